/*!
 * Shared Region
 * Fixed-size, word-backed memory shared by every handle that clones it
 */

use super::cell::AtomicCell;
use super::types::{RegionError, RegionStats};
use crate::core::limits::{CELL_SIZE, MAX_REGION_SIZE};
use crate::core::types::{Offset, RegionId, Size};
use std::fmt;
use std::sync::atomic::AtomicI32;
use std::sync::Arc;
use tracing::debug;

pub(super) struct RegionInner {
    pub id: RegionId,
    pub size: Size,
    pub words: Box<[AtomicI32]>,
}

/// Shared memory region
///
/// The region is allocated once with a fixed size and never grows. Cloning
/// is cheap and every clone addresses the same words, so a clone handed to
/// another thread is that thread's view of the region. Contents are only
/// reachable through [`AtomicCell`] views.
#[derive(Clone)]
pub struct SharedRegion {
    inner: Arc<RegionInner>,
}

impl SharedRegion {
    /// Allocate a zero-filled region of `size` bytes
    pub fn new(size: Size) -> Result<Self, RegionError> {
        if size == 0 {
            return Err(RegionError::InvalidSize("Size cannot be zero".to_string()));
        }
        if size > MAX_REGION_SIZE {
            return Err(RegionError::SizeExceeded {
                requested: size,
                max: MAX_REGION_SIZE,
            });
        }

        let word_count = size.div_ceil(CELL_SIZE);
        let words: Box<[AtomicI32]> = (0..word_count).map(|_| AtomicI32::new(0)).collect();
        let id = RegionId::next();

        debug!(region = %id, size, words = word_count, "shared region allocated");

        Ok(Self {
            inner: Arc::new(RegionInner { id, size, words }),
        })
    }

    /// Atomic view of the 32-bit cell at byte `offset`
    pub fn cell(&self, offset: Offset) -> Result<AtomicCell, RegionError> {
        RegionError::check_cell(offset, self.inner.size)?;
        Ok(AtomicCell::new(self.inner.clone(), offset / CELL_SIZE))
    }

    pub fn id(&self) -> RegionId {
        self.inner.id
    }

    /// Logical size in bytes, as requested at allocation
    pub fn size(&self) -> Size {
        self.inner.size
    }

    /// Number of whole cells that fit in the region
    pub fn cell_count(&self) -> usize {
        self.inner.size / CELL_SIZE
    }

    /// True when both handles address the same memory
    pub fn same_region(&self, other: &SharedRegion) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn stats(&self) -> RegionStats {
        RegionStats {
            id: self.inner.id,
            size: self.inner.size,
            cells: self.cell_count(),
            handles: Arc::strong_count(&self.inner),
        }
    }
}

impl fmt::Debug for SharedRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedRegion")
            .field("id", &self.inner.id)
            .field("size", &self.inner.size)
            .finish()
    }
}
