/*!
 * Shared Region Types
 * Errors and statistics for shared regions
 */

use crate::core::limits::{CELL_ALIGN, CELL_SIZE};
use crate::core::types::{Offset, RegionId, Size};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Shared region error types
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum RegionError {
    /// Zero-sized region
    #[error("Invalid size: {0}")]
    #[diagnostic(code(region::invalid_size))]
    InvalidSize(String),

    /// Region size exceeds maximum allowed
    #[error("Region size exceeds limit: requested {requested}, max {max}")]
    #[diagnostic(code(region::size_exceeded))]
    SizeExceeded { requested: Size, max: Size },

    /// Cell offset not aligned to a 32-bit word
    #[error("Misaligned cell offset {offset}: must be a multiple of {align}")]
    #[diagnostic(
        code(region::misaligned),
        help("Cells are 32-bit words. Place each primitive at a multiple of 4 bytes.")
    )]
    Misaligned { offset: Offset, align: Size },

    /// Cell does not fit inside the region
    #[error("Invalid offset or size: offset {offset}, size {size}, region size {region_size}")]
    #[diagnostic(
        code(region::invalid_range),
        help("Allocate the region with at least 4 bytes per primitive.")
    )]
    InvalidRange {
        offset: Offset,
        size: Size,
        region_size: Size,
    },
}

impl RegionError {
    pub(super) fn check_cell(offset: Offset, region_size: Size) -> Result<(), RegionError> {
        if offset % CELL_ALIGN != 0 {
            return Err(RegionError::Misaligned {
                offset,
                align: CELL_ALIGN,
            });
        }
        match offset.checked_add(CELL_SIZE) {
            Some(end) if end <= region_size => Ok(()),
            _ => Err(RegionError::InvalidRange {
                offset,
                size: CELL_SIZE,
                region_size,
            }),
        }
    }
}

/// Shared region statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RegionStats {
    pub id: RegionId,
    pub size: Size,
    pub cells: usize,
    /// Number of live handles (region clones and cells)
    pub handles: usize,
}
