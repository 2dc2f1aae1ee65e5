/*!
 * Atomic Cell
 * A 32-bit slot of a shared region, reachable only through atomic operations
 */

use super::region::RegionInner;
use crate::core::limits::CELL_SIZE;
use crate::core::sync::{futex, WaitOutcome, WakeResult};
use crate::core::types::{Offset, RegionId};
use std::fmt;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Atomic view of one cell of a [`SharedRegion`](super::SharedRegion)
///
/// Every operation is sequentially consistent. Views created from the same
/// region and offset (in any thread) operate on the same word and park on
/// the same address.
#[derive(Clone)]
pub struct AtomicCell {
    region: Arc<RegionInner>,
    index: usize,
}

impl AtomicCell {
    pub(super) fn new(region: Arc<RegionInner>, index: usize) -> Self {
        Self { region, index }
    }

    #[inline]
    fn word(&self) -> &AtomicI32 {
        &self.region.words[self.index]
    }

    #[inline]
    pub fn load(&self) -> i32 {
        self.word().load(Ordering::SeqCst)
    }

    #[inline]
    pub fn store(&self, value: i32) {
        self.word().store(value, Ordering::SeqCst)
    }

    /// Store `value`, returning the previous value
    #[inline]
    pub fn exchange(&self, value: i32) -> i32 {
        self.word().swap(value, Ordering::SeqCst)
    }

    /// Store `new` only if the cell holds `current`
    ///
    /// Returns the observed value in both cases, like `AtomicI32::compare_exchange`.
    #[inline]
    pub fn compare_exchange(&self, current: i32, new: i32) -> Result<i32, i32> {
        self.word()
            .compare_exchange(current, new, Ordering::SeqCst, Ordering::SeqCst)
    }

    /// Add `delta`, returning the previous value
    #[inline]
    pub fn fetch_add(&self, delta: i32) -> i32 {
        self.word().fetch_add(delta, Ordering::SeqCst)
    }

    /// Subtract `delta`, returning the previous value
    #[inline]
    pub fn fetch_sub(&self, delta: i32) -> i32 {
        self.word().fetch_sub(delta, Ordering::SeqCst)
    }

    /// Park the calling thread while the cell holds `expected`
    ///
    /// Returns without parking if the value already differs. May wake
    /// spuriously.
    pub fn wait(&self, expected: i32, timeout: Option<Duration>) -> WaitOutcome {
        futex::wait(self.word(), expected, timeout)
    }

    /// Wake at most one parked thread
    pub fn notify_one(&self) -> WakeResult {
        futex::wake(self.word(), 1)
    }

    /// Wake every parked thread
    pub fn notify_all(&self) -> WakeResult {
        futex::wake(self.word(), usize::MAX)
    }

    /// Wake at most `count` parked threads
    pub fn notify(&self, count: usize) -> WakeResult {
        futex::wake(self.word(), count)
    }

    /// Byte offset of this cell within its region
    pub fn offset(&self) -> Offset {
        self.index * CELL_SIZE
    }

    pub fn region_id(&self) -> RegionId {
        self.region.id
    }
}

impl fmt::Debug for AtomicCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtomicCell")
            .field("region", &self.region.id)
            .field("offset", &self.offset())
            .field("value", &self.load())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::ipc::shm::SharedRegion;
    use crate::core::sync::{WaitOutcome, WakeResult};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_cell_atomic_operations() {
        let region = SharedRegion::new(8).unwrap();
        let cell = region.cell(4).unwrap();

        assert_eq!(cell.offset(), 4);
        assert_eq!(cell.exchange(5), 0);
        assert_eq!(cell.compare_exchange(5, 6), Ok(5));
        assert_eq!(cell.compare_exchange(5, 7), Err(6));
        assert_eq!(cell.fetch_add(2), 6);
        assert_eq!(cell.fetch_sub(1), 8);
        assert_eq!(cell.load(), 7);
    }

    #[test]
    fn test_views_park_on_same_address() {
        let region = SharedRegion::new(4).unwrap();
        let waiter_region = region.clone();

        let handle = thread::spawn(move || {
            let cell = waiter_region.cell(0).unwrap();
            cell.wait(0, Some(Duration::from_secs(5)))
        });

        thread::sleep(Duration::from_millis(50));

        // A different view of the same slot reaches the parked thread
        let cell = region.cell(0).unwrap();
        cell.store(1);
        assert_eq!(cell.notify_all(), WakeResult::Woken(1));
        assert_eq!(handle.join().unwrap(), WaitOutcome::Woken);
    }

    #[test]
    fn test_notify_without_waiters() {
        let region = SharedRegion::new(4).unwrap();
        let cell = region.cell(0).unwrap();
        assert_eq!(cell.notify_one(), WakeResult::NoWaiters);
        assert_eq!(cell.notify(3), WakeResult::NoWaiters);
    }
}
