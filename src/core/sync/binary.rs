/*!
 * Binary Semaphore
 * Ownerless 0/1 gate over one shared cell (exchange protocol)
 */

use super::config::SyncConfig;
use super::exchange::ExchangeGate;
use super::traits::CriticalSection;
use crate::core::errors::{SyncError, SyncResult};
use crate::core::types::Offset;
use crate::ipc::shm::{AtomicCell, SharedRegion};
use std::time::{Duration, Instant};

const NAME: &str = "BinarySemaphore";

/// Mutual exclusion without ownership tracking
///
/// Cell values: 0 = free, 1 = held. Any context may leave a semaphore it did
/// not enter; leaving a free semaphore fails with `UnlockedRelease`.
///
/// Construct one instance per context over the same region and offset.
/// Exactly one of them should pass `init = true`, before the others start
/// using the cell; initializing a cell that is in use resets it.
#[derive(Debug, Clone)]
pub struct BinarySemaphore {
    gate: ExchangeGate,
}

impl BinarySemaphore {
    pub fn new(region: &SharedRegion, offset: Offset, init: bool) -> SyncResult<Self> {
        let cell = region.cell(offset)?;
        Ok(Self {
            gate: ExchangeGate::new(cell, init),
        })
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.gate.set_config(config);
        self
    }

    /// True while some context holds the gate
    pub fn is_locked(&self) -> bool {
        self.gate.is_held()
    }

    pub fn cell(&self) -> &AtomicCell {
        self.gate.cell()
    }
}

impl CriticalSection for BinarySemaphore {
    fn enter_critical_section(&self) {
        self.gate.acquire(None);
    }

    fn try_enter_critical_section(&self) -> bool {
        self.gate.try_acquire()
    }

    fn enter_critical_section_timeout(&self, timeout: Duration) -> SyncResult<()> {
        let start = Instant::now();
        if self.gate.acquire(start.checked_add(timeout)) {
            Ok(())
        } else {
            Err(SyncError::Timeout {
                gate: NAME,
                waited_ms: start.elapsed().as_millis() as u64,
            })
        }
    }

    fn leave_critical_section(&self) -> SyncResult<()> {
        self.gate.release(NAME)
    }

    fn name(&self) -> &'static str {
        NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn semaphore() -> BinarySemaphore {
        let region = SharedRegion::new(4).unwrap();
        BinarySemaphore::new(&region, 0, true).unwrap()
    }

    #[test]
    fn test_enter_leave() {
        let sem = semaphore();
        sem.enter_critical_section();
        assert!(sem.is_locked());
        assert_eq!(sem.cell().load(), 1);
        sem.leave_critical_section().unwrap();
        assert!(!sem.is_locked());
    }

    #[test]
    fn test_leave_unlocked_fails() {
        let sem = semaphore();
        assert_eq!(
            sem.leave_critical_section(),
            Err(SyncError::UnlockedRelease { gate: NAME })
        );
        assert!(!sem.is_locked());
    }

    #[test]
    fn test_double_leave_fails_once_released() {
        let sem = semaphore();
        sem.enter_critical_section();
        sem.leave_critical_section().unwrap();
        assert!(sem.leave_critical_section().is_err());
    }

    #[test]
    fn test_try_enter_when_held() {
        let sem = semaphore();
        assert!(sem.try_enter_critical_section());
        assert!(!sem.try_enter_critical_section());
        // A failed try leaves the gate held, not reset
        assert!(sem.is_locked());
    }

    #[test]
    fn test_timeout_while_held() {
        let sem = semaphore();
        sem.enter_critical_section();
        let err = sem
            .enter_critical_section_timeout(Duration::from_millis(30))
            .unwrap_err();
        assert!(matches!(err, SyncError::Timeout { gate: NAME, .. }));
        assert!(sem.is_locked());
    }

    #[test]
    fn test_release_from_other_thread() {
        let region = SharedRegion::new(4).unwrap();
        let sem = BinarySemaphore::new(&region, 0, true).unwrap();
        sem.enter_critical_section();

        let other_region = region.clone();
        thread::spawn(move || {
            let view = BinarySemaphore::new(&other_region, 0, false).unwrap();
            view.leave_critical_section()
        })
        .join()
        .unwrap()
        .unwrap();

        assert!(!sem.is_locked());
    }

    #[test]
    fn test_blocked_enter_resumes_after_leave() {
        let region = SharedRegion::new(4).unwrap();
        let sem = BinarySemaphore::new(&region, 0, true)
            .unwrap()
            .with_config(SyncConfig::no_spin());
        sem.enter_critical_section();

        let waiter_region = region.clone();
        let handle = thread::spawn(move || {
            let view = BinarySemaphore::new(&waiter_region, 0, false).unwrap();
            view.enter_critical_section();
            view.leave_critical_section()
        });

        thread::sleep(Duration::from_millis(50));
        sem.leave_critical_section().unwrap();

        handle.join().unwrap().unwrap();
        assert!(!sem.is_locked());
    }

    #[test]
    fn test_guard_leaves_on_drop() {
        let sem = semaphore();
        {
            let _guard = sem.guard();
            assert!(sem.is_locked());
        }
        assert!(!sem.is_locked());

        let guard = sem.guard();
        guard.leave().unwrap();
        assert!(!sem.is_locked());
    }
}
