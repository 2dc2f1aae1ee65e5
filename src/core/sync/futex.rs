/*!
 * Futex-Style Wait/Notify
 *
 * Uses parking_lot_core to block on the address of a shared cell.
 * On Linux the parking lot sits on top of futex syscalls.
 *
 * # Design
 *
 * Follows Linux futex semantics: a waiter parks only if the cell still holds
 * the expected value. The comparison runs under the parking lot bucket lock,
 * and `wake` takes the same lock, so a store followed by a wake can never
 * slip between a waiter's check and its sleep.
 * - Keyed on the cell's address: every view of the same region/offset shares it
 * - Spurious wakeups are possible; callers re-validate in a loop
 */

use super::traits::{WaitOutcome, WakeResult};
use parking_lot_core::{
    park, unpark_all, unpark_filter, unpark_one, FilterOp, ParkResult, ParkToken,
    DEFAULT_PARK_TOKEN, DEFAULT_UNPARK_TOKEN,
};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::{Duration, Instant};

#[inline]
fn park_key(atomic: &AtomicI32) -> usize {
    atomic as *const AtomicI32 as usize
}

/// Block until woken, provided `atomic` still equals `expected`
pub(crate) fn wait(atomic: &AtomicI32, expected: i32, timeout: Option<Duration>) -> WaitOutcome {
    let deadline = timeout.and_then(|d| Instant::now().checked_add(d));
    let key = park_key(atomic);

    // SAFETY: the callbacks neither panic nor call back into parking_lot
    let result = unsafe {
        park(
            key,
            || atomic.load(Ordering::SeqCst) == expected,
            || {},
            |_key, _timed_out| {},
            DEFAULT_PARK_TOKEN,
            deadline,
        )
    };

    match result {
        ParkResult::Unparked(_) => WaitOutcome::Woken,
        ParkResult::Invalid => WaitOutcome::NotEqual,
        ParkResult::TimedOut => WaitOutcome::TimedOut,
    }
}

/// Wake up to `count` threads parked on `atomic`
pub(crate) fn wake(atomic: &AtomicI32, count: usize) -> WakeResult {
    let key = park_key(atomic);

    let woken = match count {
        0 => 0,
        // SAFETY: the callback neither panics nor calls back into parking_lot
        1 => unsafe { unpark_one(key, |_| DEFAULT_UNPARK_TOKEN) }.unparked_threads,
        usize::MAX => unsafe { unpark_all(key, DEFAULT_UNPARK_TOKEN) },
        n => {
            let mut remaining = n;
            let filter = |_: ParkToken| {
                if remaining == 0 {
                    FilterOp::Stop
                } else {
                    remaining -= 1;
                    FilterOp::Unpark
                }
            };
            // SAFETY: the callbacks neither panic nor call back into parking_lot
            unsafe { unpark_filter(key, filter, |_| DEFAULT_UNPARK_TOKEN) }.unparked_threads
        }
    };

    if woken == 0 {
        WakeResult::NoWaiters
    } else {
        WakeResult::Woken(woken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_futex_wake_one() {
        let cell = Arc::new(AtomicI32::new(1));
        let cell_clone = cell.clone();

        let handle = thread::spawn(move || wait(&cell_clone, 1, Some(Duration::from_secs(5))));

        // Give thread time to park
        thread::sleep(Duration::from_millis(50));

        cell.store(0, Ordering::SeqCst);
        assert_eq!(wake(&cell, 1), WakeResult::Woken(1));
        assert_eq!(handle.join().unwrap(), WaitOutcome::Woken);
    }

    #[test]
    fn test_futex_value_mismatch_returns_immediately() {
        let cell = AtomicI32::new(3);
        assert_eq!(wait(&cell, 0, None), WaitOutcome::NotEqual);
    }

    #[test]
    fn test_futex_timeout() {
        let cell = AtomicI32::new(0);
        let start = Instant::now();
        let outcome = wait(&cell, 0, Some(Duration::from_millis(50)));

        assert_eq!(outcome, WaitOutcome::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_futex_wake_counted() {
        let cell = Arc::new(AtomicI32::new(0));
        let handles: Vec<_> = (0..3)
            .map(|_| {
                let cell = cell.clone();
                thread::spawn(move || wait(&cell, 0, Some(Duration::from_secs(5))))
            })
            .collect();

        thread::sleep(Duration::from_millis(100));

        assert_eq!(wake(&cell, 2), WakeResult::Woken(2));
        assert_eq!(wake(&cell, usize::MAX), WakeResult::Woken(1));
        assert_eq!(wake(&cell, 1), WakeResult::NoWaiters);

        for handle in handles {
            assert_eq!(handle.join().unwrap(), WaitOutcome::Woken);
        }
    }
}
