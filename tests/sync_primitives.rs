/*!
 * Synchronization Primitives Integration Tests
 *
 * Independent instances per thread over one shared region: mutual
 * exclusion, permit bounds and cross-context blocking.
 */

use pretty_assertions::assert_eq;
use shm_isolation::{
    BinarySemaphore, CasBinarySemaphore, CountingSemaphore, CriticalSection, Mutex, SharedRegion,
    SyncConfig, SyncError,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const THREADS: usize = 8;
const ITERATIONS: usize = 500;

/// Every thread builds its own gate over offset 0 and bumps the counter cell
/// at offset 4 with a non-atomic read-then-write inside the section.
fn assert_no_lost_updates<G, F>(make: F)
where
    G: CriticalSection,
    F: Fn(&SharedRegion) -> G + Copy + Send + 'static,
{
    let region = SharedRegion::new(8).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let region = region.clone();
            thread::spawn(move || {
                let gate = make(&region);
                let counter = region.cell(4).unwrap();
                for i in 0..ITERATIONS {
                    gate.enter_critical_section();
                    let value = counter.load();
                    if i % 64 == 0 {
                        thread::yield_now();
                    }
                    counter.store(value + 1);
                    gate.leave_critical_section().unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        region.cell(4).unwrap().load() as usize,
        THREADS * ITERATIONS
    );
}

#[test]
fn test_binary_semaphore_mutual_exclusion() {
    assert_no_lost_updates(|region| BinarySemaphore::new(region, 0, false).unwrap());
}

#[test]
fn test_binary_semaphore_mutual_exclusion_without_spinning() {
    assert_no_lost_updates(|region| {
        BinarySemaphore::new(region, 0, false)
            .unwrap()
            .with_config(SyncConfig::no_spin())
    });
}

#[test]
fn test_cas_binary_semaphore_mutual_exclusion() {
    // The zero-filled cell reads "held" for this variant until one context initializes it
    fn make(region: &SharedRegion) -> CasBinarySemaphore {
        CasBinarySemaphore::new(region, 0, false).unwrap()
    }

    let region = SharedRegion::new(8).unwrap();
    CasBinarySemaphore::new(&region, 0, true).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let region = region.clone();
            thread::spawn(move || {
                let gate = make(&region);
                let counter = region.cell(4).unwrap();
                for _ in 0..ITERATIONS {
                    let _section = gate.guard();
                    counter.store(counter.load() + 1);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(region.cell(4).unwrap().load() as usize, THREADS * ITERATIONS);
}

#[test]
fn test_mutex_mutual_exclusion() {
    assert_no_lost_updates(|region| Mutex::new(region, 0, false).unwrap());
}

#[test]
fn test_single_permit_counting_semaphore_mutual_exclusion() {
    let region = SharedRegion::new(8).unwrap();
    CountingSemaphore::new(&region, 0, 1).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let region = region.clone();
            thread::spawn(move || {
                let gate = CountingSemaphore::attach(&region, 0, 1).unwrap();
                let counter = region.cell(4).unwrap();
                for _ in 0..ITERATIONS {
                    gate.enter_critical_section();
                    counter.store(counter.load() + 1);
                    gate.leave_critical_section().unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(region.cell(4).unwrap().load() as usize, THREADS * ITERATIONS);
}

#[test]
fn test_counting_semaphore_bounds_concurrency() {
    const PERMITS: u32 = 2;

    let region = SharedRegion::new(4).unwrap();
    let semaphore = CountingSemaphore::new(&region, 0, PERMITS).unwrap();
    let inside = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let region = region.clone();
            let inside = inside.clone();
            let peak = peak.clone();
            thread::spawn(move || {
                let gate = CountingSemaphore::attach(&region, 0, PERMITS).unwrap();
                for _ in 0..50 {
                    gate.enter_critical_section();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);

                    let available = gate.available();
                    assert!((0..=PERMITS as i32).contains(&available));

                    thread::sleep(Duration::from_micros(50));
                    inside.fetch_sub(1, Ordering::SeqCst);
                    gate.leave_critical_section().unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= PERMITS as usize);
    assert_eq!(semaphore.available(), PERMITS as i32);
}

#[test]
fn test_acquire_beyond_permits_blocks_until_release() {
    let region = SharedRegion::new(4).unwrap();
    let semaphore = CountingSemaphore::new(&region, 0, 2).unwrap();
    semaphore.enter_critical_section();
    semaphore.enter_critical_section();

    let entered = Arc::new(AtomicBool::new(false));
    let waiter_entered = entered.clone();
    let waiter_region = region.clone();
    let handle = thread::spawn(move || {
        let gate = CountingSemaphore::attach(&waiter_region, 0, 2).unwrap();
        gate.enter_critical_section();
        waiter_entered.store(true, Ordering::SeqCst);
        gate.leave_critical_section().unwrap();
    });

    thread::sleep(Duration::from_millis(100));
    assert!(!entered.load(Ordering::SeqCst));

    semaphore.leave_critical_section().unwrap();
    handle.join().unwrap();
    assert!(entered.load(Ordering::SeqCst));

    semaphore.leave_critical_section().unwrap();
    assert_eq!(semaphore.available(), 2);
}

#[test]
fn test_mutex_wrong_owner_across_threads() {
    let region = SharedRegion::new(4).unwrap();
    let mutex = Mutex::new(&region, 0, true).unwrap();
    mutex.enter_critical_section();

    let other_region = region.clone();
    let result = thread::spawn(move || {
        let view = Mutex::new(&other_region, 0, false).unwrap();
        let release = view.leave_critical_section();
        let acquired = view.try_enter_critical_section();
        (release, acquired)
    })
    .join()
    .unwrap();

    assert!(matches!(result.0, Err(SyncError::WrongOwner { .. })));
    assert!(!result.1);
    assert!(mutex.is_locked());

    mutex.leave_critical_section().unwrap();
    assert!(!mutex.is_locked());
}

#[test]
fn test_timed_enter_succeeds_when_released_in_time() {
    let region = SharedRegion::new(4).unwrap();
    let holder = BinarySemaphore::new(&region, 0, true).unwrap();
    holder.enter_critical_section();

    let waiter_region = region.clone();
    let handle = thread::spawn(move || {
        let gate = BinarySemaphore::new(&waiter_region, 0, false).unwrap();
        let result = gate.enter_critical_section_timeout(Duration::from_secs(5));
        if result.is_ok() {
            gate.leave_critical_section().unwrap();
        }
        result
    });

    thread::sleep(Duration::from_millis(50));
    holder.leave_critical_section().unwrap();

    assert!(handle.join().unwrap().is_ok());
}

#[test]
fn test_offsets_are_independent_gates() {
    let region = SharedRegion::new(12).unwrap();
    let first = Mutex::new(&region, 0, true).unwrap();
    let second = BinarySemaphore::new(&region, 4, true).unwrap();
    let third = CountingSemaphore::new(&region, 8, 3).unwrap();

    first.enter_critical_section();
    assert!(second.try_enter_critical_section());
    assert!(third.try_enter_critical_section());

    assert_eq!(region.cell(0).unwrap().load(), 1);
    assert_eq!(region.cell(4).unwrap().load(), 1);
    assert_eq!(region.cell(8).unwrap().load(), 2);
}

#[test]
fn test_constructor_rejects_bad_offset() {
    let region = SharedRegion::new(6).unwrap();
    assert!(matches!(
        BinarySemaphore::new(&region, 4, true),
        Err(SyncError::Region(_))
    ));
    assert!(matches!(
        Mutex::new(&region, 1, true),
        Err(SyncError::Region(_))
    ));
}
