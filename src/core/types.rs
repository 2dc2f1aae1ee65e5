/*!
 * Core Types
 * Identifiers shared by the gates and the task queue
 */

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Byte offset inside a shared region
pub type Offset = usize;

/// Size type for region operations
pub type Size = usize;

// ============================================================================
// Type-Safe ID Wrappers
// ============================================================================

/// Identifier of an execution context that may own a [`Mutex`](crate::core::sync::Mutex)
///
/// Zero is reserved for "no owner" so the id fits in a single atomic word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(u64);

/// Identifier of a task admitted to a [`TaskQueue`](crate::queue::TaskQueue)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u64);

/// Identifier of a shared region, unique within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegionId(pub u32);

static NEXT_OWNER: AtomicU64 = AtomicU64::new(1);
static NEXT_REGION: AtomicU32 = AtomicU32::new(1);

thread_local! {
    static THREAD_OWNER: Cell<u64> = const { Cell::new(0) };
}

impl OwnerId {
    /// Sentinel stored when nobody holds the gate
    pub(crate) const NONE: u64 = 0;

    /// Allocate a fresh id, distinct from every thread id and every other call
    pub fn next() -> Self {
        Self(NEXT_OWNER.fetch_add(1, Ordering::Relaxed))
    }

    /// Id of the calling OS thread, assigned on first use
    pub fn current() -> Self {
        THREAD_OWNER.with(|slot| {
            let id = slot.get();
            if id != Self::NONE {
                return Self(id);
            }
            let fresh = Self::next();
            slot.set(fresh.0);
            fresh
        })
    }

    pub(crate) fn from_raw(raw: u64) -> Option<Self> {
        (raw != Self::NONE).then_some(Self(raw))
    }

    pub(crate) fn as_raw(self) -> u64 {
        self.0
    }
}

impl RegionId {
    pub(crate) fn next() -> Self {
        Self(NEXT_REGION.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_current_owner_is_stable_per_thread() {
        let a = OwnerId::current();
        let b = OwnerId::current();
        assert_eq!(a, b);

        let other = thread::spawn(OwnerId::current).join().unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn test_next_owner_never_collides() {
        let current = OwnerId::current();
        let fresh = OwnerId::next();
        assert_ne!(current, fresh);
        assert_ne!(fresh.as_raw(), OwnerId::NONE);
    }

    #[test]
    fn test_raw_round_trip_rejects_none() {
        assert_eq!(OwnerId::from_raw(OwnerId::NONE), None);
        let id = OwnerId::next();
        assert_eq!(OwnerId::from_raw(id.as_raw()), Some(id));
    }
}
