/*!
 * Shared-Memory Isolation Primitives
 *
 * Cross-thread gates built on shared memory and futex-style wait/notify,
 * plus a concurrency-limited asynchronous task queue.
 */

pub mod core;
pub mod ipc;
pub mod monitoring;
pub mod queue;

// Re-exports
pub use crate::core::errors::{QueueError, QueueResult, RegionError, SyncError, SyncResult};
pub use crate::core::sync::{
    BinarySemaphore, CasBinarySemaphore, CountingSemaphore, CriticalSection, Mutex, SectionGuard,
    SyncConfig,
};
pub use crate::core::types::{OwnerId, TaskId};
pub use ipc::{AtomicCell, SharedRegion};
pub use monitoring::init_tracing;
pub use queue::{QueueConfig, QueueStats, TaskOutcome, TaskQueue};
