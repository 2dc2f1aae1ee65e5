/*!
 * Task Queue
 *
 * Bounded-concurrency execution of asynchronous work items:
 * - Config: channel count, task timeout, wait (admission) timeout
 * - Driver: single tokio task owning the pending FIFO and in-flight set
 * - Handle: cloneable `TaskQueue` that admits tasks and registers listeners
 */

mod config;
mod driver;
#[allow(clippy::module_inception)]
mod queue;
mod types;

pub use config::QueueConfig;
pub use queue::TaskQueue;
pub use types::{QueueStats, TaskOutcome};
