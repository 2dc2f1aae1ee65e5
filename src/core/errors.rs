/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use crate::core::types::OwnerId;
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

// Re-export RegionError from the shared memory module
pub use crate::ipc::shm::RegionError;

/// Result type for gate operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Gate errors with serialization support
///
/// A failed release never changes the gate state.
#[derive(Error, Debug, Clone, Serialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum SyncError {
    #[error("Cannot leave unlocked {gate}")]
    #[diagnostic(
        code(sync::unlocked_release),
        help("Every leave_critical_section must pair with a preceding enter_critical_section.")
    )]
    UnlockedRelease { gate: &'static str },

    #[error("Mutex can only be unlocked by the context that locked it (owner: {owner:?}, caller: {caller})")]
    #[diagnostic(
        code(sync::wrong_owner),
        help("Release the mutex from the same context that acquired it.")
    )]
    WrongOwner {
        owner: Option<OwnerId>,
        caller: OwnerId,
    },

    #[error("Timed out entering {gate} after {waited_ms}ms")]
    #[diagnostic(
        code(sync::timeout),
        help("The gate stayed held for the whole timeout. Check for a holder that never leaves.")
    )]
    Timeout { gate: &'static str, waited_ms: u64 },

    #[error("Permit count {permits} exceeds maximum {max}")]
    #[diagnostic(
        code(sync::invalid_permits),
        help("A counting semaphore cell is a signed 32-bit word.")
    )]
    InvalidPermits { permits: u32, max: u32 },

    #[error("Region error: {0}")]
    #[diagnostic(transparent)]
    Region(#[from] RegionError),
}

/// Task queue errors
///
/// Every variant except `Closed`, `NoRuntime` and `InvalidConfig` reaches
/// callers through the settled listener rather than a return value.
#[derive(Error, Debug, Diagnostic)]
pub enum QueueError {
    #[error("Process timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(queue::process_timed_out),
        help("The task did not settle within the task timeout. Its channel was reclaimed.")
    )]
    ProcessTimedOut { timeout_ms: u64 },

    #[error("Task wait timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(queue::wait_timed_out),
        help("No channel became free within the wait timeout. The task never started.")
    )]
    WaitTimedOut { timeout_ms: u64 },

    #[error("Task failed: {0:#}")]
    #[diagnostic(code(queue::task_failed))]
    Failed(anyhow::Error),

    #[error("Task panicked: {0}")]
    #[diagnostic(code(queue::task_panicked))]
    Panicked(String),

    #[error("Queue driver has shut down")]
    #[diagnostic(
        code(queue::closed),
        help("The runtime running the queue driver was shut down.")
    )]
    Closed,

    #[error("No tokio runtime available to drive the queue")]
    #[diagnostic(
        code(queue::no_runtime),
        help("Create the queue from inside a tokio runtime.")
    )]
    NoRuntime,

    #[error("Invalid queue configuration: {0}")]
    #[diagnostic(code(queue::invalid_config))]
    InvalidConfig(String),
}

impl QueueError {
    /// True for the two timeout variants
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            QueueError::ProcessTimedOut { .. } | QueueError::WaitTimedOut { .. }
        )
    }
}
