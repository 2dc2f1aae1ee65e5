/*!
 * Queue Types
 * Task records, listener signatures, driver commands and statistics
 */

use crate::core::errors::QueueError;
use crate::core::types::TaskId;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// How a task settled: its value, or why it produced none
pub type TaskOutcome<T> = Result<T, QueueError>;

/// A task as stored by the queue: invoked once, when it gets a channel
pub(crate) type BoxedTask<T> = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<T>> + Send>;

pub(crate) type SuccessListener<T> = Box<dyn FnMut(&T) + Send>;
pub(crate) type SettledListener<T> = Box<dyn FnMut(&TaskOutcome<T>) + Send>;
pub(crate) type DrainListener = Box<dyn FnMut() + Send>;

/// Messages from `TaskQueue` handles to the driver, applied in send order
pub(crate) enum Command<T> {
    Add { id: TaskId, task: BoxedTask<T> },
    SetTaskTimeout(Option<Duration>),
    SetWaitTimeout(Option<Duration>),
    OnSuccess(SuccessListener<T>),
    OnSettled(SettledListener<T>),
    OnDrain(DrainListener),
    Stats(oneshot::Sender<QueueStats>),
    Drained(oneshot::Sender<()>),
}

/// A task waiting for a free channel
pub(crate) struct PendingTask<T> {
    pub id: TaskId,
    pub task: BoxedTask<T>,
    /// Admission deadline and the wait timeout it was derived from
    pub deadline: Option<(Instant, Duration)>,
}

impl<T> PendingTask<T> {
    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.deadline, Some((deadline, _)) if now >= deadline)
    }
}

/// Point-in-time queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct QueueStats {
    pub pending: usize,
    pub in_flight: usize,
    /// Highest simultaneous in-flight count observed
    pub peak_in_flight: usize,
    pub admitted: u64,
    pub succeeded: u64,
    pub failed: u64,
}
