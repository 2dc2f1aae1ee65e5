/*!
 * Task Queue Handle
 */

use super::config::QueueConfig;
use super::driver::Driver;
use super::types::{Command, QueueStats, TaskOutcome};
use crate::core::errors::{QueueError, QueueResult};
use crate::core::types::TaskId;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// Concurrency-limited asynchronous task queue
///
/// At most `channels` tasks run at once; the rest wait in admission order.
/// Tasks are zero-argument closures returning a future of
/// `anyhow::Result<T>`. Results are observed only through listeners:
///
/// - `on_success`: once per task that returned `Ok`, with its value
/// - `on_settled`: once per task, with its [`TaskOutcome`]
/// - `on_drain`: whenever nothing is pending or in flight after work was admitted
///
/// Tasks are polled on the queue's driver task, so blocking work inside a
/// task should go through `tokio::task::spawn_blocking`.
///
/// All calls on a handle are applied by the driver in the order they were
/// made, so a listener registered before an `add` sees that task settle.
/// Clones share the same queue. Dropping every handle lets outstanding work
/// finish, then stops the driver.
///
/// # Example
///
/// ```
/// use shm_isolation::queue::TaskQueue;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let queue = TaskQueue::<u32>::channels(2)?;
/// queue
///     .timeout(Duration::from_secs(1))
///     .on_success(|value| println!("task finished with {value}"));
///
/// for i in 0..4 {
///     queue.add(move || async move { Ok(i * 10) })?;
/// }
/// queue.drained().await?;
/// # Ok(())
/// # }
/// ```
pub struct TaskQueue<T> {
    commands: mpsc::UnboundedSender<Command<T>>,
    next_id: Arc<AtomicU64>,
}

impl<T: Send + 'static> TaskQueue<T> {
    /// Start a queue on the current tokio runtime
    pub fn new(config: QueueConfig) -> QueueResult<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;

        let (commands, receiver) = mpsc::unbounded_channel();
        info!(
            channels = config.channels,
            task_timeout_ms = config.task_timeout.map(|d| d.as_millis() as u64),
            wait_timeout_ms = config.wait_timeout.map(|d| d.as_millis() as u64),
            "starting task queue"
        );
        runtime.spawn(Driver::new(config, receiver).run());

        Ok(Self {
            commands,
            next_id: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Start a queue running at most `channels` tasks at once
    pub fn channels(channels: usize) -> QueueResult<Self> {
        Self::new(QueueConfig::channels(channels))
    }

    fn send(&self, command: Command<T>) -> QueueResult<()> {
        self.commands.send(command).map_err(|_| QueueError::Closed)
    }

    fn configure(&self, command: Command<T>, what: &'static str) -> &Self {
        if self.send(command).is_err() {
            warn!(setting = what, "queue driver gone, configuration ignored");
        }
        self
    }

    /// Fail tasks that have not settled within `timeout` of starting
    ///
    /// Applies to tasks started after this call.
    pub fn timeout(&self, timeout: Duration) -> &Self {
        self.configure(Command::SetTaskTimeout(Some(timeout)), "task_timeout")
    }

    /// Fail tasks that have waited longer than `timeout` for a channel
    ///
    /// Applies to tasks admitted after this call.
    pub fn wait(&self, timeout: Duration) -> &Self {
        self.configure(Command::SetWaitTimeout(Some(timeout)), "wait_timeout")
    }

    pub fn on_success<F>(&self, listener: F) -> &Self
    where
        F: FnMut(&T) + Send + 'static,
    {
        self.configure(Command::OnSuccess(Box::new(listener)), "on_success")
    }

    pub fn on_settled<F>(&self, listener: F) -> &Self
    where
        F: FnMut(&TaskOutcome<T>) + Send + 'static,
    {
        self.configure(Command::OnSettled(Box::new(listener)), "on_settled")
    }

    pub fn on_drain<F>(&self, listener: F) -> &Self
    where
        F: FnMut() + Send + 'static,
    {
        self.configure(Command::OnDrain(Box::new(listener)), "on_drain")
    }

    /// Admit a task; returns at once with the id it was given
    ///
    /// `task` is invoked when the task gets a channel, never before.
    pub fn add<F, Fut>(&self, task: F) -> QueueResult<TaskId>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.send(Command::Add {
            id,
            task: Box::new(move || task().boxed()),
        })?;
        Ok(id)
    }

    pub async fn stats(&self) -> QueueResult<QueueStats> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Stats(reply))?;
        response.await.map_err(|_| QueueError::Closed)
    }

    /// Resolve at the next drain, or at once if the queue is idle
    pub async fn drained(&self) -> QueueResult<()> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Drained(reply))?;
        response.await.map_err(|_| QueueError::Closed)
    }
}

impl<T> Clone for TaskQueue<T> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            next_id: self.next_id.clone(),
        }
    }
}

impl<T> fmt::Debug for TaskQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("admitted", &self.next_id.load(Ordering::Relaxed))
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}
