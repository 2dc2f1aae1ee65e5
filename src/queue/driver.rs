/*!
 * Queue Driver
 *
 * Owns every piece of queue state: the pending FIFO, the in-flight set,
 * the listeners and the counters. Runs as a single tokio task, so the
 * bookkeeping needs no locking; `TaskQueue` handles only send commands.
 *
 * Started tasks are polled by the driver itself, first in admission order,
 * so equal-duration tasks finish in the order they were added. A task that
 * exceeds the task timeout is handed to `tokio::spawn` and detached rather
 * than aborted; its eventual result is discarded.
 */

use super::config::QueueConfig;
use super::types::{
    BoxedTask, Command, DrainListener, PendingTask, QueueStats, SettledListener,
    SuccessListener, TaskOutcome,
};
use crate::core::errors::QueueError;
use crate::core::limits::IDLE_TIMER_PERIOD;
use crate::core::types::TaskId;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

type InFlight<T> = BoxFuture<'static, (TaskId, TaskOutcome<T>)>;

/// A task's own future with panics caught
type Work<T> = BoxFuture<'static, std::thread::Result<anyhow::Result<T>>>;

pub(super) struct Driver<T> {
    commands: mpsc::UnboundedReceiver<Command<T>>,
    channels: usize,
    task_timeout: Option<Duration>,
    wait_timeout: Option<Duration>,
    pending: VecDeque<PendingTask<T>>,
    in_flight: FuturesUnordered<InFlight<T>>,
    on_success: Vec<SuccessListener<T>>,
    on_settled: Vec<SettledListener<T>>,
    on_drain: Vec<DrainListener>,
    drain_waiters: Vec<oneshot::Sender<()>>,
    stats: QueueStats,
    /// Work admitted since the last drain
    busy: bool,
    /// Every handle dropped; exit once idle
    closed: bool,
}

impl<T: Send + 'static> Driver<T> {
    pub fn new(config: QueueConfig, commands: mpsc::UnboundedReceiver<Command<T>>) -> Self {
        Self {
            commands,
            channels: config.channels,
            task_timeout: config.task_timeout,
            wait_timeout: config.wait_timeout,
            pending: VecDeque::new(),
            in_flight: FuturesUnordered::new(),
            on_success: Vec::new(),
            on_settled: Vec::new(),
            on_drain: Vec::new(),
            drain_waiters: Vec::new(),
            stats: QueueStats::default(),
            busy: false,
            closed: false,
        }
    }

    pub async fn run(mut self) {
        info!(channels = self.channels, "task queue driver started");

        loop {
            let next_deadline = self.next_deadline();

            tokio::select! {
                biased;

                command = self.commands.recv(), if !self.closed => match command {
                    Some(command) => self.handle(command),
                    None => {
                        debug!("all queue handles dropped, finishing outstanding work");
                        self.closed = true;
                    }
                },

                Some(first) = self.in_flight.next(), if !self.in_flight.is_empty() => {
                    // Completions that are ready together settle in admission order
                    let mut batch = vec![first];
                    while let Some(Some(done)) = self.in_flight.next().now_or_never() {
                        batch.push(done);
                    }
                    batch.sort_by_key(|(id, _)| *id);

                    for (id, outcome) in batch {
                        self.settle(id, outcome);
                    }
                    self.promote();
                    self.check_drain();
                },

                _ = tokio::time::sleep_until(
                    next_deadline.unwrap_or_else(|| Instant::now() + IDLE_TIMER_PERIOD)
                ), if next_deadline.is_some() => {
                    self.expire_waiting();
                    self.check_drain();
                },

                else => break,
            }

            if self.closed && self.is_idle() {
                break;
            }
        }

        info!(
            admitted = self.stats.admitted,
            succeeded = self.stats.succeeded,
            failed = self.stats.failed,
            "task queue driver stopped"
        );
    }

    fn handle(&mut self, command: Command<T>) {
        match command {
            Command::Add { id, task } => self.admit(id, task),
            Command::SetTaskTimeout(timeout) => self.task_timeout = timeout,
            Command::SetWaitTimeout(timeout) => self.wait_timeout = timeout,
            Command::OnSuccess(listener) => self.on_success.push(listener),
            Command::OnSettled(listener) => self.on_settled.push(listener),
            Command::OnDrain(listener) => self.on_drain.push(listener),
            Command::Stats(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Drained(reply) => {
                if self.is_idle() {
                    let _ = reply.send(());
                } else {
                    self.drain_waiters.push(reply);
                }
            }
        }
    }

    fn admit(&mut self, id: TaskId, task: BoxedTask<T>) {
        self.stats.admitted += 1;
        self.busy = true;

        if self.pending.is_empty() && self.in_flight.len() < self.channels {
            self.start(id, task);
            return;
        }

        let deadline = self.wait_timeout.and_then(|limit| {
            Instant::now()
                .checked_add(limit)
                .map(|deadline| (deadline, limit))
        });
        debug!(task = %id, pending = self.pending.len() + 1, "task queued");
        self.pending.push_back(PendingTask { id, task, deadline });
    }

    fn start(&mut self, id: TaskId, task: BoxedTask<T>) {
        let timeout = self.task_timeout;
        let mut work: Work<T> = AssertUnwindSafe(async move { task().await })
            .catch_unwind()
            .boxed();

        let observed = async move {
            let outcome = match timeout {
                None => caught(work.await),
                Some(limit) => match tokio::time::timeout(limit, &mut work).await {
                    Ok(result) => caught(result),
                    Err(_) => {
                        let _ = tokio::spawn(work);
                        Err(QueueError::ProcessTimedOut {
                            timeout_ms: limit.as_millis() as u64,
                        })
                    }
                },
            };
            (id, outcome)
        };

        self.in_flight.push(observed.boxed());
        self.stats.peak_in_flight = self.stats.peak_in_flight.max(self.in_flight.len());
        debug!(task = %id, in_flight = self.in_flight.len(), "task started");
    }

    /// Fill free channels from the front of the pending list
    fn promote(&mut self) {
        while self.in_flight.len() < self.channels {
            let Some(entry) = self.pending.pop_front() else {
                break;
            };
            if entry.is_expired(Instant::now()) {
                self.fail_waiting(entry);
                continue;
            }
            self.start(entry.id, entry.task);
        }
    }

    /// Fail every pending task whose admission deadline has passed
    fn expire_waiting(&mut self) {
        let now = Instant::now();
        let mut kept = VecDeque::with_capacity(self.pending.len());
        let mut expired = Vec::new();
        for entry in self.pending.drain(..) {
            if entry.is_expired(now) {
                expired.push(entry);
            } else {
                kept.push_back(entry);
            }
        }
        self.pending = kept;

        for entry in expired {
            self.fail_waiting(entry);
        }
    }

    fn fail_waiting(&mut self, entry: PendingTask<T>) {
        let timeout_ms = entry
            .deadline
            .map(|(_, limit)| limit.as_millis() as u64)
            .unwrap_or_default();
        self.settle(entry.id, Err(QueueError::WaitTimedOut { timeout_ms }));
    }

    fn settle(&mut self, id: TaskId, outcome: TaskOutcome<T>) {
        match &outcome {
            Ok(value) => {
                self.stats.succeeded += 1;
                debug!(task = %id, "task succeeded");
                for listener in self.on_success.iter_mut() {
                    listener(value);
                }
            }
            Err(e) => {
                self.stats.failed += 1;
                if e.is_timeout() {
                    warn!(task = %id, error = %e, "task timed out");
                } else {
                    debug!(task = %id, error = %e, "task failed");
                }
            }
        }

        for listener in self.on_settled.iter_mut() {
            listener(&outcome);
        }
    }

    fn check_drain(&mut self) {
        if !self.busy || !self.is_idle() {
            return;
        }
        self.busy = false;
        debug!(settled = self.stats.succeeded + self.stats.failed, "queue drained");

        for listener in self.on_drain.iter_mut() {
            listener();
        }
        for waiter in self.drain_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }

    fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty()
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.pending
            .iter()
            .filter_map(|entry| entry.deadline.map(|(deadline, _)| deadline))
            .min()
    }

    fn snapshot(&self) -> QueueStats {
        QueueStats {
            pending: self.pending.len(),
            in_flight: self.in_flight.len(),
            ..self.stats.clone()
        }
    }
}

fn caught<T>(result: std::thread::Result<anyhow::Result<T>>) -> TaskOutcome<T> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(QueueError::Failed(e)),
        Err(payload) => Err(QueueError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string())
}
