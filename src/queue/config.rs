/*!
 * Queue Configuration
 */

use crate::core::errors::{QueueError, QueueResult};
use crate::core::limits::{DEFAULT_QUEUE_CHANNELS, MAX_QUEUE_CHANNELS};
use std::time::Duration;

/// Task queue configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum tasks in flight at once
    pub channels: usize,
    /// Fail a started task that has not settled within this long
    pub task_timeout: Option<Duration>,
    /// Fail a pending task that has not started within this long of admission
    pub wait_timeout: Option<Duration>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            channels: DEFAULT_QUEUE_CHANNELS,
            task_timeout: None,
            wait_timeout: None,
        }
    }
}

impl QueueConfig {
    pub fn channels(channels: usize) -> Self {
        Self {
            channels,
            ..Default::default()
        }
    }

    pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = Some(timeout);
        self
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> QueueResult<()> {
        if self.channels == 0 {
            return Err(QueueError::InvalidConfig(
                "channel count must be at least 1".to_string(),
            ));
        }
        if self.channels > MAX_QUEUE_CHANNELS {
            return Err(QueueError::InvalidConfig(format!(
                "channel count {} exceeds limit {}",
                self.channels, MAX_QUEUE_CHANNELS
            )));
        }
        Ok(())
    }
}
