/*!
 * Exchange Protocol
 *
 * The 0/1 gate shared by `BinarySemaphore` and `Mutex`: acquire by swapping
 * in LOCKED and looking at what was there, release by storing UNLOCKED and
 * waking one waiter.
 */

use super::config::SyncConfig;
use super::spinwait::spin_until;
use super::traits::WaitOutcome;
use crate::core::errors::{SyncError, SyncResult};
use crate::core::limits::{LOCKED, UNLOCKED};
use crate::ipc::shm::AtomicCell;
use std::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
pub(super) struct ExchangeGate {
    cell: AtomicCell,
    config: SyncConfig,
}

impl ExchangeGate {
    pub fn new(cell: AtomicCell, init: bool) -> Self {
        if init {
            cell.store(UNLOCKED);
        }
        Self {
            cell,
            config: SyncConfig::default(),
        }
    }

    pub fn set_config(&mut self, config: SyncConfig) {
        self.config = config;
    }

    #[inline]
    pub fn try_acquire(&self) -> bool {
        self.cell.exchange(LOCKED) == UNLOCKED
    }

    /// Loop until an exchange observes UNLOCKED, or `deadline` passes
    ///
    /// Mutual exclusion rests on the exchange alone; a wake only means
    /// "try again".
    pub fn acquire(&self, deadline: Option<Instant>) -> bool {
        let mut parks = 0u32;
        loop {
            if self.try_acquire() {
                if parks > 0 {
                    debug!(
                        region = %self.cell.region_id(),
                        offset = self.cell.offset(),
                        parks,
                        "gate acquired after contention"
                    );
                }
                return true;
            }

            if spin_until(&self.config, || self.cell.load() == UNLOCKED) {
                continue;
            }

            let remaining = match deadline {
                Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                    Some(remaining) if !remaining.is_zero() => Some(remaining),
                    _ => return false,
                },
                None => None,
            };

            if self.cell.wait(LOCKED, remaining) == WaitOutcome::Woken {
                parks += 1;
            }
        }
    }

    /// Store UNLOCKED and wake one waiter; a free gate is a caller bug
    pub fn release(&self, gate: &'static str) -> SyncResult<()> {
        if self.cell.load() == UNLOCKED {
            return Err(SyncError::UnlockedRelease { gate });
        }
        self.cell.store(UNLOCKED);
        self.cell.notify_one();
        Ok(())
    }

    #[inline]
    pub fn is_held(&self) -> bool {
        self.cell.load() != UNLOCKED
    }

    pub fn cell(&self) -> &AtomicCell {
        &self.cell
    }
}
