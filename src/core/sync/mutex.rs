/*!
 * Mutex
 *
 * Exchange-protocol gate layered with logical owner tracking. The owner is
 * kept in the instance, not in the shared cell: each context builds its own
 * `Mutex` over the same region and offset.
 */

use super::config::SyncConfig;
use super::exchange::ExchangeGate;
use super::traits::CriticalSection;
use crate::core::errors::{SyncError, SyncResult};
use crate::core::types::{Offset, OwnerId};
use crate::ipc::shm::{AtomicCell, SharedRegion};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

const NAME: &str = "Mutex";

/// Mutual exclusion with owner enforcement
///
/// States: unlocked, or locked by one owner. Only the owner may leave; a
/// leave by anyone else fails with `WrongOwner` and the owner keeps the lock.
/// Leaving while unlocked fails with `UnlockedRelease`.
///
/// The plain `enter`/`leave` calls identify the caller by
/// [`OwnerId::current`]; the `_as` variants take an explicit id for callers
/// whose execution context is not an OS thread.
///
/// Not re-entrant: entering twice from the same owner blocks forever.
#[derive(Debug)]
pub struct Mutex {
    gate: ExchangeGate,
    owner: AtomicU64,
}

impl Mutex {
    pub fn new(region: &SharedRegion, offset: Offset, init: bool) -> SyncResult<Self> {
        let cell = region.cell(offset)?;
        Ok(Self {
            gate: ExchangeGate::new(cell, init),
            owner: AtomicU64::new(OwnerId::NONE),
        })
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.gate.set_config(config);
        self
    }

    /// Owner recorded by this instance, if it holds the lock
    pub fn owner(&self) -> Option<OwnerId> {
        OwnerId::from_raw(self.owner.load(Ordering::SeqCst))
    }

    /// True while any context holds the shared cell
    pub fn is_locked(&self) -> bool {
        self.gate.is_held()
    }

    pub fn cell(&self) -> &AtomicCell {
        self.gate.cell()
    }

    fn record(&self, owner: OwnerId) {
        self.owner.store(owner.as_raw(), Ordering::SeqCst);
        debug!(
            region = %self.gate.cell().region_id(),
            offset = self.gate.cell().offset(),
            owner = %owner,
            "mutex locked"
        );
    }

    pub fn enter_critical_section_as(&self, owner: OwnerId) {
        self.gate.acquire(None);
        self.record(owner);
    }

    pub fn try_enter_critical_section_as(&self, owner: OwnerId) -> bool {
        if self.gate.try_acquire() {
            self.record(owner);
            true
        } else {
            false
        }
    }

    pub fn enter_critical_section_timeout_as(
        &self,
        owner: OwnerId,
        timeout: Duration,
    ) -> SyncResult<()> {
        let start = Instant::now();
        if self.gate.acquire(start.checked_add(timeout)) {
            self.record(owner);
            Ok(())
        } else {
            Err(SyncError::Timeout {
                gate: NAME,
                waited_ms: start.elapsed().as_millis() as u64,
            })
        }
    }

    /// Release on behalf of `caller`
    ///
    /// An instance that never acquired reports `UnlockedRelease` when the
    /// cell is free and `WrongOwner` when another context holds it.
    pub fn leave_critical_section_as(&self, caller: OwnerId) -> SyncResult<()> {
        // The owner must be cleared before the cell is freed: the next
        // holder records itself as soon as its exchange succeeds.
        if let Err(raw) = self.owner.compare_exchange(
            caller.as_raw(),
            OwnerId::NONE,
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            let owner = OwnerId::from_raw(raw);
            if owner.is_none() && !self.gate.is_held() {
                return Err(SyncError::UnlockedRelease { gate: NAME });
            }
            return Err(SyncError::WrongOwner { owner, caller });
        }

        if let Err(e) = self.gate.release(NAME) {
            let _ = self.owner.compare_exchange(
                OwnerId::NONE,
                caller.as_raw(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            );
            return Err(e);
        }
        debug!(
            region = %self.gate.cell().region_id(),
            offset = self.gate.cell().offset(),
            owner = %caller,
            "mutex unlocked"
        );
        Ok(())
    }
}

impl CriticalSection for Mutex {
    fn enter_critical_section(&self) {
        self.enter_critical_section_as(OwnerId::current());
    }

    fn try_enter_critical_section(&self) -> bool {
        self.try_enter_critical_section_as(OwnerId::current())
    }

    fn enter_critical_section_timeout(&self, timeout: Duration) -> SyncResult<()> {
        self.enter_critical_section_timeout_as(OwnerId::current(), timeout)
    }

    fn leave_critical_section(&self) -> SyncResult<()> {
        self.leave_critical_section_as(OwnerId::current())
    }

    fn name(&self) -> &'static str {
        NAME
    }
}
