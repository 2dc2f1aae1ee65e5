/*!
 * Counting Semaphore
 *
 * N-permit gate over one shared cell (compare-and-swap protocol), and the
 * binary variant built on the same protocol.
 */

use super::config::SyncConfig;
use super::spinwait::spin_until;
use super::traits::CriticalSection;
use crate::core::errors::{SyncError, SyncResult};
use crate::core::limits::MAX_PERMITS;
use crate::core::types::Offset;
use crate::ipc::shm::{AtomicCell, SharedRegion};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Compare-and-swap acquisition shared by both semaphores in this module
#[derive(Debug, Clone)]
struct PermitCell {
    cell: AtomicCell,
    config: SyncConfig,
}

impl PermitCell {
    fn try_acquire(&self) -> bool {
        loop {
            let current = self.cell.load();
            if current <= 0 {
                return false;
            }
            if self.cell.compare_exchange(current, current - 1).is_ok() {
                return true;
            }
        }
    }

    /// Decrement only when positive; park on the cell while it is empty
    fn acquire(&self, deadline: Option<Instant>) -> bool {
        loop {
            let current = self.cell.load();
            if current > 0 {
                if self.cell.compare_exchange(current, current - 1).is_ok() {
                    return true;
                }
                // Lost the race to another context, re-read
                continue;
            }

            if spin_until(&self.config, || self.cell.load() > 0) {
                continue;
            }

            let remaining = match deadline {
                Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                    Some(remaining) if !remaining.is_zero() => Some(remaining),
                    _ => return false,
                },
                None => None,
            };

            debug!(
                region = %self.cell.region_id(),
                offset = self.cell.offset(),
                "no permits available, parking"
            );
            self.cell.wait(current, remaining);
        }
    }

    fn acquire_timeout(&self, gate: &'static str, timeout: Duration) -> SyncResult<()> {
        let start = Instant::now();
        if self.acquire(start.checked_add(timeout)) {
            Ok(())
        } else {
            Err(SyncError::Timeout {
                gate,
                waited_ms: start.elapsed().as_millis() as u64,
            })
        }
    }
}

const COUNTING: &str = "CountingSemaphore";
const CAS_BINARY: &str = "CasBinarySemaphore";

/// Permit counts must fit the signed cell
fn permit_count(permits: u32) -> SyncResult<i32> {
    i32::try_from(permits).map_err(|_| SyncError::InvalidPermits {
        permits,
        max: MAX_PERMITS,
    })
}

/// Bounded concurrent admission: at most `permits` contexts inside at once
///
/// The cell holds the number of free permits. Leaving is not checked against
/// the configured permit count; callers must not leave more often than they
/// entered. Wake order among blocked contexts is not FIFO.
#[derive(Debug, Clone)]
pub struct CountingSemaphore {
    permits: PermitCell,
    max_permits: u32,
}

impl CountingSemaphore {
    /// Build over `offset` and store `permits` into the cell
    pub fn new(region: &SharedRegion, offset: Offset, permits: u32) -> SyncResult<Self> {
        let initial = permit_count(permits)?;
        let semaphore = Self::attach(region, offset, permits)?;
        semaphore.permits.cell.store(initial);
        Ok(semaphore)
    }

    /// Build over a cell another context already initialized
    pub fn attach(region: &SharedRegion, offset: Offset, permits: u32) -> SyncResult<Self> {
        permit_count(permits)?;
        let cell = region.cell(offset)?;
        Ok(Self {
            permits: PermitCell {
                cell,
                config: SyncConfig::default(),
            },
            max_permits: permits,
        })
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.permits.config = config;
        self
    }

    /// Permits currently free
    pub fn available(&self) -> i32 {
        self.permits.cell.load()
    }

    /// Permit count the semaphore was configured with
    pub fn permits(&self) -> u32 {
        self.max_permits
    }

    pub fn cell(&self) -> &AtomicCell {
        &self.permits.cell
    }
}

impl CriticalSection for CountingSemaphore {
    fn enter_critical_section(&self) {
        self.permits.acquire(None);
    }

    fn try_enter_critical_section(&self) -> bool {
        self.permits.try_acquire()
    }

    fn enter_critical_section_timeout(&self, timeout: Duration) -> SyncResult<()> {
        self.permits.acquire_timeout(COUNTING, timeout)
    }

    fn leave_critical_section(&self) -> SyncResult<()> {
        let cell = &self.permits.cell;
        let previous = cell.fetch_add(1);
        if i64::from(previous) + 1 > i64::from(self.max_permits) {
            warn!(
                region = %cell.region_id(),
                offset = cell.offset(),
                available = previous + 1,
                permits = self.max_permits,
                "counting semaphore released more often than acquired"
            );
        }
        cell.notify_one();
        Ok(())
    }

    fn name(&self) -> &'static str {
        COUNTING
    }
}

/// Binary semaphore on the counting protocol
///
/// Cell values: 1 = free, 0 = held, the permit domain of a one-permit
/// counting semaphore. A zero-filled region therefore starts *held* until
/// one context constructs with `init = true`. Unlike [`CountingSemaphore`],
/// leaving a free gate fails with `UnlockedRelease`.
#[derive(Debug, Clone)]
pub struct CasBinarySemaphore {
    permits: PermitCell,
}

impl CasBinarySemaphore {
    pub fn new(region: &SharedRegion, offset: Offset, init: bool) -> SyncResult<Self> {
        let cell = region.cell(offset)?;
        if init {
            cell.store(1);
        }
        Ok(Self {
            permits: PermitCell {
                cell,
                config: SyncConfig::default(),
            },
        })
    }

    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.permits.config = config;
        self
    }

    pub fn is_locked(&self) -> bool {
        self.permits.cell.load() == 0
    }

    pub fn cell(&self) -> &AtomicCell {
        &self.permits.cell
    }
}

impl CriticalSection for CasBinarySemaphore {
    fn enter_critical_section(&self) {
        self.permits.acquire(None);
    }

    fn try_enter_critical_section(&self) -> bool {
        self.permits.try_acquire()
    }

    fn enter_critical_section_timeout(&self, timeout: Duration) -> SyncResult<()> {
        self.permits.acquire_timeout(CAS_BINARY, timeout)
    }

    fn leave_critical_section(&self) -> SyncResult<()> {
        let cell = &self.permits.cell;
        match cell.compare_exchange(0, 1) {
            Ok(_) => {
                cell.notify_one();
                Ok(())
            }
            Err(_) => Err(SyncError::UnlockedRelease { gate: CAS_BINARY }),
        }
    }

    fn name(&self) -> &'static str {
        CAS_BINARY
    }
}
