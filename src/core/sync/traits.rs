/*!
 * Synchronization Traits
 * The gate contract shared by every primitive, plus wait/wake outcomes
 */

use super::guard::SectionGuard;
use crate::core::errors::SyncResult;
use std::time::Duration;

/// Result of parking on a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Woken by a notify (or spuriously)
    Woken,
    /// Cell no longer held the expected value, did not park
    NotEqual,
    /// Deadline passed while parked
    TimedOut,
}

/// Result of a wake operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeResult {
    /// No waiters were present
    NoWaiters,
    /// Woke N waiters
    Woken(usize),
}

/// A gate guarding a caller-defined critical section
///
/// Implementations keep all gate state in a shared cell, so independent
/// instances built over the same region and offset exclude each other.
///
/// Wake order among blocked contexts is implementation-defined: the context
/// that wins the next atomic exchange proceeds, not necessarily the one that
/// waited longest.
pub trait CriticalSection: Send + Sync {
    /// Block until the gate is acquired
    fn enter_critical_section(&self);

    /// Acquire without blocking; false if the gate is held
    fn try_enter_critical_section(&self) -> bool;

    /// Block for at most `timeout`
    ///
    /// On timeout the gate is left as it was and `SyncError::Timeout` is returned.
    fn enter_critical_section_timeout(&self, timeout: Duration) -> SyncResult<()>;

    /// Release the gate
    fn leave_critical_section(&self) -> SyncResult<()>;

    /// Gate name used in errors and logs
    fn name(&self) -> &'static str;

    /// Enter and return a guard that leaves on drop
    fn guard(&self) -> SectionGuard<'_, Self>
    where
        Self: Sized,
    {
        self.enter_critical_section();
        SectionGuard::new(self)
    }
}
