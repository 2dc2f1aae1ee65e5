/*!
 * Critical Section Guard
 *
 * RAII guard returned by `CriticalSection::guard`
 */

use super::traits::CriticalSection;
use crate::core::errors::SyncResult;
use tracing::error;

/// Leaves the critical section when dropped
///
/// # Example
///
/// ```
/// use shm_isolation::core::sync::{BinarySemaphore, CriticalSection};
/// use shm_isolation::ipc::SharedRegion;
///
/// let region = SharedRegion::new(4).unwrap();
/// let semaphore = BinarySemaphore::new(&region, 0, true).unwrap();
/// {
///     let _section = semaphore.guard();
///     // exclusive work
/// }
/// assert!(semaphore.try_enter_critical_section());
/// ```
#[must_use = "the critical section is left as soon as the guard is dropped"]
pub struct SectionGuard<'a, G: CriticalSection> {
    gate: Option<&'a G>,
}

impl<'a, G: CriticalSection> SectionGuard<'a, G> {
    pub(super) fn new(gate: &'a G) -> Self {
        Self { gate: Some(gate) }
    }

    /// Leave now and surface the release error instead of logging it
    pub fn leave(mut self) -> SyncResult<()> {
        match self.gate.take() {
            Some(gate) => gate.leave_critical_section(),
            None => Ok(()),
        }
    }
}

impl<G: CriticalSection> Drop for SectionGuard<'_, G> {
    fn drop(&mut self) {
        if let Some(gate) = self.gate.take() {
            if let Err(e) = gate.leave_critical_section() {
                error!(gate = gate.name(), error = %e, "failed to leave critical section on drop");
            }
        }
    }
}
