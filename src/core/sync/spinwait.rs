/*!
 * Bounded Spin Phase
 *
 * Re-checks a condition for a bounded number of iterations before a
 * caller falls back to parking on the cell.
 */

use super::config::SyncConfig;
use std::hint;
use std::thread;

/// Spin until `ready` returns true or the spin budget runs out
///
/// Returns true if the condition was observed.
pub(crate) fn spin_until(config: &SyncConfig, mut ready: impl FnMut() -> bool) -> bool {
    for spin in 0..config.spin_limit {
        if ready() {
            return true;
        }
        if config.yield_interval != 0 && spin % config.yield_interval == config.yield_interval - 1 {
            thread::yield_now();
        } else {
            hint::spin_loop();
        }
    }
    false
}
