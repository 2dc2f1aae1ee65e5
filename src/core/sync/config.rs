/*!
 * Synchronization Configuration
 *
 * Runtime configuration for the spin phase that precedes parking
 */

use crate::core::limits::{DEFAULT_SPIN_LIMIT, LOW_LATENCY_SPIN_LIMIT, SPIN_YIELD_INTERVAL};

/// Synchronization configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Spin iterations re-checking the cell before parking (0 parks immediately)
    pub spin_limit: u32,
    /// Yield to the OS scheduler every N spins
    pub yield_interval: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            spin_limit: DEFAULT_SPIN_LIMIT,
            yield_interval: SPIN_YIELD_INTERVAL,
        }
    }
}

impl SyncConfig {
    /// Configuration for short critical sections (< 10µs hold time expected)
    pub const fn low_latency() -> Self {
        Self {
            spin_limit: LOW_LATENCY_SPIN_LIMIT,
            yield_interval: SPIN_YIELD_INTERVAL,
        }
    }

    /// Park as soon as the gate is observed held
    pub const fn no_spin() -> Self {
        Self {
            spin_limit: 0,
            yield_interval: SPIN_YIELD_INTERVAL,
        }
    }
}
