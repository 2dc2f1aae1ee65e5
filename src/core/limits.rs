/*!
 * Limits and Constants
 *
 * Centralized location for sizes, spin budgets and queue bounds.
 * Grouped by domain: shared regions, gates, queue.
 */

use std::time::Duration;

// =============================================================================
// SHARED REGION LIMITS
// =============================================================================

/// Size in bytes of one atomic cell (a 32-bit word)
pub const CELL_SIZE: usize = std::mem::size_of::<i32>();

/// Required alignment of a cell offset inside a region
pub const CELL_ALIGN: usize = std::mem::align_of::<i32>();

/// Largest region a caller may allocate (16MB)
pub const MAX_REGION_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// GATE VALUES
// =============================================================================

/// Exchange-protocol gate is free
pub const UNLOCKED: i32 = 0;

/// Exchange-protocol gate is held
pub const LOCKED: i32 = 1;

/// Largest permit count a counting semaphore cell can hold
pub const MAX_PERMITS: u32 = i32::MAX as u32;

// =============================================================================
// SPIN BUDGETS
// =============================================================================

/// Default spin iterations before parking on a cell
pub const DEFAULT_SPIN_LIMIT: u32 = 64;

/// Spin iterations for the low-latency preset
pub const LOW_LATENCY_SPIN_LIMIT: u32 = 1024;

/// Yield to the scheduler every N spins
pub const SPIN_YIELD_INTERVAL: u32 = 16;

// =============================================================================
// QUEUE LIMITS
// =============================================================================

/// Default number of concurrent channels
pub const DEFAULT_QUEUE_CHANNELS: usize = 1;

/// Upper bound on configured channels
pub const MAX_QUEUE_CHANNELS: usize = 4096;

/// Far-future deadline used when no pending entry has a wait timeout
pub const IDLE_TIMER_PERIOD: Duration = Duration::from_secs(86_400);
