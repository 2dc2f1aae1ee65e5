/*!
 * Shared Memory
 * Fixed-size regions and the atomic cells the gates are built on
 */

mod cell;
mod region;
mod types;

pub use cell::AtomicCell;
pub use region::SharedRegion;
pub use types::{RegionError, RegionStats};
