/*!
 * IPC Module
 * Memory shared between execution contexts
 */

pub mod shm;

pub use shm::{AtomicCell, RegionError, RegionStats, SharedRegion};
