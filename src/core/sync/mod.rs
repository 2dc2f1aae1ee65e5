/*!
 * Synchronization Primitives
 *
 * Gates built directly on a shared region's atomic cells:
 * - `BinarySemaphore`: ownerless 0/1 gate, exchange protocol
 * - `CasBinarySemaphore`: ownerless 0/1 gate, compare-and-swap protocol
 * - `CountingSemaphore`: N-permit gate, compare-and-swap protocol
 * - `Mutex`: 0/1 gate that only its owner may release
 *
 * # Architecture
 *
 * All gate state lives in one 32-bit cell. Independent instances built over
 * the same region and offset coordinate purely through that cell: atomic
 * exchange/compare-and-swap to change it, futex-style park/unpark keyed on
 * its address to block. Every acquisition re-validates in a loop, so
 * spurious wakeups are harmless.
 *
 * # Fairness
 *
 * Wake order among blocked contexts is implementation-defined (the parking
 * lot wakes in queue order, but a running context may win the next exchange
 * first). No FIFO guarantee is made.
 */

mod binary;
mod config;
mod counting;
mod exchange;
pub(crate) mod futex;
mod guard;
mod mutex;
mod spinwait;
mod traits;

pub use binary::BinarySemaphore;
pub use config::SyncConfig;
pub use counting::{CasBinarySemaphore, CountingSemaphore};
pub use guard::SectionGuard;
pub use mutex::Mutex;
pub use traits::{CriticalSection, WaitOutcome, WakeResult};
