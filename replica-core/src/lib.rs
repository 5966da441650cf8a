//! Replica Core - Entry Records, Clocks, and Errors
//!
//! Pure data types and capabilities with no cache logic. The stateful
//! mirror lives in `replica-cache`, which depends on this crate.

pub mod clock;
pub mod entry;
pub mod error;

pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use error::{CacheError, CacheResult, MutationKind};
