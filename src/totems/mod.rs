//! 🏺 Totems - everything that outlives the process
//!
//! Storage collaborators, the versioned vault on top of them,
//! and the clock every timestamp is read from.

pub mod clock;
pub mod storage;
pub mod vault;

pub use clock::{Clock, ManualClock, SystemClock};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use vault::Vault;
