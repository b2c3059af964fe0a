//! Batch dispatch coordinator.
//!
//! Callers submit correlation tokens; a burst of submissions separated by
//! less than the quiet period becomes one batch. Once the burst goes quiet,
//! the batch is shuffled and every token is redispatched on its own after a
//! random delay, waking whichever caller is waiting on it.

pub mod coordinator;
pub mod types;

pub use coordinator::Coordinator;
pub use types::*;
