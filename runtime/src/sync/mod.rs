//! Synchronization primitives built on the cooperative runtime (§4.4).

mod condvar;
mod mutex;

pub use condvar::{Condvar, WaitOutcome};
pub use mutex::Mutex;
