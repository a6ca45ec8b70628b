//! Thread control blocks.
//!
//! Field shape follows `examples/valibali-cluu/kernel/src/scheduler/thread.rs`
//! (`ThreadId`, `ThreadState`, the overall `Thread` struct), carrying the
//! extra fields `original_source/CEThreads.h`'s `CEThread` needs
//! (`retval`, `join_waiting`) plus the scheduling hints
//! `original_source/Cars.c` attaches to each thread (`priority`,
//! `estimated_time`, `deadline`, `creation_time`).
//!
//! Per the Design Notes (§9), list membership is not modeled with an
//! intrusive `link` field: a TCB lives in the arena (`RuntimeState::threads`)
//! and is referenced by id from at most one queue at a time.

use std::fmt;

use crate::context::Context;

/// Thread identifier. `0` is reserved for the bootstrap thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Thread({})", self.0)
    }
}

impl ThreadId {
    pub const BOOTSTRAP: ThreadId = ThreadId(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Ready,
    Running,
    Blocked,
    Terminated,
}

/// Scheduling hints a policy may consult. Not every policy reads every
/// field: Round Robin ignores all of them, Priority reads only
/// `priority`, and so on (§4.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedHints {
    pub priority: i32,
    pub estimated_time: u64,
    pub deadline: u64,
    pub creation_time: u64,
}

pub(crate) type ThreadResult = Box<dyn std::any::Any + Send>;

pub struct Tcb {
    pub id: ThreadId,
    pub name: String,
    pub state: ThreadState,
    pub hints: SchedHints,
    pub context: Context,
    pub result: Option<ThreadResult>,
    pub join_waiter: Option<ThreadId>,
    pub joined: bool,
}

impl fmt::Debug for Tcb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tcb")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("hints", &self.hints)
            .field("join_waiter", &self.join_waiter)
            .field("joined", &self.joined)
            .finish()
    }
}

impl Tcb {
    pub fn is_runnable(&self) -> bool {
        self.state == ThreadState::Ready
    }
}
