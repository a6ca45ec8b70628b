//! Mechanism/policy separation.
//!
//! Grounded on `examples/valibali-cluu/kernel/src/scheduler/traits.rs`'s
//! `Scheduler` + `KernelSchedCtx` pair and `.../events.rs`'s `SchedEvent`,
//! trimmed of every SMP/tick/boot-mode concept that has no counterpart in
//! a single-threaded cooperative runtime. `SchedCtx` is the only channel
//! a policy has into thread state, exactly as `KernelSchedCtx` is for the
//! teacher's policies.

use crate::tcb::{SchedHints, ThreadId};

/// Events a policy may want to react to. Kept even though the
/// scan-based policies in `policy/` mostly ignore them, to preserve the
/// event-driven shape the teacher's scheduler uses and to leave room for
/// a future stateful policy.
#[derive(Debug, Clone, Copy)]
pub enum SchedEvent {
    ThreadCreated(ThreadId),
    ThreadWoke(ThreadId),
    ThreadYielded(ThreadId),
    ThreadBlocked(ThreadId),
    ThreadExited(ThreadId),
}

/// Read-only view into runtime thread state, handed to a policy each
/// time it is asked to react to an event or pick the next thread.
pub trait SchedCtx {
    /// All currently READY thread ids, in no particular order.
    fn ready_threads(&self) -> Vec<ThreadId>;

    /// Scheduling hints for a thread. Panics if `id` names no thread.
    fn hints(&self, id: ThreadId) -> SchedHints;
}

/// A pluggable scheduling policy (§4.3). Exactly one is active for the
/// lifetime of a `Runtime`; it may not change while threads are live.
pub trait SchedPolicy: Send {
    fn name(&self) -> &'static str;

    /// Notification hook; most policies here are purely a function of
    /// current READY-set + hints and do not need to track state here.
    fn on_event(&mut self, _event: SchedEvent) {}

    /// Chooses the next thread to run, or `None` if nothing is READY.
    /// `current` is the thread that was RUNNING before this call (for
    /// Round Robin's rotation); it may or may not still be READY.
    fn pick_next(&mut self, ctx: &dyn SchedCtx, current: Option<ThreadId>) -> Option<ThreadId>;
}
