//! Round Robin: rotate through the READY set in arrival order.
//!
//! Grounded on `examples/valibali-cluu/kernel/src/scheduler/policies/round_robin.rs`
//! for the "pop head, check runnable, re-push or drop" shape (minus its
//! boot-mode branch, which has no counterpart here) and on
//! `original_source/Cars.c`'s `scheduler_rr`, which scans `thread_table`
//! starting just after the last-run thread's index and wraps around.

use crate::tcb::ThreadId;

use super::super::traits::{SchedCtx, SchedPolicy};

#[derive(Debug, Default)]
pub struct RoundRobin;

impl RoundRobin {
    pub fn new() -> Self {
        Self
    }
}

impl SchedPolicy for RoundRobin {
    fn name(&self) -> &'static str {
        "Round-Robin"
    }

    fn pick_next(&mut self, ctx: &dyn SchedCtx, current: Option<ThreadId>) -> Option<ThreadId> {
        let mut ready = ctx.ready_threads();
        if ready.is_empty() {
            return None;
        }
        ready.sort_by_key(|id| id.0);

        let after = match current {
            Some(cur) => ready.iter().position(|&id| id.0 > cur.0),
            None => None,
        };

        match after {
            Some(idx) => Some(ready[idx]),
            None => Some(ready[0]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::test_support::MockCtx;
    use crate::tcb::SchedHints;

    #[test]
    fn rotates_past_current() {
        let ctx = MockCtx::with(&[
            (1, SchedHints::default()),
            (2, SchedHints::default()),
            (3, SchedHints::default()),
        ]);
        let mut policy = RoundRobin::new();
        assert_eq!(policy.pick_next(&ctx, Some(ThreadId(1))), Some(ThreadId(2)));
        assert_eq!(policy.pick_next(&ctx, Some(ThreadId(3))), Some(ThreadId(1)));
    }

    #[test]
    fn no_ready_threads_returns_none() {
        let ctx = MockCtx::with(&[]);
        let mut policy = RoundRobin::new();
        assert_eq!(policy.pick_next(&ctx, None), None);
    }
}
