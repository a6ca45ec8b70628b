//! First Come First Served: pick the READY thread with earliest
//! `creation_time`.
//!
//! Grounded on `original_source/Cars.c`'s `scheduler_fcfs`.

use crate::tcb::ThreadId;

use super::super::traits::{SchedCtx, SchedPolicy};

#[derive(Debug, Default)]
pub struct FirstComeFirstServed;

impl FirstComeFirstServed {
    pub fn new() -> Self {
        Self
    }
}

impl SchedPolicy for FirstComeFirstServed {
    fn name(&self) -> &'static str {
        "First-Come-First-Served"
    }

    fn pick_next(&mut self, ctx: &dyn SchedCtx, _current: Option<ThreadId>) -> Option<ThreadId> {
        ctx.ready_threads()
            .into_iter()
            .map(|id| (id, ctx.hints(id).creation_time))
            .min_by_key(|(_, creation_time)| *creation_time)
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::test_support::MockCtx;
    use crate::tcb::SchedHints;

    #[test]
    fn picks_earliest_creation_time() {
        let ctx = MockCtx::with(&[
            (1, SchedHints { creation_time: 30, ..Default::default() }),
            (2, SchedHints { creation_time: 10, ..Default::default() }),
            (3, SchedHints { creation_time: 20, ..Default::default() }),
        ]);
        let mut policy = FirstComeFirstServed::new();
        assert_eq!(policy.pick_next(&ctx, None), Some(ThreadId(2)));
    }
}
