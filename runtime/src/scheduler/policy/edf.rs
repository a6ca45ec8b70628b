//! Earliest Deadline First: pick the READY thread with smallest
//! `deadline`; a zero deadline means "no deadline" and sorts last.
//!
//! Grounded on `original_source/Cars.c`'s `scheduler_rt`, which treats an
//! emergency vehicle's deadline as the sort key and falls back to
//! arrival order among threads with no deadline.

use crate::tcb::ThreadId;

use super::super::traits::{SchedCtx, SchedPolicy};

#[derive(Debug, Default)]
pub struct EarliestDeadlineFirst;

impl EarliestDeadlineFirst {
    pub fn new() -> Self {
        Self
    }
}

impl SchedPolicy for EarliestDeadlineFirst {
    fn name(&self) -> &'static str {
        "Earliest-Deadline-First"
    }

    fn pick_next(&mut self, ctx: &dyn SchedCtx, _current: Option<ThreadId>) -> Option<ThreadId> {
        ctx.ready_threads()
            .into_iter()
            .map(|id| (id, ctx.hints(id)))
            .min_by_key(|(_, hints)| {
                let deadline_key = if hints.deadline == 0 {
                    u64::MAX
                } else {
                    hints.deadline
                };
                (deadline_key, hints.creation_time)
            })
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::test_support::MockCtx;
    use crate::tcb::SchedHints;

    #[test]
    fn picks_earliest_deadline() {
        let ctx = MockCtx::with(&[
            (1, SchedHints { deadline: 20, ..Default::default() }),
            (2, SchedHints { deadline: 5, ..Default::default() }),
        ]);
        let mut policy = EarliestDeadlineFirst::new();
        assert_eq!(policy.pick_next(&ctx, None), Some(ThreadId(2)));
    }

    #[test]
    fn zero_deadline_sorts_last() {
        let ctx = MockCtx::with(&[
            (1, SchedHints { deadline: 0, ..Default::default() }),
            (2, SchedHints { deadline: 99, ..Default::default() }),
        ]);
        let mut policy = EarliestDeadlineFirst::new();
        assert_eq!(policy.pick_next(&ctx, None), Some(ThreadId(2)));
    }
}
