//! Priority: pick the READY thread with greatest `priority`, ties broken
//! by lower id.
//!
//! Grounded on `original_source/Cars.c`'s `scheduler_priority`, which
//! scans `thread_table` for the READY thread with the highest
//! `priority` field.

use crate::tcb::ThreadId;

use super::super::traits::{SchedCtx, SchedPolicy};

#[derive(Debug, Default)]
pub struct Priority;

impl Priority {
    pub fn new() -> Self {
        Self
    }
}

impl SchedPolicy for Priority {
    fn name(&self) -> &'static str {
        "Priority"
    }

    fn pick_next(&mut self, ctx: &dyn SchedCtx, _current: Option<ThreadId>) -> Option<ThreadId> {
        ctx.ready_threads()
            .into_iter()
            .map(|id| (id, ctx.hints(id).priority))
            .max_by(|(id_a, prio_a), (id_b, prio_b)| {
                prio_a
                    .cmp(prio_b)
                    .then_with(|| id_b.0.cmp(&id_a.0))
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
    fn picks_highest_priority() {
        let ctx = MockCtx::with(&[
            (1, SchedHints { priority: 1, ..Default::default() }),
            (2, SchedHints { priority: 5, ..Default::default() }),
            (3, SchedHints { priority: 3, ..Default::default() }),
        ]);
        let mut policy = Priority::new();
        assert_eq!(policy.pick_next(&ctx, None), Some(ThreadId(2)));
    }

    #[test]
    fn ties_break_by_lower_id() {
        let ctx = MockCtx::with(&[
            (5, SchedHints { priority: 2, ..Default::default() }),
            (2, SchedHints { priority: 2, ..Default::default() }),
        ]);
        let mut policy = Priority::new();
        assert_eq!(policy.pick_next(&ctx, None), Some(ThreadId(2)));
    }
}
