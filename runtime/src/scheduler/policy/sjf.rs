//! Shortest Job First: pick the READY thread with smallest
//! `estimated_time`, ties broken by earlier `creation_time`.
//!
//! Grounded on `original_source/Cars.c`'s `scheduler_sjf`.

use crate::tcb::ThreadId;

use super::super::traits::{SchedCtx, SchedPolicy};

#[derive(Debug, Default)]
pub struct ShortestJobFirst;

impl ShortestJobFirst {
    pub fn new() -> Self {
        Self
    }
}

impl SchedPolicy for ShortestJobFirst {
    fn name(&self) -> &'static str {
        "Shortest-Job-First"
    }

    fn pick_next(&mut self, ctx: &dyn SchedCtx, _current: Option<ThreadId>) -> Option<ThreadId> {
        ctx.ready_threads()
            .into_iter()
            .map(|id| (id, ctx.hints(id)))
            .min_by(|(_, a), (_, b)| {
                a.estimated_time
                    .cmp(&b.estimated_time)
                    .then_with(|| a.creation_time.cmp(&b.creation_time))
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
    fn picks_smallest_estimated_time() {
        let ctx = MockCtx::with(&[
            (1, SchedHints { estimated_time: 300, ..Default::default() }),
            (2, SchedHints { estimated_time: 50, ..Default::default() }),
            (3, SchedHints { estimated_time: 100, ..Default::default() }),
        ]);
        let mut policy = ShortestJobFirst::new();
        assert_eq!(policy.pick_next(&ctx, None), Some(ThreadId(2)));
    }

    #[test]
    fn ties_break_by_arrival() {
        let ctx = MockCtx::with(&[
            (1, SchedHints { estimated_time: 50, creation_time: 10, ..Default::default() }),
            (2, SchedHints { estimated_time: 50, creation_time: 5, ..Default::default() }),
        ]);
        let mut policy = ShortestJobFirst::new();
        assert_eq!(policy.pick_next(&ctx, None), Some(ThreadId(2)));
    }
}
