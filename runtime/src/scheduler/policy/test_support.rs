//! Minimal `SchedCtx` mock shared by the policy unit tests — avoids
//! spinning up a full `Runtime` just to test selection order.

#![cfg(test)]

use std::collections::HashMap;

use crate::tcb::{SchedHints, ThreadId};

use super::super::traits::SchedCtx;

#[derive(Default)]
pub struct MockCtx {
    ready: Vec<ThreadId>,
    hints: HashMap<ThreadId, SchedHints>,
}

impl MockCtx {
    pub fn with(entries: &[(u64, SchedHints)]) -> Self {
        let mut ctx = MockCtx::default();
        for &(id, hints) in entries {
            let id = ThreadId(id);
            ctx.ready.push(id);
            ctx.hints.insert(id, hints);
        }
        ctx
    }
}

impl SchedCtx for MockCtx {
    fn ready_threads(&self) -> Vec<ThreadId> {
        self.ready.clone()
    }

    fn hints(&self, id: ThreadId) -> SchedHints {
        self.hints[&id]
    }
}
