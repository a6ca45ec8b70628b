//! A user-space cooperative threading runtime.
//!
//! Threads are stack-switched execution contexts multiplexed onto a
//! single OS thread by a single-threaded, strictly cooperative scheduler
//! (§2, §5). Exactly one thread is ever RUNNING; every other thread is
//! READY, BLOCKED, or TERMINATED (§3). Mechanism (context switching, the
//! TCB arena, the dispatch loop) is kept separate from policy (which
//! READY thread runs next, §4.3), following
//! `examples/valibali-cluu/kernel/src/scheduler`'s split between
//! `sched_core.rs` and `policies/`.
//!
//! This crate's own state is process-global by necessity — there is
//! exactly one scheduler per process — but confined to the single OS
//! thread that ever touches it, so it lives behind a `thread_local!`
//! rather than the teacher's `spin::Mutex`, which exists to guard
//! against bare-metal interrupt reentrancy this runtime does not have.

pub mod attrs;
pub mod context;
pub mod error;
pub mod scheduler;
pub mod sync;
pub mod tcb;

use std::cell::RefCell;
use std::time::{SystemTime, UNIX_EPOCH};

pub use attrs::{DetachState, ThreadAttr};
pub use error::{RuntimeError, RuntimeResult};
pub use scheduler::{PolicyKind, SchedCtx, SchedEvent, SchedPolicy};
pub use tcb::{SchedHints, ThreadId, ThreadState};

use context::Context;
use tcb::{Tcb, ThreadResult};

const IDLE_SLEEP: std::time::Duration = std::time::Duration::from_millis(1);
const SCHEDULER_STACK_SIZE: usize = 64 * 1024;

/// CPU-time-ish statistics surfaced for diagnostics. Ambient
/// observability grounded on
/// `examples/valibali-cluu/kernel/src/scheduler/thread.rs`'s
/// `ThreadManager::stats()`; no invariant depends on it.
#[derive(Debug, Clone)]
pub struct ThreadStats {
    pub id: ThreadId,
    pub name: String,
    pub state: ThreadState,
    pub dispatch_count: u64,
}

struct RuntimeState {
    threads: Vec<Option<Tcb>>,
    next_id: u64,
    current: ThreadId,
    policy: Box<dyn SchedPolicy>,
    dispatch_counts: Vec<u64>,
    context_switches: u64,
    started_at: std::time::Instant,
    /// The scheduler's own execution context, with its own stack (§9
    /// Design Note). Every primitive that blocks swaps to this context;
    /// every dispatch swaps from it — `scheduler_loop` is never called
    /// as an ordinary function on a TCB's stack.
    scheduler_ctx: Context,
}

thread_local! {
    static STATE: RefCell<Option<RuntimeState>> = RefCell::new(None);
}

fn now_ticks() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn index_of(id: ThreadId) -> usize {
    id.0 as usize
}

struct CtxView<'a>(&'a [Option<Tcb>]);

impl<'a> SchedCtx for CtxView<'a> {
    fn ready_threads(&self) -> Vec<ThreadId> {
        self.0
            .iter()
            .filter_map(|slot| slot.as_ref())
            .filter(|tcb| tcb.is_runnable())
            .map(|tcb| tcb.id)
            .collect()
    }

    fn hints(&self, id: ThreadId) -> SchedHints {
        self.0[index_of(id)]
            .as_ref()
            .expect("hints() called on unknown thread")
            .hints
    }
}

/// Brings the runtime up with the given policy and spawns the bootstrap
/// TCB (id 0, representing the calling OS thread), exactly as
/// `CEthread_lib_init` sets up thread 0 before any `CEthread_create`
/// call. Also spawns the scheduler's own execution context on its own
/// stack (§9 Design Note): it is a persistent coroutine running
/// `scheduler_loop`, not a function invoked on whichever TCB's stack
/// happens to call into it.
///
/// Calling this twice without an intervening [`shutdown`] is a no-op,
/// matching `CEthread_lib_init`'s `if (library_initialized) return;`
/// guard.
pub fn init(policy: PolicyKind) -> RuntimeResult<()> {
    STATE.with(|cell| {
        if cell.borrow().is_some() {
            return Ok(());
        }

        let bootstrap_ctx =
            Context::capture_current().map_err(|_| RuntimeError::NoCapacity)?;

        let scheduler_ctx =
            Context::spawn(SCHEDULER_STACK_SIZE, &bootstrap_ctx, Box::new(|| scheduler_loop()))
                .map_err(|_| RuntimeError::NoCapacity)?;

        let mut threads = Vec::new();
        threads.push(Some(Tcb {
            id: ThreadId::BOOTSTRAP,
            name: "bootstrap".to_string(),
            state: ThreadState::Running,
            hints: SchedHints::default(),
            context: bootstrap_ctx,
            result: None,
            join_waiter: None,
            joined: false,
        }));

        *cell.borrow_mut() = Some(RuntimeState {
            threads,
            next_id: 1,
            current: ThreadId::BOOTSTRAP,
            policy: policy.build(),
            dispatch_counts: vec![0],
            context_switches: 0,
            started_at: std::time::Instant::now(),
            scheduler_ctx,
        });

        tracing::debug!(policy = %policy_name(policy), "runtime initialized");
        Ok(())
    })
}

fn policy_name(policy: PolicyKind) -> &'static str {
    match policy {
        PolicyKind::RoundRobin => "round-robin",
        PolicyKind::Priority => "priority",
        PolicyKind::ShortestJobFirst => "sjf",
        PolicyKind::FirstComeFirstServed => "fcfs",
        PolicyKind::EarliestDeadlineFirst => "edf",
    }
}

/// Tears the runtime down. Every non-bootstrap TCB is dropped along with
/// its stack. Calling this while non-bootstrap threads are still READY
/// or RUNNING is a logic error on the caller's part (§4.2); this
/// implementation logs a warning rather than panicking.
pub fn shutdown() {
    STATE.with(|cell| {
        if let Some(state) = cell.borrow().as_ref() {
            let live = state
                .threads
                .iter()
                .skip(1)
                .filter_map(|t| t.as_ref())
                .filter(|t| t.state != ThreadState::Terminated)
                .count();
            if live > 0 {
                tracing::warn!(live, "shutdown called with non-terminated threads still live");
            }
        }
        *cell.borrow_mut() = None;
    });
}

/// Creates a new thread. `entry` is boxed so it can be smuggled across
/// the context-switch boundary (§4.1).
pub fn thread_create(
    name: impl Into<String>,
    attr: ThreadAttr,
    hints: SchedHints,
    entry: impl FnOnce() + 'static,
) -> RuntimeResult<ThreadId> {
    STATE.with(|cell| {
        let mut guard = cell.borrow_mut();
        let state = guard.as_mut().ok_or(RuntimeError::BadArgument)?;

        let id = ThreadId(state.next_id);
        state.next_id += 1;

        let hints = SchedHints {
            creation_time: if hints.creation_time == 0 {
                now_ticks()
            } else {
                hints.creation_time
            },
            ..hints
        };

        let boxed_entry: Box<dyn FnOnce()> = Box::new(move || {
            entry();
            thread_exit(None);
        });

        // `uc_link` only matters if `entry` ever falls off the end
        // without calling `thread_exit` (it never does here, see the
        // wrapper above) — link back into the scheduler context as a
        // defensive fallback.
        let scheduler_ptr: *const Context = &state.scheduler_ctx as *const Context;
        // SAFETY: `scheduler_ctx` lives for the lifetime of `RuntimeState`.
        let context = Context::spawn(attr.stack_size, unsafe { &*scheduler_ptr }, boxed_entry)
            .map_err(|_| RuntimeError::NoCapacity)?;

        let idx = id.0 as usize;
        if state.threads.len() <= idx {
            state.threads.resize_with(idx + 1, || None);
            state.dispatch_counts.resize(idx + 1, 0);
        }
        state.threads[idx] = Some(Tcb {
            id,
            name: name.into(),
            state: ThreadState::Ready,
            hints,
            context,
            result: None,
            join_waiter: None,
            joined: false,
        });

        tracing::trace!(thread = %id, "thread created");
        Ok(id)
    })
}

/// Returns the calling thread's id.
pub fn current() -> ThreadId {
    STATE.with(|cell| {
        cell.borrow()
            .as_ref()
            .map(|s| s.current)
            .unwrap_or(ThreadId::BOOTSTRAP)
    })
}

/// Voluntarily gives up the processor (§4.2 suspension points). A no-op
/// if no other thread is READY — the scheduler will dispatch straight
/// back.
pub fn yield_now() {
    let cur = current();
    set_state(cur, ThreadState::Ready);
    switch_to_scheduler();
}

/// Terminates the calling thread, storing `result` for a future
/// [`join`]. Does not return. Invoked automatically at the end of every
/// thread's entry closure (see [`thread_create`]); user code may also
/// call it directly to exit early, mirroring `CEthread_exit`.
pub fn thread_exit(result: Option<ThreadResult>) -> ! {
    let cur = current();
    STATE.with(|cell| {
        let mut guard = cell.borrow_mut();
        let state = guard.as_mut().expect("runtime not initialized");
        let idx = index_of(cur);
        let tcb = state.threads[idx].as_mut().expect("current thread missing");
        tcb.result = result;
        tcb.state = ThreadState::Terminated;
        if let Some(waiter) = tcb.join_waiter.take() {
            let widx = index_of(waiter);
            if let Some(w) = state.threads[widx].as_mut() {
                w.state = ThreadState::Ready;
            }
        }
    });
    tracing::trace!(thread = %cur, "thread exited");

    // The thread is dying — there is nothing of its own left to save,
    // so install straight into the scheduler context instead of
    // swapping, mirroring `CEthread_scheduler`'s terminated-predecessor
    // branch.
    let sched_ptr: *const Context = STATE.with(|cell| {
        let guard = cell.borrow();
        &guard.as_ref().unwrap().scheduler_ctx as *const Context
    });
    // SAFETY: `scheduler_ctx` lives for the lifetime of `RuntimeState`,
    // which outlives every thread it dispatches.
    unsafe { (&*sched_ptr).install() }
}

/// Blocks the current thread for later explicit wake-up by a
/// synchronization primitive. The caller is responsible for having
/// already recorded itself on the relevant waiter list before calling
/// this (mirrors `CEmutex_lock`'s slow path and `CEcond_wait`).
pub(crate) fn block_current() {
    let cur = current();
    set_state(cur, ThreadState::Blocked);
    switch_to_scheduler();
}

/// Saves the calling thread's own context and swaps into the
/// scheduler's persistent context. Returns once the scheduler dispatches
/// this thread again.
fn switch_to_scheduler() {
    let my_ctx_ptr: *mut Context = STATE.with(|cell| {
        let mut guard = cell.borrow_mut();
        let state = guard.as_mut().expect("runtime not initialized");
        let idx = index_of(state.current);
        &mut state.threads[idx].as_mut().unwrap().context as *mut Context
    });
    let sched_ptr: *const Context = STATE.with(|cell| {
        let guard = cell.borrow();
        &guard.as_ref().unwrap().scheduler_ctx as *const Context
    });
    // SAFETY: both contexts outlive this call — the current thread's
    // slot is never freed while it can still run, and `scheduler_ctx`
    // lives for the runtime's whole lifetime.
    if unsafe { Context::swap(&mut *my_ctx_ptr, &*sched_ptr) }.is_err() {
        panic!("context switch failed");
    }
}

/// Marks a blocked thread READY again. Does not itself cause a
/// reschedule; the woken thread becomes eligible the next time the
/// scheduler runs.
pub(crate) fn wake(id: ThreadId) {
    set_state(id, ThreadState::Ready);
}

pub(crate) fn thread_state(id: ThreadId) -> Option<ThreadState> {
    STATE.with(|cell| {
        cell.borrow()
            .as_ref()
            .and_then(|s| s.threads.get(index_of(id)))
            .and_then(|slot| slot.as_ref())
            .map(|t| t.state)
    })
}

fn set_state(id: ThreadId, new_state: ThreadState) {
    STATE.with(|cell| {
        if let Some(state) = cell.borrow_mut().as_mut() {
            if let Some(tcb) = state.threads.get_mut(index_of(id)).and_then(|s| s.as_mut()) {
                tcb.state = new_state;
            }
        }
    });
}

/// Waits for `target` to terminate and returns its stored result.
/// Self-join and repeated joins are rejected per §4.4.
pub fn join(target: ThreadId) -> RuntimeResult<Option<ThreadResult>> {
    let cur = current();
    if target == cur {
        return Err(RuntimeError::Deadlock);
    }

    loop {
        let outcome = STATE.with(|cell| -> RuntimeResult<Option<Option<ThreadResult>>> {
            let mut guard = cell.borrow_mut();
            let state = guard.as_mut().ok_or(RuntimeError::BadArgument)?;
            let idx = index_of(target);
            let tcb = state
                .threads
                .get_mut(idx)
                .and_then(|s| s.as_mut())
                .ok_or(RuntimeError::NoSuchThread)?;

            if tcb.joined {
                return Err(RuntimeError::AlreadyJoined);
            }

            if tcb.state == ThreadState::Terminated {
                tcb.joined = true;
                return Ok(Some(tcb.result.take()));
            }

            tcb.join_waiter = Some(cur);
            Ok(None)
        })?;

        match outcome {
            Some(result) => return Ok(result),
            None => {
                block_current();
                // Woken only when the target has terminated; loop to
                // collect the result under the lock.
            }
        }
    }
}

/// The scheduler's persistent run loop (§9 Design Note) — a distinct
/// execution context with its own stack, installed once by [`init`] and
/// never returned to by ordinary means. Every thread that blocks or
/// yields swaps into this context; this loop swaps back out to whichever
/// thread the active policy picks next. Grounded directly on
/// `CEthread_scheduler`: pick the next READY thread, idle-sleep if only
/// BLOCKED threads remain, force the bootstrap thread back to READY as a
/// defensive recovery if nothing is runnable and nothing is blocked
/// either (an orphaned-termination bug elsewhere, not a reachable state
/// in normal operation).
fn scheduler_loop() -> ! {
    loop {
        let action = STATE.with(|cell| -> LoopAction {
            let mut guard = cell.borrow_mut();
            let state = guard.as_mut().expect("runtime not initialized");

            let next = {
                let view = CtxView(&state.threads);
                state.policy.pick_next(&view, Some(state.current))
            };

            if let Some(next_id) = next {
                state.current = next_id;
                state.context_switches += 1;
                let idx = index_of(next_id);
                state.dispatch_counts[idx] += 1;
                let tcb = state.threads[idx].as_mut().expect("picked thread missing");
                tcb.state = ThreadState::Running;
                return LoopAction::Dispatch(idx);
            }

            let any_blocked = state
                .threads
                .iter()
                .filter_map(|t| t.as_ref())
                .any(|t| t.state == ThreadState::Blocked);
            if any_blocked {
                return LoopAction::Idle;
            }

            if let Some(tcb) = state.threads[0].as_mut() {
                tcb.state = ThreadState::Ready;
            }
            LoopAction::Retry
        });

        match action {
            LoopAction::Dispatch(idx) => {
                let (from_ptr, target_ptr): (*mut Context, *const Context) =
                    STATE.with(|cell| {
                        let mut guard = cell.borrow_mut();
                        let state = guard.as_mut().unwrap();
                        let from = &mut state.scheduler_ctx as *mut Context;
                        let to = &state.threads[idx].as_ref().unwrap().context as *const Context;
                        (from, to)
                    });

                // SAFETY: `scheduler_ctx` and the dispatched TCB's
                // context both outlive this call.
                if unsafe { Context::swap(&mut *from_ptr, &*target_ptr) }.is_err() {
                    panic!("context switch failed");
                }
                // Execution resumes here once some thread swaps back
                // into `scheduler_ctx` (via `switch_to_scheduler` or
                // `thread_exit`'s `install`).
            }
            LoopAction::Idle => {
                std::thread::sleep(IDLE_SLEEP);
            }
            LoopAction::Retry => {}
        }
    }
}

enum LoopAction {
    Dispatch(usize),
    Idle,
    Retry,
}

/// Snapshot of per-thread dispatch counters, ambient diagnostics
/// grounded on `ThreadManager::stats()`.
pub fn thread_stats() -> Vec<ThreadStats> {
    STATE.with(|cell| {
        let guard = cell.borrow();
        let state = match guard.as_ref() {
            Some(s) => s,
            None => return Vec::new(),
        };
        state
            .threads
            .iter()
            .enumerate()
            .filter_map(|(idx, slot)| {
                slot.as_ref().map(|t| ThreadStats {
                    id: t.id,
                    name: t.name.clone(),
                    state: t.state,
                    dispatch_count: state.dispatch_counts.get(idx).copied().unwrap_or(0),
                })
            })
            .collect()
    })
}
