//! A FIFO condition variable with timed wait (§4.4).
//!
//! `wait`/`signal`/`broadcast` are a direct port of
//! `original_source/CEThreads.c`'s `CEcond_wait`/`signal`/`broadcast`:
//! release the mutex (waking one mutex waiter exactly as `unlock`
//! would), append to a FIFO waiter list, block, and re-acquire the mutex
//! on wake. `CEcond_timedwait` in the original is a stub that ignores
//! its deadline entirely; this implementation instead polls, as §4.4
//! permits ("a valid implementation may approximate this by
//! periodically... walking the condvar waiter lists"), by yielding in a
//! bounded loop rather than fully blocking, so the waiting thread can
//! notice its own deadline has passed without needing an external timer.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::error::{RuntimeError, RuntimeResult};
use crate::sync::Mutex;
use crate::tcb::ThreadId;
use crate::{block_current, current, wake, yield_now};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Signaled,
    TimedOut,
}

pub struct Condvar {
    waiters: RefCell<VecDeque<ThreadId>>,
}

impl Condvar {
    pub fn new() -> Self {
        Self {
            waiters: RefCell::new(VecDeque::new()),
        }
    }

    /// Atomically releases `mutex` and blocks until signaled, then
    /// re-acquires `mutex` before returning.
    pub fn wait(&self, mutex: &Mutex) -> RuntimeResult<()> {
        let caller = current();
        if mutex.owner() != Some(caller) {
            return Err(RuntimeError::Permission);
        }
        mutex.release_for_wait()?;
        self.waiters.borrow_mut().push_back(caller);
        block_current();
        mutex.lock()
    }

    /// As [`Condvar::wait`], but returns `TimedOut` if `timeout` elapses
    /// before a signal removes the caller from the waiter list. Coarse
    /// granularity is acceptable (§4.4 calls for deadlines ≥ 50 ms in
    /// tests); this polls every [`POLL_INTERVAL`].
    pub fn timedwait(&self, mutex: &Mutex, timeout: Duration) -> RuntimeResult<WaitOutcome> {
        let caller = current();
        if mutex.owner() != Some(caller) {
            return Err(RuntimeError::Permission);
        }
        mutex.release_for_wait()?;
        self.waiters.borrow_mut().push_back(caller);

        let deadline = Instant::now() + timeout;
        let outcome = loop {
            yield_now();
            let mut waiters = self.waiters.borrow_mut();
            if !waiters.contains(&caller) {
                break WaitOutcome::Signaled;
            }
            if Instant::now() >= deadline {
                waiters.retain(|&id| id != caller);
                break WaitOutcome::TimedOut;
            }
            drop(waiters);
            std::thread::sleep(POLL_INTERVAL);
        };

        mutex.lock()?;
        Ok(outcome)
    }

    /// Wakes the longest-waiting thread, if any.
    pub fn signal(&self) {
        if let Some(id) = self.waiters.borrow_mut().pop_front() {
            wake(id);
        }
    }

    /// Wakes every waiter, in the order they called `wait`.
    pub fn broadcast(&self) {
        let drained: Vec<ThreadId> = self.waiters.borrow_mut().drain(..).collect();
        for id in drained {
            wake(id);
        }
    }

    pub fn destroy(&self) -> RuntimeResult<()> {
        if !self.waiters.borrow().is_empty() {
            return Err(RuntimeError::InUse);
        }
        Ok(())
    }
}

impl Default for Condvar {
    fn default() -> Self {
        Self::new()
    }
}
