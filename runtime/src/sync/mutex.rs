//! An owner-tracked FIFO mutex (§4.4).
//!
//! Grounded directly on `original_source/CEThreads.c`'s
//! `CEmutex_lock`/`CEmutex_unlock`: fast path acquires immediately if
//! free, self-relock is a deadlock error, the slow path appends the
//! caller to a FIFO waiter list and blocks, and `unlock` hands ownership
//! directly to the FIFO head rather than waking every waiter (unlike
//! `original_source/Cars.c`'s simpler retry-based mutex, which wakes
//! everyone and lets them race).

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::error::{RuntimeError, RuntimeResult};
use crate::tcb::ThreadId;
use crate::{block_current, current, wake};

struct Inner {
    locked: bool,
    owner: Option<ThreadId>,
    waiters: VecDeque<ThreadId>,
}

/// A mutex over runtime threads. Not `Send`/`Sync` in the OS-thread
/// sense — it coordinates cooperative threads within one OS thread, the
/// same way `CEmutex_t` coordinates `CEThread`s.
pub struct Mutex {
    inner: RefCell<Inner>,
}

impl Mutex {
    pub fn new() -> Self {
        Self {
            inner: RefCell::new(Inner {
                locked: false,
                owner: None,
                waiters: VecDeque::new(),
            }),
        }
    }

    pub fn lock(&self) -> RuntimeResult<()> {
        let caller = current();
        loop {
            let action = {
                let mut inner = self.inner.borrow_mut();
                if !inner.locked {
                    inner.locked = true;
                    inner.owner = Some(caller);
                    LockAction::Acquired
                } else if inner.owner == Some(caller) {
                    return Err(RuntimeError::Deadlock);
                } else {
                    inner.waiters.push_back(caller);
                    LockAction::MustBlock
                }
            };

            match action {
                LockAction::Acquired => return Ok(()),
                LockAction::MustBlock => {
                    block_current();
                    // Woken by `unlock`'s direct handoff; the waker
                    // already set us as owner, so loop once more to
                    // observe that and return.
                    let mut inner = self.inner.borrow_mut();
                    if inner.owner == Some(caller) {
                        return Ok(());
                    }
                    // Spurious wake with the mutex still taken by
                    // someone else: drop back into the waiter list.
                    inner.waiters.push_back(caller);
                    drop(inner);
                    block_current();
                }
            }
        }
    }

    pub fn unlock(&self) -> RuntimeResult<()> {
        let caller = current();
        let mut inner = self.inner.borrow_mut();
        if !inner.locked {
            return Err(RuntimeError::Permission);
        }
        if inner.owner != Some(caller) {
            return Err(RuntimeError::NotOwner);
        }

        if let Some(next) = inner.waiters.pop_front() {
            inner.owner = Some(next);
            drop(inner);
            wake(next);
        } else {
            inner.locked = false;
            inner.owner = None;
        }
        Ok(())
    }

    pub fn destroy(&self) -> RuntimeResult<()> {
        if self.inner.borrow().locked {
            return Err(RuntimeError::InUse);
        }
        Ok(())
    }

    pub fn owner(&self) -> Option<ThreadId> {
        self.inner.borrow().owner
    }

    /// Used by [`crate::sync::Condvar::wait`] to atomically release this
    /// mutex (waking one waiter, exactly as `unlock` would) before
    /// appending the caller to the condvar's own waiter list.
    pub(crate) fn release_for_wait(&self) -> RuntimeResult<()> {
        self.unlock()
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}

enum LockAction {
    Acquired,
    MustBlock,
}
