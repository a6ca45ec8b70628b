//! Thread creation attributes.
//!
//! Carried over from `original_source/CEThreads.h`'s `CEthread_attr_t`
//! (`detachstate`, `stacksize`); `CEthread_attr_init` defaulted to a 1 MiB
//! stack and joinable mode. This runtime defaults to a smaller 64 KiB
//! stack, matching the data model's stated default in §3.

/// Detach state of a newly created thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachState {
    Joinable,
    Detached,
}

/// Attributes passed to [`crate::thread_create`].
#[derive(Debug, Clone, Copy)]
pub struct ThreadAttr {
    pub stack_size: usize,
    pub detach_state: DetachState,
}

impl ThreadAttr {
    pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

    pub fn joinable(stack_size: usize) -> Self {
        Self {
            stack_size,
            detach_state: DetachState::Joinable,
        }
    }

    pub fn detached(stack_size: usize) -> Self {
        Self {
            stack_size,
            detach_state: DetachState::Detached,
        }
    }
}

impl Default for ThreadAttr {
    fn default() -> Self {
        Self {
            stack_size: Self::DEFAULT_STACK_SIZE,
            detach_state: DetachState::Joinable,
        }
    }
}
