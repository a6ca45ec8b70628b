//! Error codes returned by runtime primitives.
//!
//! Mirrors the errno values `original_source/CEThreads.c` returns at each
//! call site (`EINVAL`, `ESRCH`, `EDEADLK`, `EAGAIN`, `ENOMEM`, `EPERM`,
//! `EBUSY`) but as a typed enum instead of raw integers, since nothing in
//! this runtime crosses a panic/unwind boundary.

use thiserror::Error;

/// Errors a runtime primitive can report. Never panics across this
/// boundary; a failed context switch is the one exception (fatal, see
/// [`crate::context::Context`]).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("bad argument")]
    BadArgument,

    #[error("no such thread")]
    NoSuchThread,

    #[error("operation would deadlock")]
    Deadlock,

    #[error("no capacity for a new thread")]
    NoCapacity,

    #[error("caller does not own this resource")]
    NotOwner,

    #[error("resource is in use")]
    InUse,

    #[error("operation not permitted")]
    Permission,

    #[error("thread already joined")]
    AlreadyJoined,
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
