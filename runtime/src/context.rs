//! Stack-switched execution contexts.
//!
//! Implements capture/install/swap (§4.1) directly on top of POSIX
//! `ucontext.h`, the same mechanism `original_source/CEThreads.c` uses
//! (`getcontext`/`makecontext`/`swapcontext`/`setcontext`). No pack
//! example ships a safe green-thread/coroutine crate to build on, and the
//! original mechanism literally is ucontext, so this wraps the raw FFI
//! behind a safe-to-call type rather than inventing a hand-rolled
//! assembly trampoline.

use std::mem::MaybeUninit;

use libc::ucontext_t;

/// Trampoline entry point installed into a context via `makecontext`.
///
/// `makecontext`'s varargs are `int`-sized; on LP64 targets a pointer does
/// not fit in one, so the trampoline argument is split into two halves
/// and reassembled here, mirroring the technique used by portable
/// ucontext-based coroutine implementations.
extern "C" fn trampoline(arg_hi: u32, arg_lo: u32) {
    let arg = ((arg_hi as usize) << 32) | (arg_lo as usize);
    // SAFETY: `arg` was produced by `Context::spawn` from a `Box<dyn FnOnce()>`
    // trait object pointer smuggled through a `Box<Box<dyn FnOnce()>>`.
    let entry: Box<Box<dyn FnOnce()>> = unsafe { Box::from_raw(arg as *mut Box<dyn FnOnce()>) };
    entry();
    // The entry closure is responsible for transferring control away
    // (typically via the scheduler's context); returning from here with
    // no `uc_link` set is a runtime bug and falls through to the
    // `ucontext_t` default behavior (process exit), which is the same
    // failure mode `original_source/CEThreads.c`'s `thread_wrapper`
    // documents as "should never reach here".
}

/// An owned, stack-switched execution context.
///
/// Holds the raw `ucontext_t` plus the backing stack allocation so the
/// stack outlives every switch into this context.
pub struct Context {
    raw: Box<ucontext_t>,
    _stack: Option<Box<[u8]>>,
}

impl Context {
    /// Captures the calling execution state. Used for the bootstrap
    /// thread (which reuses the host stack) and the scheduler's own
    /// "current" slot before its first dispatch.
    pub fn capture_current() -> std::io::Result<Self> {
        let mut raw = Box::new(unsafe { MaybeUninit::<ucontext_t>::zeroed().assume_init() });
        if unsafe { libc::getcontext(raw.as_mut() as *mut ucontext_t) } != 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(Self {
            raw,
            _stack: None,
        })
    }

    /// Builds a new context with its own stack that, when first installed,
    /// runs `entry` to completion and then falls through to `link` (the
    /// scheduler context), exactly as `original_source/CEThreads.c` sets
    /// `uc_link = &scheduler_context` on every thread it creates.
    pub fn spawn(
        stack_size: usize,
        link: &Context,
        entry: Box<dyn FnOnce()>,
    ) -> std::io::Result<Self> {
        let mut stack = vec![0u8; stack_size].into_boxed_slice();
        let mut raw = Box::new(unsafe { MaybeUninit::<ucontext_t>::zeroed().assume_init() });

        if unsafe { libc::getcontext(raw.as_mut() as *mut ucontext_t) } != 0 {
            return Err(std::io::Error::last_os_error());
        }

        raw.uc_stack.ss_sp = stack.as_mut_ptr() as *mut libc::c_void;
        raw.uc_stack.ss_size = stack.len();
        raw.uc_link = link.raw.as_ref() as *const ucontext_t as *mut ucontext_t;

        // Box the boxed trait object so we have a thin, stable pointer to
        // smuggle through the two-int varargs boundary.
        let boxed_entry: Box<Box<dyn FnOnce()>> = Box::new(entry);
        let arg = Box::into_raw(boxed_entry) as usize;
        let arg_hi = (arg >> 32) as u32;
        let arg_lo = (arg & 0xffff_ffff) as u32;

        unsafe {
            libc::makecontext(
                raw.as_mut() as *mut ucontext_t,
                std::mem::transmute::<extern "C" fn(u32, u32), extern "C" fn()>(trampoline),
                2,
                arg_hi,
                arg_lo,
            );
        }

        Ok(Self {
            raw,
            _stack: Some(stack),
        })
    }

    /// Installs `self`, saving the caller's state into `from`. Returns
    /// once some other context swaps back into `from`.
    pub fn swap(from: &mut Context, to: &Context) -> std::io::Result<()> {
        let rc = unsafe {
            libc::swapcontext(
                from.raw.as_mut() as *mut ucontext_t,
                to.raw.as_ref() as *const ucontext_t,
            )
        };
        if rc != 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }

    /// Installs `self` without saving the caller's state. Does not
    /// return. Used by the scheduler when the previous thread has
    /// already terminated, matching `CEthread_scheduler`'s
    /// `prev_thread->state == CE_THREAD_TERMINATED` branch.
    pub fn install(&self) -> ! {
        unsafe {
            libc::setcontext(self.raw.as_ref() as *const ucontext_t);
        }
        // setcontext only returns on failure.
        panic!("setcontext failed: {}", std::io::Error::last_os_error());
    }
}
