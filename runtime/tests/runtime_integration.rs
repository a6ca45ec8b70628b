//! End-to-end exercises of the cooperative runtime's hard invariants
//! (§8): one RUNNING thread at a time (implicit in every test passing
//! at all, since there is only one OS thread to observe from), join
//! result delivery, mutex FIFO handoff, and condvar broadcast.
//!
//! Each test brings its own runtime up and tears it down, since the
//! runtime is process-global (confined to the calling OS thread) and
//! Rust's default test harness runs each `#[test]` on its own OS
//! thread, giving every test a fresh `thread_local!` instance.

use std::cell::RefCell;
use std::rc::Rc;

use cethreads_rt::sync::{Condvar, Mutex};
use cethreads_rt::{PolicyKind, SchedHints, ThreadAttr};

fn with_runtime<F: FnOnce()>(policy: PolicyKind, body: F) {
    cethreads_rt::init(policy).unwrap();
    body();
    cethreads_rt::shutdown();
}

#[test]
fn join_returns_the_exact_exit_value() {
    with_runtime(PolicyKind::FirstComeFirstServed, || {
        let id = cethreads_rt::thread_create(
            "worker",
            ThreadAttr::default(),
            SchedHints::default(),
            || {
                cethreads_rt::thread_exit(Some(Box::new(42i32)));
            },
        )
        .unwrap();

        let result = cethreads_rt::join(id).unwrap();
        let value = result.unwrap().downcast::<i32>().unwrap();
        assert_eq!(*value, 42);
    });
}

#[test]
fn self_join_is_a_deadlock_error() {
    with_runtime(PolicyKind::FirstComeFirstServed, || {
        let err = cethreads_rt::join(cethreads_rt::current()).unwrap_err();
        assert_eq!(err, cethreads_rt::RuntimeError::Deadlock);
    });
}

#[test]
fn joining_unknown_thread_is_an_error() {
    with_runtime(PolicyKind::FirstComeFirstServed, || {
        let err = cethreads_rt::join(cethreads_rt::ThreadId(999)).unwrap_err();
        assert_eq!(err, cethreads_rt::RuntimeError::NoSuchThread);
    });
}

#[test]
fn round_robin_runs_every_thread_to_completion() {
    with_runtime(PolicyKind::RoundRobin, || {
        let order: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));
        let mut ids = Vec::new();
        for n in 0..3u32 {
            let order = Rc::clone(&order);
            let id = cethreads_rt::thread_create(
                format!("rr-{n}"),
                ThreadAttr::default(),
                SchedHints::default(),
                move || {
                    cethreads_rt::yield_now();
                    order.borrow_mut().push(n);
                },
            )
            .unwrap();
            ids.push(id);
        }

        for id in ids {
            cethreads_rt::join(id).unwrap();
        }

        let mut observed = order.borrow().clone();
        observed.sort();
        assert_eq!(observed, vec![0, 1, 2]);
    });
}

#[test]
fn mutex_hands_off_to_fifo_waiter_in_order() {
    with_runtime(PolicyKind::FirstComeFirstServed, || {
        let mutex = Rc::new(Mutex::new());
        let order: Rc<RefCell<Vec<u32>>> = Rc::new(RefCell::new(Vec::new()));

        mutex.lock().unwrap();

        let mut ids = Vec::new();
        for n in 0..3u32 {
            let mutex = Rc::clone(&mutex);
            let order = Rc::clone(&order);
            let hints = SchedHints {
                creation_time: n as u64 + 1,
                ..Default::default()
            };
            let id = cethreads_rt::thread_create(
                format!("waiter-{n}"),
                ThreadAttr::default(),
                hints,
                move || {
                    mutex.lock().unwrap();
                    order.borrow_mut().push(n);
                    mutex.unlock().unwrap();
                },
            )
            .unwrap();
            ids.push(id);
        }

        // Give every waiter a chance to enqueue on the held mutex before
        // releasing it.
        for _ in 0..3 {
            cethreads_rt::yield_now();
        }
        mutex.unlock().unwrap();

        for id in ids {
            cethreads_rt::join(id).unwrap();
        }

        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    });
}

#[test]
fn condvar_broadcast_wakes_every_waiter() {
    with_runtime(PolicyKind::FirstComeFirstServed, || {
        let mutex = Rc::new(Mutex::new());
        let condvar = Rc::new(Condvar::new());
        let woken = Rc::new(RefCell::new(0u32));

        let mut ids = Vec::new();
        for _ in 0..4 {
            let mutex = Rc::clone(&mutex);
            let condvar = Rc::clone(&condvar);
            let woken = Rc::clone(&woken);
            let id = cethreads_rt::thread_create(
                "cv-waiter",
                ThreadAttr::default(),
                SchedHints::default(),
                move || {
                    mutex.lock().unwrap();
                    condvar.wait(&mutex).unwrap();
                    *woken.borrow_mut() += 1;
                    mutex.unlock().unwrap();
                },
            )
            .unwrap();
            ids.push(id);
        }

        for _ in 0..4 {
            cethreads_rt::yield_now();
        }

        mutex.lock().unwrap();
        condvar.broadcast();
        mutex.unlock().unwrap();

        for id in ids {
            cethreads_rt::join(id).unwrap();
        }

        assert_eq!(*woken.borrow(), 4);
    });
}
