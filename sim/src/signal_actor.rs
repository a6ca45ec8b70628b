//! The SIGNAL policy's auxiliary direction-flipping actor.
//!
//! Grounded on `original_source/Cars.c`'s `signal_thread`: sleep
//! `signal_time`, then flip `current_direction` unless an emergency
//! vehicle is close to timing out, logging either way.

use std::rc::Rc;
use std::time::Duration;

use crate::bridge::BridgeState;

pub fn run_signal_actor(bridge: Rc<BridgeState>, signal_time: Duration, until: impl Fn() -> bool) {
    while !until() {
        std::thread::sleep(signal_time);
        if until() {
            break;
        }

        bridge.mutex.lock().expect("bridge mutex lock");
        let flipped = bridge.try_flip_for_signal();
        let next_direction = bridge.current_direction();
        if flipped {
            bridge.condvar.broadcast();
        }
        bridge.mutex.unlock().expect("bridge mutex unlock");

        if flipped {
            tracing::info!("[Signal] Cambio de sentido: {}", next_direction);
        } else {
            tracing::info!("[Signal] Maintaining direction: emergency vehicle waiting");
        }
    }
}
