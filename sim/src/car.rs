//! The per-vehicle actor (§4.5 steps 1-5).
//!
//! Grounded on `original_source/Cars.c`'s `car_thread`: arrival log,
//! mutex-guarded eligibility loop with an emergency-override escape
//! hatch, unlock-sleep-relock to model crossing without holding the
//! bridge mutex for the whole transit, and exit-time bookkeeping.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use cethreads_rt::{SchedHints, ThreadAttr};

use crate::bridge::BridgeState;
use crate::types::{speed_multiplier, Car, CarType};

const POLL_TIMEOUT: Duration = Duration::from_millis(100);
const EMERGENCY_HORIZON: Duration = Duration::from_secs(1);

/// Shared monotonic id allocator so a Round-Robin requeue (§4.5 step 5)
/// can mint a fresh id for the re-spawned copy.
pub struct CarIdAllocator {
    next: Cell<u64>,
}

impl CarIdAllocator {
    pub fn starting_at(next: u64) -> Self {
        Self {
            next: Cell::new(next),
        }
    }

    pub fn allocate(&self) -> u64 {
        let id = self.next.get();
        self.next.set(id + 1);
        id
    }
}

pub struct CarActorConfig {
    pub road_length: u64,
    pub base_speed: u64,
    pub rr_quantum: Option<Duration>,
    pub max_wait_emergency: Duration,
}

/// Scheduling hints derived from a vehicle's type (§4.5's per-type
/// priority/estimated-time/deadline assignment). Shared by the initial
/// spawn in `main.rs::spawn_cars` and the round-robin requeue below, so
/// a requeued copy gets the same hint derivation as a freshly arriving
/// vehicle of its type.
pub fn hints_for(
    car_type: CarType,
    road_length: u64,
    base_speed: u64,
    max_wait_emergency_s: u64,
) -> SchedHints {
    let multiplier = speed_multiplier(car_type) as u64;
    let estimated_time = (road_length * 1000) / (base_speed * multiplier).max(1);
    match car_type {
        CarType::Normal => SchedHints {
            priority: 1,
            estimated_time,
            deadline: 0,
            creation_time: 0,
        },
        CarType::Sport => SchedHints {
            priority: 2,
            estimated_time,
            deadline: 0,
            creation_time: 0,
        },
        CarType::Emergency => SchedHints {
            priority: 3,
            estimated_time,
            deadline: max_wait_emergency_s,
            creation_time: 0,
        },
    }
}

/// Runs one vehicle's full arrival-to-exit protocol. Spawned as the
/// entry closure of a `cethreads_rt` thread; blocks cooperatively, never
/// parking the underlying OS thread except via the runtime's own
/// idle/poll sleeps.
pub fn run_car(car: Car, bridge: Rc<BridgeState>, ids: Rc<CarIdAllocator>, cfg: Rc<CarActorConfig>) {
    tracing::info!(
        "[Arrive] Car {} [{}] from {} side",
        car.id,
        car.car_type,
        car.direction
    );

    bridge.enqueue(car);
    bridge.mutex.lock().expect("bridge mutex lock");

    loop {
        let flow_ok = bridge.flow_eligible(&car);
        let safe = bridge.can_enter(car.direction);

        if flow_ok && safe {
            if !bridge.dequeue_front(&car) {
                tracing::error!(car = car.id, "queue head mismatch on dequeue");
            }
            break;
        }

        if car.car_type == CarType::Emergency
            && car.elapsed_since_arrival() + EMERGENCY_HORIZON >= cfg.max_wait_emergency
        {
            tracing::warn!(
                "[EMERGENCY OVERRIDE] Car {} forcing entry with {} seconds remaining to deadline",
                car.id,
                cfg.max_wait_emergency
                    .saturating_sub(car.elapsed_since_arrival())
                    .as_secs()
            );
            bridge.dequeue_front(&car);
            break;
        }

        if bridge.any_emergency_near_deadline() {
            bridge.condvar.wait(&bridge.mutex).expect("cond wait");
        } else {
            bridge
                .condvar
                .timedwait(&bridge.mutex, POLL_TIMEOUT)
                .expect("cond timedwait");
        }
    }

    bridge.enter(&car);
    bridge.mutex.unlock().expect("bridge mutex unlock");

    tracing::info!(
        "[Enter ] Car {} [{}] from {} side",
        car.id,
        car.car_type,
        car.direction
    );

    let crossing_time = Duration::from_secs_f64(
        cfg.road_length as f64 / (cfg.base_speed * speed_multiplier(car.car_type) as u64) as f64,
    );
    let crossing_start = Instant::now();
    std::thread::sleep(crossing_time);
    let rr_timeout = cfg
        .rr_quantum
        .map(|q| crossing_start.elapsed() > q)
        .unwrap_or(false);

    bridge.mutex.lock().expect("bridge mutex lock");
    bridge.exit(&car, rr_timeout);

    tracing::info!(
        "[Exit  ] Car {} [{}] from {} side",
        car.id,
        car.car_type,
        car.direction
    );

    bridge.condvar.broadcast();
    bridge.mutex.unlock().expect("bridge mutex unlock");

    if rr_timeout {
        tracing::info!("[RR] Car {} exceeded time slice", car.id);
        let requeued = Car {
            id: ids.allocate(),
            arrival_time: Instant::now(),
            ..car
        };
        let hints = hints_for(
            requeued.car_type,
            cfg.road_length,
            cfg.base_speed,
            cfg.max_wait_emergency.as_secs(),
        );
        let bridge = Rc::clone(&bridge);
        let ids = Rc::clone(&ids);
        let cfg = Rc::clone(&cfg);
        if let Err(err) = cethreads_rt::thread_create(
            format!("car-{}", requeued.id),
            ThreadAttr::default(),
            hints,
            move || run_car(requeued, bridge, ids, cfg),
        ) {
            tracing::error!(car = requeued.id, ?err, "failed to spawn requeued car");
        }
    }
}
