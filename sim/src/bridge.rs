//! Shared arbitration state (§3, §4.5): the bridge's occupancy counters,
//! per-direction queues, and the flow/safety admission predicates.
//!
//! Grounded on `original_source/Cars.c`'s global bridge state
//! (`cars_on_bridge_left/right`, `current_dir`, `cars_in_window`) and the
//! branches inlined in its `car_thread`, refactored here into named
//! predicate methods the car actor (`car.rs`) calls directly.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use cethreads_rt::sync::{Condvar, Mutex};
use cethreads_rt::PolicyKind;

use crate::types::{Car, CarType, Direction, FlowPolicy};

/// Fraction of `max_wait_emergency` an EMERGENCY vehicle's wait must
/// reach before it counts as "close to timing out" for the `cond_wait`
/// gate (§4.5 step 2) and the SIGNAL flip gate (§4.5 Signal policy).
const EMERGENCY_WAIT_FRACTION: f64 = 0.8;

struct Inner {
    current_direction: Direction,
    cars_in_window: u32,
    cars_on_bridge_left: u32,
    cars_on_bridge_right: u32,
    remaining_left: u32,
    remaining_right: u32,
    emergency_waiting_left: u32,
    emergency_waiting_right: u32,
    queue_left: VecDeque<Car>,
    queue_right: VecDeque<Car>,
}

/// Bridge-wide state, protected by `mutex` exactly as §5 requires: every
/// read-modify-write of occupancy counters, queues, or `current_direction`
/// happens while holding it.
pub struct BridgeState {
    pub mutex: Mutex,
    pub condvar: Condvar,
    inner: RefCell<Inner>,
    pub flow_policy: FlowPolicy,
    pub scheduler_policy: PolicyKind,
    pub equity_window: u32,
    pub signal_time: Duration,
    pub max_wait_emergency: Duration,
}

impl BridgeState {
    pub fn new(
        flow_policy: FlowPolicy,
        scheduler_policy: PolicyKind,
        equity_window: u32,
        signal_time: Duration,
        max_wait_emergency: Duration,
        remaining_left: u32,
        remaining_right: u32,
    ) -> Self {
        Self {
            mutex: Mutex::new(),
            condvar: Condvar::new(),
            inner: RefCell::new(Inner {
                current_direction: Direction::Left,
                cars_in_window: 0,
                cars_on_bridge_left: 0,
                cars_on_bridge_right: 0,
                remaining_left,
                remaining_right,
                emergency_waiting_left: 0,
                emergency_waiting_right: 0,
                queue_left: VecDeque::new(),
                queue_right: VecDeque::new(),
            }),
        }
    }

    pub fn current_direction(&self) -> Direction {
        self.inner.borrow().current_direction
    }

    pub fn all_crossed(&self) -> bool {
        let inner = self.inner.borrow();
        inner.remaining_left == 0 && inner.remaining_right == 0
    }

    /// Appends `car` to its side's queue, ordered by the active
    /// scheduling policy (§3's "Direction queue" definition).
    pub fn enqueue(&self, car: Car) {
        let mut inner = self.inner.borrow_mut();
        if car.car_type == CarType::Emergency {
            match car.direction {
                Direction::Left => inner.emergency_waiting_left += 1,
                Direction::Right => inner.emergency_waiting_right += 1,
            }
        }
        let policy = self.scheduler_policy;
        let queue = match car.direction {
            Direction::Left => &mut inner.queue_left,
            Direction::Right => &mut inner.queue_right,
        };
        let pos = insertion_position(queue, &car, policy);
        queue.insert(pos, car);
    }

    /// True if `car` is at the head of its side's queue under the
    /// active scheduling policy.
    pub fn is_front(&self, car: &Car) -> bool {
        let inner = self.inner.borrow();
        let queue = match car.direction {
            Direction::Left => &inner.queue_left,
            Direction::Right => &inner.queue_right,
        };
        queue.front().map(|c| c.id) == Some(car.id)
    }

    /// The flow-policy eligibility predicate (§4.5 step 2).
    pub fn flow_eligible(&self, car: &Car) -> bool {
        if !self.is_front(car) {
            return false;
        }
        match self.flow_policy {
            FlowPolicy::Fifo => true,
            FlowPolicy::Equity => {
                let inner = self.inner.borrow();
                let opposite_remaining = match car.direction {
                    Direction::Left => inner.remaining_right,
                    Direction::Right => inner.remaining_left,
                };
                (car.direction == inner.current_direction && inner.cars_in_window < self.equity_window)
                    || opposite_remaining == 0
            }
            FlowPolicy::Signal => car.direction == self.inner.borrow().current_direction,
        }
    }

    /// The safety predicate (§4.5): never let both directions occupy
    /// the bridge at once.
    pub fn can_enter(&self, direction: Direction) -> bool {
        let inner = self.inner.borrow();
        let total = inner.cars_on_bridge_left + inner.cars_on_bridge_right;
        if total == 0 {
            return true;
        }
        match direction {
            Direction::Left => inner.cars_on_bridge_left > 0 && inner.cars_on_bridge_right == 0,
            Direction::Right => inner.cars_on_bridge_right > 0 && inner.cars_on_bridge_left == 0,
        }
    }

    /// Removes `car` from the head of its side's queue. Returns `false`
    /// (logged by the caller as an error, not fatal) if the head does
    /// not match `car`'s id.
    pub fn dequeue_front(&self, car: &Car) -> bool {
        let mut inner = self.inner.borrow_mut();
        let queue = match car.direction {
            Direction::Left => &mut inner.queue_left,
            Direction::Right => &mut inner.queue_right,
        };
        match queue.front() {
            Some(front) if front.id == car.id => {
                queue.pop_front();
                true
            }
            _ => false,
        }
    }

    /// Admits `car` onto the bridge: bumps occupancy and, under EQUITY,
    /// increments the window counter at entry time, per §9's resolution
    /// of the EQUITY-window Open Question (entry, not exit, unlike the
    /// `cars_in_window++` at exit in `original_source/Cars.c`).
    pub fn enter(&self, car: &Car) {
        let mut inner = self.inner.borrow_mut();
        match car.direction {
            Direction::Left => inner.cars_on_bridge_left += 1,
            Direction::Right => inner.cars_on_bridge_right += 1,
        }
        if matches!(car.car_type, CarType::Emergency) {
            match car.direction {
                Direction::Left => inner.emergency_waiting_left -= 1,
                Direction::Right => inner.emergency_waiting_right -= 1,
            }
        }
        if self.flow_policy == FlowPolicy::Equity {
            inner.cars_in_window += 1;
        }
    }

    /// Releases `car` from the bridge after crossing; updates remaining
    /// counts and, under EQUITY, flips direction when the window fills
    /// or the current side drains.
    ///
    /// `requeued` is true when this exit is immediately followed by a
    /// round-robin requeue (§4.5 step 5) of the same logical vehicle —
    /// in that case `remaining_<side>` is left untouched, since the
    /// vehicle has not actually finished; only its physical occupancy of
    /// the bridge ends. Decrementing `remaining_<side>` here regardless
    /// would let `all_crossed()` report the simulation done while the
    /// requeued copy is still waiting to cross.
    pub fn exit(&self, car: &Car, requeued: bool) {
        let mut inner = self.inner.borrow_mut();
        match car.direction {
            Direction::Left => {
                inner.cars_on_bridge_left -= 1;
                if !requeued {
                    inner.remaining_left -= 1;
                }
            }
            Direction::Right => {
                inner.cars_on_bridge_right -= 1;
                if !requeued {
                    inner.remaining_right -= 1;
                }
            }
        }

        if self.flow_policy == FlowPolicy::Equity {
            let side_exhausted = match inner.current_direction {
                Direction::Left => inner.remaining_left == 0,
                Direction::Right => inner.remaining_right == 0,
            };
            if inner.cars_in_window >= self.equity_window || side_exhausted {
                inner.cars_in_window = 0;
                inner.current_direction = inner.current_direction.opposite();
                tracing::info!(
                    direction = %inner.current_direction,
                    "[EQUITY] Changing direction to: {}",
                    inner.current_direction
                );
            }
        }
    }

    /// True if an emergency vehicle is currently waiting on either side —
    /// a coarse presence counter (§3's `emergency_waiting_left/right`)
    /// kept as ambient diagnostics. Deadline-proximity decisions use
    /// [`Self::nearest_emergency_wait`]/[`Self::any_emergency_near_deadline`]
    /// instead, which scan each side's queue for actual elapsed wait.
    pub fn emergency_waiting(&self) -> bool {
        let inner = self.inner.borrow();
        inner.emergency_waiting_left > 0 || inner.emergency_waiting_right > 0
    }

    /// The elapsed wait of the longest-waiting (hence nearest-to-deadline,
    /// since an EMERGENCY's deadline is `arrival_time + max_wait_emergency`)
    /// EMERGENCY vehicle still queued on `direction`, if any.
    pub fn nearest_emergency_wait(&self, direction: Direction) -> Option<Duration> {
        let inner = self.inner.borrow();
        let queue = match direction {
            Direction::Left => &inner.queue_left,
            Direction::Right => &inner.queue_right,
        };
        queue
            .iter()
            .filter(|c| c.car_type == CarType::Emergency)
            .map(|c| c.elapsed_since_arrival())
            .max()
    }

    fn emergency_near_deadline(&self, direction: Direction) -> bool {
        self.nearest_emergency_wait(direction)
            .map(|elapsed| {
                elapsed.as_secs_f64() >= self.max_wait_emergency.as_secs_f64() * EMERGENCY_WAIT_FRACTION
            })
            .unwrap_or(false)
    }

    /// True if an EMERGENCY vehicle on either side has waited ≥ 80% of
    /// `max_wait_emergency` — the `cond_wait` vs `cond_timedwait` gate of
    /// §4.5 step 2.
    pub fn any_emergency_near_deadline(&self) -> bool {
        self.emergency_near_deadline(Direction::Left) || self.emergency_near_deadline(Direction::Right)
    }

    /// Flips `current_direction` (used by the SIGNAL actor) unless an
    /// EMERGENCY vehicle on the *current-direction* side is within 80% of
    /// its deadline (§4.5 Signal policy).
    pub fn try_flip_for_signal(&self) -> bool {
        if self.emergency_near_deadline(self.current_direction()) {
            return false;
        }
        let mut inner = self.inner.borrow_mut();
        inner.current_direction = inner.current_direction.opposite();
        inner.cars_in_window = 0;
        true
    }
}

fn insertion_position(queue: &VecDeque<Car>, car: &Car, policy: PolicyKind) -> usize {
    match policy {
        PolicyKind::FirstComeFirstServed | PolicyKind::RoundRobin => queue.len(),
        PolicyKind::Priority => queue
            .iter()
            .position(|c| c.priority < car.priority)
            .unwrap_or(queue.len()),
        PolicyKind::ShortestJobFirst => queue
            .iter()
            .position(|c| c.estimated_time_ms > car.estimated_time_ms)
            .unwrap_or(queue.len()),
        PolicyKind::EarliestDeadlineFirst => {
            let car_is_emergency = matches!(car.car_type, CarType::Emergency);
            if !car_is_emergency {
                return queue.len();
            }
            queue
                .iter()
                .position(|c| !matches!(c.car_type, CarType::Emergency))
                .unwrap_or(queue.len())
        }
    }
}
