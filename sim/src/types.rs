//! Simulator data model (§3): directions, vehicle types, flow policies,
//! and the `Car` record itself.
//!
//! Grounded on `original_source/Cars.c`'s `Direction`, `CarType`, `Car`
//! struct, and `get_speed`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => write!(f, "LEFT"),
            Direction::Right => write!(f, "RIGHT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarType {
    Normal,
    Sport,
    Emergency,
}

impl fmt::Display for CarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CarType::Normal => write!(f, "NORMAL"),
            CarType::Sport => write!(f, "SPORT"),
            CarType::Emergency => write!(f, "EMERGENCY"),
        }
    }
}

/// Crossing speed as a multiple of `base_speed`, per `Cars.c`'s
/// `get_speed`: sport vehicles cross twice as fast as normal, emergency
/// vehicles three times as fast.
pub fn speed_multiplier(car_type: CarType) -> u32 {
    match car_type {
        CarType::Normal => 1,
        CarType::Sport => 2,
        CarType::Emergency => 3,
    }
}

/// Flow policy governing which side may enter next (§4.5), orthogonal
/// to the scheduling policy ordering each side's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPolicy {
    Fifo,
    Equity,
    Signal,
}

#[derive(Debug, Clone, Copy)]
pub struct Car {
    pub id: u64,
    pub direction: Direction,
    pub car_type: CarType,
    pub arrival_time: std::time::Instant,
    pub priority: i32,
    pub estimated_time_ms: u64,
    pub deadline_s: u64,
}

impl Car {
    pub fn elapsed_since_arrival(&self) -> std::time::Duration {
        self.arrival_time.elapsed()
    }
}
