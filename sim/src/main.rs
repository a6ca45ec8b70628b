//! `bridge-sim`: a single-lane bridge simulator exercising
//! `cethreads-rt`'s cooperative scheduler and synchronization
//! primitives.
//!
//! Entry point structure grounded on `original_source/Cars.c`'s
//! `main()` (load-or-create config, spawn the signal actor only under
//! SIGNAL, spawn every configured vehicle, poll until every vehicle has
//! crossed); CLI surface and tracing setup are the ambient stack this
//! repository carries per SPEC_FULL.md §1.1.

mod bridge;
mod car;
mod config;
mod signal_actor;
mod types;

use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use clap::Parser;

use cethreads_rt::{SchedHints, ThreadAttr};

use bridge::BridgeState;
use car::{hints_for, CarActorConfig, CarIdAllocator};
use config::SimConfig;
use types::{Car, CarType, Direction, FlowPolicy};

#[derive(Parser, Debug)]
#[command(name = "bridge-sim", about = "Single-lane bridge arbitration simulator")]
struct Cli {
    /// Path to the flat key=value configuration file.
    #[arg(long, default_value = "config.txt")]
    config: PathBuf,

    /// Raise log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_target(false)
        .init();
}

fn spawn_cars(
    bridge: &Rc<BridgeState>,
    ids: &Rc<CarIdAllocator>,
    car_cfg: &Rc<CarActorConfig>,
    config: &SimConfig,
    direction: Direction,
    car_type: CarType,
    count: u32,
) -> Result<(), cethreads_rt::RuntimeError> {
    for _ in 0..count {
        let id = ids.allocate();
        let car = Car {
            id,
            direction,
            car_type,
            arrival_time: std::time::Instant::now(),
            priority: 0,
            estimated_time_ms: 0,
            deadline_s: 0,
        };
        let hints = hints_for(
            car_type,
            config.road_length,
            config.base_speed,
            config.max_wait_emergency_s,
        );
        let car = Car {
            priority: hints.priority,
            estimated_time_ms: hints.estimated_time,
            deadline_s: hints.deadline,
            ..car
        };

        let bridge = Rc::clone(bridge);
        let ids = Rc::clone(ids);
        let car_cfg = Rc::clone(car_cfg);
        cethreads_rt::thread_create(
            format!("car-{id}"),
            ThreadAttr::default(),
            hints,
            move || car::run_car(car, bridge, ids, car_cfg),
        )?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = SimConfig::load_or_create(&cli.config)?;
    tracing::info!(?config, "loaded simulator configuration");

    cethreads_rt::init(config.scheduler_method)?;

    let signal_time = Duration::from_secs(config.signal_time_s);
    let max_wait_emergency = Duration::from_secs(config.max_wait_emergency_s);
    let remaining_left =
        config.normal_left + config.sport_left + config.emergency_left;
    let remaining_right =
        config.normal_right + config.sport_right + config.emergency_right;

    let bridge = Rc::new(BridgeState::new(
        config.flow_method,
        config.scheduler_method,
        config.equity_window,
        signal_time,
        max_wait_emergency,
        remaining_left,
        remaining_right,
    ));
    let ids = Rc::new(CarIdAllocator::starting_at(1));
    let rr_quantum = matches!(config.scheduler_method, cethreads_rt::PolicyKind::RoundRobin)
        .then(|| Duration::from_secs(1));
    let car_cfg = Rc::new(CarActorConfig {
        road_length: config.road_length,
        base_speed: config.base_speed,
        rr_quantum,
        max_wait_emergency,
    });

    if config.flow_method == FlowPolicy::Signal {
        let bridge_for_signal = Rc::clone(&bridge);
        let signal_bridge_done = Rc::clone(&bridge);
        cethreads_rt::thread_create(
            "signal-actor",
            ThreadAttr::default(),
            SchedHints::default(),
            move || {
                signal_actor::run_signal_actor(bridge_for_signal, signal_time, move || {
                    signal_bridge_done.all_crossed()
                })
            },
        )?;
    }

    spawn_cars(
        &bridge,
        &ids,
        &car_cfg,
        &config,
        Direction::Left,
        CarType::Normal,
        config.normal_left,
    )?;
    spawn_cars(
        &bridge,
        &ids,
        &car_cfg,
        &config,
        Direction::Left,
        CarType::Sport,
        config.sport_left,
    )?;
    spawn_cars(
        &bridge,
        &ids,
        &car_cfg,
        &config,
        Direction::Left,
        CarType::Emergency,
        config.emergency_left,
    )?;
    spawn_cars(
        &bridge,
        &ids,
        &car_cfg,
        &config,
        Direction::Right,
        CarType::Normal,
        config.normal_right,
    )?;
    spawn_cars(
        &bridge,
        &ids,
        &car_cfg,
        &config,
        Direction::Right,
        CarType::Sport,
        config.sport_right,
    )?;
    spawn_cars(
        &bridge,
        &ids,
        &car_cfg,
        &config,
        Direction::Right,
        CarType::Emergency,
        config.emergency_right,
    )?;

    while !bridge.all_crossed() {
        cethreads_rt::yield_now();
        std::thread::sleep(Duration::from_millis(10));
    }

    tracing::info!("all vehicles crossed");
    cethreads_rt::shutdown();
    Ok(())
}
