//! Flat `key=value` configuration file, the same format
//! `original_source/Cars.c`'s `main()` reads via
//! `fscanf("%31[^=]=%31s\n", key, val)` and writes back out with
//! defaults when the file is missing.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use thiserror::Error;

use cethreads_rt::PolicyKind;

use crate::types::FlowPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write default config file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config line: {0:?}")]
    MalformedLine(String),

    #[error("unknown flow_method value: {0:?}")]
    UnknownFlowMethod(String),

    #[error("unknown scheduler_method value: {0:?}")]
    UnknownSchedulerMethod(String),

    #[error("invalid integer value for key {key}: {value:?}")]
    InvalidInteger { key: String, value: String },
}

#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    pub flow_method: FlowPolicy,
    pub scheduler_method: PolicyKind,
    pub road_length: u64,
    pub base_speed: u64,
    pub equity_window: u32,
    pub signal_time_s: u64,
    pub max_wait_emergency_s: u64,
    pub normal_left: u32,
    pub sport_left: u32,
    pub emergency_left: u32,
    pub normal_right: u32,
    pub sport_right: u32,
    pub emergency_right: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            flow_method: FlowPolicy::Fifo,
            scheduler_method: PolicyKind::EarliestDeadlineFirst,
            road_length: 10,
            base_speed: 10,
            equity_window: 2,
            signal_time_s: 5,
            max_wait_emergency_s: 10,
            normal_left: 3,
            sport_left: 1,
            emergency_left: 0,
            normal_right: 3,
            sport_right: 1,
            emergency_right: 0,
        }
    }
}

impl SimConfig {
    /// Loads the config at `path`, writing out the default file first if
    /// it does not exist, matching `Cars.c`'s `main()`.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let defaults = Self::default();
            defaults.write(path)?;
            tracing::info!(path = %path.display(), "wrote default config file");
            return Ok(defaults);
        }
        Self::parse(path)
    }

    pub fn parse(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| ConfigError::MalformedLine(line.to_string()))?;
            let key = key.trim();
            let value = value.trim();
            apply_key(&mut config, key, value)?;
        }
        Ok(config)
    }

    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let mut out = String::new();
        let _ = writeln!(out, "flow_method={}", flow_method_str(self.flow_method));
        let _ = writeln!(
            out,
            "scheduler_method={}",
            scheduler_method_str(self.scheduler_method)
        );
        let _ = writeln!(out, "road_length={}", self.road_length);
        let _ = writeln!(out, "car_speed={}", self.base_speed);
        let _ = writeln!(out, "W={}", self.equity_window);
        let _ = writeln!(out, "signal_time={}", self.signal_time_s);
        let _ = writeln!(out, "max_wait_emergency={}", self.max_wait_emergency_s);
        let _ = writeln!(out, "normales_left={}", self.normal_left);
        let _ = writeln!(out, "deportivos_left={}", self.sport_left);
        let _ = writeln!(out, "emergencia_left={}", self.emergency_left);
        let _ = writeln!(out, "normales_right={}", self.normal_right);
        let _ = writeln!(out, "deportivos_right={}", self.sport_right);
        let _ = writeln!(out, "emergencia_right={}", self.emergency_right);

        fs::write(path, out).map_err(|source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        })
    }
}

fn apply_key(config: &mut SimConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    match key {
        "flow_method" => config.flow_method = parse_flow_method(value)?,
        "scheduler_method" => config.scheduler_method = parse_scheduler_method(value)?,
        "road_length" => config.road_length = parse_u64(key, value)?,
        "car_speed" => config.base_speed = parse_u64(key, value)?,
        "W" => config.equity_window = parse_u64(key, value)? as u32,
        "signal_time" => config.signal_time_s = parse_u64(key, value)?,
        "max_wait_emergency" => config.max_wait_emergency_s = parse_u64(key, value)?,
        "normales_left" => config.normal_left = parse_u64(key, value)? as u32,
        "deportivos_left" => config.sport_left = parse_u64(key, value)? as u32,
        "emergencia_left" => config.emergency_left = parse_u64(key, value)? as u32,
        "normales_right" => config.normal_right = parse_u64(key, value)? as u32,
        "deportivos_right" => config.sport_right = parse_u64(key, value)? as u32,
        "emergencia_right" => config.emergency_right = parse_u64(key, value)? as u32,
        // Unknown keys are ignored rather than rejected, so config files
        // carrying fields from other simulator variants still load.
        _ => {}
    }
    Ok(())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidInteger {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_flow_method(value: &str) -> Result<FlowPolicy, ConfigError> {
    match value.to_ascii_uppercase().as_str() {
        "FIFO" => Ok(FlowPolicy::Fifo),
        "EQUITY" => Ok(FlowPolicy::Equity),
        "SIGNAL" => Ok(FlowPolicy::Signal),
        other => Err(ConfigError::UnknownFlowMethod(other.to_string())),
    }
}

fn flow_method_str(policy: FlowPolicy) -> &'static str {
    match policy {
        FlowPolicy::Fifo => "FIFO",
        FlowPolicy::Equity => "EQUITY",
        FlowPolicy::Signal => "SIGNAL",
    }
}

fn parse_scheduler_method(value: &str) -> Result<PolicyKind, ConfigError> {
    match value.to_ascii_uppercase().as_str() {
        "FCFS" => Ok(PolicyKind::FirstComeFirstServed),
        "RR" => Ok(PolicyKind::RoundRobin),
        "PRIORITY" => Ok(PolicyKind::Priority),
        "SJF" => Ok(PolicyKind::ShortestJobFirst),
        "REALTIME" | "RT" | "EDF" => Ok(PolicyKind::EarliestDeadlineFirst),
        other => Err(ConfigError::UnknownSchedulerMethod(other.to_string())),
    }
}

fn scheduler_method_str(kind: PolicyKind) -> &'static str {
    match kind {
        PolicyKind::FirstComeFirstServed => "FCFS",
        PolicyKind::RoundRobin => "RR",
        PolicyKind::Priority => "PRIORITY",
        PolicyKind::ShortestJobFirst => "SJF",
        PolicyKind::EarliestDeadlineFirst => "REALTIME",
    }
}
