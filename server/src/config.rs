//! Process configuration, read once at start-up.

use std::net::SocketAddr;
use std::time::Duration;

use system::chrono;
use system::StrokeSettings;
use thiserror::Error;

use crate::connection::{WsSettings, DEFAULT_MAX_FRAME_SIZE};

pub const BIND_ADDR_VAR: &str = "CANVAS_BIND_ADDR";
pub const STROKE_TTL_VAR: &str = "CANVAS_STROKE_TTL_SECS";
pub const SWEEP_INTERVAL_VAR: &str = "CANVAS_SWEEP_INTERVAL_SECS";
pub const SIMPLIFY_TOLERANCE_VAR: &str = "CANVAS_SIMPLIFY_TOLERANCE";
pub const MAX_FRAME_SIZE_VAR: &str = "CANVAS_MAX_FRAME_BYTES";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub sweep_interval: Duration,
    pub stroke_settings: StrokeSettings,
    /// Largest inbound WebSocket message in bytes.
    pub max_frame_size: usize,
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            sweep_interval: Duration::from_secs(60),
            stroke_settings: StrokeSettings::default(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn with_stroke_ttl(mut self, ttl: chrono::Duration) -> Self {
        self.stroke_settings.ttl = ttl;
        self
    }

    pub fn with_simplify_tolerance(mut self, tolerance: f64) -> Self {
        self.stroke_settings.tolerance = tolerance;
        self
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn ws_settings(&self) -> WsSettings {
        WsSettings {
            max_frame_size: self.max_frame_size,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from `lookup`, falling back to defaults for
    /// missing keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(BIND_ADDR_VAR) {
            config.bind_addr = parse(BIND_ADDR_VAR, &value)?;
        }
        if let Some(value) = lookup(STROKE_TTL_VAR) {
            let secs: i64 = parse(STROKE_TTL_VAR, &value)?;
            if secs <= 0 {
                return Err(invalid(STROKE_TTL_VAR, &value));
            }
            config = config.with_stroke_ttl(chrono::Duration::seconds(secs));
        }
        if let Some(value) = lookup(SWEEP_INTERVAL_VAR) {
            let secs: u64 = parse(SWEEP_INTERVAL_VAR, &value)?;
            if secs == 0 {
                return Err(invalid(SWEEP_INTERVAL_VAR, &value));
            }
            config = config.with_sweep_interval(Duration::from_secs(secs));
        }
        if let Some(value) = lookup(SIMPLIFY_TOLERANCE_VAR) {
            let tolerance: f64 = parse(SIMPLIFY_TOLERANCE_VAR, &value)?;
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(invalid(SIMPLIFY_TOLERANCE_VAR, &value));
            }
            config = config.with_simplify_tolerance(tolerance);
        }
        if let Some(value) = lookup(MAX_FRAME_SIZE_VAR) {
            let max_frame_size: usize = parse(MAX_FRAME_SIZE_VAR, &value)?;
            if max_frame_size == 0 {
                return Err(invalid(MAX_FRAME_SIZE_VAR, &value));
            }
            config = config.with_max_frame_size(max_frame_size);
        }

        Ok(config)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 3024)))
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_owned(),
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| invalid(key, value))
}
