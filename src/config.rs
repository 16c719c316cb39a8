//! Sandbox configuration, read from environment variables.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Runtime configuration for the sandbox server
#[derive(Clone, Debug)]
pub struct SandboxConfig {
    /// WebSocket binding address
    pub addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Optional JSON tuning table replacing the built-in brands
    pub tuning_file: Option<PathBuf>,
    /// One car is spawned per listed brand
    pub brands: Vec<String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 9001)),
            log_level: "info".to_string(),
            tick_rate: 60,
            tuning_file: None,
            brands: vec!["DEFAULT".to_string(), "HOTROD".to_string()],
        }
    }
}

impl SandboxConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let addr = match lookup("SANDBOX_ADDR") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidAddress)?,
            None => defaults.addr,
        };

        let tick_rate = match lookup("TICK_RATE") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(rate) if rate > 0 => rate,
                _ => return Err(ConfigError::Invalid { var: "TICK_RATE", value: raw }),
            },
            None => defaults.tick_rate,
        };

        let brands = match lookup("SANDBOX_BRANDS") {
            Some(raw) => {
                let brands: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|b| !b.is_empty())
                    .map(str::to_string)
                    .collect();
                if brands.is_empty() {
                    return Err(ConfigError::Invalid { var: "SANDBOX_BRANDS", value: raw });
                }
                brands
            }
            None => defaults.brands,
        };

        Ok(Self {
            addr,
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            tick_rate,
            tuning_file: lookup("TUNING_FILE").filter(|p| !p.is_empty()).map(PathBuf::from),
            brands,
        })
    }

    /// Fixed timestep in seconds.
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }
}
