//! Run configuration
//!
//! One immutable [`RunConfig`] record is built at startup and threaded into
//! the orchestrator, which hands each role the parameters it needs at spawn
//! time. There is no process-wide mutable configuration: a role's view is
//! fixed for its whole lifetime.
//!
//! ## Loading order
//!
//! 1. Explicit path (`--config PATH`)
//! 2. `GNCSIM_CONFIG` environment variable (path to a TOML file)
//! 3. `gncsim.toml` in the current working directory
//! 4. Built-in defaults
//!
//! Every field has a default, so a partial TOML file only overrides what it
//! names.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Environment variable pointing at a TOML config file.
pub const CONFIG_ENV_VAR: &str = "GNCSIM_CONFIG";

/// Config file searched for in the working directory.
pub const CONFIG_FILE_NAME: &str = "gncsim.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Number of sensor instances per class (before TMR tripling).
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SensorCounts {
    pub imu: usize,
    pub gnss: usize,
    pub star_tracker: usize,
}

impl Default for SensorCounts {
    fn default() -> Self {
        Self {
            imu: 1,
            gnss: 1,
            star_tracker: 1,
        }
    }
}

impl SensorCounts {
    pub fn total(&self) -> usize {
        self.imu + self.gnss + self.star_tracker
    }
}

/// Static per-run parameters, bound before any role starts and immutable
/// thereafter.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Run three replicas per sensor class, adjudicated by majority vote.
    pub tmr_enabled: bool,
    /// Have replicas 0 and 1 of each class produce deliberately faulty
    /// readings (stuck-at faults).
    pub inject_faults: bool,
    /// Sensor population per class. Tripled at spawn time under TMR.
    pub sensors: SensorCounts,
    /// Actuator population. The default matches the controller round size
    /// so one full control cycle drains every command.
    pub actuators: usize,
    /// Bounded capacity of every channel, in messages.
    pub channel_capacity: usize,
    /// Upper bound on the simulated acquisition/actuation latency, in
    /// milliseconds. Each one-shot role sleeps a random interval below it.
    pub max_latency_ms: u64,
    /// Grace period the controller waits after observing termination, so
    /// in-flight sends settle before it exits.
    pub controller_grace_ms: u64,
    /// Namespace component of channel identity derivation. Runs with
    /// different namespaces never rendezvous on each other's channels.
    pub namespace: String,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tmr_enabled: false,
            inject_faults: false,
            sensors: SensorCounts::default(),
            actuators: crate::roles::ROUND_SIZE,
            channel_capacity: crate::channel::DEFAULT_CHANNEL_CAPACITY,
            max_latency_ms: 100,
            controller_grace_ms: 500,
            namespace: "gncsim".to_string(),
        }
    }
}

impl RunConfig {
    /// Load configuration following the documented precedence order.
    ///
    /// A missing file at the env-var or cwd locations falls through to
    /// defaults; an explicit path that cannot be read is an error.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return Self::from_file(Path::new(&path));
            }
        }
        let cwd_file = Path::new(CONFIG_FILE_NAME);
        if cwd_file.exists() {
            return Self::from_file(cwd_file);
        }
        info!("no config file found, using built-in defaults");
        Ok(Self::default())
    }

    /// Parse a TOML config file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: RunConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "loaded run configuration");
        Ok(config)
    }

    /// Effective sensor count for one class, accounting for TMR tripling.
    pub fn effective_sensors(&self, base: usize) -> usize {
        if self.tmr_enabled {
            base * 3
        } else {
            base
        }
    }

    /// Number of voters to run: one per class under TMR, none otherwise.
    pub fn voter_count(&self) -> usize {
        if self.tmr_enabled {
            crate::types::SensorClass::ALL.len()
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_keep_one_cycle_consistent() {
        let config = RunConfig::default();
        // One reading per class per round, one command per reading: the
        // actuator population must drain exactly one controller round.
        assert_eq!(config.sensors.total(), crate::roles::ROUND_SIZE);
        assert_eq!(config.actuators, crate::roles::ROUND_SIZE);
        assert!(!config.tmr_enabled);
        assert_eq!(config.voter_count(), 0);
    }

    #[test]
    fn tmr_triples_sensors_and_adds_voters() {
        let config = RunConfig {
            tmr_enabled: true,
            ..RunConfig::default()
        };
        assert_eq!(config.effective_sensors(1), 3);
        assert_eq!(config.effective_sensors(2), 6);
        assert_eq!(config.voter_count(), 3);
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(
            file,
            "tmr_enabled = true\nmax_latency_ms = 0\n\n[sensors]\nimu = 2"
        )
        .expect("write");

        let config = RunConfig::from_file(file.path()).expect("parse");
        assert!(config.tmr_enabled);
        assert_eq!(config.max_latency_ms, 0);
        assert_eq!(config.sensors.imu, 2);
        // Unnamed fields keep their defaults.
        assert_eq!(config.sensors.gnss, 1);
        assert_eq!(config.controller_grace_ms, 500);
        assert!(!config.inject_faults);
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "tmr_enabled = \"definitely\"").expect("write");
        assert!(matches!(
            RunConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_explicit_file_is_an_io_error() {
        assert!(matches!(
            RunConfig::from_file(Path::new("/nonexistent/gncsim.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
