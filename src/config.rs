//! # Configuration Module
//!
//! Settings for one link session: channel buffer sizes, delivery backoff,
//! accelerometer polling and logging.
//!
//! ## Features
//! - **Layered Loading**: Combines YAML file settings, environment variables (`.env`), and hardcoded defaults.
//! - **Serde Integration**: Uses `serde` for serialization/deserialization to/from YAML.
//! - **Partial Configuration**: Missing fields fall back to defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

// --- Default Value Providers ---
// These functions provide default values for Serde when a field is missing in the YAML file.

fn d_inbound() -> usize {
    2048
}
fn d_outbound() -> usize {
    512
}
fn d_depth() -> usize {
    32
}
fn d_base_delay() -> u64 {
    10
}
fn d_max_delay() -> u64 {
    5000
}
fn d_poll_interval() -> u64 {
    10
}
fn d_log_level() -> String {
    "INFO".to_string()
}

/// Buffer sizes negotiated when the channel is opened.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChannelConfig {
    /// Largest inbound message in bytes.
    #[serde(default = "d_inbound")]
    pub inbound_capacity: usize,
    /// Largest outbound message in bytes.
    #[serde(default = "d_outbound")]
    pub outbound_capacity: usize,
    /// Depth of the event and outbox queues of in-process channels.
    #[serde(default = "d_depth")]
    pub event_depth: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: d_inbound(),
            outbound_capacity: d_outbound(),
            event_depth: d_depth(),
        }
    }
}

/// Retry behaviour of the outbound delivery queue.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DeliveryConfig {
    /// Delay before the first retry, and after every successful send.
    #[serde(default = "d_base_delay")]
    pub base_delay_ms: u64,
    /// Ceiling for the doubling retry delay.
    #[serde(default = "d_max_delay")]
    pub max_delay_ms: u64,
}

impl DeliveryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms.max(self.base_delay_ms))
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: d_base_delay(),
            max_delay_ms: d_max_delay(),
        }
    }
}

/// Accelerometer sample polling.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccelConfig {
    /// Interval between attempts to deliver a peeked sample.
    #[serde(default = "d_poll_interval")]
    pub poll_interval_ms: u64,
}

impl AccelConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for AccelConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: d_poll_interval(),
        }
    }
}

/// The master configuration object of a link session.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub accel: AccelConfig,
    /// Global logging level ("DEBUG", "INFO", "WARN", "ERROR").
    #[serde(default = "d_log_level")]
    pub log_level: String,
    /// Optional path to the log file. If None, logs to stdout.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            delivery: DeliveryConfig::default(),
            accel: AccelConfig::default(),
            log_level: d_log_level(),
            log_file: None,
        }
    }
}

impl Config {
    /// Loads the configuration from a YAML file and environment variables.
    ///
    /// It first attempts to load `.env` variables, then reads the specified YAML file.
    /// `LOG_LEVEL` overrides the level found in the file. A missing or
    /// unreadable file yields the defaults.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Optional path to the YAML file. Defaults to `stagelink.yaml`.
    pub fn from_file(config_path: Option<PathBuf>) -> Self {
        let _ = dotenvy::dotenv();

        let path = config_path.unwrap_or_else(|| PathBuf::from("stagelink.yaml"));

        let mut config: Config = if path.exists() {
            let content = fs::read_to_string(&path).unwrap_or_default();
            serde_yaml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = ?path, error = %e, "Invalid config file, using defaults");
                Config::default()
            })
        } else {
            Config::default()
        };

        if let Ok(env_level) = env::var("LOG_LEVEL") {
            config.log_level = env_level;
        }

        config
    }

    /// Persists the current configuration state to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the serialization fails or if the file cannot be written.
    pub fn to_file(&self, config_path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        let yaml_content = serde_yaml::to_string(self)?;
        fs::write(config_path, yaml_content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: Config = serde_yaml::from_str("delivery:\n  base_delay_ms: 25\n").unwrap();
        assert_eq!(config.delivery.base_delay_ms, 25);
        assert_eq!(config.delivery.max_delay_ms, 5000);
        assert_eq!(config.channel.inbound_capacity, 2048);
        assert_eq!(config.channel.outbound_capacity, 512);
        assert_eq!(config.accel.poll_interval(), Duration::from_millis(10));
    }

    #[test]
    fn max_delay_never_below_base() {
        let delivery = DeliveryConfig {
            base_delay_ms: 100,
            max_delay_ms: 10,
        };
        assert_eq!(delivery.max_delay(), Duration::from_millis(100));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("link.yaml");
        let mut config = Config::default();
        config.channel.outbound_capacity = 256;
        config.to_file(path.clone()).unwrap();
        let loaded = Config::from_file(Some(path));
        assert_eq!(loaded.channel.outbound_capacity, 256);
    }
}
