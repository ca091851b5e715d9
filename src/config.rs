//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::oem4::protocol::{MSG_BESTXYZ, MSG_RTKXYZ};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub receiver: ReceiverConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Receiver protocol and watchdog configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ReceiverConfig {
    /// Telemetry report to request (BESTXYZ or RTKXYZ)
    #[serde(default = "default_telemetry_message_id")]
    pub telemetry_message_id: u16,

    /// Reporting period in seconds (0.25 for the nominal 4 Hz)
    #[serde(default = "default_log_period_s")]
    pub log_period_s: f32,

    /// Offset from the period boundary in seconds
    #[serde(default = "default_log_offset_s")]
    pub log_offset_s: f32,

    /// Per-read timeout; bounds shutdown latency
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Data staleness threshold before the watchdog restarts logging
    #[serde(default = "default_stale_timeout_ms")]
    pub stale_timeout_ms: u64,

    /// Pause between the watchdog's stop and start commands
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,

    /// Receiver settle time before the first command at startup
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

/// Durable sample log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PersistenceConfig {
    #[serde(default = "default_persistence_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { 38400 }

fn default_telemetry_message_id() -> u16 { MSG_BESTXYZ }
fn default_log_period_s() -> f32 { 0.25 }
fn default_log_offset_s() -> f32 { 0.0 }
fn default_read_timeout_ms() -> u64 { 100 }
fn default_stale_timeout_ms() -> u64 { 10_000 }
fn default_restart_delay_ms() -> u64 { 100 }
fn default_settle_delay_ms() -> u64 { 1000 }

fn default_persistence_enabled() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            telemetry_message_id: default_telemetry_message_id(),
            log_period_s: default_log_period_s(),
            log_offset_s: default_log_offset_s(),
            read_timeout_ms: default_read_timeout_ms(),
            stale_timeout_ms: default_stale_timeout_ms(),
            restart_delay_ms: default_restart_delay_ms(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_persistence_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl ReceiverConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn stale_timeout(&self) -> Duration {
        Duration::from_millis(self.stale_timeout_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(crate::error::NovatelError::Config(
                toml::de::Error::custom("serial port cannot be empty"),
            ));
        }

        if ![9600, 19200, 38400, 57600, 115200].contains(&self.serial.baud_rate) {
            return Err(crate::error::NovatelError::Config(
                toml::de::Error::custom(
                    "baud_rate must be one of: 9600, 19200, 38400, 57600, 115200",
                ),
            ));
        }

        if ![MSG_BESTXYZ, MSG_RTKXYZ].contains(&self.receiver.telemetry_message_id) {
            return Err(crate::error::NovatelError::Config(
                toml::de::Error::custom(format!(
                    "telemetry_message_id must be {} (BESTXYZ) or {} (RTKXYZ)",
                    MSG_BESTXYZ, MSG_RTKXYZ
                )),
            ));
        }

        if self.receiver.log_period_s <= 0.0 || self.receiver.log_period_s > 60.0 {
            return Err(crate::error::NovatelError::Config(
                toml::de::Error::custom("log_period_s must be between 0 (exclusive) and 60"),
            ));
        }

        if self.receiver.log_offset_s < 0.0
            || self.receiver.log_offset_s >= self.receiver.log_period_s
        {
            return Err(crate::error::NovatelError::Config(
                toml::de::Error::custom("log_offset_s must be at least 0 and below log_period_s"),
            ));
        }

        if self.receiver.read_timeout_ms == 0 || self.receiver.read_timeout_ms > 10_000 {
            return Err(crate::error::NovatelError::Config(
                toml::de::Error::custom("read_timeout_ms must be between 1 and 10000"),
            ));
        }

        if self.receiver.stale_timeout_ms <= self.receiver.read_timeout_ms
            || self.receiver.stale_timeout_ms > 600_000
        {
            return Err(crate::error::NovatelError::Config(
                toml::de::Error::custom(
                    "stale_timeout_ms must exceed read_timeout_ms and be at most 600000",
                ),
            ));
        }

        if self.receiver.restart_delay_ms == 0 || self.receiver.restart_delay_ms > 10_000 {
            return Err(crate::error::NovatelError::Config(
                toml::de::Error::custom("restart_delay_ms must be between 1 and 10000"),
            ));
        }

        if self.receiver.settle_delay_ms > 30_000 {
            return Err(crate::error::NovatelError::Config(
                toml::de::Error::custom("settle_delay_ms must be at most 30000"),
            ));
        }

        if self.persistence.enabled && self.persistence.log_dir.is_empty() {
            return Err(crate::error::NovatelError::Config(
                toml::de::Error::custom("persistence log_dir cannot be empty when enabled"),
            ));
        }

        if self.persistence.max_records_per_file == 0 {
            return Err(crate::error::NovatelError::Config(
                toml::de::Error::custom("max_records_per_file must be greater than 0"),
            ));
        }

        if self.persistence.max_files_to_keep == 0 {
            return Err(crate::error::NovatelError::Config(
                toml::de::Error::custom("max_files_to_keep must be greater than 0"),
            ));
        }

        Ok(())
    }
}
