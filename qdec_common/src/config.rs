//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load the TOML configuration of
//! the decoder service, plus the decoder-level enums shared by every crate
//! (`Mode`, `NotifyPolicy`).
//!
//! # Usage
//!
//! ```rust,no_run
//! use qdec_common::config::{ConfigError, QdecConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = QdecConfig::load_validated(Path::new("qdec.toml"))?;
//!     println!("Encoders: {}", config.encoders.len());
//!     Ok(())
//! }
//! ```

use crate::consts::{
    DEFAULT_ENCODER_A_CHANNELS, DEFAULT_ENCODER_B_CHANNELS, DEFAULT_NOISE_FILTER_US,
    DEFAULT_QUEUE_CAPACITY, MAX_CHANNEL, MAX_ENCODERS, QDEC_SERVICE_NAME, STEPS_PER_DETENT,
};
use crate::gpio::ChannelId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, includes every accepted transition.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

fn default_service_name() -> String {
    QDEC_SERVICE_NAME.to_string()
}

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "qdec-bench-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Position reporting mode of an encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Report every quarter-step.
    Raw,
    /// Report one position per full detent click (4 quarter-steps).
    #[default]
    Detent,
}

impl Mode {
    /// Externally visible position for a quarter-step count.
    ///
    /// Detent positions truncate toward zero, so position 0 spans steps
    /// -3..=3.
    #[inline]
    pub const fn position_of(self, steps: i64) -> i64 {
        match self {
            Mode::Raw => steps,
            Mode::Detent => steps / STEPS_PER_DETENT,
        }
    }

    /// Quarter-step count that reports as `position`.
    #[inline]
    pub const fn steps_for(self, position: i64) -> i64 {
        match self {
            Mode::Raw => position,
            Mode::Detent => position.saturating_mul(STEPS_PER_DETENT),
        }
    }
}

/// How position notifications reach the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotifyPolicy {
    /// Notifier runs in the edge delivery context, under the encoder lock.
    /// Only for notifiers that never block.
    #[default]
    Inline,
    /// Positions are queued and delivered by a background thread.
    Deferred,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

/// Notification delivery settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// Delivery policy.
    #[serde(default)]
    pub policy: NotifyPolicy,

    /// Queue depth for [`NotifyPolicy::Deferred`]. Overflow drops values.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            policy: NotifyPolicy::default(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_noise_filter_us() -> u32 {
    DEFAULT_NOISE_FILTER_US
}

fn default_backend() -> String {
    "simulation".to_string()
}

/// Decoder-wide settings; apply to every encoder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DecoderConfig {
    /// Reporting mode for all encoders.
    #[serde(default)]
    pub mode: Mode,

    /// Glitch filter window in microseconds. 0 disables filtering.
    #[serde(default = "default_noise_filter_us")]
    pub noise_filter_us: u32,

    /// GPIO backend name (see the backend registry).
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Run time in seconds; 0 runs until interrupted.
    #[serde(default)]
    pub run_seconds: u64,

    /// Notification delivery.
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            noise_filter_us: default_noise_filter_us(),
            backend: default_backend(),
            run_seconds: 0,
            notify: NotifyConfig::default(),
        }
    }
}

impl DecoderConfig {
    /// Noise filter window as a `Duration`.
    pub fn noise_filter(&self) -> Duration {
        Duration::from_micros(u64::from(self.noise_filter_us))
    }
}

/// One physical encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncoderConfig {
    /// Unique encoder name (used in logs).
    pub name: String,

    /// Line of channel A.
    pub channel_a: ChannelId,

    /// Line of channel B.
    pub channel_b: ChannelId,

    /// Telemetry topic; defaults to the encoder name.
    #[serde(default)]
    pub topic: Option<String>,
}

impl EncoderConfig {
    /// Create an encoder entry with the topic defaulting to the name.
    pub fn new(name: impl Into<String>, channel_a: ChannelId, channel_b: ChannelId) -> Self {
        Self {
            name: name.into(),
            channel_a,
            channel_b,
            topic: None,
        }
    }

    /// Telemetry topic for this encoder.
    pub fn topic(&self) -> &str {
        self.topic.as_deref().unwrap_or(&self.name)
    }

    /// Validate a single entry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::ValidationError(
                "encoder name cannot be empty".to_string(),
            ));
        }
        if self.channel_a == self.channel_b {
            return Err(ConfigError::ValidationError(format!(
                "Encoder '{}': channel_a and channel_b must differ (both {})",
                self.name, self.channel_a
            )));
        }
        for channel in [self.channel_a, self.channel_b] {
            if channel > MAX_CHANNEL {
                return Err(ConfigError::ValidationError(format!(
                    "Encoder '{}': channel {} out of range (max {})",
                    self.name, channel, MAX_CHANNEL
                )));
            }
        }
        Ok(())
    }
}

fn default_encoders() -> Vec<EncoderConfig> {
    vec![
        EncoderConfig::new(
            "encoder_a",
            DEFAULT_ENCODER_A_CHANNELS.0,
            DEFAULT_ENCODER_A_CHANNELS.1,
        ),
        EncoderConfig::new(
            "encoder_b",
            DEFAULT_ENCODER_B_CHANNELS.0,
            DEFAULT_ENCODER_B_CHANNELS.1,
        ),
    ]
}

/// Main configuration loaded from `qdec.toml`.
///
/// Every section is optional; an empty file yields the two-encoder default
/// wiring (23/24 and 17/27, detent mode, 1000 µs filter).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QdecConfig {
    /// Logging and service identity.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Decoder-wide settings.
    #[serde(default)]
    pub decoder: DecoderConfig,

    /// Encoders to drive.
    #[serde(default = "default_encoders")]
    pub encoders: Vec<EncoderConfig>,
}

impl Default for QdecConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig::default(),
            decoder: DecoderConfig::default(),
            encoders: default_encoders(),
        }
    }
}

impl QdecConfig {
    /// Load and validate a configuration file.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Validation Rules
    /// 1. `shared` is valid
    /// 2. 1 <= `encoders.len()` <= MAX_ENCODERS
    /// 3. Every encoder entry is valid (name, distinct channels in range)
    /// 4. Encoder names are unique
    /// 5. No line is used by more than one encoder
    /// 6. Deferred notification needs a non-zero queue
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if self.encoders.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one encoder is required".to_string(),
            ));
        }
        if self.encoders.len() > MAX_ENCODERS {
            return Err(ConfigError::ValidationError(format!(
                "Too many encoders: {} (max {})",
                self.encoders.len(),
                MAX_ENCODERS
            )));
        }

        let mut names = HashSet::new();
        let mut channels = HashSet::new();
        for encoder in &self.encoders {
            encoder.validate()?;
            if !names.insert(encoder.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate encoder name: {}",
                    encoder.name
                )));
            }
            for channel in [encoder.channel_a, encoder.channel_b] {
                if !channels.insert(channel) {
                    return Err(ConfigError::ValidationError(format!(
                        "Channel {} is assigned to more than one encoder",
                        channel
                    )));
                }
            }
        }

        if self.decoder.notify.queue_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "queue_capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Any serde-deserializable struct can use ConfigLoader.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}
