//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::ask::protocol::DEFAULT_MAX_PAYLOAD_LEN;
use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub writer: WriterConfig,
    #[serde(default)]
    pub reader: ReaderConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub demo: DemoConfig,
}

/// Pulse timing and frame limits shared by both ends of the link
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LinkConfig {
    #[serde(default = "default_us_per_div")]
    pub us_per_div: u64,

    #[serde(default = "default_max_payload_len")]
    pub max_payload_len: usize,
}

/// Writer configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct WriterConfig {
    #[serde(default = "default_poll_divisor")]
    pub poll_divisor: u32,
}

/// Reader configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReaderConfig {
    #[serde(default = "default_detached_validation")]
    pub detached_validation: bool,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_report_interval_ms")]
    pub report_interval_ms: u64,
}

/// Loopback demo configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DemoConfig {
    #[serde(default = "default_frames")]
    pub frames: u32,

    #[serde(default = "default_message")]
    pub message: String,

    #[serde(default = "default_inter_frame_gap_ms")]
    pub inter_frame_gap_ms: u64,
}

// Default value functions
fn default_us_per_div() -> u64 { 1000 }
fn default_max_payload_len() -> usize { DEFAULT_MAX_PAYLOAD_LEN }

fn default_poll_divisor() -> u32 { 10 }

fn default_detached_validation() -> bool { true }

fn default_telemetry_enabled() -> bool { true }
fn default_report_interval_ms() -> u64 { 5000 }

fn default_frames() -> u32 { 10 }
fn default_message() -> String { "This is a test string".to_string() }
fn default_inter_frame_gap_ms() -> u64 { 10 }

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            us_per_div: default_us_per_div(),
            max_payload_len: default_max_payload_len(),
        }
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self { poll_divisor: default_poll_divisor() }
    }
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self { detached_validation: default_detached_validation() }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            report_interval_ms: default_report_interval_ms(),
        }
    }
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            frames: default_frames(),
            message: default_message(),
            inter_frame_gap_ms: default_inter_frame_gap_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use ask_link::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.link.us_per_div == 0 || self.link.us_per_div > 1_000_000 {
            return Err(crate::error::AskLinkError::Config(
                toml::de::Error::custom("us_per_div must be between 1 and 1000000")
            ));
        }

        // The length field is a signed 32-bit count
        if self.link.max_payload_len == 0 || self.link.max_payload_len > i32::MAX as usize {
            return Err(crate::error::AskLinkError::Config(
                toml::de::Error::custom("max_payload_len must be between 1 and 2147483647")
            ));
        }

        if self.writer.poll_divisor == 0 || self.writer.poll_divisor > 1000 {
            return Err(crate::error::AskLinkError::Config(
                toml::de::Error::custom("poll_divisor must be between 1 and 1000")
            ));
        }

        if self.telemetry.report_interval_ms == 0 || self.telemetry.report_interval_ms > 600_000 {
            return Err(crate::error::AskLinkError::Config(
                toml::de::Error::custom("report_interval_ms must be between 1 and 600000")
            ));
        }

        if self.demo.message.len() > self.link.max_payload_len {
            return Err(crate::error::AskLinkError::Config(
                toml::de::Error::custom("demo message must not exceed max_payload_len")
            ));
        }

        Ok(())
    }
}
