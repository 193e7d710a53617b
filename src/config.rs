//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::dshot::DshotRate;
use crate::error::Result;
use crate::motor::Pacing;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub gpio: GpioConfig,

    #[serde(default)]
    pub dshot: DshotConfig,

    #[serde(default)]
    pub arming: ArmingConfig,

    #[serde(default)]
    pub safety: SafetyConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// GPIO line configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GpioConfig {
    /// BCM line number wired to the ESC signal input
    #[serde(default = "default_gpio_line")]
    pub line: u8,
}

/// DShot protocol configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DshotConfig {
    /// Speed class key: 150, 300 or 600. 300 is the most reliable with
    /// integer-microsecond waveform timing.
    #[serde(default = "default_dshot_rate")]
    pub rate: u16,

    #[serde(default)]
    pub telemetry: bool,
}

/// Arming window configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ArmingConfig {
    #[serde(default = "default_arm_duration_ms")]
    pub duration_ms: u64,

    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

/// Safety configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SafetyConfig {
    /// Prompt for propeller removal before touching the hardware
    #[serde(default = "default_require_confirmation")]
    pub require_confirmation: bool,

    #[serde(default = "default_shutdown_repeats")]
    pub shutdown_repeats: u32,
}

/// Interactive session configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// Interval between automatic re-sends of the last throttle
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Refresh frames between status log lines
    #[serde(default = "default_status_log_every")]
    pub status_log_every: u64,

    /// Throttle step applied per tick by the ramp command
    #[serde(default = "default_ramp_step")]
    pub ramp_step: f64,
}

// Default value functions
fn default_gpio_line() -> u8 { 18 }

fn default_dshot_rate() -> u16 { 300 }

fn default_arm_duration_ms() -> u64 { 2000 }
fn default_frame_interval_ms() -> u64 { 10 }

fn default_require_confirmation() -> bool { true }
fn default_shutdown_repeats() -> u32 { 10 }

fn default_refresh_interval_ms() -> u64 { 20 }
fn default_status_log_every() -> u64 { 500 }
fn default_ramp_step() -> f64 { 0.01 }

impl Default for GpioConfig {
    fn default() -> Self {
        Self { line: default_gpio_line() }
    }
}

impl Default for DshotConfig {
    fn default() -> Self {
        Self { rate: default_dshot_rate(), telemetry: false }
    }
}

impl Default for ArmingConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_arm_duration_ms(),
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            require_confirmation: default_require_confirmation(),
            shutdown_repeats: default_shutdown_repeats(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            status_log_every: default_status_log_every(),
            ramp_step: default_ramp_step(),
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
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Arming/shutdown pacing for the motor driver
    pub fn pacing(&self) -> Pacing {
        Pacing {
            arm_duration: Duration::from_millis(self.arming.duration_ms),
            frame_interval: Duration::from_millis(self.arming.frame_interval_ms),
            shutdown_repeats: self.safety.shutdown_repeats,
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // The Pi header exposes BCM lines 0-27
        if self.gpio.line > 27 {
            return Err(crate::error::EscBridgeError::Config(
                toml::de::Error::custom("gpio line must be between 0 and 27")
            ));
        }

        // Reject unsupported speed classes before any hardware is touched
        DshotRate::from_key(self.dshot.rate)?;

        if self.arming.duration_ms < 100 || self.arming.duration_ms > 10000 {
            return Err(crate::error::EscBridgeError::Config(
                toml::de::Error::custom("arming duration_ms must be between 100 and 10000")
            ));
        }

        if self.arming.frame_interval_ms == 0 || self.arming.frame_interval_ms > 100 {
            return Err(crate::error::EscBridgeError::Config(
                toml::de::Error::custom("arming frame_interval_ms must be between 1 and 100")
            ));
        }

        if self.safety.shutdown_repeats == 0 || self.safety.shutdown_repeats > 100 {
            return Err(crate::error::EscBridgeError::Config(
                toml::de::Error::custom("shutdown_repeats must be between 1 and 100")
            ));
        }

        if self.session.refresh_interval_ms < 5 || self.session.refresh_interval_ms > 1000 {
            return Err(crate::error::EscBridgeError::Config(
                toml::de::Error::custom("refresh_interval_ms must be between 5 and 1000")
            ));
        }

        if self.session.status_log_every == 0 {
            return Err(crate::error::EscBridgeError::Config(
                toml::de::Error::custom("status_log_every must be greater than 0")
            ));
        }

        if self.session.ramp_step <= 0.0 || self.session.ramp_step > 0.1 {
            return Err(crate::error::EscBridgeError::Config(
                toml::de::Error::custom("ramp_step must be between 0.0 (exclusive) and 0.1")
            ));
        }

        Ok(())
    }
}
