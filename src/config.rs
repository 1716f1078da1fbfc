//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! configuration that matches the usual ELRS receiver wiring: throttle on
//! channel 3, steering on channel 1.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::crsf::protocol::{
    CRSF_CHANNEL_VALUE_1000, CRSF_CHANNEL_VALUE_2000, CRSF_CHANNEL_VALUE_MAX, CRSF_NUM_CHANNELS,
};
use crate::error::{Result, RoverError};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub channels: ChannelConfig,
    pub drive: DriveConfig,
    pub safety: SafetyConfig,
    pub motors: MotorConfig,
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path, or `"auto"` to try the default UARTs in turn
    pub port: String,
    pub baud_rate: u32,
    /// Upper bound for a single frame read
    pub timeout_ms: u64,
}

/// RC channel assignment and raw-to-normalized mapping
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChannelConfig {
    /// Zero-based channel index carrying throttle
    pub throttle: usize,
    /// Zero-based channel index carrying steering
    pub steering: usize,
    pub input_min: u16,
    pub input_max: u16,
    pub output_min: f32,
    pub output_max: f32,
}

/// Stick shaping applied after mapping
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DriveConfig {
    /// Normalized values with magnitude below this snap to zero
    pub deadzone: f32,
    pub invert_throttle: bool,
    pub invert_steering: bool,
}

/// Safety configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SafetyConfig {
    /// Link age after which both motors are forced to stop
    pub failsafe_timeout_ms: u64,
}

/// Which actuator the binary drives
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MotorBackend {
    /// H-bridge on Raspberry Pi GPIO
    Gpio,
    /// Log commands only
    DryRun,
}

/// BCM pin numbers of one H-bridge channel
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct HBridgePins {
    pub in1: u8,
    pub in2: u8,
    /// PWM enable line (ENA/ENB)
    pub enable: u8,
}

/// Motor output configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MotorConfig {
    pub driver: MotorBackend,
    pub left: HBridgePins,
    pub right: HBridgePins,
    pub pwm_frequency_hz: f64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is unset
    pub level: String,
    /// Directory for daily rolling log files; empty disables file logging
    pub log_dir: String,
    /// Period of the link status line
    pub status_interval_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            throttle: default_throttle_channel(),
            steering: default_steering_channel(),
            input_min: CRSF_CHANNEL_VALUE_1000,
            input_max: CRSF_CHANNEL_VALUE_2000,
            output_min: -100.0,
            output_max: 100.0,
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            deadzone: default_deadzone(),
            invert_throttle: false,
            invert_steering: false,
        }
    }
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            failsafe_timeout_ms: default_failsafe_timeout_ms(),
        }
    }
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            driver: MotorBackend::Gpio,
            left: HBridgePins { in1: 24, in2: 23, enable: 25 },
            right: HBridgePins { in1: 22, in2: 27, enable: 17 },
            pwm_frequency_hz: default_pwm_frequency_hz(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: String::new(),
            status_interval_ms: default_status_interval_ms(),
        }
    }
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyS0".to_string() }
fn default_baud_rate() -> u32 { 420000 }
fn default_timeout_ms() -> u64 { 50 }

fn default_throttle_channel() -> usize { 2 }
fn default_steering_channel() -> usize { 0 }

fn default_deadzone() -> f32 { 50.0 }

fn default_failsafe_timeout_ms() -> u64 { 500 }

fn default_pwm_frequency_hz() -> f64 { 1000.0 }

fn default_log_level() -> String { "info".to_string() }
fn default_status_interval_ms() -> u64 { 1000 }

/// Baud rates ELRS receivers can be flashed to
const VALID_BAUD_RATES: &[u32] = &[115200, 400000, 416666, 420000, 921600, 1870000];

/// Accepted `logging.level` values
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Highest BCM GPIO number on the 40-pin header
const MAX_BCM_PIN: u8 = 27;

/// Upper bound for software PWM on the enable lines
const MAX_PWM_FREQUENCY_HZ: f64 = 10_000.0;

/// Largest magnitude a normalized axis may take
const MAX_OUTPUT_MAGNITUDE: f32 = 100.0;

fn invalid(msg: impl std::fmt::Display) -> RoverError {
    RoverError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
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
    /// use elrs_rover::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
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
        // Serial
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !VALID_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {:?}",
                VALID_BAUD_RATES
            )));
        }

        if self.serial.timeout_ms == 0 || self.serial.timeout_ms > 1000 {
            return Err(invalid("timeout_ms must be between 1 and 1000"));
        }

        // Safety
        if self.safety.failsafe_timeout_ms == 0 || self.safety.failsafe_timeout_ms > 60000 {
            return Err(invalid("failsafe_timeout_ms must be between 1 and 60000"));
        }

        // A read that outlasts the failsafe window would delay the stop
        if self.serial.timeout_ms >= self.safety.failsafe_timeout_ms {
            return Err(invalid("timeout_ms must be less than failsafe_timeout_ms"));
        }

        // Channel indices (CRSF has 16 channels: 0-15)
        for (name, index) in [
            ("throttle", self.channels.throttle),
            ("steering", self.channels.steering),
        ] {
            if index >= CRSF_NUM_CHANNELS {
                return Err(invalid(format!(
                    "{} channel index {} is out of bounds (must be 0-15)",
                    name, index
                )));
            }
        }

        if self.channels.throttle == self.channels.steering {
            return Err(invalid("throttle and steering must use different channels"));
        }

        // Mapping ranges
        if self.channels.input_min >= self.channels.input_max {
            return Err(invalid("input_min must be less than input_max"));
        }

        if self.channels.input_max > CRSF_CHANNEL_VALUE_MAX {
            return Err(invalid("input_max must not exceed 2047"));
        }

        if !(self.channels.output_min < self.channels.output_max) {
            return Err(invalid("output_min must be less than output_max"));
        }

        if self.channels.output_min < -MAX_OUTPUT_MAGNITUDE
            || self.channels.output_max > MAX_OUTPUT_MAGNITUDE
        {
            return Err(invalid("output range must lie within -100 to 100"));
        }

        // Deadzone
        if !(0.0..MAX_OUTPUT_MAGNITUDE).contains(&self.drive.deadzone) {
            return Err(invalid("deadzone must be between 0 and 100 (exclusive)"));
        }

        // Motors
        let pins = [self.motors.left, self.motors.right]
            .into_iter()
            .flat_map(|p| [p.in1, p.in2, p.enable])
            .collect::<Vec<_>>();

        if let Some(pin) = pins.iter().find(|&&pin| pin > MAX_BCM_PIN) {
            return Err(invalid(format!(
                "motor GPIO {} is out of range (must be 0-{})",
                pin, MAX_BCM_PIN
            )));
        }

        for (i, pin) in pins.iter().enumerate() {
            if pins[i + 1..].contains(pin) {
                return Err(invalid(format!("motor GPIO {} is assigned twice", pin)));
            }
        }

        if !(self.motors.pwm_frequency_hz > 0.0
            && self.motors.pwm_frequency_hz <= MAX_PWM_FREQUENCY_HZ)
        {
            return Err(invalid("pwm_frequency_hz must be between 0 and 10000 (exclusive of 0)"));
        }

        // Logging
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "log level must be one of: {}",
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        if self.logging.status_interval_ms < 100 || self.logging.status_interval_ms > 60000 {
            return Err(invalid("status_interval_ms must be between 100 and 60000"));
        }

        Ok(())
    }
}
