//! # Channel Mapper Module
//!
//! Converts raw CRSF channel values into the normalized `-100..=100` drive
//! range and shapes them with a deadzone and optional inversion.
//!
//! ## Value Ranges
//!
//! - Raw CRSF input: 172-1811 (ELRS stick travel inside the 11-bit range)
//! - Normalized output: -100 to 100
//! - Center: 992 maps to ~0
//!
//! ## Usage
//!
//! ```
//! use elrs_rover::drive::mapper::{map_channel_value, AxisShaping, MapRange};
//!
//! let range = MapRange::default();
//! let shaping = AxisShaping::new(50.0, false);
//!
//! assert_eq!(map_channel_value(1811.0, &range), 100.0);
//! assert_eq!(shaping.apply(map_channel_value(1100.0, &range)), 0.0);
//! ```

use crate::config::{ChannelConfig, Config};
use crate::crsf::protocol::{RcChannels, CRSF_CHANNEL_VALUE_1000, CRSF_CHANNEL_VALUE_2000};
use crate::error::Result;

/// Linear mapping from a raw channel range onto an output range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapRange {
    pub in_min: f32,
    pub in_max: f32,
    pub out_min: f32,
    pub out_max: f32,
}

impl Default for MapRange {
    fn default() -> Self {
        Self {
            in_min: CRSF_CHANNEL_VALUE_1000 as f32,
            in_max: CRSF_CHANNEL_VALUE_2000 as f32,
            out_min: -100.0,
            out_max: 100.0,
        }
    }
}

impl From<&ChannelConfig> for MapRange {
    fn from(config: &ChannelConfig) -> Self {
        Self {
            in_min: config.input_min as f32,
            in_max: config.input_max as f32,
            out_min: config.output_min,
            out_max: config.output_max,
        }
    }
}

/// Map a raw channel value onto `range`
///
/// The input is clamped to `[in_min, in_max]` first, so any value yields a
/// result inside `[out_min, out_max]`.
///
/// # Examples
///
/// ```
/// use elrs_rover::drive::mapper::{map_channel_value, MapRange};
///
/// let range = MapRange::default();
/// assert_eq!(map_channel_value(0.0, &range), -100.0);
/// assert_eq!(map_channel_value(2047.0, &range), 100.0);
/// ```
#[must_use]
pub fn map_channel_value(raw: f32, range: &MapRange) -> f32 {
    let clamped = raw.clamp(range.in_min, range.in_max);
    (clamped - range.in_min) * (range.out_max - range.out_min) / (range.in_max - range.in_min)
        + range.out_min
}

/// Deadzone and inversion for one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisShaping {
    /// Magnitudes strictly below this become zero
    deadzone: f32,
    invert: bool,
}

impl AxisShaping {
    #[must_use]
    pub fn new(deadzone: f32, invert: bool) -> Self {
        Self {
            deadzone: deadzone.max(0.0),
            invert,
        }
    }

    /// Apply deadzone, then inversion
    ///
    /// Values at or above the deadzone pass through unscaled.
    #[must_use]
    pub fn apply(&self, value: f32) -> f32 {
        let shaped = if value.abs() < self.deadzone { 0.0 } else { value };

        if self.invert {
            -shaped
        } else {
            shaped
        }
    }
}

/// Normalized throttle and steering for one control cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveInput {
    /// -100 (full reverse) to 100 (full forward)
    pub throttle: f32,
    /// -100 (full left) to 100 (full right)
    pub steering: f32,
}

/// Extracts throttle and steering from a channel set
#[derive(Debug, Clone)]
pub struct ChannelMapper {
    throttle_channel: usize,
    steering_channel: usize,
    range: MapRange,
    throttle: AxisShaping,
    steering: AxisShaping,
}

impl ChannelMapper {
    /// Build a mapper from configuration
    ///
    /// # Errors
    ///
    /// Returns error if `config` fails validation (channel index out of
    /// range, empty or inverted input range)
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            throttle_channel: config.channels.throttle,
            steering_channel: config.channels.steering,
            range: MapRange::from(&config.channels),
            throttle: AxisShaping::new(config.drive.deadzone, config.drive.invert_throttle),
            steering: AxisShaping::new(config.drive.deadzone, config.drive.invert_steering),
        })
    }

    /// Map the configured throttle and steering channels
    #[must_use]
    pub fn map(&self, channels: &RcChannels) -> DriveInput {
        DriveInput {
            throttle: self.map_axis(channels[self.throttle_channel], &self.throttle),
            steering: self.map_axis(channels[self.steering_channel], &self.steering),
        }
    }

    fn map_axis(&self, raw: u16, shaping: &AxisShaping) -> f32 {
        shaping.apply(map_channel_value(f32::from(raw), &self.range))
    }
}
