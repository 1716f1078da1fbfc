//! # Drive Mixer
//!
//! Proportional differential mixing: steering slows the inside wheel, the
//! outside wheel keeps the throttle value.
//!
//! ```text
//! steering > 0 (right):  left = t,                      right = t * (1 - s / 100)
//! steering < 0 (left):   left = t * (1 - |s| / 100),    right = t
//! steering = 0:          left = t,                      right = t
//! ```
//!
//! Full deflection stops the inside wheel rather than reversing it, so the
//! robot pivots around that wheel instead of spinning in place.

use super::mapper::DriveInput;

/// Maximum motor speed magnitude
pub const MAX_SPEED: f32 = 100.0;

/// Per-side signed speeds, each in `-100..=100`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelSpeeds {
    pub left: f32,
    pub right: f32,
}

/// Mix throttle and steering into left/right speeds
///
/// # Examples
///
/// ```
/// use elrs_rover::drive::mixer::mix;
///
/// let speeds = mix(100.0, 100.0);
/// assert_eq!((speeds.left, speeds.right), (100.0, 0.0));
/// ```
#[must_use]
pub fn mix(throttle: f32, steering: f32) -> WheelSpeeds {
    let mut left = throttle;
    let mut right = throttle;

    if steering > 0.0 {
        right = throttle * (1.0 - steering / 100.0);
    } else if steering < 0.0 {
        left = throttle * (1.0 - steering.abs() / 100.0);
    }

    WheelSpeeds {
        left: left.clamp(-MAX_SPEED, MAX_SPEED),
        right: right.clamp(-MAX_SPEED, MAX_SPEED),
    }
}

impl From<DriveInput> for WheelSpeeds {
    fn from(input: DriveInput) -> Self {
        mix(input.throttle, input.steering)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(speeds: WheelSpeeds) -> (f32, f32) {
        (speeds.left, speeds.right)
    }

    #[test]
    fn test_straight_line_any_throttle() {
        for t in [-100.0, -73.5, -50.0, 0.0, 12.5, 50.0, 100.0] {
            assert_eq!(pair(mix(t, 0.0)), (t, t));
        }
    }

    #[test]
    fn test_full_right() {
        assert_eq!(pair(mix(100.0, 100.0)), (100.0, 0.0));
    }

    #[test]
    fn test_full_left() {
        assert_eq!(pair(mix(100.0, -100.0)), (0.0, 100.0));
    }

    #[test]
    fn test_reverse_half_right() {
        assert_eq!(pair(mix(-50.0, 50.0)), (-50.0, -25.0));
    }

    #[test]
    fn test_partial_left_turn() {
        assert_eq!(pair(mix(80.0, -25.0)), (60.0, 80.0));
    }

    #[test]
    fn test_steering_without_throttle_stays_still() {
        // Proportional model: no pivot in place
        assert_eq!(pair(mix(0.0, 100.0)), (0.0, 0.0));
        assert_eq!(pair(mix(0.0, -100.0)), (0.0, 0.0));
    }

    #[test]
    fn test_outputs_stay_in_range() {
        let mut t = -100.0;
        while t <= 100.0 {
            let mut s = -100.0;
            while s <= 100.0 {
                let speeds = mix(t, s);
                assert!((-MAX_SPEED..=MAX_SPEED).contains(&speeds.left));
                assert!((-MAX_SPEED..=MAX_SPEED).contains(&speeds.right));
                s += 12.5;
            }
            t += 12.5;
        }
    }

    #[test]
    fn test_out_of_range_inputs_clamped() {
        assert_eq!(pair(mix(150.0, 0.0)), (100.0, 100.0));
        assert_eq!(pair(mix(-150.0, 0.0)), (-100.0, -100.0));
    }

    #[test]
    fn test_from_drive_input() {
        let speeds = WheelSpeeds::from(DriveInput {
            throttle: 100.0,
            steering: -100.0,
        });
        assert_eq!(pair(speeds), (0.0, 100.0));
    }
}
