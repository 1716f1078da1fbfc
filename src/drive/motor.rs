//! # Motor Interface
//!
//! Abstract per-motor commands and the actuator trait they are sent
//! through. Pin numbers and PWM frequency belong to the driver
//! implementation, never to the control loop.

use std::fmt;
use tracing::{debug, info};

use super::mixer::{WheelSpeeds, MAX_SPEED};
use crate::error::Result;

/// Which side of the robot a motor drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotorSide {
    Left,
    Right,
}

impl MotorSide {
    pub const ALL: [MotorSide; 2] = [MotorSide::Left, MotorSide::Right];
}

impl fmt::Display for MotorSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorSide::Left => f.write_str("left"),
            MotorSide::Right => f.write_str("right"),
        }
    }
}

/// H-bridge direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
    Stop,
}

/// Duty cycle and direction for one motor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorCommand {
    /// PWM duty in percent, 0 to 100
    pub duty: f32,
    pub direction: Direction,
}

impl MotorCommand {
    pub const STOP: MotorCommand = MotorCommand {
        duty: 0.0,
        direction: Direction::Stop,
    };

    /// Convert a signed speed (-100..=100) into duty and direction
    ///
    /// # Examples
    ///
    /// ```
    /// use elrs_rover::drive::motor::{Direction, MotorCommand};
    ///
    /// let cmd = MotorCommand::from_speed(-40.0);
    /// assert_eq!(cmd.direction, Direction::Reverse);
    /// assert_eq!(cmd.duty, 40.0);
    /// ```
    #[must_use]
    pub fn from_speed(speed: f32) -> Self {
        let duty = speed.abs().min(MAX_SPEED);

        if speed > 0.0 {
            Self { duty, direction: Direction::Forward }
        } else if speed < 0.0 {
            Self { duty, direction: Direction::Reverse }
        } else {
            // Also catches NaN
            Self::STOP
        }
    }

    #[must_use]
    pub fn is_stop(&self) -> bool {
        self.direction == Direction::Stop
    }
}

/// Commands for both motors in one cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveCommand {
    pub left: MotorCommand,
    pub right: MotorCommand,
}

impl DriveCommand {
    pub const STOP: DriveCommand = DriveCommand {
        left: MotorCommand::STOP,
        right: MotorCommand::STOP,
    };

    #[must_use]
    pub fn get(&self, side: MotorSide) -> MotorCommand {
        match side {
            MotorSide::Left => self.left,
            MotorSide::Right => self.right,
        }
    }
}

impl From<WheelSpeeds> for DriveCommand {
    fn from(speeds: WheelSpeeds) -> Self {
        Self {
            left: MotorCommand::from_speed(speeds.left),
            right: MotorCommand::from_speed(speeds.right),
        }
    }
}

/// Actuator interface: applies a command to one motor
#[cfg_attr(test, mockall::automock)]
pub trait MotorDriver: Send {
    /// Set duty and direction for `side`
    ///
    /// # Errors
    ///
    /// Returns error if the output hardware rejects the command
    fn set_motor(&mut self, side: MotorSide, command: MotorCommand) -> Result<()>;
}

/// Whole-robot operations built on [`MotorDriver::set_motor`]
pub trait MotorDriverExt: MotorDriver {
    /// Apply a full drive command, left then right
    fn apply(&mut self, command: &DriveCommand) -> Result<()> {
        for side in MotorSide::ALL {
            self.set_motor(side, command.get(side))?;
        }
        Ok(())
    }

    /// Stop both motors
    ///
    /// Tries every motor even if one fails; returns the first error.
    fn stop_all(&mut self) -> Result<()> {
        let mut first_error = None;
        for side in MotorSide::ALL {
            if let Err(e) = self.set_motor(side, MotorCommand::STOP) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl<T: MotorDriver + ?Sized> MotorDriverExt for T {}

/// Dry-run driver that logs commands instead of driving hardware
///
/// Only changes are logged, so a steady stick does not flood the log.
#[derive(Debug, Default)]
pub struct TracingMotorDriver {
    last: [Option<MotorCommand>; 2],
}

impl TracingMotorDriver {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(side: MotorSide) -> usize {
        match side {
            MotorSide::Left => 0,
            MotorSide::Right => 1,
        }
    }
}

impl MotorDriver for TracingMotorDriver {
    fn set_motor(&mut self, side: MotorSide, command: MotorCommand) -> Result<()> {
        let slot = &mut self.last[Self::slot(side)];
        if *slot != Some(command) {
            if command.is_stop() {
                info!("{} motor: stop", side);
            } else {
                debug!("{} motor: {:?} at {:.0}%", side, command.direction, command.duty);
            }
            *slot = Some(command);
        }
        Ok(())
    }
}
