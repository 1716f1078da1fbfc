//! # H-Bridge Motor Driver
//!
//! Drives two DC motors through a dual H-bridge (L298N style) wired to
//! Raspberry Pi GPIO:
//!
//! ```text
//! IN1/IN3  IN2/IN4  motor
//!  high     low     forward
//!  low      high    reverse
//!  low      low     stop (coast)
//! ENA/ENB  software PWM, duty = speed
//! ```
//!
//! Pin access sits behind [`OutputLine`] so the bridge logic runs against
//! recorded lines in tests and against `rppal` pins on the robot.

use rppal::gpio::{Gpio, OutputPin};
use tracing::{info, warn};

use super::motor::{Direction, MotorCommand, MotorDriver, MotorSide};
use crate::config::{HBridgePins, MotorConfig};
use crate::error::{Result, RoverError};

/// One digital output as the H-bridge uses it
pub trait OutputLine: Send {
    fn set_high(&mut self);

    fn set_low(&mut self);

    /// Run PWM at `frequency_hz` with `duty` in `0.0..=1.0`
    ///
    /// # Errors
    ///
    /// Returns error if the PWM could not be started or updated
    fn set_pwm(&mut self, frequency_hz: f64, duty: f64) -> Result<()>;

    /// Stop PWM, leaving the line at its last static level
    ///
    /// # Errors
    ///
    /// Returns error if the PWM could not be stopped
    fn clear_pwm(&mut self) -> Result<()>;
}

impl OutputLine for OutputPin {
    fn set_high(&mut self) {
        OutputPin::set_high(self);
    }

    fn set_low(&mut self) {
        OutputPin::set_low(self);
    }

    fn set_pwm(&mut self, frequency_hz: f64, duty: f64) -> Result<()> {
        let pin = self.pin();
        self.set_pwm_frequency(frequency_hz, duty)
            .map_err(|e| RoverError::Motor(format!("PWM on GPIO {} failed: {}", pin, e)))
    }

    fn clear_pwm(&mut self) -> Result<()> {
        let pin = self.pin();
        OutputPin::clear_pwm(self)
            .map_err(|e| RoverError::Motor(format!("Stopping PWM on GPIO {} failed: {}", pin, e)))
    }
}

/// Direction pair plus enable line for one motor
pub struct HBridgeChannel<L: OutputLine> {
    in1: L,
    in2: L,
    enable: L,
}

impl<L: OutputLine> HBridgeChannel<L> {
    pub fn new(in1: L, in2: L, enable: L) -> Self {
        Self { in1, in2, enable }
    }

    fn drive(&mut self, command: MotorCommand, frequency_hz: f64) -> Result<()> {
        match command.direction {
            Direction::Forward => {
                self.in1.set_high();
                self.in2.set_low();
            }
            Direction::Reverse => {
                self.in1.set_low();
                self.in2.set_high();
            }
            Direction::Stop => {
                self.in1.set_low();
                self.in2.set_low();
            }
        }

        if command.is_stop() || command.duty <= 0.0 {
            self.enable.clear_pwm()?;
            self.enable.set_low();
            Ok(())
        } else {
            self.enable.set_pwm(frequency_hz, f64::from(command.duty) / 100.0)
        }
    }

    /// All lines low, PWM off
    fn release(&mut self) -> Result<()> {
        self.in1.set_low();
        self.in2.set_low();
        let cleared = self.enable.clear_pwm();
        self.enable.set_low();
        cleared
    }
}

/// Two-motor H-bridge driver
///
/// Dropping the driver stops both motors and returns every line to low.
pub struct HBridgeDriver<L: OutputLine> {
    left: HBridgeChannel<L>,
    right: HBridgeChannel<L>,
    pwm_frequency_hz: f64,
}

/// H-bridge on Raspberry Pi GPIO
pub type GpioMotorDriver = HBridgeDriver<OutputPin>;

impl<L: OutputLine> HBridgeDriver<L> {
    pub fn new(left: HBridgeChannel<L>, right: HBridgeChannel<L>, pwm_frequency_hz: f64) -> Self {
        Self {
            left,
            right,
            pwm_frequency_hz,
        }
    }

    fn channel(&mut self, side: MotorSide) -> &mut HBridgeChannel<L> {
        match side {
            MotorSide::Left => &mut self.left,
            MotorSide::Right => &mut self.right,
        }
    }
}

impl GpioMotorDriver {
    /// Claim the configured BCM pins as outputs, all starting low
    ///
    /// # Errors
    ///
    /// Returns error if the GPIO peripheral is unavailable or a pin is
    /// already in use
    pub fn open(config: &MotorConfig) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| RoverError::Motor(format!("GPIO unavailable: {}", e)))?;

        let output = |pin: u8| -> Result<OutputPin> {
            gpio.get(pin)
                .map(|p| p.into_output_low())
                .map_err(|e| RoverError::Motor(format!("Failed to claim GPIO {}: {}", pin, e)))
        };
        let channel = |pins: &HBridgePins| -> Result<HBridgeChannel<OutputPin>> {
            Ok(HBridgeChannel::new(output(pins.in1)?, output(pins.in2)?, output(pins.enable)?))
        };

        let driver = Self::new(
            channel(&config.left)?,
            channel(&config.right)?,
            config.pwm_frequency_hz,
        );

        info!(
            "H-bridge ready: left {:?}, right {:?}, PWM {} Hz",
            config.left, config.right, config.pwm_frequency_hz
        );
        Ok(driver)
    }
}

impl<L: OutputLine> MotorDriver for HBridgeDriver<L> {
    fn set_motor(&mut self, side: MotorSide, command: MotorCommand) -> Result<()> {
        let frequency_hz = self.pwm_frequency_hz;
        self.channel(side).drive(command, frequency_hz)
    }
}

impl<L: OutputLine> Drop for HBridgeDriver<L> {
    fn drop(&mut self) {
        for side in MotorSide::ALL {
            if let Err(e) = self.channel(side).release() {
                warn!("Failed to release {} motor: {}", side, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::motor::{DriveCommand, MotorDriverExt};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, Copy, Default, PartialEq)]
    struct LineState {
        high: bool,
        pwm: Option<(f64, f64)>,
    }

    /// Output line that records its level and PWM setting
    #[derive(Clone, Default)]
    struct RecordingLine {
        state: Arc<Mutex<LineState>>,
        fail_pwm: bool,
    }

    impl RecordingLine {
        fn state(&self) -> LineState {
            *self.state.lock().unwrap()
        }
    }

    impl OutputLine for RecordingLine {
        fn set_high(&mut self) {
            self.state.lock().unwrap().high = true;
        }

        fn set_low(&mut self) {
            self.state.lock().unwrap().high = false;
        }

        fn set_pwm(&mut self, frequency_hz: f64, duty: f64) -> Result<()> {
            if self.fail_pwm {
                return Err(RoverError::Motor("pwm thread died".to_string()));
            }
            self.state.lock().unwrap().pwm = Some((frequency_hz, duty));
            Ok(())
        }

        fn clear_pwm(&mut self) -> Result<()> {
            self.state.lock().unwrap().pwm = None;
            Ok(())
        }
    }

    struct Lines {
        left: [RecordingLine; 3],
        right: [RecordingLine; 3],
    }

    impl Lines {
        fn all(&self) -> impl Iterator<Item = LineState> + '_ {
            self.left.iter().chain(self.right.iter()).map(RecordingLine::state)
        }
    }

    fn driver() -> (HBridgeDriver<RecordingLine>, Lines) {
        let lines = Lines {
            left: Default::default(),
            right: Default::default(),
        };
        let channel = |l: &[RecordingLine; 3]| {
            HBridgeChannel::new(l[0].clone(), l[1].clone(), l[2].clone())
        };
        let driver = HBridgeDriver::new(channel(&lines.left), channel(&lines.right), 1000.0);
        (driver, lines)
    }

    const LOW: LineState = LineState { high: false, pwm: None };
    const HIGH: LineState = LineState { high: true, pwm: None };

    #[test]
    fn test_forward_sets_direction_and_duty() {
        let (mut driver, lines) = driver();

        driver.set_motor(MotorSide::Left, MotorCommand::from_speed(40.0)).unwrap();

        assert_eq!(lines.left[0].state(), HIGH);
        assert_eq!(lines.left[1].state(), LOW);
        assert_eq!(lines.left[2].state().pwm, Some((1000.0, 0.4)));
        // Other side untouched
        assert!(lines.right.iter().all(|l| l.state() == LOW));
    }

    #[test]
    fn test_reverse_swaps_direction_pins() {
        let (mut driver, lines) = driver();

        driver.set_motor(MotorSide::Right, MotorCommand::from_speed(-100.0)).unwrap();

        assert_eq!(lines.right[0].state(), LOW);
        assert_eq!(lines.right[1].state(), HIGH);
        assert_eq!(lines.right[2].state().pwm, Some((1000.0, 1.0)));
    }

    #[test]
    fn test_stop_drops_all_lines() {
        let (mut driver, lines) = driver();

        driver
            .apply(&DriveCommand {
                left: MotorCommand::from_speed(80.0),
                right: MotorCommand::from_speed(-30.0),
            })
            .unwrap();
        driver.stop_all().unwrap();

        assert!(lines.all().all(|state| state == LOW));
    }

    #[test]
    fn test_drop_releases_lines() {
        let (mut driver, lines) = driver();

        driver.set_motor(MotorSide::Left, MotorCommand::from_speed(60.0)).unwrap();
        driver.set_motor(MotorSide::Right, MotorCommand::from_speed(60.0)).unwrap();
        drop(driver);

        assert!(lines.all().all(|state| state == LOW));
    }

    #[test]
    fn test_pwm_failure_is_motor_error() {
        let enable = RecordingLine {
            fail_pwm: true,
            ..Default::default()
        };
        let channel = HBridgeChannel::new(RecordingLine::default(), RecordingLine::default(), enable);
        let other = HBridgeChannel::new(
            RecordingLine::default(),
            RecordingLine::default(),
            RecordingLine::default(),
        );
        let mut driver = HBridgeDriver::new(channel, other, 1000.0);

        match driver.set_motor(MotorSide::Left, MotorCommand::from_speed(50.0)) {
            Err(RoverError::Motor(msg)) => assert!(msg.contains("pwm")),
            other => panic!("Expected Motor error, got: {:?}", other),
        }
        // Stopping does not need PWM
        assert!(driver.stop_all().is_ok());
    }

    #[test]
    #[ignore] // Requires Raspberry Pi GPIO
    fn test_open_gpio_driver() {
        let driver = GpioMotorDriver::open(&MotorConfig::default());
        assert!(driver.is_ok(), "GPIO driver failed to open: {:?}", driver.err());
    }
}
