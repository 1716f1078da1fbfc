//! # Control Loop
//!
//! Single-threaded receive, map, mix and actuate loop with a link failsafe.
//!
//! Each cycle:
//! 1. Attempt to read one RC channels frame, bounded by the serial timeout
//!    and, while the link is live, by the instant it would go stale
//! 2. On a valid frame, record its arrival and compute a drive command
//! 3. Re-evaluate the failsafe
//! 4. Stop both motors while in failsafe, otherwise apply the new command
//!
//! The motors are stopped once at startup and again on every exit path:
//! shutdown, a fatal transport or actuator error, and unwinding.

pub mod failsafe;

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::crsf::decoder::{DecoderStats, FrameReader};
use crate::drive::mapper::ChannelMapper;
use crate::drive::mixer::WheelSpeeds;
use crate::drive::motor::{DriveCommand, MotorDriver, MotorDriverExt};
use crate::error::Result;
use crate::serial::port_trait::SerialPortIO;

use failsafe::{LinkState, LinkStatus, LinkTransition};

/// What one cycle did with the motors
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// A new command from a valid frame was applied
    Drive(DriveCommand),
    /// No new frame, link still fresh; motors keep their last command
    Idle,
    /// Link stale; both motors were commanded to stop
    Failsafe,
}

/// Counters kept across the life of the loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub cycles: u64,
    pub commands: u64,
    pub failsafe_cycles: u64,
    pub failsafe_entries: u64,
}

/// Periodic link report
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    /// Valid frames per second since the previous report
    pub frame_rate: f64,
    pub status: LinkStatus,
    pub link_age: Duration,
    pub decoder: DecoderStats,
}

/// Receiver-driven motor control loop
pub struct ControlLoop<P: SerialPortIO, M: MotorDriver> {
    reader: FrameReader<P>,
    motors: M,
    mapper: ChannelMapper,
    link: LinkState,
    stats: LoopStats,
    status_interval: Duration,
    last_report: Instant,
    frames_at_last_report: u64,
    halted: bool,
}

impl<P: SerialPortIO, M: MotorDriver> ControlLoop<P, M> {
    /// Build a loop over an open receiver port and motor driver
    ///
    /// The failsafe window starts now, so a receiver that never sends a
    /// valid frame trips the failsafe after one timeout.
    ///
    /// # Errors
    ///
    /// Returns error if `config` fails validation
    pub fn new(port: P, motors: M, config: &Config) -> Result<Self> {
        let mapper = ChannelMapper::from_config(config)?;
        let now = Instant::now();

        Ok(Self {
            reader: FrameReader::new(port, Duration::from_millis(config.serial.timeout_ms)),
            motors,
            mapper,
            link: LinkState::new(now, Duration::from_millis(config.safety.failsafe_timeout_ms)),
            stats: LoopStats::default(),
            status_interval: Duration::from_millis(config.logging.status_interval_ms),
            last_report: now,
            frames_at_last_report: 0,
            halted: false,
        })
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn decoder_stats(&self) -> DecoderStats {
        self.reader.stats()
    }

    pub fn link_status(&self) -> LinkStatus {
        self.link.status()
    }

    /// Stop both motors before the first cycle
    ///
    /// # Errors
    ///
    /// Returns error if the actuator rejects the stop
    pub fn start(&mut self) -> Result<()> {
        self.motors.stop_all()?;
        info!(
            "Motors stopped, waiting for receiver (failsafe after {} ms)",
            self.link.timeout().as_millis()
        );
        Ok(())
    }

    /// Run a single receive/actuate cycle
    ///
    /// # Errors
    ///
    /// Returns error on a fatal serial or actuator failure. Invalid or
    /// missing frames are not errors.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let decoded = match self.link.status() {
            // Never wait past the point the link goes stale
            LinkStatus::Running => self.reader.try_read_frame_until(self.link.stale_at()).await?,
            LinkStatus::Failsafe => self.reader.try_read_frame().await?,
        };
        let now = Instant::now();
        self.stats.cycles += 1;

        let command = decoded.map(|channels| {
            self.link.record_frame(now);
            let input = self.mapper.map(&channels);
            DriveCommand::from(WheelSpeeds::from(input))
        });

        match self.link.evaluate(now) {
            Some(LinkTransition::Lost { silence }) => {
                self.stats.failsafe_entries += 1;
                warn!(
                    "FAILSAFE: no valid frame for {} ms, stopping motors",
                    silence.as_millis()
                );
            }
            Some(LinkTransition::Recovered { outage }) => {
                info!("Link recovered after {} ms in failsafe", outage.as_millis());
            }
            None => {}
        }

        let outcome = if self.link.status() == LinkStatus::Failsafe {
            self.stats.failsafe_cycles += 1;
            self.motors.stop_all()?;
            CycleOutcome::Failsafe
        } else if let Some(command) = command {
            self.stats.commands += 1;
            self.motors.apply(&command)?;
            CycleOutcome::Drive(command)
        } else {
            CycleOutcome::Idle
        };

        if let Some(report) = self.status_report(now) {
            info!(
                "Link {:?}: {:.1} frames/s, age {} ms, {} frames, {} crc errors, {} length errors, {} skipped",
                report.status,
                report.frame_rate,
                report.link_age.as_millis(),
                report.decoder.frames,
                report.decoder.crc_errors,
                report.decoder.length_errors,
                report.decoder.skipped_frames,
            );
        }

        Ok(outcome)
    }

    /// Build a status report if the reporting interval has elapsed
    fn status_report(&mut self, now: Instant) -> Option<StatusReport> {
        let elapsed = now.saturating_duration_since(self.last_report);
        if elapsed < self.status_interval {
            return None;
        }

        let decoder = self.reader.stats();
        let frames = decoder.frames - self.frames_at_last_report;
        self.last_report = now;
        self.frames_at_last_report = decoder.frames;

        Some(StatusReport {
            frame_rate: frames as f64 / elapsed.as_secs_f64(),
            status: self.link.status(),
            link_age: self.link.age(now),
            decoder,
        })
    }

    /// Run until `shutdown` completes or a fatal error occurs
    ///
    /// The shutdown future is checked before every cycle. Whatever the exit
    /// path, both motors are commanded to stop and the receiver port is
    /// released before this returns.
    ///
    /// # Errors
    ///
    /// Returns the fatal serial or actuator error that ended the loop
    pub async fn run<F>(mut self, shutdown: F) -> Result<LoopStats>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let result = self.drive_until(shutdown).await;
        if let Err(e) = &result {
            error!("Control loop failed: {}", e);
        }

        let stats = self.stats;
        let decoder = self.reader.stats();
        self.halt();
        drop(self);

        info!(
            "Control loop finished: {} cycles, {} commands, {} failsafe entries, {} valid frames, {} crc errors",
            stats.cycles, stats.commands, stats.failsafe_entries, decoder.frames, decoder.crc_errors
        );

        result.map(|()| stats)
    }

    async fn drive_until<F>(&mut self, mut shutdown: std::pin::Pin<&mut F>) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.start()?;

        loop {
            tokio::select! {
                biased;

                () = &mut shutdown => {
                    info!("Shutdown requested");
                    return Ok(());
                }
                outcome = self.run_cycle() => {
                    let outcome = outcome?;
                    debug!("Cycle outcome: {:?}", outcome);
                }
            }
        }
    }

    /// Stop both motors, once
    ///
    /// Errors are logged rather than returned: this runs on exit paths
    /// where there is nothing left to propagate them to.
    pub fn halt(&mut self) {
        if self.halted {
            return;
        }
        self.halted = true;

        match self.motors.stop_all() {
            Ok(()) => info!("Motors stopped"),
            Err(e) => error!("Failed to stop motors: {}", e),
        }
    }
}

impl<P: SerialPortIO, M: MotorDriver> Drop for ControlLoop<P, M> {
    fn drop(&mut self) {
        self.halt();
    }
}
