//! # ELRS Rover
//!
//! Drive a two-motor robot from an ExpressLRS receiver connected to a UART.
//!
//! ```text
//! elrs-rover [CONFIG_PATH]
//! ```
//!
//! `CONFIG_PATH` defaults to `config/default.toml`. A missing file falls
//! back to built-in defaults; an invalid one is an error.

use std::future::Future;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use elrs_rover::config::{Config, MotorBackend};
use elrs_rover::control::ControlLoop;
use elrs_rover::drive::hbridge::GpioMotorDriver;
use elrs_rover::drive::motor::{MotorDriver, TracingMotorDriver};
use elrs_rover::logging;
use elrs_rover::serial::ReceiverSerial;

/// Configuration file used when none is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config_found = Path::new(&config_path).exists();

    let config = if config_found {
        Config::load(&config_path)
            .with_context(|| format!("Failed to load configuration from {}", config_path))?
    } else {
        Config::default()
    };

    let _log_guard = logging::init(&config.logging).context("Failed to initialize logging")?;

    info!("ELRS Rover v{} starting...", env!("CARGO_PKG_VERSION"));
    if config_found {
        info!("Loaded configuration from {}", config_path);
    } else {
        warn!("{} not found, using default configuration", config_path);
    }

    let receiver = ReceiverSerial::open(&config.serial).context("Failed to open receiver")?;
    info!(
        "Receiver opened at {} ({} baud)",
        receiver.device_path(),
        config.serial.baud_rate
    );

    info!(
        "Throttle on channel {}, steering on channel {}, failsafe after {} ms",
        config.channels.throttle + 1,
        config.channels.steering + 1,
        config.safety.failsafe_timeout_ms
    );
    info!("Press Ctrl+C to exit");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match config.motors.driver {
        MotorBackend::Gpio => {
            let motors =
                GpioMotorDriver::open(&config.motors).context("Failed to open motor driver")?;
            drive(receiver, motors, &config, shutdown).await
        }
        MotorBackend::DryRun => {
            info!("Dry run: motor commands are logged, not driven");
            drive(receiver, TracingMotorDriver::new(), &config, shutdown).await
        }
    }
}

/// Run the control loop until `shutdown` resolves
async fn drive<M, F>(
    receiver: ReceiverSerial,
    motors: M,
    config: &Config,
    shutdown: F,
) -> Result<()>
where
    M: MotorDriver,
    F: Future<Output = ()>,
{
    let control = ControlLoop::new(receiver, motors, config)?;
    let stats = control.run(shutdown).await?;
    info!("Exited after {} cycles", stats.cycles);

    Ok(())
}
