//! # Serial Communication Module
//!
//! Handles the UART link to the ELRS receiver.
//!
//! This module handles:
//! - Opening the receiver port at 420,000 baud, 8N1
//! - Bounded-timeout reads for the frame decoder
//! - Falling back across common Raspberry Pi UART paths

pub mod port_trait;

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::error::{Result, RoverError};
use port_trait::{SerialPortIO, TokioSerialPort};

/// CRSF baud rate for ELRS receivers (420,000 baud)
pub const CRSF_BAUD_RATE: u32 = 420_000;

/// Port name that selects auto-detection over `DEFAULT_DEVICE_PATHS`
pub const AUTO_DETECT_PORT: &str = "auto";

/// Default receiver UART paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyS0",   // Pi 3/4/Zero W mini UART with console disabled
    "/dev/ttyAMA0", // PL011 UART on older boards
];

/// ELRS receiver serial port
///
/// Owns the open UART handle. Dropping it releases the device.
pub struct ReceiverSerial {
    port: TokioSerialPort,
    device_path: String,
}

impl std::fmt::Debug for ReceiverSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl ReceiverSerial {
    /// Open the receiver port described by `config`
    ///
    /// A port of `"auto"` tries the default Raspberry Pi UART paths in order.
    ///
    /// # Errors
    ///
    /// Returns error if no candidate port could be opened
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use elrs_rover::config::SerialConfig;
    /// use elrs_rover::serial::ReceiverSerial;
    ///
    /// fn main() -> anyhow::Result<()> {
    ///     let serial = ReceiverSerial::open(&SerialConfig::default())?;
    ///     println!("Receiver on {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(config: &SerialConfig) -> Result<Self> {
        if config.port == AUTO_DETECT_PORT {
            Self::open_with_paths(DEFAULT_DEVICE_PATHS, config.baud_rate)
        } else {
            Self::open_with_paths(&[config.port.as_str()], config.baud_rate)
        }
    }

    /// Open the first port in `paths` that accepts the CRSF settings
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyS0"])
    /// * `baud_rate` - Line rate, normally [`CRSF_BAUD_RATE`]
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened ELRS receiver at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        port: TokioSerialPort::new(port),
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(RoverError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with CRSF settings (8N1, no flow control)
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| RoverError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Path of the opened device (e.g. "/dev/ttyS0")
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[async_trait]
impl SerialPortIO for ReceiverSerial {
    async fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        self.port.read_timeout(buf, timeout).await
    }
}
