//! Trait abstraction for serial port operations to enable testing

use async_trait::async_trait;
use std::io;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

/// Trait for serial port I/O operations
#[async_trait]
pub trait SerialPortIO: Send {
    /// Read up to `buf.len()` bytes, giving up once `timeout` has elapsed.
    ///
    /// Returns the number of bytes actually read (`0..=buf.len()`). A short
    /// count means the timeout expired; only unrecoverable port failures are
    /// returned as errors.
    async fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;
}

/// Wrapper around tokio_serial::SerialStream that implements SerialPortIO
pub struct TokioSerialPort {
    port: tokio_serial::SerialStream,
}

impl TokioSerialPort {
    pub fn new(port: tokio_serial::SerialStream) -> Self {
        Self { port }
    }
}

/// Error kinds that only end the current read early
fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        use tokio::io::AsyncReadExt;

        let deadline = Instant::now() + timeout;
        let mut filled = 0;

        while filled < buf.len() {
            match timeout_at(deadline, self.port.read(&mut buf[filled..])).await {
                Ok(Ok(0)) => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "serial device closed",
                    ));
                }
                Ok(Ok(n)) => filled += n,
                Ok(Err(e)) if is_transient(e.kind()) => break,
                Ok(Err(e)) => return Err(e),
                Err(_elapsed) => break,
            }
        }

        Ok(filled)
    }
}
