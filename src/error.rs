//! # Error Types
//!
//! Custom error types for ELRS Rover using `thiserror`.

use thiserror::Error;

/// Main error type for ELRS Rover
#[derive(Debug, Error)]
pub enum RoverError {
    /// CRSF protocol errors
    #[error("CRSF protocol error: {0}")]
    CrsfProtocol(String),

    /// Serial transport failures (open, read)
    #[error("Serial error: {0}")]
    Serial(String),

    /// Configured receiver port could not be opened
    #[error("Serial port not found: {0}")]
    SerialPortNotFound(String),

    /// Actuator failures
    #[error("Motor driver error: {0}")]
    Motor(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Tracing subscriber could not be installed
    #[error("Logging error: {0}")]
    Logging(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ELRS Rover
pub type Result<T> = std::result::Result<T, RoverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RoverError::Serial("Failed to read receiver: broken pipe".to_string());
        assert_eq!(err.to_string(), "Serial error: Failed to read receiver: broken pipe");

        let err = RoverError::Motor("left driver stalled".to_string());
        assert_eq!(err.to_string(), "Motor driver error: left driver stalled");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err: RoverError = io.into();
        assert!(matches!(err, RoverError::Io(_)));
    }
}
