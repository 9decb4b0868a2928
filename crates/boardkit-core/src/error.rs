use thiserror::Error;

/// Validation errors shared by all boardkit crates.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid pin {pin}: {reason}")]
    InvalidPin { pin: u8, reason: String },

    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    #[error("Invalid frame: {message}")]
    InvalidFrame { message: String },

    #[error("Checksum mismatch: expected {expected:02X}, got {actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new invalid frame error.
    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::InvalidFrame {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pin_display() {
        let error = Error::InvalidPin {
            pin: 6,
            reason: "ground pin".to_string(),
        };
        assert_eq!(error.to_string(), "Invalid pin 6: ground pin");
    }

    #[test]
    fn test_checksum_mismatch_display() {
        let error = Error::ChecksumMismatch {
            expected: 0x0A,
            actual: 0xFF,
        };
        assert_eq!(error.to_string(), "Checksum mismatch: expected 0A, got FF");
    }

    #[test]
    fn test_helpers() {
        assert!(matches!(
            Error::invalid_frame("short"),
            Error::InvalidFrame { .. }
        ));
        assert_eq!(
            Error::config("baud rate must be non-zero").to_string(),
            "Configuration error: baud rate must be non-zero"
        );
    }
}
