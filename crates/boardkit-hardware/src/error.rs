//! Error types for transport and device operations.
//!
//! Errors fall into four groups. A missing platform driver is fatal for
//! the whole process ([`HardwareError::is_fatal`]). Everything else is an
//! ordinary return value: a duplicate serial claim is not an error at all
//! (the device is built disabled), unsupported SPI data is reported as a
//! rejected send, and an empty read is an empty result.

use boardkit_core::{BoardPin, Direction, TransportKind};
use tracing::error;

/// Result type alias for hardware operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur during transport and device operations.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The platform driver for a transport could not be loaded.
    #[error("{transport} driver unavailable: you need to install {hint}")]
    TransportUnavailable {
        transport: TransportKind,
        hint: String,
    },

    /// An operation was issued on a transport nobody has acquired.
    #[error("{transport} transport is not acquired")]
    NotAcquired { transport: TransportKind },

    /// The pin is already claimed by another live device.
    #[error("{pin} is already claimed")]
    PinInUse { pin: BoardPin },

    /// The pin was set up in the other direction.
    #[error("{pin} is configured as {actual}, operation needs {expected}")]
    WrongDirection {
        pin: BoardPin,
        expected: Direction,
        actual: Direction,
    },

    /// The platform driver reported a failure.
    #[error("{transport} driver error: {message}")]
    Driver {
        transport: TransportKind,
        message: String,
    },

    /// Operation is not supported by this driver.
    #[error("Unsupported operation: {operation}")]
    Unsupported { operation: String },

    /// Validation failure from the shared vocabulary.
    #[error(transparent)]
    Core(#[from] boardkit_core::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new transport unavailable error.
    pub fn unavailable(transport: TransportKind, hint: impl Into<String>) -> Self {
        Self::TransportUnavailable {
            transport,
            hint: hint.into(),
        }
    }

    /// Create a new not acquired error.
    pub fn not_acquired(transport: TransportKind) -> Self {
        Self::NotAcquired { transport }
    }

    /// Create a new driver error from anything printable.
    pub fn driver(transport: TransportKind, message: impl ToString) -> Self {
        Self::Driver {
            transport,
            message: message.to_string(),
        }
    }

    /// Create a new unsupported operation error.
    pub fn unsupported(operation: impl Into<String>) -> Self {
        Self::Unsupported {
            operation: operation.into(),
        }
    }

    /// Whether the process cannot continue after this error.
    ///
    /// Only a missing platform driver is fatal: there is no substitute
    /// transport to fall back to.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TransportUnavailable { .. })
    }

    /// Exit the process if this error is fatal, otherwise hand it back.
    ///
    /// The fatal path logs the error, prints the install hint to stderr and
    /// exits with status 1.
    ///
    /// ```no_run
    /// use boardkit_hardware::{TransportRegistry, gpio::Led};
    ///
    /// let registry = TransportRegistry::system();
    /// let led = Led::new(&registry, 11).map_err(|e| e.abort_if_fatal());
    /// ```
    pub fn abort_if_fatal(self) -> Self {
        if self.is_fatal() {
            error!("{}", self);
            eprintln!("{}", self);
            std::process::exit(1);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_error() {
        let error = HardwareError::unavailable(TransportKind::Gpio, "the rppal GPIO driver");
        assert!(error.is_fatal());
        assert_eq!(
            error.to_string(),
            "GPIO driver unavailable: you need to install the rppal GPIO driver"
        );
    }

    #[test]
    fn test_pin_in_use_error() {
        let pin = BoardPin::new(11).unwrap();
        let error = HardwareError::PinInUse { pin };
        assert!(!error.is_fatal());
        assert_eq!(error.to_string(), "pin 11 is already claimed");
    }

    #[test]
    fn test_driver_error() {
        let error = HardwareError::driver(TransportKind::Spi, "bus closed");
        assert!(matches!(error, HardwareError::Driver { .. }));
        assert_eq!(error.to_string(), "SPI driver error: bus closed");
    }

    #[test]
    fn test_core_error_is_transparent() {
        let error: HardwareError = boardkit_core::Error::config("bad address").into();
        assert_eq!(error.to_string(), "Configuration error: bad address");
        assert!(!error.is_fatal());
    }

    #[test]
    fn test_non_fatal_errors_are_returned() {
        let error = HardwareError::not_acquired(TransportKind::I2c).abort_if_fatal();
        assert_eq!(error.to_string(), "I2C transport is not acquired");
    }
}
