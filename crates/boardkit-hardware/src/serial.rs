//! UART device with single-owner semantics.
//!
//! The board has one UART and only one device may own it at a time. The
//! first [`SerialDevice`] opens the port and becomes its enabled owner. Any
//! device built while the port is open is constructed *disabled*: it logs a
//! warning and every read returns empty immediately. A disabled device
//! stays disabled for its whole lifetime, even after the owner is dropped.
//!
//! # Example
//!
//! ```
//! use boardkit_hardware::TransportRegistry;
//! use boardkit_hardware::mock::MockPlatform;
//! use boardkit_hardware::serial::{SerialConfig, SerialDevice};
//!
//! let (platform, handle) = MockPlatform::new();
//! let registry = TransportRegistry::new(platform);
//!
//! let mut owner = SerialDevice::new(&registry, SerialConfig::default().baud_rate(9600)).unwrap();
//! let mut second = SerialDevice::new(&registry, SerialConfig::default()).unwrap();
//! assert!(owner.is_enabled());
//! assert!(!second.is_enabled());
//!
//! handle.push_serial(b"hello\n");
//! assert!(second.readline().unwrap().is_empty());
//! assert_eq!(owner.readline().unwrap(), b"hello\n");
//! ```

use crate::error::Result;
use crate::registry::{TransportLease, TransportRegistry};
use boardkit_core::constants::{DEFAULT_SERIAL_PATH, DEFAULT_SERIAL_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{trace, warn};

/// UART settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Device node of the UART
    pub path: String,

    /// Line speed in baud
    pub baud_rate: u32,

    /// Read timeout; a read returns whatever arrived when it elapses
    pub timeout: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_SERIAL_PATH.to_string(),
            baud_rate: 9600,
            timeout: Duration::from_millis(DEFAULT_SERIAL_TIMEOUT_MS),
        }
    }
}

impl SerialConfig {
    /// Default port at `baud_rate`.
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Default::default()
        }
    }

    /// Set the device node
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the line speed
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the read timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check the settings before the port is opened.
    pub fn validate(&self) -> boardkit_core::Result<()> {
        if self.path.is_empty() {
            return Err(boardkit_core::Error::config("serial path must not be empty"));
        }
        if self.baud_rate == 0 {
            return Err(boardkit_core::Error::config("baud rate must be non-zero"));
        }
        Ok(())
    }
}

/// One logical user of the UART.
#[derive(Debug)]
pub struct SerialDevice {
    config: SerialConfig,
    lease: Option<TransportLease>,
}

impl SerialDevice {
    /// Claim the UART.
    ///
    /// A second claim while the port is open is not an error: the device is
    /// returned disabled.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or when the UART driver cannot be
    /// loaded (fatal, see [`HardwareError::is_fatal`]).
    ///
    /// [`HardwareError::is_fatal`]: crate::error::HardwareError::is_fatal
    pub fn new(registry: &TransportRegistry, config: SerialConfig) -> Result<Self> {
        config.validate()?;
        let lease = registry.claim_serial(&config)?;
        if lease.is_none() {
            warn!(
                "Another serial device exists. Only one serial device may be instantiated at a time."
            );
        }
        Ok(Self { config, lease })
    }

    /// Whether this device owns the port.
    pub fn is_enabled(&self) -> bool {
        self.lease.is_some()
    }

    /// Settings the device was built with.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Read one line including its delimiter.
    ///
    /// Empty when nothing arrived before the timeout, or when the device is
    /// disabled.
    pub fn readline(&mut self) -> Result<Vec<u8>> {
        let Some(lease) = &self.lease else {
            return Ok(Vec::new());
        };
        let line = lease.registry().serial_readline()?;
        trace!(len = line.len(), "serial readline");
        Ok(line)
    }

    /// Read up to `size` bytes. Empty when disabled.
    pub fn read(&mut self, size: usize) -> Result<Vec<u8>> {
        let Some(lease) = &self.lease else {
            return Ok(Vec::new());
        };
        let bytes = lease.registry().serial_read(size)?;
        trace!(requested = size, len = bytes.len(), "serial read");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{DriverCall, MockPlatform};
    use crate::registry::TransportKey;

    #[test]
    fn test_config_defaults() {
        let config = SerialConfig::default();
        assert_eq!(config.path, "/dev/ttyAMA0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.timeout, Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder_and_validation() {
        let config = SerialConfig::new(115_200)
            .path("/dev/ttyUSB0")
            .timeout(Duration::from_millis(250));
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.path, "/dev/ttyUSB0");
        assert!(config.validate().is_ok());

        assert!(SerialConfig::new(0).validate().is_err());
        assert!(SerialConfig::default().path("").validate().is_err());
    }

    #[test]
    fn test_config_serde() {
        let config = SerialConfig::new(19_200);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: SerialConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_config_does_not_open_port() {
        let (platform, handle) = MockPlatform::new();
        let registry = TransportRegistry::new(platform);

        assert!(SerialDevice::new(&registry, SerialConfig::new(0)).is_err());
        assert!(handle.calls().is_empty());
    }

    #[test]
    fn test_owner_opens_with_config() {
        let (platform, handle) = MockPlatform::new();
        let registry = TransportRegistry::new(platform);

        let _device = SerialDevice::new(&registry, SerialConfig::new(9600)).unwrap();
        assert_eq!(
            handle.calls(),
            vec![DriverCall::SerialOpen {
                path: "/dev/ttyAMA0".to_string(),
                baud_rate: 9600,
                timeout: Duration::from_millis(100),
            }]
        );
    }

    #[test]
    fn test_disabled_device_ignores_wire_traffic() {
        let (platform, handle) = MockPlatform::new();
        let registry = TransportRegistry::new(platform);

        let _owner = SerialDevice::new(&registry, SerialConfig::default()).unwrap();
        let mut second = SerialDevice::new(&registry, SerialConfig::default()).unwrap();
        handle.push_serial(b"\x02AB12345678\n\x03");

        assert!(!second.is_enabled());
        assert!(second.readline().unwrap().is_empty());
        assert!(second.read(1).unwrap().is_empty());
        assert_eq!(handle.serial_pending(), 13);
    }

    #[test]
    fn test_disabled_drop_keeps_port_open() {
        let (platform, handle) = MockPlatform::new();
        let registry = TransportRegistry::new(platform);

        let owner = SerialDevice::new(&registry, SerialConfig::default()).unwrap();
        let second = SerialDevice::new(&registry, SerialConfig::default()).unwrap();

        drop(second);
        assert!(registry.is_active(TransportKey::Serial));
        assert_eq!(handle.count(|c| matches!(c, DriverCall::SerialClose)), 0);

        drop(owner);
        assert!(!registry.is_active(TransportKey::Serial));
        assert_eq!(handle.count(|c| matches!(c, DriverCall::SerialClose)), 1);
    }

    #[test]
    fn test_port_reopens_after_owner_dropped() {
        let (platform, _handle) = MockPlatform::new();
        let registry = TransportRegistry::new(platform);

        let owner = SerialDevice::new(&registry, SerialConfig::default()).unwrap();
        let disabled = SerialDevice::new(&registry, SerialConfig::default()).unwrap();
        drop(owner);

        let fresh = SerialDevice::new(&registry, SerialConfig::default()).unwrap();
        assert!(fresh.is_enabled());
        assert!(!disabled.is_enabled());
    }

    #[test]
    fn test_read_passes_through() {
        let (platform, handle) = MockPlatform::new();
        let registry = TransportRegistry::new(platform);
        let mut device = SerialDevice::new(&registry, SerialConfig::default()).unwrap();

        handle.push_serial(b"line one\nrest");
        assert_eq!(device.readline().unwrap(), b"line one\n");
        assert_eq!(device.read(2).unwrap(), b"re");
        assert_eq!(device.read(10).unwrap(), b"st");
        assert!(device.readline().unwrap().is_empty());
    }

    #[test]
    fn test_undelimited_line_ends_at_burst() {
        let (platform, handle) = MockPlatform::new();
        let registry = TransportRegistry::new(platform);
        let mut device = SerialDevice::new(&registry, SerialConfig::default()).unwrap();

        handle.push_serial(b"\x02AB12345678\x03");
        handle.push_serial(b"\x02CD12345678\x03");
        assert_eq!(device.readline().unwrap(), b"\x02AB12345678\x03");
        assert_eq!(handle.serial_pending(), 12);
        assert_eq!(device.readline().unwrap(), b"\x02CD12345678\x03");
        assert_eq!(handle.serial_pending(), 0);
    }
}
