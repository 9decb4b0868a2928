//! I2C register access for one slave device.
//!
//! Each [`I2cBusDevice`] talks to one fixed slave address and shares the
//! bus handle with every other device on the same bus number.

use crate::error::Result;
use crate::registry::{TransportLease, TransportRegistry};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Lowest non-reserved 7-bit address.
const MIN_ADDRESS: u16 = 0x03;
/// Highest non-reserved 7-bit address.
const MAX_ADDRESS: u16 = 0x77;

/// Bus number and slave address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct I2cConfig {
    /// Bus number, as in `/dev/i2c-N`
    pub bus: u8,

    /// 7-bit slave address
    pub address: u16,
}

impl I2cConfig {
    pub fn new(bus: u8, address: u16) -> Self {
        Self { bus, address }
    }

    /// Set the bus number
    pub fn bus(mut self, bus: u8) -> Self {
        self.bus = bus;
        self
    }

    /// Set the slave address
    pub fn address(mut self, address: u16) -> Self {
        self.address = address;
        self
    }

    /// Reject reserved and 10-bit addresses.
    pub fn validate(&self) -> boardkit_core::Result<()> {
        if !(MIN_ADDRESS..=MAX_ADDRESS).contains(&self.address) {
            return Err(boardkit_core::Error::config(format!(
                "I2C address 0x{:02X} outside 0x{:02X}..=0x{:02X}",
                self.address, MIN_ADDRESS, MAX_ADDRESS
            )));
        }
        Ok(())
    }
}

/// A slave device on a shared I2C bus.
#[derive(Debug)]
pub struct I2cBusDevice {
    config: I2cConfig,
    lease: TransportLease,
}

impl I2cBusDevice {
    /// Open (or share) the bus and bind to the configured address.
    pub fn new(registry: &TransportRegistry, config: I2cConfig) -> Result<Self> {
        config.validate()?;
        let lease = registry.acquire_i2c(config.bus)?;
        Ok(Self { config, lease })
    }

    /// Read a 16-bit register as the bus returns it (low byte first).
    pub fn read_word(&mut self, register: u8) -> Result<u16> {
        let word = self
            .lease
            .registry()
            .i2c_read_word(self.config.bus, self.config.address, register)?;
        trace!(address = self.config.address, register, word, "I2C read word");
        Ok(word)
    }

    /// Read an 8-bit register.
    pub fn read_byte(&mut self, register: u8) -> Result<u8> {
        self.lease
            .registry()
            .i2c_read_byte(self.config.bus, self.config.address, register)
    }

    pub fn bus(&self) -> u8 {
        self.config.bus
    }

    pub fn address(&self) -> u16 {
        self.config.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{DriverCall, MockPlatform};
    use crate::registry::TransportKey;
    use rstest::rstest;

    #[rstest]
    #[case(0x03, true)]
    #[case(0x48, true)]
    #[case(0x77, true)]
    #[case(0x00, false)]
    #[case(0x02, false)]
    #[case(0x78, false)]
    #[case(0x1FF, false)]
    fn test_address_validation(#[case] address: u16, #[case] valid: bool) {
        assert_eq!(I2cConfig::new(1, address).validate().is_ok(), valid);
    }

    #[test]
    fn test_reads_use_fixed_address() {
        let (platform, handle) = MockPlatform::new();
        let registry = TransportRegistry::new(platform);
        handle.set_i2c_word(1, 0x48, 0x00, 0x04B0);
        handle.set_i2c_byte(1, 0x48, 0x01, 0x60);

        let mut device = I2cBusDevice::new(&registry, I2cConfig::new(1, 0x48)).unwrap();
        assert_eq!(device.read_word(0x00).unwrap(), 0x04B0);
        assert_eq!(device.read_byte(0x01).unwrap(), 0x60);
        assert_eq!(
            handle.calls(),
            vec![
                DriverCall::I2cOpen { bus: 1 },
                DriverCall::I2cReadWord {
                    bus: 1,
                    address: 0x48,
                    register: 0
                },
                DriverCall::I2cReadByte {
                    bus: 1,
                    address: 0x48,
                    register: 1
                },
            ]
        );
    }

    #[test]
    fn test_devices_share_bus() {
        let (platform, handle) = MockPlatform::new();
        let registry = TransportRegistry::new(platform);

        let first = I2cBusDevice::new(&registry, I2cConfig::new(1, 0x48)).unwrap();
        let second = I2cBusDevice::new(&registry, I2cConfig::new(1, 0x49)).unwrap();
        assert_eq!(registry.users(TransportKey::I2c { bus: 1 }), 2);
        assert_eq!(handle.count(|c| matches!(c, DriverCall::I2cOpen { .. })), 1);

        drop(first);
        drop(second);
        assert!(!registry.is_active(TransportKey::I2c { bus: 1 }));
    }

    #[test]
    fn test_invalid_address_does_not_open_bus() {
        let (platform, handle) = MockPlatform::new();
        let registry = TransportRegistry::new(platform);

        assert!(I2cBusDevice::new(&registry, I2cConfig::new(1, 0x80)).is_err());
        assert!(handle.calls().is_empty());
    }
}
