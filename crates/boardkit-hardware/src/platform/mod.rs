//! Real system drivers.
//!
//! [`SystemPlatform`] wires the registry to Linux device nodes. Which
//! transports work depends on the enabled cargo features:
//!
//! | feature | transports |
//! |---|---|
//! | `hardware-rpi` | GPIO, I2C, SPI (via `rppal`) |
//! | `hardware-serial` | UART (via `serialport`) |
//!
//! A transport whose feature is disabled fails every acquisition with
//! [`HardwareError::TransportUnavailable`], which is fatal.
//!
//! [`HardwareError::TransportUnavailable`]: crate::error::HardwareError::TransportUnavailable

#[cfg(feature = "hardware-rpi")]
mod rpi;
#[cfg(feature = "hardware-serial")]
mod uart;

#[cfg(not(all(feature = "hardware-rpi", feature = "hardware-serial")))]
use crate::error::HardwareError;
use crate::error::Result;
use crate::serial::SerialConfig;
use crate::traits::{GpioDriver, I2cDriver, Platform, SerialDriver, SpiDriver};
#[cfg(feature = "hardware-rpi")]
use tracing::debug;

#[cfg(not(feature = "hardware-rpi"))]
const RPI_HINT: &str = "the rppal driver (rebuild boardkit-hardware with the `hardware-rpi` feature)";

#[cfg(not(feature = "hardware-serial"))]
const SERIAL_HINT: &str =
    "the serialport driver (rebuild boardkit-hardware with the `hardware-serial` feature)";

/// Platform backed by the host's device nodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPlatform;

impl Platform for SystemPlatform {
    #[cfg(feature = "hardware-rpi")]
    fn gpio(&self) -> Result<Box<dyn GpioDriver>> {
        debug!("loading rppal GPIO driver");
        Ok(Box::new(rpi::RppalGpio::open()?))
    }

    #[cfg(not(feature = "hardware-rpi"))]
    fn gpio(&self) -> Result<Box<dyn GpioDriver>> {
        Err(HardwareError::unavailable(boardkit_core::TransportKind::Gpio, RPI_HINT))
    }

    #[cfg(feature = "hardware-serial")]
    fn serial(&self, config: &SerialConfig) -> Result<Box<dyn SerialDriver>> {
        Ok(Box::new(uart::SerialPortDriver::open(config)?))
    }

    #[cfg(not(feature = "hardware-serial"))]
    fn serial(&self, _config: &SerialConfig) -> Result<Box<dyn SerialDriver>> {
        Err(HardwareError::unavailable(boardkit_core::TransportKind::Serial, SERIAL_HINT))
    }

    #[cfg(feature = "hardware-rpi")]
    fn i2c(&self, bus: u8) -> Result<Box<dyn I2cDriver>> {
        Ok(Box::new(rpi::RppalI2c::open(bus)?))
    }

    #[cfg(not(feature = "hardware-rpi"))]
    fn i2c(&self, _bus: u8) -> Result<Box<dyn I2cDriver>> {
        Err(HardwareError::unavailable(boardkit_core::TransportKind::I2c, RPI_HINT))
    }

    #[cfg(feature = "hardware-rpi")]
    fn spi(&self) -> Result<Box<dyn SpiDriver>> {
        Ok(Box::new(rpi::RppalSpi::default()))
    }

    #[cfg(not(feature = "hardware-rpi"))]
    fn spi(&self) -> Result<Box<dyn SpiDriver>> {
        Err(HardwareError::unavailable(boardkit_core::TransportKind::Spi, RPI_HINT))
    }
}
