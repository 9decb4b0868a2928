//! Platform driver boundary.
//!
//! These traits are the only place boardkit touches silicon. A [`Platform`]
//! hands out one driver per transport; the [`TransportRegistry`] decides
//! when to create, share and tear those drivers down. Devices never call
//! the traits directly.
//!
//! Two platforms ship with the crate: [`MockPlatform`] for tests and
//! development, and [`SystemPlatform`] which wraps the real Linux drivers
//! when the `hardware-serial` / `hardware-rpi` features are enabled.
//!
//! Drivers are not required to be `Send`: the registry pins them to the
//! thread that created it.
//!
//! [`TransportRegistry`]: crate::registry::TransportRegistry
//! [`MockPlatform`]: crate::mock::MockPlatform
//! [`SystemPlatform`]: crate::platform::SystemPlatform

use crate::error::Result;
use crate::serial::SerialConfig;
use boardkit_core::{BoardPin, Direction, Level, NumberingScheme, SpiSelection};

/// Pin-level GPIO controller.
pub trait GpioDriver {
    /// Select the pin numbering scheme. Called once per controller
    /// initialization, before any pin is set up.
    fn set_mode(&mut self, scheme: NumberingScheme) -> Result<()>;

    /// Configure a pin. Outputs receive their initial level in the same
    /// call so the pin never floats at the wrong level.
    fn setup(&mut self, pin: BoardPin, direction: Direction, initial: Option<Level>) -> Result<()>;

    /// Drive an output pin.
    fn output(&mut self, pin: BoardPin, level: Level) -> Result<()>;

    /// Sample a pin.
    fn input(&mut self, pin: BoardPin) -> Result<Level>;

    /// Return every pin to its reset state.
    fn cleanup(&mut self) -> Result<()>;
}

/// Byte-oriented UART.
pub trait SerialDriver {
    /// Read up to and including the next line delimiter, or whatever
    /// arrived before the read timeout. Empty when nothing arrived.
    fn readline(&mut self) -> Result<Vec<u8>>;

    /// Read up to `size` bytes, stopping early on timeout.
    fn read(&mut self, size: usize) -> Result<Vec<u8>>;

    /// Close the port.
    fn close(&mut self) -> Result<()>;
}

/// SMBus-style register access on one I2C bus.
pub trait I2cDriver {
    fn read_word_data(&mut self, address: u16, register: u8) -> Result<u16>;

    fn read_byte_data(&mut self, address: u16, register: u8) -> Result<u8>;
}

/// Full-duplex SPI controller that can be re-pointed at another
/// (bus, chip-select) pair.
pub trait SpiDriver {
    /// Open the controller at `selection`.
    fn open(&mut self, selection: SpiSelection) -> Result<()>;

    /// Transfer `data` with chip-select held for the whole transfer and
    /// return the bytes clocked in. `speed_hz` overrides the controller
    /// default for this transfer only.
    fn xfer2(&mut self, data: &[u8], speed_hz: Option<u32>) -> Result<Vec<u8>>;

    /// Close the controller.
    fn close(&mut self) -> Result<()>;
}

/// Source of transport drivers.
///
/// Every method either returns a ready driver or fails with
/// [`HardwareError::TransportUnavailable`] when the platform cannot
/// provide that transport.
///
/// [`HardwareError::TransportUnavailable`]: crate::error::HardwareError::TransportUnavailable
pub trait Platform {
    /// Load the GPIO controller. The registry selects the numbering scheme.
    fn gpio(&self) -> Result<Box<dyn GpioDriver>>;

    /// Open the UART described by `config`.
    fn serial(&self, config: &SerialConfig) -> Result<Box<dyn SerialDriver>>;

    /// Open I2C bus `bus`.
    fn i2c(&self, bus: u8) -> Result<Box<dyn I2cDriver>>;

    /// Load an SPI controller. The registry opens it at the first
    /// requested selection.
    fn spi(&self) -> Result<Box<dyn SpiDriver>>;
}
