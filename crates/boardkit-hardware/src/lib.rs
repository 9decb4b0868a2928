//! Shared-transport peripheral layer for single-board computers.
//!
//! This crate exposes uniform device objects over the four transports of a
//! Raspberry Pi style header: GPIO pins, the UART, I2C buses and the SPI
//! controller. Each transport is a singleton owned by a
//! [`TransportRegistry`]; devices hold reference-counted leases on it, so a
//! transport is initialized by its first user and torn down exactly when the
//! last one is dropped.
//!
//! # Devices
//!
//! | module | devices |
//! |---|---|
//! | [`gpio`] | [`GpioPin`](gpio::GpioPin), [`DigitalOutputDevice`](gpio::DigitalOutputDevice), [`DigitalInputDevice`](gpio::DigitalInputDevice), [`Led`](gpio::Led), [`Relay`](gpio::Relay), [`Switch`](gpio::Switch), [`Button`](gpio::Button) |
//! | [`serial`] | [`SerialDevice`](serial::SerialDevice) |
//! | [`i2c`] | [`I2cBusDevice`](i2c::I2cBusDevice) |
//! | [`spi`] | [`SpiBusDevice`](spi::SpiBusDevice) |
//!
//! # Platforms
//!
//! Drivers come from a [`Platform`](traits::Platform). [`mock::MockPlatform`]
//! runs everywhere and records every call; [`platform::SystemPlatform`] uses
//! the real device nodes when built with the `hardware-rpi` and
//! `hardware-serial` features.
//!
//! ```
//! use boardkit_hardware::TransportRegistry;
//! use boardkit_hardware::gpio::Led;
//! use boardkit_hardware::mock::MockPlatform;
//! use boardkit_hardware::spi::{SpiBusDevice, SpiConfig};
//!
//! let (platform, handle) = MockPlatform::new();
//! let registry = TransportRegistry::new(platform);
//!
//! let mut led = Led::new(&registry, 11)?;
//! let mut display = SpiBusDevice::new(&registry, SpiConfig::new(0, 0).max_speed_hz(250_000))?;
//!
//! led.on()?;
//! display.send_data("1234")?;
//! assert_eq!(handle.spi_transfers().len(), 1);
//! # Ok::<(), boardkit_hardware::HardwareError>(())
//! ```
//!
//! # Threading
//!
//! The registry and every device are `!Send`. Build and use them on one
//! thread.
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`][error::Result]. Only a missing
//! platform driver is fatal; see [`HardwareError::abort_if_fatal`].

pub mod error;
pub mod gpio;
pub mod i2c;
pub mod mock;
pub mod platform;
pub mod registry;
pub mod serial;
pub mod spi;
pub mod traits;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use registry::{TransportKey, TransportLease, TransportRegistry};
pub use spi::{ReselectPolicy, SendOutcome, SpiData};
