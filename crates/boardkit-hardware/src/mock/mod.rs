//! Mock platform for testing and development.
//!
//! [`MockPlatform`] hands out in-memory drivers for all four transports.
//! Every driver call is recorded as a [`DriverCall`], and the paired
//! [`MockPlatformHandle`] lets a test feed input (pin levels, serial bytes,
//! I2C registers) and inspect what the devices did.
//!
//! # Examples
//!
//! ```
//! use boardkit_core::Level;
//! use boardkit_hardware::TransportRegistry;
//! use boardkit_hardware::gpio::Led;
//! use boardkit_hardware::mock::{DriverCall, MockPlatform};
//!
//! let (platform, handle) = MockPlatform::new();
//! let registry = TransportRegistry::new(platform);
//!
//! let mut led = Led::new(&registry, 11).unwrap();
//! led.on().unwrap();
//!
//! assert_eq!(handle.output_level(11), Some(Level::Low));
//! assert_eq!(
//!     handle.count(|c| matches!(c, DriverCall::GpioOutput { .. })),
//!     1
//! );
//! ```
//!
//! The handle is `Send`, so a helper thread can feed serial bytes while the
//! owner thread polls a reader.

pub mod gpio;
pub mod i2c;
pub mod serial;
pub mod spi;

pub use gpio::MockGpio;
pub use i2c::MockI2c;
pub use serial::MockSerial;
pub use spi::MockSpi;

use crate::error::{HardwareError, Result};
use crate::serial::SerialConfig;
use crate::traits::{GpioDriver, I2cDriver, Platform, SerialDriver, SpiDriver};
use boardkit_core::{Direction, Level, NumberingScheme, SpiSelection, TransportKind};
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// One call made into a mock driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    GpioSetMode(NumberingScheme),
    GpioSetup {
        pin: u8,
        direction: Direction,
        initial: Option<Level>,
    },
    GpioOutput {
        pin: u8,
        level: Level,
    },
    GpioInput {
        pin: u8,
    },
    GpioCleanup,
    SerialOpen {
        path: String,
        baud_rate: u32,
        timeout: Duration,
    },
    SerialReadline,
    SerialRead {
        size: usize,
    },
    SerialClose,
    I2cOpen {
        bus: u8,
    },
    I2cReadWord {
        bus: u8,
        address: u16,
        register: u8,
    },
    I2cReadByte {
        bus: u8,
        address: u16,
        register: u8,
    },
    SpiOpen(SpiSelection),
    SpiTransfer {
        data: Vec<u8>,
        speed_hz: Option<u32>,
    },
    SpiClose,
}

/// Register key: (bus, address, register).
type RegisterKey = (u8, u16, u8);

/// State shared by the platform, its drivers and the handle.
#[derive(Debug, Default)]
pub(crate) struct MockState {
    calls: Vec<DriverCall>,
    unavailable: BTreeSet<TransportKind>,
    failing: BTreeSet<TransportKind>,
    inputs: HashMap<u8, Level>,
    outputs: HashMap<u8, Level>,
    serial_rx: VecDeque<u8>,
    /// Bytes left in each pushed burst, oldest first
    serial_bursts: VecDeque<usize>,
    i2c_words: HashMap<RegisterKey, u16>,
    i2c_bytes: HashMap<RegisterKey, u8>,
}

impl MockState {
    pub(crate) fn record(&mut self, call: DriverCall) {
        self.calls.push(call);
    }

    /// Fail with a driver error if `kind` was marked failing.
    pub(crate) fn check(&self, kind: TransportKind) -> Result<()> {
        if self.failing.contains(&kind) {
            return Err(HardwareError::driver(kind, "injected failure"));
        }
        Ok(())
    }

    /// Take one received byte, and whether it was the last of its burst.
    pub(crate) fn pop_serial(&mut self) -> Option<(u8, bool)> {
        let byte = self.serial_rx.pop_front()?;
        let mut ends_burst = false;
        if let Some(remaining) = self.serial_bursts.front_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                self.serial_bursts.pop_front();
                ends_burst = true;
            }
        }
        Some((byte, ends_burst))
    }
}

pub(crate) type SharedState = Arc<Mutex<MockState>>;

/// In-memory platform.
#[derive(Debug, Clone)]
pub struct MockPlatform {
    state: SharedState,
}

impl MockPlatform {
    /// Create a platform and the handle that controls it.
    pub fn new() -> (Self, MockPlatformHandle) {
        let state = SharedState::default();
        let handle = MockPlatformHandle {
            state: Arc::clone(&state),
        };
        (Self { state }, handle)
    }

    fn ensure_available(&self, kind: TransportKind) -> Result<()> {
        if self.state.lock().unavailable.contains(&kind) {
            return Err(HardwareError::unavailable(
                kind,
                format!("the {} driver", kind),
            ));
        }
        Ok(())
    }
}

impl Platform for MockPlatform {
    fn gpio(&self) -> Result<Box<dyn GpioDriver>> {
        self.ensure_available(TransportKind::Gpio)?;
        Ok(Box::new(MockGpio::new(Arc::clone(&self.state))))
    }

    fn serial(&self, config: &SerialConfig) -> Result<Box<dyn SerialDriver>> {
        self.ensure_available(TransportKind::Serial)?;
        self.state.lock().record(DriverCall::SerialOpen {
            path: config.path.clone(),
            baud_rate: config.baud_rate,
            timeout: config.timeout,
        });
        Ok(Box::new(MockSerial::new(Arc::clone(&self.state))))
    }

    fn i2c(&self, bus: u8) -> Result<Box<dyn I2cDriver>> {
        self.ensure_available(TransportKind::I2c)?;
        self.state.lock().record(DriverCall::I2cOpen { bus });
        Ok(Box::new(MockI2c::new(Arc::clone(&self.state), bus)))
    }

    fn spi(&self) -> Result<Box<dyn SpiDriver>> {
        self.ensure_available(TransportKind::Spi)?;
        Ok(Box::new(MockSpi::new(Arc::clone(&self.state))))
    }
}

/// Control and inspection handle for a [`MockPlatform`].
#[derive(Debug, Clone)]
pub struct MockPlatformHandle {
    state: SharedState,
}

impl MockPlatformHandle {
    /// Every driver call so far, oldest first.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.state.lock().calls.clone()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&DriverCall) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// Number of GPIO cleanups, i.e. completed GPIO teardowns.
    pub fn gpio_cleanups(&self) -> usize {
        self.count(|c| matches!(c, DriverCall::GpioCleanup))
    }

    /// Make the platform fail to load drivers for `kind`.
    pub fn set_unavailable(&self, kind: TransportKind) {
        self.state.lock().unavailable.insert(kind);
    }

    /// Make every operation on loaded `kind` drivers fail, or stop failing.
    pub fn set_failing(&self, kind: TransportKind, failing: bool) {
        let mut state = self.state.lock();
        if failing {
            state.failing.insert(kind);
        } else {
            state.failing.remove(&kind);
        }
    }

    /// Level returned when header pin `pin` is sampled. Unset pins read low.
    pub fn set_input(&self, pin: u8, level: Level) {
        self.state.lock().inputs.insert(pin, level);
    }

    /// Level header pin `pin` is currently driven at.
    pub fn output_level(&self, pin: u8) -> Option<Level> {
        self.state.lock().outputs.get(&pin).copied()
    }

    /// Append one burst of bytes to the serial receive buffer.
    ///
    /// Each call is a separate arrival on the wire: a `readline` that finds
    /// no delimiter stops at the end of the burst, as a read timeout would.
    pub fn push_serial(&self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        let mut state = self.state.lock();
        state.serial_rx.extend(bytes.iter().copied());
        state.serial_bursts.push_back(bytes.len());
    }

    /// Bytes still waiting in the serial receive buffer.
    pub fn serial_pending(&self) -> usize {
        self.state.lock().serial_rx.len()
    }

    pub fn set_i2c_word(&self, bus: u8, address: u16, register: u8, word: u16) {
        self.state
            .lock()
            .i2c_words
            .insert((bus, address, register), word);
    }

    pub fn set_i2c_byte(&self, bus: u8, address: u16, register: u8, byte: u8) {
        self.state
            .lock()
            .i2c_bytes
            .insert((bus, address, register), byte);
    }

    /// Payload and speed of every SPI transfer so far.
    pub fn spi_transfers(&self) -> Vec<(Vec<u8>, Option<u32>)> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                DriverCall::SpiTransfer { data, speed_hz } => Some((data.clone(), *speed_hz)),
                _ => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_transport() {
        let (platform, handle) = MockPlatform::new();
        handle.set_unavailable(TransportKind::Spi);

        let err = platform.spi().err().unwrap();
        assert_eq!(
            err.to_string(),
            "SPI driver unavailable: you need to install the SPI driver"
        );
        assert!(platform.gpio().is_ok());
    }

    #[test]
    fn test_handle_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<MockPlatformHandle>();
    }

    #[test]
    fn test_clear_calls() {
        let (platform, handle) = MockPlatform::new();
        platform.i2c(1).unwrap();
        assert_eq!(handle.calls(), vec![DriverCall::I2cOpen { bus: 1 }]);

        handle.clear_calls();
        assert!(handle.calls().is_empty());
    }
}
