//! Shared transport registry.
//!
//! Every physical transport is a singleton shared by any number of device
//! objects. The registry owns the drivers and a live-user count per
//! transport; devices hold a [`TransportLease`] for as long as they need the
//! transport.
//!
//! # Lifecycle
//!
//! ```text
//!  Led::new ──► acquire_gpio ──► (first user?) ──yes──► platform.gpio()
//!                    │                                   set_mode(Board)
//!                    ▼
//!              users += 1  ◄───────────────────────────────────┘
//!                    │
//!  drop(led) ──► TransportLease::drop ──► users -= 1 ──► (zero?) ──► cleanup()
//! ```
//!
//! A transport is initialized lazily by its first lease and torn down
//! exactly when the last lease is dropped. Acquiring it again later starts
//! a fresh driver.
//!
//! # Keys
//!
//! GPIO, serial and SPI have one handle each. I2C handles are keyed by bus
//! number, so devices on `/dev/i2c-0` and `/dev/i2c-1` get separate drivers.
//!
//! # Threading
//!
//! The registry is `!Send` and `!Sync`. All devices built on it live on the
//! thread that created it; there is no locking because there is no second
//! thread to lock against.

use crate::error::{HardwareError, Result};
use crate::platform::SystemPlatform;
use crate::serial::SerialConfig;
use crate::spi::ReselectPolicy;
use crate::traits::{GpioDriver, I2cDriver, Platform, SerialDriver, SpiDriver};
use boardkit_core::{BoardPin, Direction, Level, NumberingScheme, SpiSelection, TransportKind};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace, warn};

/// Identifies one shared transport handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKey {
    Gpio,
    Serial,
    I2c { bus: u8 },
    Spi,
}

impl TransportKey {
    /// Transport family of this key.
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Gpio => TransportKind::Gpio,
            Self::Serial => TransportKind::Serial,
            Self::I2c { .. } => TransportKind::I2c,
            Self::Spi => TransportKind::Spi,
        }
    }
}

impl fmt::Display for TransportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I2c { bus } => write!(f, "I2C bus {}", bus),
            other => write!(f, "{}", other.kind()),
        }
    }
}

/// A shared driver plus its live-user count.
trait SharedHandle {
    fn users_mut(&mut self) -> &mut usize;

    /// Release the driver once the last user is gone.
    fn teardown(self) -> Result<()>;
}

struct GpioHandle {
    driver: Box<dyn GpioDriver>,
    users: usize,
    pins: BTreeMap<BoardPin, Direction>,
}

impl SharedHandle for GpioHandle {
    fn users_mut(&mut self) -> &mut usize {
        &mut self.users
    }

    fn teardown(mut self) -> Result<()> {
        self.driver.cleanup()
    }
}

struct SerialHandle {
    driver: Box<dyn SerialDriver>,
    users: usize,
}

impl SharedHandle for SerialHandle {
    fn users_mut(&mut self) -> &mut usize {
        &mut self.users
    }

    fn teardown(mut self) -> Result<()> {
        self.driver.close()
    }
}

struct I2cHandle {
    driver: Box<dyn I2cDriver>,
    users: usize,
}

impl SharedHandle for I2cHandle {
    fn users_mut(&mut self) -> &mut usize {
        &mut self.users
    }

    // SMBus handles have no explicit close; dropping the driver is enough.
    fn teardown(self) -> Result<()> {
        Ok(())
    }
}

struct SpiHandle {
    driver: Box<dyn SpiDriver>,
    users: usize,

    /// `None` while a reselect has left the controller closed
    selected: Option<SpiSelection>,
}

impl SharedHandle for SpiHandle {
    fn users_mut(&mut self) -> &mut usize {
        &mut self.users
    }

    fn teardown(mut self) -> Result<()> {
        self.driver.close()
    }
}

/// Decrement a handle's user count and tear it down at zero.
///
/// Returns `None` while users remain, otherwise the teardown result.
fn release_handle<H: SharedHandle>(slot: &mut Option<H>) -> Option<Result<()>> {
    let handle = slot.as_mut()?;
    let users = handle.users_mut();
    *users = users.saturating_sub(1);
    if *users > 0 {
        return None;
    }
    slot.take().map(SharedHandle::teardown)
}

struct RegistryState {
    platform: Box<dyn Platform>,
    gpio: Option<GpioHandle>,
    serial: Option<SerialHandle>,
    i2c: BTreeMap<u8, I2cHandle>,
    spi: Option<SpiHandle>,
}

/// Table of shared transport handles.
///
/// Cloning a registry is cheap and yields another reference to the same
/// table. Devices take the registry by reference at construction and keep
/// a lease that points back into it.
///
/// # Examples
///
/// ```
/// use boardkit_hardware::{TransportKey, TransportRegistry};
/// use boardkit_hardware::gpio::{Led, Switch};
/// use boardkit_hardware::mock::MockPlatform;
///
/// let (platform, handle) = MockPlatform::new();
/// let registry = TransportRegistry::new(platform);
///
/// let led = Led::new(&registry, 11).unwrap();
/// let switch = Switch::new(&registry, 13).unwrap();
/// assert_eq!(registry.users(TransportKey::Gpio), 2);
///
/// drop(led);
/// drop(switch);
/// assert!(!registry.is_active(TransportKey::Gpio));
/// assert_eq!(handle.gpio_cleanups(), 1);
/// ```
#[derive(Clone)]
pub struct TransportRegistry {
    inner: Rc<RefCell<RegistryState>>,
}

thread_local! {
    static SYSTEM: TransportRegistry = TransportRegistry::new(SystemPlatform::default());
}

impl TransportRegistry {
    /// Create a registry that draws drivers from `platform`.
    pub fn new(platform: impl Platform + 'static) -> Self {
        Self {
            inner: Rc::new(RefCell::new(RegistryState {
                platform: Box::new(platform),
                gpio: None,
                serial: None,
                i2c: BTreeMap::new(),
                spi: None,
            })),
        }
    }

    /// The registry backed by the real system drivers.
    ///
    /// Every call on the same thread returns the same table, so devices
    /// built from separate `system()` calls still share transports. Without
    /// the `hardware-*` features each acquisition fails with
    /// [`HardwareError::TransportUnavailable`].
    pub fn system() -> Self {
        SYSTEM.with(Clone::clone)
    }

    /// Acquire the GPIO controller, initializing it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform has no GPIO driver or the driver
    /// rejects the numbering scheme.
    pub fn acquire_gpio(&self) -> Result<TransportLease> {
        {
            let mut guard = self.inner.borrow_mut();
            let state = &mut *guard;
            if let Some(handle) = state.gpio.as_mut() {
                handle.users += 1;
            } else {
                let mut driver = state.platform.gpio()?;
                driver.set_mode(NumberingScheme::Board)?;
                debug!("GPIO controller initialized with board numbering");
                state.gpio = Some(GpioHandle {
                    driver,
                    users: 1,
                    pins: BTreeMap::new(),
                });
            }
        }
        Ok(TransportLease::new(self.clone(), TransportKey::Gpio))
    }

    /// Claim the UART for a single owner.
    ///
    /// Returns `Ok(None)` without touching the port if another owner holds
    /// it. The caller decides how to degrade.
    pub fn claim_serial(&self, config: &SerialConfig) -> Result<Option<TransportLease>> {
        {
            let mut guard = self.inner.borrow_mut();
            let state = &mut *guard;
            if state.serial.is_some() {
                return Ok(None);
            }
            let driver = state.platform.serial(config)?;
            debug!(
                path = %config.path,
                baud_rate = config.baud_rate,
                "serial port opened"
            );
            state.serial = Some(SerialHandle { driver, users: 1 });
        }
        Ok(Some(TransportLease::new(self.clone(), TransportKey::Serial)))
    }

    /// Acquire I2C bus `bus`, opening it on first use.
    pub fn acquire_i2c(&self, bus: u8) -> Result<TransportLease> {
        {
            let mut guard = self.inner.borrow_mut();
            let state = &mut *guard;
            match state.i2c.entry(bus) {
                Entry::Occupied(mut entry) => entry.get_mut().users += 1,
                Entry::Vacant(entry) => {
                    let driver = state.platform.i2c(bus)?;
                    debug!(bus, "I2C bus opened");
                    entry.insert(I2cHandle { driver, users: 1 });
                }
            }
        }
        Ok(TransportLease::new(self.clone(), TransportKey::I2c { bus }))
    }

    /// Acquire the SPI controller.
    ///
    /// The first acquisition opens the controller at `selection` and records
    /// it as the current selection. Later acquisitions leave the current
    /// selection untouched; devices re-select before each transfer.
    pub fn acquire_spi(&self, selection: SpiSelection) -> Result<TransportLease> {
        {
            let mut guard = self.inner.borrow_mut();
            let state = &mut *guard;
            if let Some(handle) = state.spi.as_mut() {
                handle.users += 1;
            } else {
                let mut driver = state.platform.spi()?;
                driver.open(selection)?;
                debug!(%selection, "SPI controller opened");
                state.spi = Some(SpiHandle {
                    driver,
                    users: 1,
                    selected: Some(selection),
                });
            }
        }
        Ok(TransportLease::new(self.clone(), TransportKey::Spi))
    }

    /// Number of live leases on `key`.
    pub fn users(&self, key: TransportKey) -> usize {
        let state = self.inner.borrow();
        match key {
            TransportKey::Gpio => state.gpio.as_ref().map_or(0, |h| h.users),
            TransportKey::Serial => state.serial.as_ref().map_or(0, |h| h.users),
            TransportKey::I2c { bus } => state.i2c.get(&bus).map_or(0, |h| h.users),
            TransportKey::Spi => state.spi.as_ref().map_or(0, |h| h.users),
        }
    }

    /// Whether a driver is currently initialized for `key`.
    pub fn is_active(&self, key: TransportKey) -> bool {
        self.users(key) > 0
    }

    /// The (bus, chip-select) pair the SPI controller is currently open at.
    pub fn spi_selection(&self) -> Option<SpiSelection> {
        self.inner.borrow().spi.as_ref().and_then(|h| h.selected)
    }

    /// Pins currently claimed through the GPIO controller.
    pub fn claimed_pins(&self) -> Vec<BoardPin> {
        self.inner
            .borrow()
            .gpio
            .as_ref()
            .map(|h| h.pins.keys().copied().collect())
            .unwrap_or_default()
    }

    fn release(&self, key: TransportKey) {
        let outcome = {
            let mut guard = self.inner.borrow_mut();
            let state = &mut *guard;
            match key {
                TransportKey::Gpio => release_handle(&mut state.gpio),
                TransportKey::Serial => release_handle(&mut state.serial),
                TransportKey::Spi => release_handle(&mut state.spi),
                TransportKey::I2c { bus } => {
                    let mut slot = state.i2c.remove(&bus);
                    let outcome = release_handle(&mut slot);
                    if let Some(handle) = slot {
                        state.i2c.insert(bus, handle);
                    }
                    outcome
                }
            }
        };

        match outcome {
            None => trace!(%key, "transport lease released"),
            Some(Ok(())) => debug!(%key, "transport torn down"),
            Some(Err(e)) => warn!(%key, "transport teardown failed: {}", e),
        }
    }

    fn with_gpio<R>(&self, f: impl FnOnce(&mut GpioHandle) -> Result<R>) -> Result<R> {
        let mut state = self.inner.borrow_mut();
        let handle = state
            .gpio
            .as_mut()
            .ok_or_else(|| HardwareError::not_acquired(TransportKind::Gpio))?;
        f(handle)
    }

    fn with_serial<R>(&self, f: impl FnOnce(&mut SerialHandle) -> Result<R>) -> Result<R> {
        let mut state = self.inner.borrow_mut();
        let handle = state
            .serial
            .as_mut()
            .ok_or_else(|| HardwareError::not_acquired(TransportKind::Serial))?;
        f(handle)
    }

    fn with_i2c<R>(&self, bus: u8, f: impl FnOnce(&mut I2cHandle) -> Result<R>) -> Result<R> {
        let mut state = self.inner.borrow_mut();
        let handle = state
            .i2c
            .get_mut(&bus)
            .ok_or_else(|| HardwareError::not_acquired(TransportKind::I2c))?;
        f(handle)
    }

    fn with_spi<R>(&self, f: impl FnOnce(&mut SpiHandle) -> Result<R>) -> Result<R> {
        let mut state = self.inner.borrow_mut();
        let handle = state
            .spi
            .as_mut()
            .ok_or_else(|| HardwareError::not_acquired(TransportKind::Spi))?;
        f(handle)
    }

    pub(crate) fn claim_pin(
        &self,
        pin: BoardPin,
        direction: Direction,
        initial: Option<Level>,
    ) -> Result<()> {
        self.with_gpio(|handle| {
            if handle.pins.contains_key(&pin) {
                return Err(HardwareError::PinInUse { pin });
            }
            handle.driver.setup(pin, direction, initial)?;
            handle.pins.insert(pin, direction);
            trace!(%pin, %direction, "pin claimed");
            Ok(())
        })
    }

    pub(crate) fn unclaim_pin(&self, pin: BoardPin) {
        if let Some(handle) = self.inner.borrow_mut().gpio.as_mut() {
            handle.pins.remove(&pin);
        }
    }

    pub(crate) fn write_pin(&self, pin: BoardPin, level: Level) -> Result<()> {
        self.with_gpio(|handle| {
            match handle.pins.get(&pin) {
                Some(Direction::Output) => {}
                Some(Direction::Input) => {
                    return Err(HardwareError::WrongDirection {
                        pin,
                        expected: Direction::Output,
                        actual: Direction::Input,
                    });
                }
                None => return Err(HardwareError::not_acquired(TransportKind::Gpio)),
            }
            handle.driver.output(pin, level)
        })
    }

    pub(crate) fn read_pin(&self, pin: BoardPin) -> Result<Level> {
        self.with_gpio(|handle| handle.driver.input(pin))
    }

    pub(crate) fn serial_readline(&self) -> Result<Vec<u8>> {
        self.with_serial(|handle| handle.driver.readline())
    }

    pub(crate) fn serial_read(&self, size: usize) -> Result<Vec<u8>> {
        self.with_serial(|handle| handle.driver.read(size))
    }

    pub(crate) fn i2c_read_word(&self, bus: u8, address: u16, register: u8) -> Result<u16> {
        self.with_i2c(bus, |handle| handle.driver.read_word_data(address, register))
    }

    pub(crate) fn i2c_read_byte(&self, bus: u8, address: u16, register: u8) -> Result<u8> {
        self.with_i2c(bus, |handle| handle.driver.read_byte_data(address, register))
    }

    /// Re-point the SPI controller at `selection` if `policy` requires it.
    ///
    /// Returns whether the controller was reopened. A failed reselect
    /// leaves no current selection, so the next call always reopens.
    pub(crate) fn spi_select(&self, selection: SpiSelection, policy: ReselectPolicy) -> Result<bool> {
        self.with_spi(|handle| {
            let current = handle.selected;
            if let Some(current) = current
                && !policy.needs_reselect(current, selection)
            {
                return Ok(false);
            }
            handle.selected = None;
            handle.driver.close()?;
            handle.driver.open(selection)?;
            handle.selected = Some(selection);
            debug!(from = ?current, to = %selection, "SPI controller reselected");
            Ok(true)
        })
    }

    pub(crate) fn spi_transfer(&self, data: &[u8], speed_hz: Option<u32>) -> Result<Vec<u8>> {
        self.with_spi(|handle| {
            trace!(len = data.len(), ?speed_hz, "SPI transfer");
            handle.driver.xfer2(data, speed_hz)
        })
    }
}

impl fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        let i2c: Vec<(u8, usize)> = state.i2c.iter().map(|(bus, h)| (*bus, h.users)).collect();
        f.debug_struct("TransportRegistry")
            .field("gpio_users", &state.gpio.as_ref().map(|h| h.users))
            .field("serial_users", &state.serial.as_ref().map(|h| h.users))
            .field("i2c_users", &i2c)
            .field("spi_users", &state.spi.as_ref().map(|h| h.users))
            .field("spi_selection", &state.spi.as_ref().and_then(|h| h.selected))
            .finish()
    }
}

/// RAII lease on one shared transport.
///
/// Dropping the lease releases the transport; the last lease to go tears
/// the driver down. Each lease releases exactly once.
#[must_use = "dropping a lease releases the transport immediately"]
pub struct TransportLease {
    registry: TransportRegistry,
    key: TransportKey,
}

impl TransportLease {
    fn new(registry: TransportRegistry, key: TransportKey) -> Self {
        trace!(%key, "transport lease acquired");
        Self { registry, key }
    }

    /// Transport this lease holds.
    pub fn key(&self) -> TransportKey {
        self.key
    }

    /// Registry the lease belongs to.
    pub fn registry(&self) -> &TransportRegistry {
        &self.registry
    }
}

impl fmt::Debug for TransportLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportLease").field("key", &self.key).finish()
    }
}

impl Drop for TransportLease {
    fn drop(&mut self) {
        self.registry.release(self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{DriverCall, MockPlatform};

    fn registry() -> (TransportRegistry, crate::mock::MockPlatformHandle) {
        let (platform, handle) = MockPlatform::new();
        (TransportRegistry::new(platform), handle)
    }

    #[test]
    fn test_gpio_initialized_once_and_torn_down_at_zero() {
        let (registry, handle) = registry();

        let first = registry.acquire_gpio().unwrap();
        let second = registry.acquire_gpio().unwrap();
        assert_eq!(registry.users(TransportKey::Gpio), 2);
        assert_eq!(handle.count(|c| matches!(c, DriverCall::GpioSetMode(_))), 1);

        drop(first);
        assert_eq!(handle.gpio_cleanups(), 0);
        assert!(registry.is_active(TransportKey::Gpio));

        drop(second);
        assert_eq!(handle.gpio_cleanups(), 1);
        assert!(!registry.is_active(TransportKey::Gpio));
    }

    #[test]
    fn test_gpio_numbering_is_board() {
        let (registry, handle) = registry();
        let _lease = registry.acquire_gpio().unwrap();

        assert_eq!(
            handle.calls(),
            vec![DriverCall::GpioSetMode(NumberingScheme::Board)]
        );
    }

    #[test]
    fn test_reacquire_after_teardown_starts_fresh_driver() {
        let (registry, handle) = registry();

        drop(registry.acquire_spi(SpiSelection::new(0, 0)).unwrap());
        let _lease = registry.acquire_spi(SpiSelection::new(0, 1)).unwrap();

        assert_eq!(handle.count(|c| matches!(c, DriverCall::SpiOpen(_))), 2);
        assert_eq!(handle.count(|c| matches!(c, DriverCall::SpiClose)), 1);
        assert_eq!(registry.spi_selection(), Some(SpiSelection::new(0, 1)));
    }

    #[test]
    fn test_unavailable_platform_is_fatal() {
        let (registry, handle) = registry();
        handle.set_unavailable(TransportKind::Gpio);

        let err = registry.acquire_gpio().unwrap_err();
        assert!(err.is_fatal());
        assert!(!registry.is_active(TransportKey::Gpio));
    }

    #[test]
    fn test_second_serial_claim_is_refused() {
        let (registry, handle) = registry();
        let config = SerialConfig::default();

        let owner = registry.claim_serial(&config).unwrap();
        assert!(owner.is_some());
        assert!(registry.claim_serial(&config).unwrap().is_none());
        assert_eq!(handle.count(|c| matches!(c, DriverCall::SerialOpen { .. })), 1);

        drop(owner);
        assert_eq!(handle.count(|c| matches!(c, DriverCall::SerialClose)), 1);
    }

    #[test]
    fn test_i2c_buses_are_independent() {
        let (registry, handle) = registry();

        let bus0 = registry.acquire_i2c(0).unwrap();
        let bus1 = registry.acquire_i2c(1).unwrap();
        let bus1_again = registry.acquire_i2c(1).unwrap();

        assert_eq!(registry.users(TransportKey::I2c { bus: 0 }), 1);
        assert_eq!(registry.users(TransportKey::I2c { bus: 1 }), 2);
        assert_eq!(handle.count(|c| matches!(c, DriverCall::I2cOpen { .. })), 2);

        drop(bus1);
        drop(bus0);
        assert!(!registry.is_active(TransportKey::I2c { bus: 0 }));
        assert!(registry.is_active(TransportKey::I2c { bus: 1 }));
        drop(bus1_again);
        assert!(!registry.is_active(TransportKey::I2c { bus: 1 }));
    }

    #[test]
    fn test_operations_without_lease_fail() {
        let (registry, _handle) = registry();
        let pin = BoardPin::new(11).unwrap();

        assert!(matches!(
            registry.read_pin(pin),
            Err(HardwareError::NotAcquired { .. })
        ));
        assert!(matches!(
            registry.spi_transfer(&[1], None),
            Err(HardwareError::NotAcquired { .. })
        ));
    }

    #[test]
    fn test_duplicate_pin_claim() {
        let (registry, _handle) = registry();
        let _lease = registry.acquire_gpio().unwrap();
        let pin = BoardPin::new(11).unwrap();

        registry.claim_pin(pin, Direction::Output, Some(Level::Low)).unwrap();
        assert!(matches!(
            registry.claim_pin(pin, Direction::Input, None),
            Err(HardwareError::PinInUse { .. })
        ));

        registry.unclaim_pin(pin);
        registry.claim_pin(pin, Direction::Input, None).unwrap();
        assert_eq!(registry.claimed_pins(), vec![pin]);
    }

    #[test]
    fn test_write_to_input_pin_rejected() {
        let (registry, _handle) = registry();
        let _lease = registry.acquire_gpio().unwrap();
        let pin = BoardPin::new(13).unwrap();
        registry.claim_pin(pin, Direction::Input, None).unwrap();

        assert!(matches!(
            registry.write_pin(pin, Level::High),
            Err(HardwareError::WrongDirection { .. })
        ));
    }

    #[test]
    fn test_debug_output() {
        let (registry, _handle) = registry();
        let _lease = registry.acquire_spi(SpiSelection::new(0, 0)).unwrap();
        let debug = format!("{:?}", registry);
        assert!(debug.contains("spi_users: Some(1)"));
    }
}
