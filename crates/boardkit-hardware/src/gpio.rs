//! GPIO pins and polarity-aware digital devices.
//!
//! A [`GpioPin`] claims one header pin with a fixed direction. On top of it:
//!
//! - [`DigitalOutputDevice`] turns a logical on/off into the right
//!   electrical level for its polarity. [`Led`] and [`Relay`] are the usual
//!   active-low presets.
//! - [`DigitalInputDevice`] reads a pin and reports whether it is logically
//!   on. [`Switch`] and [`Button`] are thin presets over it.
//!
//! Pins are always addressed by physical header position (1-40).
//!
//! # Example
//!
//! ```
//! use boardkit_core::Level;
//! use boardkit_hardware::TransportRegistry;
//! use boardkit_hardware::gpio::Relay;
//! use boardkit_hardware::mock::MockPlatform;
//!
//! let (platform, handle) = MockPlatform::new();
//! let registry = TransportRegistry::new(platform);
//!
//! // Relays are active-low: "on" pulls the pin low.
//! let mut relay = Relay::new(&registry, 16, false).unwrap();
//! assert_eq!(handle.output_level(16), Some(Level::High));
//!
//! relay.on().unwrap();
//! assert_eq!(handle.output_level(16), Some(Level::Low));
//! ```

use crate::error::Result;
use crate::registry::{TransportLease, TransportRegistry};
use boardkit_core::{BoardPin, Direction, Level};
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};
use tracing::warn;

/// One claimed header pin.
///
/// The pin stays claimed until the value is dropped; claiming it again in
/// the meantime fails with [`HardwareError::PinInUse`].
///
/// [`HardwareError::PinInUse`]: crate::error::HardwareError::PinInUse
#[derive(Debug)]
pub struct GpioPin {
    pin: BoardPin,
    direction: Direction,
    lease: TransportLease,
}

impl GpioPin {
    /// Claim `pin` in `direction`.
    ///
    /// Outputs receive `initial` in the same driver call that configures
    /// them.
    pub fn new(
        registry: &TransportRegistry,
        pin: BoardPin,
        direction: Direction,
        initial: Option<Level>,
    ) -> Result<Self> {
        let lease = registry.acquire_gpio()?;
        lease.registry().claim_pin(pin, direction, initial)?;
        Ok(Self {
            pin,
            direction,
            lease,
        })
    }

    pub fn pin(&self) -> BoardPin {
        self.pin
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Drive the pin. Fails on input pins.
    pub fn write(&mut self, level: Level) -> Result<()> {
        self.lease.registry().write_pin(self.pin, level)
    }

    /// Sample the pin.
    pub fn read(&self) -> Result<Level> {
        self.lease.registry().read_pin(self.pin)
    }
}

impl Drop for GpioPin {
    fn drop(&mut self) {
        self.lease.registry().unclaim_pin(self.pin);
    }
}

/// Polarity and start state of an output device.
///
/// Defaults to active-low and off: most boards sink LED and relay current
/// through the pin, so a low level turns them on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Whether "on" means a high level
    pub active_high: bool,

    /// Whether the device starts on
    pub default_on: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            active_high: false,
            default_on: false,
        }
    }
}

impl OutputConfig {
    /// Active-low, starts off.
    pub fn led() -> Self {
        Self::default()
    }

    /// Active-low, starting in `default_on`.
    pub fn relay(default_on: bool) -> Self {
        Self {
            active_high: false,
            default_on,
        }
    }

    /// Set the polarity
    pub fn active_high(mut self, active_high: bool) -> Self {
        self.active_high = active_high;
        self
    }

    /// Set the start state
    pub fn default_on(mut self, default_on: bool) -> Self {
        self.default_on = default_on;
        self
    }

    /// Electrical level for a logical state.
    pub fn level_for(&self, on: bool) -> Level {
        Level::from(on == self.active_high)
    }
}

/// Output pin with on/off semantics.
///
/// The electrical level always equals `is_on == active_high`. Dropping the
/// device turns it off before the pin is released.
#[derive(Debug)]
pub struct DigitalOutputDevice {
    pin: GpioPin,
    config: OutputConfig,
    is_on: bool,
}

impl DigitalOutputDevice {
    /// Claim header pin `pin` as an output.
    pub fn new(registry: &TransportRegistry, pin: u8, config: OutputConfig) -> Result<Self> {
        let pin = BoardPin::new(pin)?;
        let initial = config.level_for(config.default_on);
        let pin = GpioPin::new(registry, pin, Direction::Output, Some(initial))?;
        Ok(Self {
            pin,
            config,
            is_on: config.default_on,
        })
    }

    pub fn on(&mut self) -> Result<()> {
        self.set(true)
    }

    pub fn off(&mut self) -> Result<()> {
        self.set(false)
    }

    /// Flip the logical state.
    pub fn toggle(&mut self) -> Result<()> {
        self.set(!self.is_on)
    }

    fn set(&mut self, on: bool) -> Result<()> {
        self.pin.write(self.config.level_for(on))?;
        self.is_on = on;
        Ok(())
    }

    /// Logical state.
    pub fn is_on(&self) -> bool {
        self.is_on
    }

    /// Level the pin is being driven at.
    pub fn level(&self) -> Level {
        self.config.level_for(self.is_on)
    }

    pub fn active_high(&self) -> bool {
        self.config.active_high
    }

    pub fn pin(&self) -> BoardPin {
        self.pin.pin()
    }
}

impl Drop for DigitalOutputDevice {
    fn drop(&mut self) {
        if let Err(e) = self.off() {
            warn!(pin = %self.pin.pin(), "failed to turn output off on drop: {}", e);
        }
    }
}

/// Polarity of an input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Whether a high level reads as "on"
    pub active_high: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self { active_high: true }
    }
}

impl InputConfig {
    /// Set the polarity
    pub fn active_high(mut self, active_high: bool) -> Self {
        self.active_high = active_high;
        self
    }
}

/// Input pin read by polling. No debounce, no edge detection.
#[derive(Debug)]
pub struct DigitalInputDevice {
    pin: GpioPin,
    config: InputConfig,
}

impl DigitalInputDevice {
    /// Claim header pin `pin` as an input.
    pub fn new(registry: &TransportRegistry, pin: u8, config: InputConfig) -> Result<Self> {
        let pin = BoardPin::new(pin)?;
        let pin = GpioPin::new(registry, pin, Direction::Input, None)?;
        Ok(Self { pin, config })
    }

    /// Raw electrical level.
    pub fn read(&self) -> Result<Level> {
        self.pin.read()
    }

    /// Whether the input is logically on, sampled now.
    pub fn is_on(&self) -> Result<bool> {
        Ok(self.read()?.is_high() == self.config.active_high)
    }

    pub fn active_high(&self) -> bool {
        self.config.active_high
    }

    pub fn pin(&self) -> BoardPin {
        self.pin.pin()
    }
}

/// Active-low LED, off at start.
#[derive(Debug)]
pub struct Led(DigitalOutputDevice);

impl Led {
    pub fn new(registry: &TransportRegistry, pin: u8) -> Result<Self> {
        Self::with_config(registry, pin, OutputConfig::led())
    }

    /// LED with non-default wiring.
    pub fn with_config(registry: &TransportRegistry, pin: u8, config: OutputConfig) -> Result<Self> {
        DigitalOutputDevice::new(registry, pin, config).map(Self)
    }
}

impl Deref for Led {
    type Target = DigitalOutputDevice;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Led {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Relay board channel. Relay boards are always driven active-low.
#[derive(Debug)]
pub struct Relay(DigitalOutputDevice);

impl Relay {
    pub fn new(registry: &TransportRegistry, pin: u8, default_on: bool) -> Result<Self> {
        DigitalOutputDevice::new(registry, pin, OutputConfig::relay(default_on)).map(Self)
    }
}

impl Deref for Relay {
    type Target = DigitalOutputDevice;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Relay {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Two-state switch, active-high unless configured otherwise.
#[derive(Debug)]
pub struct Switch(DigitalInputDevice);

impl Switch {
    pub fn new(registry: &TransportRegistry, pin: u8) -> Result<Self> {
        Self::with_config(registry, pin, InputConfig::default())
    }

    pub fn with_config(registry: &TransportRegistry, pin: u8, config: InputConfig) -> Result<Self> {
        DigitalInputDevice::new(registry, pin, config).map(Self)
    }
}

impl Deref for Switch {
    type Target = DigitalInputDevice;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Momentary push button.
#[derive(Debug)]
pub struct Button(DigitalInputDevice);

impl Button {
    pub fn new(registry: &TransportRegistry, pin: u8) -> Result<Self> {
        Self::with_config(registry, pin, InputConfig::default())
    }

    pub fn with_config(registry: &TransportRegistry, pin: u8, config: InputConfig) -> Result<Self> {
        DigitalInputDevice::new(registry, pin, config).map(Self)
    }

    /// Whether the button is held down right now.
    pub fn is_pressed(&self) -> Result<bool> {
        self.0.is_on()
    }
}

impl Deref for Button {
    type Target = DigitalInputDevice;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HardwareError;
    use crate::mock::{DriverCall, MockPlatform, MockPlatformHandle};
    use crate::registry::TransportKey;
    use rstest::rstest;

    fn setup() -> (TransportRegistry, MockPlatformHandle) {
        let (platform, handle) = MockPlatform::new();
        (TransportRegistry::new(platform), handle)
    }

    #[rstest]
    #[case(true, true, Level::High)]
    #[case(true, false, Level::Low)]
    #[case(false, true, Level::Low)]
    #[case(false, false, Level::High)]
    fn test_initial_level(#[case] active_high: bool, #[case] default_on: bool, #[case] level: Level) {
        let (registry, handle) = setup();
        let config = OutputConfig::default()
            .active_high(active_high)
            .default_on(default_on);

        let device = DigitalOutputDevice::new(&registry, 11, config).unwrap();
        assert_eq!(device.is_on(), default_on);
        assert_eq!(device.level(), level);
        assert_eq!(handle.output_level(11), Some(level));
    }

    #[test]
    fn test_initial_level_passed_with_setup() {
        let (registry, handle) = setup();
        let _relay = Relay::new(&registry, 16, true).unwrap();

        let setup_call = DriverCall::GpioSetup {
            pin: 16,
            direction: Direction::Output,
            initial: Some(Level::Low),
        };
        assert_eq!(handle.count(|c| *c == setup_call), 1);
        assert_eq!(handle.count(|c| matches!(c, DriverCall::GpioOutput { .. })), 0);
    }

    #[test]
    fn test_double_toggle_restores_state() {
        let (registry, handle) = setup();
        let mut led = Led::new(&registry, 11).unwrap();

        led.toggle().unwrap();
        assert!(led.is_on());
        assert_eq!(handle.output_level(11), Some(Level::Low));

        led.toggle().unwrap();
        assert!(!led.is_on());
        assert_eq!(handle.output_level(11), Some(Level::High));
    }

    #[test]
    fn test_drop_turns_off_then_releases() {
        let (registry, handle) = setup();
        let mut relay = Relay::new(&registry, 16, false).unwrap();
        relay.on().unwrap();
        handle.clear_calls();

        drop(relay);
        assert_eq!(
            handle.calls(),
            vec![
                DriverCall::GpioOutput {
                    pin: 16,
                    level: Level::High
                },
                DriverCall::GpioCleanup,
            ]
        );
        assert!(!registry.is_active(TransportKey::Gpio));
    }

    #[test]
    fn test_duplicate_pin_claim_fails_and_releases() {
        let (registry, handle) = setup();
        let _led = Led::new(&registry, 11).unwrap();

        let err = Switch::new(&registry, 11).unwrap_err();
        assert!(matches!(err, HardwareError::PinInUse { .. }));
        assert_eq!(registry.users(TransportKey::Gpio), 1);
        assert_eq!(handle.gpio_cleanups(), 0);
    }

    #[test]
    fn test_pin_reusable_after_drop() {
        let (registry, _handle) = setup();
        let led = Led::new(&registry, 11).unwrap();
        drop(led);

        assert!(Button::new(&registry, 11).is_ok());
    }

    #[test]
    fn test_invalid_pin_rejected_before_acquire() {
        let (registry, handle) = setup();

        let err = Led::new(&registry, 6).unwrap_err();
        assert!(matches!(err, HardwareError::Core(_)));
        assert!(handle.calls().is_empty());
    }

    #[rstest]
    #[case(true, Level::High, true)]
    #[case(true, Level::Low, false)]
    #[case(false, Level::High, false)]
    #[case(false, Level::Low, true)]
    fn test_input_polarity(#[case] active_high: bool, #[case] level: Level, #[case] on: bool) {
        let (registry, handle) = setup();
        let config = InputConfig::default().active_high(active_high);
        let input = DigitalInputDevice::new(&registry, 13, config).unwrap();

        handle.set_input(13, level);
        assert_eq!(input.is_on().unwrap(), on);
        assert_eq!(input.read().unwrap(), level);
    }

    #[test]
    fn test_button_is_pressed_follows_pin() {
        let (registry, handle) = setup();
        let button = Button::new(&registry, 15).unwrap();

        assert!(!button.is_pressed().unwrap());
        handle.set_input(15, Level::High);
        assert!(button.is_pressed().unwrap());
    }

    #[test]
    fn test_config_presets() {
        assert_eq!(
            OutputConfig::led(),
            OutputConfig {
                active_high: false,
                default_on: false
            }
        );
        assert!(OutputConfig::relay(true).default_on);
        assert!(!OutputConfig::relay(true).active_high);
        assert!(InputConfig::default().active_high);
    }

    #[test]
    fn test_default_output_is_active_low() {
        let (registry, handle) = setup();
        assert!(!OutputConfig::default().active_high);

        let mut device = DigitalOutputDevice::new(&registry, 11, OutputConfig::default()).unwrap();
        assert_eq!(handle.output_level(11), Some(Level::High));
        device.on().unwrap();
        assert_eq!(handle.output_level(11), Some(Level::Low));
    }

    #[test]
    fn test_config_serde() {
        let json = serde_json::to_string(&OutputConfig::relay(true)).unwrap();
        assert_eq!(json, r#"{"active_high":false,"default_on":true}"#);
    }
}
