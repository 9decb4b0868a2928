//! Four-digit serial seven-segment display on the SPI controller.
//!
//! The display takes ASCII characters as data. Two command bytes are
//! interpreted specially:
//!
//! ```text
//! 0x76            clear and home the cursor
//! 0x77 <flags>    decimal point / colon / apostrophe control
//! ```

use boardkit_core::constants::{
    DISPLAY_CHIP_SELECT, DISPLAY_CMD_CLEAR, DISPLAY_CMD_DECIMAL_CONTROL, DISPLAY_FLAG_COLON,
    DISPLAY_FLAG_TEMPERATURE, DISPLAY_MAX_SPEED_HZ, DISPLAY_SPI_BUS,
};
use boardkit_core::SpiSelection;
use boardkit_hardware::spi::{SendOutcome, SpiBusDevice, SpiConfig, SpiData};
use boardkit_hardware::{Result, TransportRegistry};
use chrono::{Local, NaiveTime};
use serde::{Deserialize, Serialize};
use std::ops::BitOr;
use tracing::{debug, warn};

/// Bits of the decimal control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DecimalFlags(u8);

impl DecimalFlags {
    pub const NONE: Self = Self(0x00);
    pub const DIGIT_1: Self = Self(0x01);
    pub const DIGIT_2: Self = Self(0x02);
    pub const DIGIT_3: Self = Self(0x04);
    pub const DIGIT_4: Self = Self(0x08);
    pub const COLON: Self = Self(DISPLAY_FLAG_COLON);
    pub const APOSTROPHE: Self = Self(0x20);

    /// Decimal after the second digit plus the apostrophe, for `23.5'C`.
    pub const TEMPERATURE: Self = Self(DISPLAY_FLAG_TEMPERATURE);

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for DecimalFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Display wiring and behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SevenSegmentConfig {
    pub bus: u8,
    pub chip_select: u8,
    pub max_speed_hz: u32,

    /// Blank the display when it is dropped
    pub clear_on_drop: bool,
}

impl Default for SevenSegmentConfig {
    fn default() -> Self {
        Self {
            bus: DISPLAY_SPI_BUS,
            chip_select: DISPLAY_CHIP_SELECT,
            max_speed_hz: DISPLAY_MAX_SPEED_HZ,
            clear_on_drop: true,
        }
    }
}

impl SevenSegmentConfig {
    /// Set the (bus, chip-select) pair
    pub fn selection(mut self, bus: u8, chip_select: u8) -> Self {
        self.bus = bus;
        self.chip_select = chip_select;
        self
    }

    pub fn max_speed_hz(mut self, hz: u32) -> Self {
        self.max_speed_hz = hz;
        self
    }

    pub fn clear_on_drop(mut self, clear: bool) -> Self {
        self.clear_on_drop = clear;
        self
    }

    pub fn spi(&self) -> SpiConfig {
        SpiConfig::new(self.bus, self.chip_select).max_speed_hz(self.max_speed_hz)
    }

    pub fn validate(&self) -> boardkit_core::Result<()> {
        self.spi().validate()
    }
}

/// Text shown for a temperature: one decimal, width four, the point
/// removed (the decimal flag draws it), then the unit letter.
///
/// ```
/// use boardkit_display::format_temperature;
///
/// assert_eq!(format_temperature(23.46, "C"), "235C");
/// assert_eq!(format_temperature(5.0, "F"), " 50F");
/// ```
pub fn format_temperature(temp: f64, unit: &str) -> String {
    let rounded = (temp * 10.0).round() / 10.0;
    format!("{:4.1}{}", rounded, unit).replace('.', "")
}

/// Text shown for a time of day: `HHMM`.
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H%M").to_string()
}

/// Serial seven-segment display.
///
/// # Example
/// ```
/// use boardkit_display::SevenSegmentDisplay;
/// use boardkit_hardware::TransportRegistry;
/// use boardkit_hardware::mock::MockPlatform;
///
/// let (platform, handle) = MockPlatform::new();
/// let registry = TransportRegistry::new(platform);
///
/// let mut display = SevenSegmentDisplay::new(&registry)?;
/// display.write("1234", true)?;
/// assert_eq!(
///     handle.spi_transfers(),
///     vec![(vec![0x76], Some(250_000)), (b"1234".to_vec(), Some(250_000))]
/// );
/// # Ok::<(), boardkit_hardware::HardwareError>(())
/// ```
#[derive(Debug)]
pub struct SevenSegmentDisplay {
    device: SpiBusDevice,
    clear_on_drop: bool,
}

impl SevenSegmentDisplay {
    /// Display on controller 0, chip-select 0, at 250 kHz.
    pub fn new(registry: &TransportRegistry) -> Result<Self> {
        Self::with_config(registry, SevenSegmentConfig::default())
    }

    pub fn with_config(registry: &TransportRegistry, config: SevenSegmentConfig) -> Result<Self> {
        config.validate()?;
        let device = SpiBusDevice::new(registry, config.spi())?;
        debug!(selection = %device.selection(), "Seven-segment display ready");
        Ok(Self {
            device,
            clear_on_drop: config.clear_on_drop,
        })
    }

    /// Blank all digits and home the cursor.
    pub fn clear(&mut self) -> Result<SendOutcome> {
        self.device.send_data(DISPLAY_CMD_CLEAR)
    }

    /// Send raw data, optionally clearing first.
    pub fn write(&mut self, data: impl Into<SpiData>, clear: bool) -> Result<SendOutcome> {
        if clear {
            self.clear()?;
        }
        self.device.send_data(data)
    }

    /// Set the decimal, colon and apostrophe segments.
    pub fn set_decimals(&mut self, flags: DecimalFlags) -> Result<SendOutcome> {
        self.device
            .send_data(vec![DISPLAY_CMD_DECIMAL_CONTROL, flags.bits()])
    }

    /// Show the current local time as `HH:MM`.
    pub fn display_time(&mut self) -> Result<()> {
        self.display_time_at(Local::now().time())
    }

    /// Show `time` as `HH:MM`.
    pub fn display_time_at(&mut self, time: NaiveTime) -> Result<()> {
        self.write(format_time(time), true)?;
        self.set_decimals(DecimalFlags::COLON)?;
        Ok(())
    }

    /// Show a temperature with one decimal and the unit letter, e.g. `23.5'C`.
    pub fn display_temp(&mut self, temp: f64, unit: &str) -> Result<()> {
        self.write(format_temperature(temp, unit), true)?;
        self.set_decimals(DecimalFlags::TEMPERATURE)?;
        Ok(())
    }

    pub fn selection(&self) -> SpiSelection {
        self.device.selection()
    }
}

impl Drop for SevenSegmentDisplay {
    fn drop(&mut self) {
        if self.clear_on_drop
            && let Err(e) = self.clear()
        {
            warn!(selection = %self.selection(), "Failed to clear display: {}", e);
        }
    }
}
