//! Temperature decoding shared by all temperature sensors.

use boardkit_core::constants::TMP102_CELSIUS_PER_LSB;
use boardkit_hardware::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimal digits an `f64` can hold.
const MAX_ROUNDING_DIGITS: u32 = f64::DIGITS;

/// Convert Celsius to Fahrenheit.
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 1.80 + 32.00
}

/// Round to `digits` decimal places, halves away from zero.
///
/// Past the precision of an `f64` rounding cannot change the value, so it
/// is returned unchanged.
///
/// ```
/// use boardkit_sensors::round_to;
///
/// assert_eq!(round_to(176.0625, 2), 176.06);
/// assert_eq!(round_to(-0.25, 1), -0.3);
/// assert_eq!(round_to(21.5, 0), 22.0);
/// ```
pub fn round_to(value: f64, digits: u32) -> f64 {
    if digits > MAX_ROUNDING_DIGITS {
        return value;
    }
    let scale = 10f64.powi(digits as i32);
    let scaled = value * scale;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / scale
}

fn maybe_round(value: f64, digits: Option<u32>) -> f64 {
    match digits {
        Some(digits) => round_to(value, digits),
        None => value,
    }
}

/// Temperature scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemperatureUnit {
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Single-letter symbol, as shown on a display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "C",
            Self::Fahrenheit => "F",
        }
    }
}

impl fmt::Display for TemperatureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Raw temperature register word as returned by an SMBus word read.
///
/// SMBus delivers the low register byte first, so the sensor's MSB ends up
/// in bits 0-7 and the upper nibble of its LSB in bits 12-15:
///
/// ```text
/// word:    LLLL xxxx MMMM MMMM      (L = LSB high nibble, M = MSB)
/// counts:  MMMM MMMM LLLL           ((w & 0x00FF) << 4) | ((w & 0xFF00) >> 12)
/// ```
///
/// [`celsius`](Self::celsius) applies exactly that formula and reads the
/// 12 bits as unsigned. [`celsius_signed`](Self::celsius_signed) treats
/// them as two's complement for sub-zero readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemperatureReading {
    raw: u16,
}

impl TemperatureReading {
    pub fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> u16 {
        self.raw
    }

    /// 12-bit conversion result.
    pub fn counts(&self) -> u16 {
        ((self.raw & 0x00FF) << 4) | ((self.raw & 0xFF00) >> 12)
    }

    /// Degrees Celsius, unsigned decode.
    pub fn celsius(&self) -> f64 {
        f64::from(self.counts()) * TMP102_CELSIUS_PER_LSB
    }

    /// Degrees Celsius with the 12 bits read as two's complement.
    pub fn celsius_signed(&self) -> f64 {
        let counts = i32::from(self.counts());
        let signed = if counts & 0x800 != 0 { counts - 0x1000 } else { counts };
        f64::from(signed) * TMP102_CELSIUS_PER_LSB
    }

    /// Degrees Fahrenheit from the unsigned decode.
    pub fn fahrenheit(&self) -> f64 {
        celsius_to_fahrenheit(self.celsius())
    }

    /// Value in `unit`, rounded to `digits` places when given.
    pub fn value(&self, unit: TemperatureUnit, digits: Option<u32>) -> f64 {
        let value = match unit {
            TemperatureUnit::Celsius => self.celsius(),
            TemperatureUnit::Fahrenheit => self.fahrenheit(),
        };
        maybe_round(value, digits)
    }
}

/// A sensor that reports temperature.
///
/// Implementors provide [`read_reading`](Self::read_reading); the unit
/// conversions come for free. Fahrenheit is converted from full-precision
/// Celsius and rounded only at the end.
pub trait TemperatureSensor {
    /// Take one raw reading.
    fn read_reading(&mut self) -> Result<TemperatureReading>;

    /// Current temperature in Celsius, rounded to `digits` places if given.
    fn get_temp_in_c(&mut self, digits: Option<u32>) -> Result<f64> {
        Ok(self
            .read_reading()?
            .value(TemperatureUnit::Celsius, digits))
    }

    /// Current temperature in Fahrenheit, rounded to `digits` places if given.
    fn get_temp_in_f(&mut self, digits: Option<u32>) -> Result<f64> {
        Ok(self
            .read_reading()?
            .value(TemperatureUnit::Fahrenheit, digits))
    }
}
