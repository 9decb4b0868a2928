//! Sensors on the board's I2C buses.
//!
//! [`TemperatureReading`] decodes the raw register word the bus returns;
//! [`TemperatureSensor`] adds Celsius/Fahrenheit accessors with optional
//! rounding on top of any sensor that can produce one. [`Tmp102`] is the
//! concrete driver.

pub mod temperature;
pub mod tmp102;

pub use temperature::{
    TemperatureReading, TemperatureSensor, TemperatureUnit, celsius_to_fahrenheit, round_to,
};
pub use tmp102::{Tmp102, Tmp102Config};
