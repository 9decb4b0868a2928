//! TMP102 digital temperature sensor.

use crate::temperature::{TemperatureReading, TemperatureSensor};
use boardkit_core::constants::{
    TMP102_DEFAULT_ADDRESS, TMP102_DEFAULT_BUS, TMP102_TEMPERATURE_REGISTER,
};
use boardkit_hardware::Result;
use boardkit_hardware::i2c::{I2cBusDevice, I2cConfig};
use boardkit_hardware::TransportRegistry;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Where the sensor sits on the I2C bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tmp102Config {
    pub bus: u8,
    pub address: u16,
}

impl Default for Tmp102Config {
    fn default() -> Self {
        Self {
            bus: TMP102_DEFAULT_BUS,
            address: TMP102_DEFAULT_ADDRESS,
        }
    }
}

impl Tmp102Config {
    pub fn bus(mut self, bus: u8) -> Self {
        self.bus = bus;
        self
    }

    /// Set the slave address (ADD0 strapping selects 0x48..=0x4B)
    pub fn address(mut self, address: u16) -> Self {
        self.address = address;
        self
    }

    pub fn i2c(&self) -> I2cConfig {
        I2cConfig::new(self.bus, self.address)
    }

    pub fn validate(&self) -> boardkit_core::Result<()> {
        self.i2c().validate()
    }
}

/// A TMP102 on a shared I2C bus.
///
/// # Example
/// ```
/// use boardkit_hardware::TransportRegistry;
/// use boardkit_hardware::mock::MockPlatform;
/// use boardkit_sensors::{TemperatureSensor, Tmp102};
///
/// let (platform, handle) = MockPlatform::new();
/// let registry = TransportRegistry::new(platform);
/// handle.set_i2c_word(1, 0x48, 0x00, 0x8019);
///
/// let mut sensor = Tmp102::new(&registry)?;
/// assert_eq!(sensor.get_temp_in_c(None)?, 25.5);
/// assert_eq!(sensor.get_temp_in_f(Some(1))?, 77.9);
/// # Ok::<(), boardkit_hardware::HardwareError>(())
/// ```
#[derive(Debug)]
pub struct Tmp102 {
    device: I2cBusDevice,
}

impl Tmp102 {
    /// Sensor at the default bus and address.
    pub fn new(registry: &TransportRegistry) -> Result<Self> {
        Self::with_config(registry, Tmp102Config::default())
    }

    pub fn with_config(registry: &TransportRegistry, config: Tmp102Config) -> Result<Self> {
        config.validate()?;
        let device = I2cBusDevice::new(registry, config.i2c())?;
        Ok(Self { device })
    }

    pub fn bus(&self) -> u8 {
        self.device.bus()
    }

    pub fn address(&self) -> u16 {
        self.device.address()
    }
}

impl TemperatureSensor for Tmp102 {
    fn read_reading(&mut self) -> Result<TemperatureReading> {
        let word = self.device.read_word(TMP102_TEMPERATURE_REGISTER)?;
        let reading = TemperatureReading::from_raw(word);
        trace!(raw = word, celsius = reading.celsius(), "TMP102 reading");
        Ok(reading)
    }
}
