//! Raspberry Pi GPIO, I2C and SPI drivers on top of `rppal`.

use crate::error::{HardwareError, Result};
use crate::traits::{GpioDriver, I2cDriver, SpiDriver};
use boardkit_core::{BoardPin, Direction, Level, NumberingScheme, SpiSelection, TransportKind};
use rppal::gpio::{Gpio, InputPin, OutputPin};
use rppal::i2c::I2c;
use rppal::spi::{Bus, Mode, Segment, SlaveSelect, Spi};
use std::collections::HashMap;
use tracing::trace;

/// Controller clock when a transfer does not ask for one.
const DEFAULT_SPI_CLOCK_HZ: u32 = 500_000;

fn gpio_error(e: rppal::gpio::Error) -> HardwareError {
    HardwareError::driver(TransportKind::Gpio, e)
}

fn to_rppal(level: Level) -> rppal::gpio::Level {
    match level {
        Level::Low => rppal::gpio::Level::Low,
        Level::High => rppal::gpio::Level::High,
    }
}

fn from_rppal(level: rppal::gpio::Level) -> Level {
    Level::from(level == rppal::gpio::Level::High)
}

enum ClaimedPin {
    Output(OutputPin),
    Input(InputPin),
}

/// GPIO controller over `/dev/gpiomem`.
///
/// Pins arrive as header positions and are translated to Broadcom numbers
/// here; rppal only speaks BCM.
pub struct RppalGpio {
    gpio: Gpio,
    pins: HashMap<BoardPin, ClaimedPin>,
}

impl RppalGpio {
    pub fn open() -> Result<Self> {
        Ok(Self {
            gpio: Gpio::new().map_err(gpio_error)?,
            pins: HashMap::new(),
        })
    }
}

impl GpioDriver for RppalGpio {
    fn set_mode(&mut self, scheme: NumberingScheme) -> Result<()> {
        match scheme {
            NumberingScheme::Board => Ok(()),
            NumberingScheme::Bcm => Err(HardwareError::unsupported(
                "BCM numbering; pins are addressed by header position",
            )),
        }
    }

    fn setup(&mut self, pin: BoardPin, direction: Direction, initial: Option<Level>) -> Result<()> {
        let raw = self.gpio.get(pin.bcm()).map_err(gpio_error)?;
        let claimed = match (direction, initial) {
            (Direction::Output, Some(Level::High)) => ClaimedPin::Output(raw.into_output_high()),
            (Direction::Output, _) => ClaimedPin::Output(raw.into_output_low()),
            (Direction::Input, _) => ClaimedPin::Input(raw.into_input()),
        };
        trace!(%pin, bcm = pin.bcm(), %direction, "rppal pin configured");
        self.pins.insert(pin, claimed);
        Ok(())
    }

    fn output(&mut self, pin: BoardPin, level: Level) -> Result<()> {
        match self.pins.get_mut(&pin) {
            Some(ClaimedPin::Output(out)) => {
                out.write(to_rppal(level));
                Ok(())
            }
            _ => Err(HardwareError::driver(
                TransportKind::Gpio,
                format!("{} is not set up as an output", pin),
            )),
        }
    }

    fn input(&mut self, pin: BoardPin) -> Result<Level> {
        match self.pins.get(&pin) {
            Some(ClaimedPin::Input(input)) => Ok(from_rppal(input.read())),
            Some(ClaimedPin::Output(out)) => Ok(Level::from(out.is_set_high())),
            None => Err(HardwareError::driver(
                TransportKind::Gpio,
                format!("{} is not set up", pin),
            )),
        }
    }

    // rppal restores each pin's previous mode when it is dropped.
    fn cleanup(&mut self) -> Result<()> {
        self.pins.clear();
        Ok(())
    }
}

/// One `/dev/i2c-N` bus.
pub struct RppalI2c {
    i2c: I2c,
    bus: u8,
    address: Option<u16>,
}

impl RppalI2c {
    pub fn open(bus: u8) -> Result<Self> {
        let i2c = I2c::with_bus(bus).map_err(|e| HardwareError::driver(TransportKind::I2c, e))?;
        Ok(Self {
            i2c,
            bus,
            address: None,
        })
    }

    fn select(&mut self, address: u16) -> Result<()> {
        if self.address != Some(address) {
            self.i2c
                .set_slave_address(address)
                .map_err(|e| HardwareError::driver(TransportKind::I2c, e))?;
            self.address = Some(address);
            trace!(bus = self.bus, address, "I2C slave selected");
        }
        Ok(())
    }
}

impl I2cDriver for RppalI2c {
    fn read_word_data(&mut self, address: u16, register: u8) -> Result<u16> {
        self.select(address)?;
        self.i2c
            .smbus_read_word(register)
            .map_err(|e| HardwareError::driver(TransportKind::I2c, e))
    }

    fn read_byte_data(&mut self, address: u16, register: u8) -> Result<u8> {
        self.select(address)?;
        self.i2c
            .smbus_read_byte(register)
            .map_err(|e| HardwareError::driver(TransportKind::I2c, e))
    }
}

fn spi_bus(bus: u8) -> Result<Bus> {
    Ok(match bus {
        0 => Bus::Spi0,
        1 => Bus::Spi1,
        2 => Bus::Spi2,
        3 => Bus::Spi3,
        4 => Bus::Spi4,
        5 => Bus::Spi5,
        6 => Bus::Spi6,
        other => {
            return Err(HardwareError::driver(
                TransportKind::Spi,
                format!("no SPI bus {}", other),
            ));
        }
    })
}

fn slave_select(chip_select: u8) -> Result<SlaveSelect> {
    Ok(match chip_select {
        0 => SlaveSelect::Ss0,
        1 => SlaveSelect::Ss1,
        2 => SlaveSelect::Ss2,
        other => {
            return Err(HardwareError::driver(
                TransportKind::Spi,
                format!("no chip-select {}", other),
            ));
        }
    })
}

/// SPI controller over `/dev/spidevB.C`.
#[derive(Default)]
pub struct RppalSpi {
    spi: Option<Spi>,
}

impl SpiDriver for RppalSpi {
    fn open(&mut self, selection: SpiSelection) -> Result<()> {
        let spi = Spi::new(
            spi_bus(selection.bus)?,
            slave_select(selection.chip_select)?,
            DEFAULT_SPI_CLOCK_HZ,
            Mode::Mode0,
        )
        .map_err(|e| HardwareError::driver(TransportKind::Spi, e))?;
        self.spi = Some(spi);
        Ok(())
    }

    fn xfer2(&mut self, data: &[u8], speed_hz: Option<u32>) -> Result<Vec<u8>> {
        let spi = self
            .spi
            .as_ref()
            .ok_or_else(|| HardwareError::driver(TransportKind::Spi, "controller is closed"))?;

        let mut response = vec![0; data.len()];
        let mut segment = Segment::new(&mut response, data);
        if let Some(hz) = speed_hz {
            segment.set_clock_speed(hz);
        }
        spi.transfer_segments(&[segment])
            .map_err(|e| HardwareError::driver(TransportKind::Spi, e))?;
        Ok(response)
    }

    fn close(&mut self) -> Result<()> {
        self.spi = None;
        Ok(())
    }
}
