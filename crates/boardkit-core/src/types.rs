use crate::{Result, constants::board_to_bcm, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Electrical level of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Low,
    High,
}

impl Level {
    #[must_use]
    pub fn is_high(self) -> bool {
        matches!(self, Self::High)
    }

    #[must_use]
    pub fn is_low(self) -> bool {
        matches!(self, Self::Low)
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

impl std::ops::Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Self::Low => Self::High,
            Self::High => Self::Low,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Pin direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// Pin numbering scheme handed to the GPIO driver.
///
/// boardkit always addresses pins by their physical header position so
/// the same numbers work across board revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumberingScheme {
    /// Physical header position (1-40).
    Board,
    /// Broadcom GPIO number.
    Bcm,
}

/// A GPIO-capable pin on the 40-pin header, by physical position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct BoardPin(u8);

impl BoardPin {
    /// Create a board pin with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidPin` if the number is off the header or names
    /// a power/ground pin.
    pub fn new(pin: u8) -> Result<Self> {
        if board_to_bcm(pin).is_none() {
            return Err(Error::InvalidPin {
                pin,
                reason: "not a GPIO pin on the 40-pin header".to_string(),
            });
        }
        Ok(BoardPin(pin))
    }

    /// Physical header position.
    #[must_use]
    pub fn number(&self) -> u8 {
        self.0
    }

    /// Broadcom GPIO number behind this header position.
    #[must_use]
    pub fn bcm(&self) -> u8 {
        // Construction guarantees the lookup succeeds.
        board_to_bcm(self.0).unwrap_or_default()
    }
}

impl TryFrom<u8> for BoardPin {
    type Error = Error;

    fn try_from(pin: u8) -> Result<Self> {
        BoardPin::new(pin)
    }
}

impl From<BoardPin> for u8 {
    fn from(pin: BoardPin) -> u8 {
        pin.0
    }
}

impl fmt::Display for BoardPin {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "pin {}", self.0)
    }
}

/// The four shared transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TransportKind {
    Gpio,
    Serial,
    I2c,
    Spi,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Gpio => write!(f, "GPIO"),
            Self::Serial => write!(f, "serial"),
            Self::I2c => write!(f, "I2C"),
            Self::Spi => write!(f, "SPI"),
        }
    }
}

/// SPI controller address: bus number plus chip-select line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpiSelection {
    pub bus: u8,
    pub chip_select: u8,
}

impl SpiSelection {
    #[must_use]
    pub fn new(bus: u8, chip_select: u8) -> Self {
        Self { bus, chip_select }
    }
}

impl fmt::Display for SpiSelection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "spi{}.{}", self.bus, self.chip_select)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(3, 2)]
    #[case(11, 17)]
    #[case(12, 18)]
    #[case(40, 21)]
    fn test_board_pin_valid(#[case] pin: u8, #[case] bcm: u8) {
        let board_pin = BoardPin::new(pin).unwrap();
        assert_eq!(board_pin.number(), pin);
        assert_eq!(board_pin.bcm(), bcm);
    }

    #[rstest]
    #[case(0)] // off the header
    #[case(1)] // 3V3
    #[case(6)] // GND
    #[case(41)] // off the header
    fn test_board_pin_invalid(#[case] pin: u8) {
        assert!(matches!(BoardPin::new(pin), Err(Error::InvalidPin { .. })));
    }

    #[test]
    fn test_level_conversions() {
        assert_eq!(Level::from(true), Level::High);
        assert_eq!(Level::from(false), Level::Low);
        assert_eq!(!Level::High, Level::Low);
        assert!(Level::High.is_high());
        assert!(Level::Low.is_low());
    }

    #[test]
    fn test_spi_selection_display() {
        assert_eq!(SpiSelection::new(0, 1).to_string(), "spi0.1");
    }

    #[test]
    fn test_board_pin_serde_validates() {
        let pin: BoardPin = serde_json::from_str("11").unwrap();
        assert_eq!(pin.number(), 11);
        assert!(serde_json::from_str::<BoardPin>("6").is_err());
        assert_eq!(serde_json::to_string(&pin).unwrap(), "11");
    }
}
