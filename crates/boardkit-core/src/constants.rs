//! Wire, command and board constants.
//!
//! Everything the peripheral crates need to agree on byte-for-byte lives
//! here: RFID framing bytes, the seven-segment display command set, the
//! TMP102 register layout and the default UART settings.
//!
//! # RFID Frame Structure
//!
//! The ID-series readers emit one ASCII frame per scanned tag:
//!
//! ```text
//! <STX>TTTTTTTTTTCC<CR><LF><ETX>
//! ```
//!
//! Where:
//! - `<STX>` - Start of text marker (0x02)
//! - `T` - Ten tag characters
//! - `C` - Optional two-character hex checksum
//! - `<CR><LF>` - Line terminator consumed by the line read
//! - `<ETX>` - End of text marker (0x03), read separately after the line
//!
//! # Usage
//!
//! ```
//! use boardkit_core::constants::*;
//!
//! assert_eq!(STX, 0x02);
//! assert_eq!(RFID_TAG_LENGTH, 10);
//! assert_eq!(board_to_bcm(11), Some(17));
//! ```

// ============================================================================
// RFID Framing
// ============================================================================

/// Start of text marker that opens every RFID frame.
pub const STX: u8 = 0x02;

/// End of text marker that follows the RFID line on the wire.
pub const ETX: u8 = 0x03;

/// Number of characters in a tag identifier.
pub const RFID_TAG_LENGTH: usize = 10;

/// Number of hex characters in the optional frame checksum.
pub const RFID_CHECKSUM_LENGTH: usize = 2;

/// Shortest line that carries a complete tag (STX + tag).
pub const RFID_MIN_LINE_LENGTH: usize = 1 + RFID_TAG_LENGTH;

/// Baud rate used by the ID-series readers.
pub const RFID_BAUD_RATE: u32 = 9600;

/// Interval between polls while waiting for a scan (milliseconds).
pub const RFID_POLL_INTERVAL_MS: u64 = 100;

// ============================================================================
// UART
// ============================================================================

/// Device node of the primary UART on the board header.
pub const DEFAULT_SERIAL_PATH: &str = "/dev/ttyAMA0";

/// Read timeout applied to the UART when none is configured (milliseconds).
pub const DEFAULT_SERIAL_TIMEOUT_MS: u64 = 100;

/// Byte that terminates a line for `readline`.
pub const LINE_DELIMITER: u8 = b'\n';

// ============================================================================
// TMP102 Temperature Sensor
// ============================================================================

/// I2C bus the sensor sits on by default.
pub const TMP102_DEFAULT_BUS: u8 = 1;

/// Default 7-bit slave address (ADD0 tied to ground).
pub const TMP102_DEFAULT_ADDRESS: u16 = 0x48;

/// Temperature register.
pub const TMP102_TEMPERATURE_REGISTER: u8 = 0x00;

/// Resolution of one count of the 12-bit reading.
pub const TMP102_CELSIUS_PER_LSB: f64 = 0.0625;

// ============================================================================
// Seven-Segment Display
// ============================================================================

/// SPI controller the display is wired to.
pub const DISPLAY_SPI_BUS: u8 = 0;

/// Chip-select line the display is wired to.
pub const DISPLAY_CHIP_SELECT: u8 = 0;

/// Highest clock the display's serial interface accepts (Hz).
pub const DISPLAY_MAX_SPEED_HZ: u32 = 250_000;

/// Clears the display and moves the cursor home.
pub const DISPLAY_CMD_CLEAR: u8 = 0x76;

/// Introduces a decimal/colon/apostrophe control byte.
pub const DISPLAY_CMD_DECIMAL_CONTROL: u8 = 0x77;

/// Decimal control flags: centre colon.
pub const DISPLAY_FLAG_COLON: u8 = 0x10;

/// Decimal control flags: third decimal point and apostrophe.
pub const DISPLAY_FLAG_TEMPERATURE: u8 = 0x22;

// ============================================================================
// Board Header
// ============================================================================

/// Number of pins on the 40-pin header.
pub const BOARD_PIN_COUNT: u8 = 40;

/// Physical header pin to BCM GPIO number. `None` marks power and ground.
///
/// Index 0 is unused so the table can be indexed by the pin number.
pub const BOARD_TO_BCM: [Option<u8>; 41] = [
    None,     // 0 (unused)
    None,     // 1  3V3
    None,     // 2  5V
    Some(2),  // 3
    None,     // 4  5V
    Some(3),  // 5
    None,     // 6  GND
    Some(4),  // 7
    Some(14), // 8
    None,     // 9  GND
    Some(15), // 10
    Some(17), // 11
    Some(18), // 12
    Some(27), // 13
    None,     // 14 GND
    Some(22), // 15
    Some(23), // 16
    None,     // 17 3V3
    Some(24), // 18
    Some(10), // 19
    None,     // 20 GND
    Some(9),  // 21
    Some(25), // 22
    Some(11), // 23
    Some(8),  // 24
    None,     // 25 GND
    Some(7),  // 26
    Some(0),  // 27
    Some(1),  // 28
    Some(5),  // 29
    None,     // 30 GND
    Some(6),  // 31
    Some(12), // 32
    Some(13), // 33
    None,     // 34 GND
    Some(19), // 35
    Some(16), // 36
    Some(26), // 37
    Some(20), // 38
    None,     // 39 GND
    Some(21), // 40
];

/// Look up the BCM GPIO number behind a physical header pin.
///
/// Returns `None` for power/ground pins and numbers off the header.
#[must_use]
pub fn board_to_bcm(pin: u8) -> Option<u8> {
    BOARD_TO_BCM.get(pin as usize).copied().flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_map_covers_header() {
        assert_eq!(BOARD_TO_BCM.len(), BOARD_PIN_COUNT as usize + 1);
        let gpio_pins = BOARD_TO_BCM.iter().filter(|p| p.is_some()).count();
        assert_eq!(gpio_pins, 28);
    }

    #[test]
    fn test_board_to_bcm() {
        assert_eq!(board_to_bcm(3), Some(2));
        assert_eq!(board_to_bcm(40), Some(21));
        assert_eq!(board_to_bcm(6), None);
        assert_eq!(board_to_bcm(0), None);
        assert_eq!(board_to_bcm(41), None);
    }

    #[test]
    fn test_min_line_length() {
        assert_eq!(RFID_MIN_LINE_LENGTH, 11);
    }
}
