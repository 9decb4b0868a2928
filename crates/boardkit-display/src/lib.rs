//! Displays driven over the board's SPI controller.
//!
//! [`SevenSegmentDisplay`] wraps a shared [`SpiBusDevice`](boardkit_hardware::spi::SpiBusDevice)
//! and adds the display's command bytes: clear, raw writes, and the
//! time / temperature helpers that light the colon or decimal segments.

pub mod seven_segment;

pub use seven_segment::{
    DecimalFlags, SevenSegmentConfig, SevenSegmentDisplay, format_temperature, format_time,
};
