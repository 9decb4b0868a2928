//! Mock SMBus.

use super::{DriverCall, SharedState};
use crate::error::Result;
use crate::traits::I2cDriver;
use boardkit_core::TransportKind;

/// One I2C bus reading from the handle's register table. Unset registers
/// read as zero.
#[derive(Debug)]
pub struct MockI2c {
    state: SharedState,
    bus: u8,
}

impl MockI2c {
    pub(crate) fn new(state: SharedState, bus: u8) -> Self {
        Self { state, bus }
    }
}

impl I2cDriver for MockI2c {
    fn read_word_data(&mut self, address: u16, register: u8) -> Result<u16> {
        let mut state = self.state.lock();
        state.record(DriverCall::I2cReadWord {
            bus: self.bus,
            address,
            register,
        });
        state.check(TransportKind::I2c)?;
        Ok(state
            .i2c_words
            .get(&(self.bus, address, register))
            .copied()
            .unwrap_or_default())
    }

    fn read_byte_data(&mut self, address: u16, register: u8) -> Result<u8> {
        let mut state = self.state.lock();
        state.record(DriverCall::I2cReadByte {
            bus: self.bus,
            address,
            register,
        });
        state.check(TransportKind::I2c)?;
        Ok(state
            .i2c_bytes
            .get(&(self.bus, address, register))
            .copied()
            .unwrap_or_default())
    }
}
