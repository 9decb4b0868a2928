//! Mock UART fed from the handle's receive buffer.

use super::{DriverCall, SharedState};
use crate::error::Result;
use crate::traits::SerialDriver;
use boardkit_core::TransportKind;
use boardkit_core::constants::LINE_DELIMITER;

/// UART that reads from the shared receive buffer.
///
/// An empty buffer behaves like a read timeout. `readline` returns at the
/// delimiter or at the end of the current burst, whichever comes first.
#[derive(Debug)]
pub struct MockSerial {
    state: SharedState,
}

impl MockSerial {
    pub(crate) fn new(state: SharedState) -> Self {
        Self { state }
    }
}

impl SerialDriver for MockSerial {
    fn readline(&mut self) -> Result<Vec<u8>> {
        let mut state = self.state.lock();
        state.record(DriverCall::SerialReadline);
        state.check(TransportKind::Serial)?;

        let mut line = Vec::new();
        while let Some((byte, ends_burst)) = state.pop_serial() {
            line.push(byte);
            if byte == LINE_DELIMITER || ends_burst {
                break;
            }
        }
        Ok(line)
    }

    fn read(&mut self, size: usize) -> Result<Vec<u8>> {
        let mut state = self.state.lock();
        state.record(DriverCall::SerialRead { size });
        state.check(TransportKind::Serial)?;

        let mut data = Vec::with_capacity(size);
        while data.len() < size {
            match state.pop_serial() {
                Some((byte, _)) => data.push(byte),
                None => break,
            }
        }
        Ok(data)
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.record(DriverCall::SerialClose);
        state.check(TransportKind::Serial)
    }
}
