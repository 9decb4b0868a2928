//! Mock SPI controller.

use super::{DriverCall, SharedState};
use crate::error::{HardwareError, Result};
use crate::traits::SpiDriver;
use boardkit_core::{SpiSelection, TransportKind};

/// SPI controller that records transfers and clocks in zeros.
#[derive(Debug)]
pub struct MockSpi {
    state: SharedState,
    open: bool,
}

impl MockSpi {
    pub(crate) fn new(state: SharedState) -> Self {
        Self { state, open: false }
    }
}

impl SpiDriver for MockSpi {
    fn open(&mut self, selection: SpiSelection) -> Result<()> {
        let mut state = self.state.lock();
        state.record(DriverCall::SpiOpen(selection));
        state.check(TransportKind::Spi)?;
        self.open = true;
        Ok(())
    }

    fn xfer2(&mut self, data: &[u8], speed_hz: Option<u32>) -> Result<Vec<u8>> {
        let mut state = self.state.lock();
        state.record(DriverCall::SpiTransfer {
            data: data.to_vec(),
            speed_hz,
        });
        state.check(TransportKind::Spi)?;
        if !self.open {
            return Err(HardwareError::driver(TransportKind::Spi, "controller is closed"));
        }
        Ok(vec![0; data.len()])
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.record(DriverCall::SpiClose);
        self.open = false;
        state.check(TransportKind::Spi)
    }
}
