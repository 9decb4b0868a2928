//! Mock GPIO controller.

use super::{DriverCall, SharedState};
use crate::error::Result;
use crate::traits::GpioDriver;
use boardkit_core::{BoardPin, Direction, Level, NumberingScheme, TransportKind};

/// GPIO controller backed by the mock pin table.
#[derive(Debug)]
pub struct MockGpio {
    state: SharedState,
}

impl MockGpio {
    pub(crate) fn new(state: SharedState) -> Self {
        Self { state }
    }
}

impl GpioDriver for MockGpio {
    fn set_mode(&mut self, scheme: NumberingScheme) -> Result<()> {
        let mut state = self.state.lock();
        state.record(DriverCall::GpioSetMode(scheme));
        state.check(TransportKind::Gpio)
    }

    fn setup(&mut self, pin: BoardPin, direction: Direction, initial: Option<Level>) -> Result<()> {
        let mut state = self.state.lock();
        state.record(DriverCall::GpioSetup {
            pin: pin.number(),
            direction,
            initial,
        });
        state.check(TransportKind::Gpio)?;
        if let (Direction::Output, Some(level)) = (direction, initial) {
            state.outputs.insert(pin.number(), level);
        }
        Ok(())
    }

    fn output(&mut self, pin: BoardPin, level: Level) -> Result<()> {
        let mut state = self.state.lock();
        state.record(DriverCall::GpioOutput {
            pin: pin.number(),
            level,
        });
        state.check(TransportKind::Gpio)?;
        state.outputs.insert(pin.number(), level);
        Ok(())
    }

    fn input(&mut self, pin: BoardPin) -> Result<Level> {
        let mut state = self.state.lock();
        state.record(DriverCall::GpioInput { pin: pin.number() });
        state.check(TransportKind::Gpio)?;
        Ok(state
            .inputs
            .get(&pin.number())
            .copied()
            .unwrap_or(Level::Low))
    }

    fn cleanup(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.record(DriverCall::GpioCleanup);
        state.check(TransportKind::Gpio)?;
        state.outputs.clear();
        Ok(())
    }
}
