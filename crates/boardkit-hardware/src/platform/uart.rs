//! UART driver on top of `serialport`.

use crate::error::{HardwareError, Result};
use crate::serial::SerialConfig;
use crate::traits::SerialDriver;
use boardkit_core::TransportKind;
use boardkit_core::constants::LINE_DELIMITER;
use serialport::SerialPort;
use std::io::{ErrorKind, Read};

/// An open serial port. Reads stop at the configured timeout.
pub struct SerialPortDriver {
    port: Option<Box<dyn SerialPort>>,
}

impl SerialPortDriver {
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let port = serialport::new(&config.path, config.baud_rate)
            .timeout(config.timeout)
            .open()
            .map_err(|e| HardwareError::driver(TransportKind::Serial, e))?;
        Ok(Self { port: Some(port) })
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port
            .as_mut()
            .ok_or_else(|| HardwareError::driver(TransportKind::Serial, "port is closed"))
    }

    /// Read one byte, `None` on timeout.
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        match self.port()?.read(&mut byte) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(byte[0])),
            Err(e) if e.kind() == ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl SerialDriver for SerialPortDriver {
    fn readline(&mut self) -> Result<Vec<u8>> {
        let mut line = Vec::new();
        while let Some(byte) = self.read_byte()? {
            line.push(byte);
            if byte == LINE_DELIMITER {
                break;
            }
        }
        Ok(line)
    }

    fn read(&mut self, size: usize) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(size);
        while buf.len() < size {
            match self.read_byte()? {
                Some(byte) => buf.push(byte),
                None => break,
            }
        }
        Ok(buf)
    }

    fn close(&mut self) -> Result<()> {
        self.port = None;
        Ok(())
    }
}
