//! Serial RFID reader.
//!
//! The ID-3LA, ID-12LA and ID-20LA modules share one output format and one
//! line speed, so a single [`RfidFrameReader`] serves all three. The reader
//! owns a [`SerialDevice`]; if another serial device already holds the UART
//! the reader is built disabled and never sees a tag.

use crate::frame::{RfidFrame, RfidTag};
use boardkit_core::constants::{ETX, RFID_BAUD_RATE, RFID_POLL_INTERVAL_MS};
use boardkit_hardware::serial::{SerialConfig, SerialDevice};
use boardkit_hardware::{HardwareError, Result, TransportRegistry};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Supported reader modules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReaderModel {
    #[serde(rename = "ID-3LA")]
    Id3La,
    #[default]
    #[serde(rename = "ID-12LA")]
    Id12La,
    #[serde(rename = "ID-20LA")]
    Id20La,
}

impl ReaderModel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Id3La => "ID-3LA",
            Self::Id12La => "ID-12LA",
            Self::Id20La => "ID-20LA",
        }
    }

    /// Line speed the module transmits at.
    pub fn baud_rate(&self) -> u32 {
        RFID_BAUD_RATE
    }
}

impl fmt::Display for ReaderModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reader settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RfidReaderConfig {
    /// Reader module
    pub model: ReaderModel,

    /// UART settings
    pub serial: SerialConfig,

    /// Delay between polls in [`RfidFrameReader::wait_for_scan`]
    pub poll_interval: Duration,
}

impl Default for RfidReaderConfig {
    fn default() -> Self {
        Self::for_model(ReaderModel::default())
    }
}

impl RfidReaderConfig {
    /// Default UART and poll interval for `model`.
    pub fn for_model(model: ReaderModel) -> Self {
        Self {
            model,
            serial: SerialConfig::new(model.baud_rate()),
            poll_interval: Duration::from_millis(RFID_POLL_INTERVAL_MS),
        }
    }

    /// Set the UART settings
    pub fn serial(mut self, serial: SerialConfig) -> Self {
        self.serial = serial;
        self
    }

    /// Set the poll interval
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn validate(&self) -> boardkit_core::Result<()> {
        self.serial.validate()?;
        if self.poll_interval.is_zero() {
            return Err(boardkit_core::Error::config("poll interval must be non-zero"));
        }
        Ok(())
    }
}

/// Limits on a [`RfidFrameReader::wait_for_scan`] call.
///
/// With neither a token nor a timeout the wait lasts until a tag arrives.
///
/// # Example
///
/// ```
/// use boardkit_rfid::ScanWait;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// let token = CancellationToken::new();
/// let wait = ScanWait::new()
///     .cancel_on(token.clone())
///     .timeout(Duration::from_secs(30));
///
/// // From any thread:
/// token.cancel();
/// assert!(wait.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScanWait {
    token: Option<CancellationToken>,
    timeout: Option<Duration>,
}

impl ScanWait {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop waiting once `token` is cancelled.
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.token = Some(token);
        self
    }

    /// Give up after `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

/// How a wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Tag(RfidTag),
    Cancelled,
    TimedOut,
}

impl ScanOutcome {
    /// The scanned tag, if the wait produced one.
    pub fn tag(self) -> Option<RfidTag> {
        match self {
            Self::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}

/// Frame decoder on top of the UART.
#[derive(Debug)]
pub struct RfidFrameReader {
    serial: SerialDevice,
    config: RfidReaderConfig,
}

impl RfidFrameReader {
    /// Open the reader's UART.
    ///
    /// Like [`SerialDevice::new`], a busy UART yields a disabled reader
    /// rather than an error.
    pub fn new(registry: &TransportRegistry, config: RfidReaderConfig) -> Result<Self> {
        config.validate()?;
        let serial = SerialDevice::new(registry, config.serial.clone())?;
        debug!(model = %config.model, enabled = serial.is_enabled(), "RFID reader ready");
        Ok(Self { serial, config })
    }

    /// Reader for `model` on the default UART.
    pub fn with_model(registry: &TransportRegistry, model: ReaderModel) -> Result<Self> {
        Self::new(registry, RfidReaderConfig::for_model(model))
    }

    pub fn model(&self) -> ReaderModel {
        self.config.model
    }

    /// Whether the reader owns the UART.
    pub fn is_enabled(&self) -> bool {
        self.serial.is_enabled()
    }

    /// Read the next frame, if a line is waiting.
    ///
    /// After a non-empty line exactly one more byte (the ETX trailer) is
    /// read and discarded. A line that timed out without a delimiter and
    /// already ends in ETX has no trailer to read.
    ///
    /// # Errors
    /// Transport failures are returned as-is; a malformed line becomes
    /// `HardwareError::Core(Error::InvalidFrame)`.
    pub fn get_last_frame(&mut self) -> Result<Option<RfidFrame>> {
        let line = self.serial.readline()?;
        if line.is_empty() {
            return Ok(None);
        }

        if line.last() != Some(&ETX) {
            let trailer = self.serial.read(1)?;
            if trailer.as_slice() != [ETX] {
                warn!(
                    trailer = ?trailer,
                    "expected ETX (0x{:02X}) after RFID frame",
                    ETX
                );
            }
        }

        let frame = RfidFrame::parse(&line)?;
        trace!(tag = %frame.tag(), "RFID frame decoded");
        Ok(Some(frame))
    }

    /// Tag from the next frame, if a line is waiting.
    pub fn get_last_scan(&mut self) -> Result<Option<RfidTag>> {
        Ok(self.get_last_frame()?.map(RfidFrame::into_tag))
    }

    /// Poll until a tag arrives, the wait is cancelled, or it times out.
    ///
    /// Each round sleeps for the poll interval (shortened to the remaining
    /// timeout) and then reads once. Cancellation is checked before and
    /// after every sleep. Malformed frames are logged and skipped.
    pub fn wait_for_scan(&mut self, wait: &ScanWait) -> Result<ScanOutcome> {
        let deadline = wait.timeout.map(|timeout| Instant::now() + timeout);

        loop {
            if wait.is_cancelled() {
                return Ok(ScanOutcome::Cancelled);
            }

            let mut nap = self.config.poll_interval;
            if let Some(deadline) = deadline {
                nap = nap.min(deadline.saturating_duration_since(Instant::now()));
            }
            thread::sleep(nap);

            if wait.is_cancelled() {
                return Ok(ScanOutcome::Cancelled);
            }

            match self.get_last_scan() {
                Ok(Some(tag)) => return Ok(ScanOutcome::Tag(tag)),
                Ok(None) => {}
                Err(HardwareError::Core(e)) => warn!("skipping malformed RFID frame: {}", e),
                Err(e) => return Err(e),
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Ok(ScanOutcome::TimedOut);
            }
        }
    }
}
