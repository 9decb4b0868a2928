//! SPI devices sharing one controller.
//!
//! Several logical devices can sit behind the one SPI controller, each at
//! its own (bus, chip-select) pair. The controller stays open at whichever
//! pair was selected last, so every [`SpiBusDevice::send_data`] first calls
//! [`SpiBusDevice::set_bus`] to re-point it when the [`ReselectPolicy`]
//! says so.
//!
//! # Reselect policies
//!
//! | policy | reopens when |
//! |---|---|
//! | [`ReselectPolicy::Compatible`] | bus **and** chip-select both differ |
//! | [`ReselectPolicy::Exact`] | bus **or** chip-select differs |
//!
//! `Compatible` is the default and keeps the historical behaviour of this
//! layer: a device that differs only in chip-select (or only in bus) is
//! *not* re-selected and its transfer goes to the current selection.
//! Use `Exact` when several devices share a bus on different chip-selects.

use crate::error::Result;
use crate::registry::{TransportLease, TransportRegistry};
use boardkit_core::SpiSelection;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{trace, warn};

/// When to reopen the controller before a transfer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReselectPolicy {
    /// Reopen only if both bus and chip-select differ.
    #[default]
    Compatible,
    /// Reopen whenever the pair differs.
    Exact,
}

impl ReselectPolicy {
    /// Whether moving from `current` to `target` requires a reopen.
    pub fn needs_reselect(self, current: SpiSelection, target: SpiSelection) -> bool {
        match self {
            Self::Compatible => {
                current.bus != target.bus && current.chip_select != target.chip_select
            }
            Self::Exact => current != target,
        }
    }
}

/// Address and clocking of one SPI device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpiConfig {
    /// Controller bus number
    pub bus: u8,

    /// Chip-select line
    pub chip_select: u8,

    /// Clock for this device's transfers; controller default when unset
    pub max_speed_hz: Option<u32>,

    /// Reselect behaviour before each transfer
    pub reselect: ReselectPolicy,
}

impl Default for SpiConfig {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl SpiConfig {
    pub fn new(bus: u8, chip_select: u8) -> Self {
        Self {
            bus,
            chip_select,
            max_speed_hz: None,
            reselect: ReselectPolicy::default(),
        }
    }

    /// Set the transfer clock
    pub fn max_speed_hz(mut self, hz: u32) -> Self {
        self.max_speed_hz = Some(hz);
        self
    }

    /// Set the reselect policy
    pub fn reselect(mut self, policy: ReselectPolicy) -> Self {
        self.reselect = policy;
        self
    }

    pub fn selection(&self) -> SpiSelection {
        SpiSelection::new(self.bus, self.chip_select)
    }

    pub fn validate(&self) -> boardkit_core::Result<()> {
        if self.max_speed_hz == Some(0) {
            return Err(boardkit_core::Error::config("SPI max speed must be non-zero"));
        }
        Ok(())
    }
}

/// Payload accepted by [`SpiBusDevice::send_data`].
///
/// Every variant is converted to a byte sequence before the transfer.
/// Values that do not fit a byte are rejected rather than truncated.
#[derive(Debug, Clone, PartialEq)]
pub enum SpiData {
    /// Raw bytes, sent as-is.
    Bytes(Vec<u8>),
    /// Small integers, each sent as one byte.
    Words(Vec<i64>),
    /// Text, each character sent as its code point.
    Text(String),
    /// A single small integer.
    Int(i64),
    /// A value of a type the display protocol cannot carry.
    Unsupported { type_name: &'static str },
}

fn byte_from_int(value: i64) -> std::result::Result<u8, String> {
    u8::try_from(value).map_err(|_| format!("integer {} does not fit in a byte", value))
}

impl SpiData {
    /// Encode as transfer bytes, or explain why the data cannot be sent.
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, String> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Words(words) => words.iter().map(|w| byte_from_int(*w)).collect(),
            Self::Text(text) => text
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c))
                        .map_err(|_| format!("character {:?} has no single-byte code", c))
                })
                .collect(),
            Self::Int(value) => byte_from_int(*value).map(|b| vec![b]),
            Self::Unsupported { type_name } => Err(format!(
                "unsupported type {}; must be text, integer or a list of integers",
                type_name
            )),
        }
    }
}

impl From<Vec<u8>> for SpiData {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for SpiData {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<[u8; N]> for SpiData {
    fn from(bytes: [u8; N]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl<const N: usize> From<&[u8; N]> for SpiData {
    fn from(bytes: &[u8; N]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<Vec<i32>> for SpiData {
    fn from(words: Vec<i32>) -> Self {
        Self::Words(words.into_iter().map(i64::from).collect())
    }
}

impl From<Vec<i64>> for SpiData {
    fn from(words: Vec<i64>) -> Self {
        Self::Words(words)
    }
}

impl From<&str> for SpiData {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for SpiData {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<u8> for SpiData {
    fn from(value: u8) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i32> for SpiData {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for SpiData {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for SpiData {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for SpiData {
    fn from(_: f32) -> Self {
        Self::Unsupported { type_name: "f32" }
    }
}

impl From<f64> for SpiData {
    fn from(_: f64) -> Self {
        Self::Unsupported { type_name: "f64" }
    }
}

/// Result of a [`SpiBusDevice::send_data`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The transfer ran; `response` holds the bytes clocked in.
    Transferred { response: Vec<u8> },
    /// The data could not be encoded. Nothing was sent.
    Rejected { reason: String },
}

impl SendOutcome {
    pub fn is_transferred(&self) -> bool {
        matches!(self, Self::Transferred { .. })
    }
}

impl fmt::Display for SendOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transferred { response } => write!(f, "transferred ({} bytes in)", response.len()),
            Self::Rejected { reason } => write!(f, "rejected: {}", reason),
        }
    }
}

/// One logical device on the shared SPI controller.
#[derive(Debug)]
pub struct SpiBusDevice {
    config: SpiConfig,
    lease: TransportLease,
}

impl SpiBusDevice {
    /// Acquire the controller for a device at `config.selection()`.
    ///
    /// The first device opens the controller at its own pair; later devices
    /// leave the current selection alone until they transfer.
    pub fn new(registry: &TransportRegistry, config: SpiConfig) -> Result<Self> {
        config.validate()?;
        let lease = registry.acquire_spi(config.selection())?;
        Ok(Self { config, lease })
    }

    /// Re-point the controller at this device if the policy requires it.
    ///
    /// Returns whether the controller was reopened.
    pub fn set_bus(&mut self) -> Result<bool> {
        self.lease
            .registry()
            .spi_select(self.config.selection(), self.config.reselect)
    }

    /// Send `data` to the device.
    ///
    /// Data that cannot be encoded is logged and reported as
    /// [`SendOutcome::Rejected`]; no transfer and no reselect happen.
    pub fn send_data(&mut self, data: impl Into<SpiData>) -> Result<SendOutcome> {
        let bytes = match data.into().to_bytes() {
            Ok(bytes) => bytes,
            Err(reason) => {
                warn!(selection = %self.config.selection(), "SPI send rejected: {}", reason);
                return Ok(SendOutcome::Rejected { reason });
            }
        };

        self.set_bus()?;
        let response = self
            .lease
            .registry()
            .spi_transfer(&bytes, self.config.max_speed_hz)?;
        trace!(sent = bytes.len(), received = response.len(), "SPI send complete");
        Ok(SendOutcome::Transferred { response })
    }

    /// This device's (bus, chip-select) pair.
    pub fn selection(&self) -> SpiSelection {
        self.config.selection()
    }

    pub fn config(&self) -> &SpiConfig {
        &self.config
    }
}
