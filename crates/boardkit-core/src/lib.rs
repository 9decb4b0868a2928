//! Shared vocabulary for the boardkit peripheral layer.
//!
//! This crate holds the pieces every other boardkit crate agrees on: wire
//! and command constants, the board header pin map, small value types
//! (logic levels, pin directions, SPI selections) and the validation
//! error type. It performs no I/O.

pub mod constants;
pub mod error;
pub mod logging;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
