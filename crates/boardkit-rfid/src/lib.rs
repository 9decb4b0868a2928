//! RFID tag readers on the board UART.
//!
//! This crate decodes the serial output of the ID-3LA / ID-12LA / ID-20LA
//! reader family:
//!
//! - [`RfidFrame`] / [`RfidTag`]: framing validation, tag extraction and the
//!   optional XOR checksum.
//! - [`RfidFrameReader`]: reads frames from the shared UART and offers a
//!   cancellable [`wait_for_scan`](RfidFrameReader::wait_for_scan) poll loop.
//!
//! # Example
//!
//! ```
//! use boardkit_hardware::TransportRegistry;
//! use boardkit_hardware::mock::MockPlatform;
//! use boardkit_rfid::{ReaderModel, RfidFrameReader, ScanOutcome, ScanWait};
//! use std::time::Duration;
//!
//! let (platform, handle) = MockPlatform::new();
//! let registry = TransportRegistry::new(platform);
//! let mut reader = RfidFrameReader::with_model(&registry, ReaderModel::Id12La)?;
//!
//! handle.push_serial(b"\x02AB12345678\r\n\x03");
//! let outcome = reader.wait_for_scan(&ScanWait::new().timeout(Duration::from_secs(1)))?;
//! assert!(matches!(outcome, ScanOutcome::Tag(tag) if tag.as_str() == "AB12345678"));
//! # Ok::<(), boardkit_hardware::HardwareError>(())
//! ```

pub mod frame;
pub mod reader;

pub use frame::{RfidFrame, RfidTag};
pub use reader::{ReaderModel, RfidFrameReader, RfidReaderConfig, ScanOutcome, ScanWait};
