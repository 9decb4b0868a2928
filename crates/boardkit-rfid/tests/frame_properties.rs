//! Property-based tests for RFID frame decoding.

use boardkit_hardware::TransportRegistry;
use boardkit_hardware::mock::MockPlatform;
use boardkit_rfid::{RfidFrame, RfidFrameReader, RfidReaderConfig, RfidTag};
use proptest::prelude::*;

/// Strategy for generating tag identifiers (ten alphanumeric characters).
fn tag_id() -> impl Strategy<Value = String> {
    prop::string::string_regex("[0-9A-Za-z]{10}").expect("Failed to create tag regex strategy")
}

/// Strategy for generating hexadecimal tags, as real readers send.
fn hex_tag_id() -> impl Strategy<Value = String> {
    prop::string::string_regex("[0-9A-F]{10}").expect("Failed to create hex tag regex strategy")
}

proptest! {
    /// Property: the tag is always the ten characters after STX, whatever
    /// line terminator follows.
    #[test]
    fn prop_tag_extraction(id in tag_id(), terminator in prop_oneof![Just("\n"), Just("\r\n"), Just("")]) {
        let line = format!("\x02{}{}", id, terminator);
        let frame = RfidFrame::parse(line.as_bytes()).unwrap();
        prop_assert_eq!(frame.tag().as_str(), id.as_str());
    }

    /// Property: encoded frames with a checksum always verify.
    #[test]
    fn prop_checksum_verifies(id in hex_tag_id()) {
        let tag = RfidTag::new(id).unwrap();
        let wire = RfidFrame::encode(&tag, true);
        let frame = RfidFrame::parse(&wire).unwrap();
        prop_assert_eq!(frame.tag(), &tag);
        prop_assert!(frame.verify_checksum().unwrap());
    }

    /// Property: lines not starting with STX are always rejected.
    #[test]
    fn prop_missing_stx_rejected(first in any::<u8>().prop_filter("not STX", |b| *b != 0x02), id in tag_id()) {
        let mut line = vec![first];
        line.extend_from_slice(id.as_bytes());
        line.push(b'\n');
        prop_assert!(RfidFrame::parse(&line).is_err());
    }

    /// Property: a stream of frames is read back in order, each consuming
    /// exactly its own trailer byte.
    #[test]
    fn prop_reader_consumes_frames_in_order(ids in prop::collection::vec(tag_id(), 1..8)) {
        let (platform, handle) = MockPlatform::new();
        let registry = TransportRegistry::new(platform);
        let mut reader = RfidFrameReader::new(&registry, RfidReaderConfig::default()).unwrap();

        for id in &ids {
            handle.push_serial(&RfidFrame::encode(&RfidTag::new(id.clone()).unwrap(), false));
        }
        for id in &ids {
            let tag = reader.get_last_scan().unwrap().unwrap();
            prop_assert_eq!(tag.as_str(), id.as_str());
        }
        prop_assert_eq!(handle.serial_pending(), 0);
        prop_assert!(reader.get_last_scan().unwrap().is_none());
    }
}
