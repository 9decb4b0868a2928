use boardkit_core::constants::{
    ETX, RFID_CHECKSUM_LENGTH, RFID_MIN_LINE_LENGTH, RFID_TAG_LENGTH, STX,
};
use boardkit_core::{Error, Result};
use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A 10-character tag identifier.
///
/// Readers in this family report the tag as ten ASCII characters, normally
/// upper-case hexadecimal (a 1-byte version plus a 4-byte serial number).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RfidTag(String);

impl RfidTag {
    /// Create a tag identifier with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidFrame` unless `id` is exactly ten ASCII
    /// alphanumeric characters.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.len() != RFID_TAG_LENGTH {
            return Err(Error::invalid_frame(format!(
                "tag must be {} characters, got {}",
                RFID_TAG_LENGTH,
                id.len()
            )));
        }
        if !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(Error::invalid_frame(format!(
                "tag {:?} contains non-alphanumeric characters",
                id
            )));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The five bytes the tag encodes, if it is hexadecimal.
    pub fn to_bytes(&self) -> Option<[u8; RFID_TAG_LENGTH / 2]> {
        let mut bytes = [0u8; RFID_TAG_LENGTH / 2];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = parse_hex_byte(&self.0.as_bytes()[i * 2..i * 2 + 2])?;
        }
        Some(bytes)
    }

    /// XOR of the tag bytes, as sent after the tag by checksumming readers.
    pub fn checksum(&self) -> Option<u8> {
        self.to_bytes()
            .map(|bytes| bytes.iter().fold(0u8, |acc, &b| acc ^ b))
    }
}

impl fmt::Display for RfidTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RfidTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for RfidTag {
    type Error = Error;

    fn try_from(id: String) -> Result<Self> {
        Self::new(id)
    }
}

impl From<RfidTag> for String {
    fn from(tag: RfidTag) -> String {
        tag.0
    }
}

fn parse_hex_byte(pair: &[u8]) -> Option<u8> {
    let text = std::str::from_utf8(pair).ok()?;
    u8::from_str_radix(text, 16).ok()
}

/// One decoded reader line.
///
/// # Wire Format
/// ```text
/// STX  T T T T T T T T T T  [C C]  CR LF   ETX
/// 0x02 <------ tag ------>  xor    line    0x03 (read separately)
/// ```
///
/// The tag is the ten characters after STX. Readers that checksum append
/// two hex characters: the XOR of the five tag bytes. ETX follows the line
/// terminator and is consumed by the reader, not part of the frame.
///
/// # Example
/// ```
/// use boardkit_rfid::RfidFrame;
///
/// let frame = RfidFrame::parse(b"\x026F008B2A3E\r\n").unwrap();
/// assert_eq!(frame.tag().as_str(), "6F008B2A3E");
/// assert_eq!(frame.checksum(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RfidFrame {
    /// Raw line as received, terminator included
    raw: Bytes,

    /// Tag identifier
    tag: RfidTag,

    /// Checksum sent after the tag, if any
    checksum: Option<u8>,
}

impl RfidFrame {
    /// Decode one line read from the reader.
    ///
    /// Trailing CR/LF and a stray in-line ETX are ignored. Anything after the
    /// tag that is not two hex characters is ignored too.
    ///
    /// # Errors
    /// Returns `Error::InvalidFrame` if the line is shorter than STX plus a
    /// tag, does not start with STX, or the tag is not alphanumeric.
    pub fn parse(line: &[u8]) -> Result<Self> {
        let body = trim_line(line);
        if body.len() < RFID_MIN_LINE_LENGTH {
            return Err(Error::invalid_frame(format!(
                "line too short: {} bytes, need {}",
                body.len(),
                RFID_MIN_LINE_LENGTH
            )));
        }
        if body[0] != STX {
            return Err(Error::invalid_frame(format!(
                "expected STX (0x{:02X}), got 0x{:02X}",
                STX, body[0]
            )));
        }

        let tag_bytes = &body[1..RFID_MIN_LINE_LENGTH];
        let tag = std::str::from_utf8(tag_bytes)
            .map_err(|e| Error::invalid_frame(format!("tag is not ASCII: {}", e)))
            .and_then(RfidTag::new)?;

        let trailer = &body[RFID_MIN_LINE_LENGTH..];
        let checksum = trailer
            .get(..RFID_CHECKSUM_LENGTH)
            .and_then(parse_hex_byte);

        Ok(Self {
            raw: Bytes::copy_from_slice(line),
            tag,
            checksum,
        })
    }

    /// Wire bytes for `tag`: STX, tag, optional checksum, CR LF, ETX.
    pub fn encode(tag: &RfidTag, with_checksum: bool) -> Bytes {
        let mut buf = BytesMut::with_capacity(RFID_MIN_LINE_LENGTH + RFID_CHECKSUM_LENGTH + 3);
        buf.put_u8(STX);
        buf.put_slice(tag.as_str().as_bytes());
        if with_checksum && let Some(checksum) = tag.checksum() {
            buf.put_slice(format!("{:02X}", checksum).as_bytes());
        }
        buf.put_slice(b"\r\n");
        buf.put_u8(ETX);
        buf.freeze()
    }

    pub fn tag(&self) -> &RfidTag {
        &self.tag
    }

    pub fn into_tag(self) -> RfidTag {
        self.tag
    }

    /// Checksum sent with the frame, if any.
    pub fn checksum(&self) -> Option<u8> {
        self.checksum
    }

    /// Raw line as received.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Verify the sent checksum against the tag.
    ///
    /// # Returns
    /// - `Ok(true)` if a checksum was sent and matches
    /// - `Ok(false)` if no checksum was sent (nothing to verify)
    /// - `Err(ChecksumMismatch)` if it does not match
    ///
    /// # Errors
    /// Returns `Error::InvalidFrame` if a checksum was sent but the tag is
    /// not hexadecimal.
    pub fn verify_checksum(&self) -> Result<bool> {
        let Some(actual) = self.checksum else {
            return Ok(false);
        };
        let expected = self.tag.checksum().ok_or_else(|| {
            Error::invalid_frame(format!("tag {} is not hexadecimal", self.tag))
        })?;
        if expected == actual {
            Ok(true)
        } else {
            Err(Error::ChecksumMismatch { expected, actual })
        }
    }
}

/// Strip the line terminator and an ETX that arrived before it.
fn trim_line(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\r' | b'\n' | ETX) {
        end -= 1;
    }
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"\x02AB12345678\n".as_slice(), "AB12345678", None)]
    #[case(b"\x026F008B2A3E\r\n".as_slice(), "6F008B2A3E", None)]
    #[case(b"\x026F008B2A3EF0\r\n".as_slice(), "6F008B2A3E", Some(0xF0))]
    #[case(b"\x020415AB7C9D\x03".as_slice(), "0415AB7C9D", None)]
    #[case(b"\x02AB12345678".as_slice(), "AB12345678", None)]
    #[case(b"\x02AB12345678zz\n".as_slice(), "AB12345678", None)]
    fn test_parse_valid(#[case] line: &[u8], #[case] tag: &str, #[case] checksum: Option<u8>) {
        let frame = RfidFrame::parse(line).unwrap();
        assert_eq!(frame.tag().as_str(), tag);
        assert_eq!(frame.checksum(), checksum);
        assert_eq!(frame.as_bytes(), line);
    }

    #[rstest]
    #[case(b"".as_slice())]
    #[case(b"\n".as_slice())]
    #[case(b"\x02AB1234\n".as_slice())]
    #[case(b"AB12345678X\n".as_slice())]
    #[case(b"\x02AB-2345678\n".as_slice())]
    #[case(b"\x02AB 2345678\n".as_slice())]
    fn test_parse_invalid(#[case] line: &[u8]) {
        assert!(matches!(
            RfidFrame::parse(line),
            Err(Error::InvalidFrame { .. })
        ));
    }

    #[test]
    fn test_tag_checksum() {
        // 6F ^ 00 ^ 8B ^ 2A ^ 3E
        let tag = RfidTag::new("6F008B2A3E").unwrap();
        assert_eq!(tag.to_bytes(), Some([0x6F, 0x00, 0x8B, 0x2A, 0x3E]));
        assert_eq!(tag.checksum(), Some(0xF0));

        let tag = RfidTag::new("ZZ12345678").unwrap();
        assert_eq!(tag.checksum(), None);
    }

    #[test]
    fn test_verify_checksum() {
        let frame = RfidFrame::parse(b"\x026F008B2A3EF0\r\n").unwrap();
        assert!(frame.verify_checksum().unwrap());

        let frame = RfidFrame::parse(b"\x026F008B2A3E\r\n").unwrap();
        assert!(!frame.verify_checksum().unwrap());

        let frame = RfidFrame::parse(b"\x026F008B2A3E00\r\n").unwrap();
        assert!(matches!(
            frame.verify_checksum(),
            Err(Error::ChecksumMismatch {
                expected: 0xF0,
                actual: 0x00
            })
        ));
    }

    #[test]
    fn test_verify_checksum_on_non_hex_tag() {
        let frame = RfidFrame::parse(b"\x02ZZ1234567800\r\n").unwrap();
        assert_eq!(frame.checksum(), Some(0x00));
        assert!(matches!(
            frame.verify_checksum(),
            Err(Error::InvalidFrame { .. })
        ));
    }

    #[test]
    fn test_encode() {
        let tag = RfidTag::new("6F008B2A3E").unwrap();
        assert_eq!(
            RfidFrame::encode(&tag, true).as_ref(),
            b"\x026F008B2A3EF0\r\n\x03"
        );
        assert_eq!(RfidFrame::encode(&tag, false).as_ref(), b"\x026F008B2A3E\r\n\x03");
    }

    #[rstest]
    #[case("AB12345678", true)]
    #[case("ab12345678", true)]
    #[case("AB1234567", false)]
    #[case("AB123456789", false)]
    #[case("AB1234567!", false)]
    fn test_tag_validation(#[case] id: &str, #[case] valid: bool) {
        assert_eq!(id.parse::<RfidTag>().is_ok(), valid);
    }

    #[test]
    fn test_tag_serde() {
        let tag = RfidTag::new("AB12345678").unwrap();
        assert_eq!(serde_json::to_string(&tag).unwrap(), r#""AB12345678""#);
        assert!(serde_json::from_str::<RfidTag>(r#""short""#).is_err());
    }
}
