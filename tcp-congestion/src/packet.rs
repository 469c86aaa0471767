//! Wire-format definitions for the two datagram kinds.
//!
//! Every datagram carries exactly one message and has no header, length
//! prefix, or checksum:
//!
//! ```text
//!  sender   → receiver :  "<seq>"            e.g. "17"
//!  receiver → sender   :  "ACK:<frontier>"   e.g. "ACK:16", "ACK:-1"
//! ```
//!
//! The ACK carries the receiver's cumulative frontier, i.e. the highest
//! sequence number for which every earlier segment has arrived.  Before
//! segment `0` has been accepted the frontier is empty and travels as `-1`.
//!
//! No I/O happens here.

use std::fmt;

use thiserror::Error;

/// Prefix of every acknowledgement datagram.
pub const ACK_PREFIX: &str = "ACK:";

/// Wire spelling of an empty frontier.
const NO_FRONTIER: &str = "-1";

/// A data segment identified only by its sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub seq: u32,
}

impl Segment {
    pub fn new(seq: u32) -> Self {
        Self { seq }
    }

    /// Serialise as the ASCII decimal sequence number.
    pub fn encode(&self) -> Vec<u8> {
        self.seq.to_string().into_bytes()
    }

    /// Parse a segment datagram.  Anything other than a plain decimal `u32`
    /// is rejected.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        let text = std::str::from_utf8(buf).map_err(|_| PacketError::NotUtf8)?;
        let seq = parse_decimal(text)
            .ok_or_else(|| PacketError::BadSequence(text.to_owned()))?;
        Ok(Self { seq })
    }
}

/// A cumulative acknowledgement.
///
/// `frontier == None` means "nothing delivered in order yet".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ack {
    pub frontier: Option<u32>,
}

impl Ack {
    pub fn new(frontier: Option<u32>) -> Self {
        Self { frontier }
    }

    /// `true` when this ACK covers `seq`.
    pub fn covers(&self, seq: u32) -> bool {
        self.frontier.is_some_and(|f| seq <= f)
    }

    /// The first sequence number the receiver is still missing.
    pub fn next_expected(&self) -> u32 {
        self.frontier.map_or(0, |f| f.saturating_add(1))
    }

    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Parse an ACK datagram.
    ///
    /// There is no partial parsing: a payload that is not exactly
    /// `ACK:<u32>` or `ACK:-1` is an error.
    pub fn decode(buf: &[u8]) -> Result<Self, PacketError> {
        let text = std::str::from_utf8(buf).map_err(|_| PacketError::NotUtf8)?;
        let number = text
            .strip_prefix(ACK_PREFIX)
            .ok_or_else(|| PacketError::MissingAckPrefix(text.to_owned()))?;
        if number == NO_FRONTIER {
            return Ok(Self { frontier: None });
        }
        let frontier = parse_decimal(number)
            .ok_or_else(|| PacketError::BadAckNumber(text.to_owned()))?;
        Ok(Self {
            frontier: Some(frontier),
        })
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frontier {
            Some(n) => write!(f, "{ACK_PREFIX}{n}"),
            None => write!(f, "{ACK_PREFIX}{NO_FRONTIER}"),
        }
    }
}

/// Canonical decimal `u32`: ASCII digits only, no sign, no leading zero.
fn parse_decimal(text: &str) -> Option<u32> {
    let canonical = !text.is_empty()
        && text.bytes().all(|b| b.is_ascii_digit())
        && (text == "0" || !text.starts_with('0'));
    if !canonical {
        return None;
    }
    text.parse().ok()
}

/// Errors that can arise when parsing a raw datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PacketError {
    #[error("datagram is not valid UTF-8")]
    NotUtf8,
    #[error("segment payload {0:?} is not a decimal sequence number")]
    BadSequence(String),
    #[error("acknowledgement {0:?} lacks the \"ACK:\" prefix")]
    MissingAckPrefix(String),
    #[error("acknowledgement {0:?} carries an invalid number")]
    BadAckNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_is_plain_decimal() {
        assert_eq!(Segment::new(42).encode(), b"42");
        assert_eq!(Segment::decode(b"0").unwrap(), Segment::new(0));
    }

    #[test]
    fn segment_rejects_garbage() {
        assert_eq!(
            Segment::decode(b"4x"),
            Err(PacketError::BadSequence("4x".into()))
        );
        assert_eq!(
            Segment::decode(b"-3"),
            Err(PacketError::BadSequence("-3".into()))
        );
        assert_eq!(Segment::decode(&[0xff, 0xfe]), Err(PacketError::NotUtf8));
    }

    #[test]
    fn ack_wire_spelling() {
        assert_eq!(Ack::new(Some(16)).encode(), b"ACK:16");
        assert_eq!(Ack::new(None).encode(), b"ACK:-1");
        assert_eq!(Ack::decode(b"ACK:-1").unwrap(), Ack::new(None));
        assert_eq!(Ack::decode(b"ACK:99").unwrap(), Ack::new(Some(99)));
    }

    #[test]
    fn ack_without_prefix_is_malformed() {
        assert_eq!(
            Ack::decode(b"NAK:3"),
            Err(PacketError::MissingAckPrefix("NAK:3".into()))
        );
    }

    #[test]
    fn ack_with_trailing_bytes_is_malformed() {
        assert_eq!(
            Ack::decode(b"ACK:3 "),
            Err(PacketError::BadAckNumber("ACK:3 ".into()))
        );
        assert_eq!(
            Ack::decode(b"ACK:"),
            Err(PacketError::BadAckNumber("ACK:".into()))
        );
    }

    #[test]
    fn signs_and_padding_are_rejected() {
        for payload in ["+5", "007", " 5", "4294967296"] {
            assert_eq!(
                Segment::decode(payload.as_bytes()),
                Err(PacketError::BadSequence(payload.into()))
            );
            let ack = format!("ACK:{payload}");
            assert_eq!(
                Ack::decode(ack.as_bytes()),
                Err(PacketError::BadAckNumber(ack.clone()))
            );
        }
        assert_eq!(
            Ack::decode(b"ACK:-2"),
            Err(PacketError::BadAckNumber("ACK:-2".into()))
        );
        assert_eq!(Ack::decode(b"ACK:0").unwrap(), Ack::new(Some(0)));
    }

    #[test]
    fn covers_and_next_expected() {
        let none = Ack::new(None);
        assert!(!none.covers(0));
        assert_eq!(none.next_expected(), 0);

        let five = Ack::new(Some(5));
        assert!(five.covers(0));
        assert!(five.covers(5));
        assert!(!five.covers(6));
        assert_eq!(five.next_expected(), 6);
    }
}
