//! Feed handler: decode a datagram of concatenated market-data records.
//!
//! Records are packed back to back with no delimiter; the leading tag byte
//! of each record determines its size. The handler decodes each record and
//! pushes it onto the supplied ring. It never blocks and never allocates;
//! a failed push is counted by the ring itself and is not retried here.

use std::fmt;

use crate::ring::SpscRing;
use crate::wire::MarketDataMessage;

/// Why a packet could not be fully parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketError {
    /// The bytes remaining are shorter than the record the tag announces.
    Truncated {
        /// Offset of the offending record.
        at: usize,
        /// Bytes the tag requires.
        needed: usize,
        /// Bytes actually remaining.
        remaining: usize,
    },
    /// The tag byte does not name any known record type.
    UnknownType {
        /// Offset of the offending record.
        at: usize,
        /// The unrecognized tag.
        tag: u8,
    },
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketError::Truncated {
                at,
                needed,
                remaining,
            } => write!(
                f,
                "packet truncated at offset {at}: record needs {needed} bytes, {remaining} remain"
            ),
            PacketError::UnknownType { at, tag } => {
                write!(f, "unknown message type {tag:#04x} at offset {at}")
            }
        }
    }
}

impl std::error::Error for PacketError {}

/// Parse every record in `packet` and push each onto `sink`.
///
/// Returns the number of records decoded on success. On error, records
/// preceding the malformed one have already been pushed and are not rolled
/// back — downstream must tolerate partial packets.
pub fn parse_packet<const N: usize>(
    packet: &[u8],
    sink: &SpscRing<MarketDataMessage, N>,
) -> Result<usize, PacketError> {
    let mut offset = 0;
    let mut decoded = 0;

    while offset < packet.len() {
        let tag = packet[offset];
        let size = MarketDataMessage::record_size(tag)
            .ok_or(PacketError::UnknownType { at: offset, tag })?;

        let remaining = packet.len() - offset;
        if size > remaining {
            return Err(PacketError::Truncated {
                at: offset,
                needed: size,
                remaining,
            });
        }

        let message = MarketDataMessage::decode(&packet[offset..offset + size]);
        // A full ring counts the drop itself; the parser moves on.
        sink.try_push(message);

        offset += size;
        decoded += 1;
    }

    Ok(decoded)
}
