//! # OEM4 Frame Codec
//!
//! Shared framing rules for both the decode and encode paths: the 3-byte
//! sync pattern, the fixed header layout, and checksum placement.
//!
//! All multi-byte scalars are little-endian on the wire. Both directions go
//! through the `bytes` cursors so a layout change cannot drift between
//! encode and decode.

use bytes::{Buf, BufMut};

use super::crc::crc32;
use super::protocol::*;
use crate::error::{NovatelError, Result};

/// Parsed view of the 25 header bytes that follow the sync pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Header length byte (sync included); 28 for every known firmware
    pub header_length: u8,

    /// Message id selecting the payload layout
    pub message_id: u16,

    /// Message type byte; bit 7 marks a response to a command
    pub message_type: u8,

    /// Port the message originated from
    pub port: u8,

    /// Payload bytes between the header and the checksum
    pub payload_length: u16,

    /// Time solution quality at the moment the frame was generated
    pub time_status: TimeStatus,

    /// GPS week number
    pub week: u16,

    /// Milliseconds into the GPS week
    pub milliseconds: u32,
}

impl FrameHeader {
    /// Parse the header bytes that follow the sync pattern
    ///
    /// # Arguments
    ///
    /// * `header` - At least [`HEADER_SIZE`] bytes read after the sync match
    ///
    /// # Errors
    ///
    /// Returns [`NovatelError::MalformedFrame`] if fewer than
    /// [`HEADER_SIZE`] bytes are supplied.
    pub fn parse(header: &[u8]) -> Result<Self> {
        if header.len() < HEADER_SIZE {
            return Err(NovatelError::MalformedFrame(format!(
                "header is {} bytes, need {}",
                header.len(),
                HEADER_SIZE
            )));
        }

        let mut buf = header;
        let header_length = buf.get_u8();
        let message_id = buf.get_u16_le();
        let message_type = buf.get_u8();
        let port = buf.get_u8();
        let payload_length = buf.get_u16_le();
        buf.advance(3); // sequence count + idle time
        let time_status = TimeStatus::from_raw(buf.get_u8());
        let week = buf.get_u16_le();
        let milliseconds = buf.get_u32_le();

        Ok(Self {
            header_length,
            message_id,
            message_type,
            port,
            payload_length,
            time_status,
            week,
            milliseconds,
        })
    }

    /// Whether this frame is a response to a command rather than
    /// unsolicited telemetry
    pub fn is_response(&self) -> bool {
        self.message_type & 0x80 != 0
    }

    /// GPS time carried by this header
    pub fn gps_time(&self) -> GpsTime {
        GpsTime {
            week: self.week,
            milliseconds: self.milliseconds,
            status: self.time_status,
        }
    }
}

/// Build the canonical command header, sync pattern included
///
/// Sync bytes, header-length byte, message id, message type 0 (binary,
/// original message), the connected-port address, the payload length, and
/// zero-filled reserved/time fields.
///
/// # Arguments
///
/// * `message_id` - Command message id
/// * `payload_length` - Exact payload length that will follow the header
///
/// # Returns
///
/// * `[u8; FULL_HEADER_SIZE]` - Complete 28-byte header
pub fn encode_header(message_id: u16, payload_length: u16) -> [u8; FULL_HEADER_SIZE] {
    let mut header = [0u8; FULL_HEADER_SIZE];
    let mut buf = &mut header[..];

    buf.put_slice(&SYNC_BYTES);
    buf.put_u8(FULL_HEADER_SIZE as u8);
    buf.put_u16_le(message_id);
    buf.put_u8(0); // message type
    buf.put_u8(PORT_ADDRESS);
    buf.put_u16_le(payload_length);
    // remaining reserved/time fields stay zero

    header
}

/// Validate the trailing checksum of a complete frame
///
/// The CRC covers everything before the final [`CHECKSUM_SIZE`] bytes:
/// sync pattern, header, and payload.
///
/// # Arguments
///
/// * `frame` - Complete frame, checksum included
///
/// # Returns
///
/// * `bool` - true when the trailing checksum matches the recomputed one
pub fn validate_frame(frame: &[u8]) -> bool {
    if frame.len() < CHECKSUM_SIZE {
        return false;
    }

    let (body, trailer) = frame.split_at(frame.len() - CHECKSUM_SIZE);
    crc32(body).to_le_bytes() == trailer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_header_structure() {
        let header = encode_header(MSG_BESTXYZ, 112);

        assert_eq!(header.len(), FULL_HEADER_SIZE);
        assert_eq!(&header[0..3], &SYNC_BYTES);
        assert_eq!(header[3], FULL_HEADER_SIZE as u8);
        assert_eq!(header[7], PORT_ADDRESS);
        // reserved/time fields are zero-filled
        assert!(header[10..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_header_round_trip() {
        for (id, len) in [(MSG_LOG, 24u16), (MSG_UNLOG, 8), (MSG_BESTXYZ, 112), (0xBEEF, 0)] {
            let encoded = encode_header(id, len);
            let parsed = FrameHeader::parse(&encoded[SYNC_BYTES.len()..]).unwrap();

            assert_eq!(parsed.message_id, id);
            assert_eq!(parsed.payload_length, len);
            assert_eq!(parsed.header_length, FULL_HEADER_SIZE as u8);
            assert!(!parsed.is_response());
        }
    }

    #[test]
    fn test_parse_rejects_truncated_header() {
        let header = encode_header(MSG_LOG, 8);
        let result = FrameHeader::parse(&header[3..20]);
        assert!(matches!(result, Err(NovatelError::MalformedFrame(_))));
    }

    #[test]
    fn test_response_bit() {
        let mut header = encode_header(MSG_LOG, 4);
        let parsed = FrameHeader::parse(&header[3..]).unwrap();
        assert!(!parsed.is_response());

        header[6] |= 0x80; // message type byte
        let parsed = FrameHeader::parse(&header[3..]).unwrap();
        assert!(parsed.is_response());
    }

    #[test]
    fn test_header_time_fields() {
        let mut header = encode_header(MSG_BESTXYZ, 112);
        // time status, week, and milliseconds live at fixed offsets after
        // the reserved fields
        header[13] = 160; // fine
        header[14..16].copy_from_slice(&1842u16.to_le_bytes());
        header[16..20].copy_from_slice(&259_200_000u32.to_le_bytes());

        let parsed = FrameHeader::parse(&header[3..]).unwrap();
        let time = parsed.gps_time();

        assert_eq!(time.status, TimeStatus::Fine);
        assert_eq!(time.week, 1842);
        assert_eq!(time.milliseconds, 259_200_000);
    }

    #[test]
    fn test_validate_frame() {
        let mut frame = Vec::new();
        frame.extend_from_slice(&encode_header(MSG_UNLOG, 2));
        frame.extend_from_slice(&[0x01, 0x02]);
        let crc = crc32(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());

        assert!(validate_frame(&frame));
    }

    #[test]
    fn test_validate_frame_rejects_any_single_byte_mutation() {
        let mut frame = Vec::new();
        frame.extend_from_slice(&encode_header(MSG_UNLOG, 2));
        frame.extend_from_slice(&[0x01, 0x02]);
        let crc = crc32(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());

        for i in 0..frame.len() {
            let mut mutated = frame.clone();
            mutated[i] ^= 0xFF;
            assert!(
                !validate_frame(&mutated),
                "mutation at byte {} was not rejected",
                i
            );
        }
    }

    #[test]
    fn test_validate_frame_too_short() {
        assert!(!validate_frame(&[0x01, 0x02]));
    }
}
