//! # OEM4 Command Builder
//!
//! Builds the two outbound receiver-control commands: LOG (start periodic
//! telemetry) and UNLOG (stop it). Both are assembled as
//! header ++ payload ++ checksum(header ++ payload) and are ready for a
//! single transport write.

use bytes::{BufMut, BytesMut};

use super::crc::crc32;
use super::frame::encode_header;
use super::protocol::*;

/// LOG payload: port + message id + 2 reserved + trigger + period +
/// offset + 4 reserved
const LOG_PAYLOAD_SIZE: u16 = 24;

/// UNLOG payload: port + message id + 2 reserved
const UNLOG_PAYLOAD_SIZE: u16 = 8;

/// Build a LOG command requesting a telemetry message at a fixed period
///
/// # Arguments
///
/// * `message_id` - Telemetry message to start (e.g. [`MSG_BESTXYZ`])
/// * `period_s` - Reporting period in seconds (0.25 for the nominal 4 Hz)
/// * `offset_s` - Offset from the period boundary in seconds
///
/// # Returns
///
/// * `Vec<u8>` - Complete command frame, checksum appended
pub fn build_log_command(message_id: u16, period_s: f32, offset_s: f32) -> Vec<u8> {
    let mut command = BytesMut::with_capacity(
        FULL_HEADER_SIZE + LOG_PAYLOAD_SIZE as usize + CHECKSUM_SIZE,
    );

    command.put_slice(&encode_header(MSG_LOG, LOG_PAYLOAD_SIZE));
    command.put_u32_le(PORT_ADDRESS as u32);
    command.put_u16_le(message_id);
    command.put_bytes(0, 2);
    command.put_u32_le(TRIGGER_ONTIME);
    command.put_f32_le(period_s);
    command.put_f32_le(offset_s);
    command.put_bytes(0, 4);

    seal(command)
}

/// Build an UNLOG command stopping a telemetry message
///
/// # Arguments
///
/// * `message_id` - Telemetry message to stop
///
/// # Returns
///
/// * `Vec<u8>` - Complete command frame, checksum appended
pub fn build_unlog_command(message_id: u16) -> Vec<u8> {
    let mut command = BytesMut::with_capacity(
        FULL_HEADER_SIZE + UNLOG_PAYLOAD_SIZE as usize + CHECKSUM_SIZE,
    );

    command.put_slice(&encode_header(MSG_UNLOG, UNLOG_PAYLOAD_SIZE));
    command.put_u32_le(PORT_ADDRESS as u32);
    command.put_u16_le(message_id);
    command.put_bytes(0, 2);

    seal(command)
}

/// Append the checksum over everything assembled so far
fn seal(mut command: BytesMut) -> Vec<u8> {
    let crc = crc32(&command);
    command.put_u32_le(crc);
    command.to_vec()
}
