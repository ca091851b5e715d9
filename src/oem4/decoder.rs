//! # OEM4 Message Decoder
//!
//! Interprets a validated frame's payload according to its message id:
//! command responses on the LOG id, and the two position/velocity/time
//! reports (BESTXYZ and RTKXYZ, identical payload layouts for alternate
//! solution types).

use bytes::Buf;
use tracing::debug;

use super::frame::FrameHeader;
use super::protocol::*;
use crate::error::{NovatelError, Result};
use crate::geo;

/// Outcome of decoding one validated frame
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// The receiver acknowledged (or rejected) a LOG command
    LogResponse(ResponseStatus),

    /// A telemetry report carrying a full navigation solution
    Navigation(Box<NavigationSample>),

    /// A response frame with no decodable content; already traced
    ResponseDiscarded,
}

/// Decode a validated frame's payload, dispatching on the header's
/// message id
///
/// A non-response frame on the LOG id is decoded as telemetry: the
/// response bit, not the id, is the authoritative direction discriminator
/// for that id.
///
/// # Errors
///
/// * [`NovatelError::UnexpectedMessageId`] for ids this driver does not
///   handle (framing was valid, no resync needed)
/// * [`NovatelError::MalformedFrame`] for payloads shorter than their
///   message layout
pub fn decode(header: &FrameHeader, payload: &[u8]) -> Result<Decoded> {
    if header.is_response() && payload.len() > 4 {
        // responses carry a short ASCII description after the status code
        debug!(
            id = header.message_id,
            text = %String::from_utf8_lossy(&payload[4..]),
            "receiver response"
        );
    }

    match (header.message_id, header.is_response()) {
        (MSG_LOG, true) => {
            if payload.len() < 4 {
                return Err(NovatelError::MalformedFrame(format!(
                    "response payload is {} bytes, need 4",
                    payload.len()
                )));
            }
            let status = ResponseStatus::from_raw((&payload[..4]).get_u32_le());
            Ok(Decoded::LogResponse(status))
        }
        (MSG_BESTXYZ, false) | (MSG_RTKXYZ, false) | (MSG_LOG, false) => Ok(
            Decoded::Navigation(Box::new(decode_navigation(header, payload)?)),
        ),
        (MSG_BESTXYZ, true) | (MSG_RTKXYZ, true) => Ok(Decoded::ResponseDiscarded),
        (id, _) => Err(NovatelError::UnexpectedMessageId(id)),
    }
}

/// Decode a position/velocity/time payload into a [`NavigationSample`]
///
/// Field offsets are fixed by the report layout; the geodetic position and
/// the NED-frame vectors are derived from the ECEF values here so every
/// sample leaves the decoder complete.
fn decode_navigation(header: &FrameHeader, payload: &[u8]) -> Result<NavigationSample> {
    if payload.len() < PVT_PAYLOAD_SIZE {
        return Err(NovatelError::MalformedFrame(format!(
            "navigation payload is {} bytes, need {}",
            payload.len(),
            PVT_PAYLOAD_SIZE
        )));
    }

    let mut buf = payload;
    let position_status = SolutionStatus::from_raw(buf.get_u32_le());
    let position_type = SolutionType::from_raw(buf.get_u32_le());
    let ecef_position = [buf.get_f64_le(), buf.get_f64_le(), buf.get_f64_le()];
    let ecef_position_sigma = [buf.get_f32_le(), buf.get_f32_le(), buf.get_f32_le()];
    let velocity_status = SolutionStatus::from_raw(buf.get_u32_le());
    let velocity_type = SolutionType::from_raw(buf.get_u32_le());
    let ecef_velocity = [buf.get_f64_le(), buf.get_f64_le(), buf.get_f64_le()];
    let ecef_velocity_sigma = [buf.get_f32_le(), buf.get_f32_le(), buf.get_f32_le()];
    buf.advance(16); // station id, latency, age
    let satellites = buf.get_u8();

    let llh_position = geo::ecef_to_llh(ecef_position);
    let (latitude, longitude) = (llh_position[0], llh_position[1]);

    Ok(NavigationSample {
        gps_time: header.gps_time(),
        position_status,
        position_type,
        ecef_position,
        ecef_position_sigma,
        velocity_status,
        velocity_type,
        ecef_velocity,
        ecef_velocity_sigma,
        satellites,
        llh_position,
        ned_position_sigma: geo::ecef_vector_to_ned_f32(ecef_position_sigma, latitude, longitude),
        ned_velocity: geo::ecef_vector_to_ned(ecef_velocity, latitude, longitude),
        ned_velocity_sigma: geo::ecef_vector_to_ned_f32(ecef_velocity_sigma, latitude, longitude),
    })
}
