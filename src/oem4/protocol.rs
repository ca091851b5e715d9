//! # OEM4 Protocol Constants and Types
//!
//! Core definitions for the OEM4 binary message format: sync pattern, header
//! geometry, message ids, and the typed navigation data extracted from
//! position/velocity/time logs.
//!
//! Status and type fields are closed enumerations with an explicit
//! `Unrecognized` variant because the wire format can legally carry reserved
//! codes this driver does not know about.

use serde::Serialize;

/// Frame sync pattern, always the first three bytes of a frame
pub const SYNC_BYTES: [u8; 3] = [0xAA, 0x44, 0x12];

/// Header bytes following the sync pattern on the wire
pub const HEADER_SIZE: usize = 25;

/// Header size including the sync pattern; this is the value the
/// header-length byte carries
pub const FULL_HEADER_SIZE: usize = 28;

/// Trailing checksum size in bytes
pub const CHECKSUM_SIZE: usize = 4;

/// LOG command id (and the id of its response)
pub const MSG_LOG: u16 = 1;

/// UNLOG command id
pub const MSG_UNLOG: u16 = 36;

/// BESTXYZ position/velocity/time report id
pub const MSG_BESTXYZ: u16 = 241;

/// RTKXYZ position/velocity/time report id
pub const MSG_RTKXYZ: u16 = 244;

/// Port address used for commands addressed to the connected port
pub const PORT_ADDRESS: u8 = 192;

/// LOG trigger: report periodically ("on time")
pub const TRIGGER_ONTIME: u32 = 2;

/// Bytes of a position/velocity/time payload this driver interprets,
/// through the satellite-count byte
pub const PVT_PAYLOAD_SIZE: usize = 105;

/// Quality of the receiver's time solution (header field, one byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeStatus {
    Unknown,
    Approximate,
    CoarseAdjusting,
    Coarse,
    CoarseSteering,
    FreeWheeling,
    FineAdjusting,
    Fine,
    FineSteering,
    SatTime,
    /// Reserved or unpublished code
    Unrecognized(u8),
}

impl TimeStatus {
    /// Map a wire code to a time status
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            20 => Self::Unknown,
            60 => Self::Approximate,
            80 => Self::CoarseAdjusting,
            100 => Self::Coarse,
            120 => Self::CoarseSteering,
            130 => Self::FreeWheeling,
            140 => Self::FineAdjusting,
            160 => Self::Fine,
            180 => Self::FineSteering,
            200 => Self::SatTime,
            other => Self::Unrecognized(other),
        }
    }
}

/// Solution status reported for both the position and the velocity solution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolutionStatus {
    Computed,
    InsufficientObservations,
    NoConvergence,
    Singularity,
    CovarianceTrace,
    TestDistance,
    ColdStart,
    VelocityHeightLimit,
    Variance,
    Residuals,
    /// Reserved or unpublished code
    Unrecognized(u32),
}

impl SolutionStatus {
    /// Map a wire code to a solution status
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::Computed,
            1 => Self::InsufficientObservations,
            2 => Self::NoConvergence,
            3 => Self::Singularity,
            4 => Self::CovarianceTrace,
            5 => Self::TestDistance,
            6 => Self::ColdStart,
            7 => Self::VelocityHeightLimit,
            8 => Self::Variance,
            9 => Self::Residuals,
            other => Self::Unrecognized(other),
        }
    }
}

/// Position or velocity solution type; both fields draw from the same table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolutionType {
    None,
    FixedPosition,
    FixedHeight,
    DopplerVelocity,
    Single,
    PsrDiff,
    Waas,
    Propagated,
    L1Float,
    IonoFreeFloat,
    NarrowFloat,
    L1Integer,
    WideIntegers,
    NarrowIntegers,
    /// Reserved or unpublished code
    Unrecognized(u32),
}

impl SolutionType {
    /// Map a wire code to a solution type
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => Self::None,
            1 => Self::FixedPosition,
            2 => Self::FixedHeight,
            8 => Self::DopplerVelocity,
            16 => Self::Single,
            17 => Self::PsrDiff,
            18 => Self::Waas,
            19 => Self::Propagated,
            32 => Self::L1Float,
            33 => Self::IonoFreeFloat,
            34 => Self::NarrowFloat,
            48 => Self::L1Integer,
            49 => Self::WideIntegers,
            50 => Self::NarrowIntegers,
            other => Self::Unrecognized(other),
        }
    }
}

/// Receiver status answered to a LOG/UNLOG command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResponseStatus {
    /// Command accepted
    Ok,
    /// The receiver computed a different checksum for our command
    InvalidChecksum,
    /// Any other (error) response code
    Unrecognized(u32),
}

impl ResponseStatus {
    /// Map a wire code to a response status
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => Self::Ok,
            8 => Self::InvalidChecksum,
            other => Self::Unrecognized(other),
        }
    }
}

/// GPS time carried in every frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GpsTime {
    /// GPS week number
    pub week: u16,

    /// Milliseconds into the GPS week
    pub milliseconds: u32,

    /// Quality of the time solution
    pub status: TimeStatus,
}

/// Decoded output of one accepted position/velocity/time frame
///
/// Wire-native fields come straight from the payload layout; the geodetic
/// position and the NED-frame vectors are derived from the ECEF values
/// during decoding. Constructed fresh per accepted frame and handed to the
/// sink, never retained by the driver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NavigationSample {
    /// GPS time from the frame header
    pub gps_time: GpsTime,

    /// Position solution status
    pub position_status: SolutionStatus,

    /// Position solution type
    pub position_type: SolutionType,

    /// ECEF position in meters
    pub ecef_position: [f64; 3],

    /// ECEF position standard deviation in meters
    pub ecef_position_sigma: [f32; 3],

    /// Velocity solution status
    pub velocity_status: SolutionStatus,

    /// Velocity solution type
    pub velocity_type: SolutionType,

    /// ECEF velocity in meters per second
    pub ecef_velocity: [f64; 3],

    /// ECEF velocity standard deviation in meters per second
    pub ecef_velocity_sigma: [f32; 3],

    /// Number of satellites used in the solution
    pub satellites: u8,

    /// Geodetic position: latitude (rad), longitude (rad), height (m)
    pub llh_position: [f64; 3],

    /// Position standard deviation rotated into the local NED frame
    pub ned_position_sigma: [f32; 3],

    /// Velocity rotated into the local NED frame, meters per second
    pub ned_velocity: [f64; 3],

    /// Velocity standard deviation rotated into the local NED frame
    pub ned_velocity_sigma: [f32; 3],
}
