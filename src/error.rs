//! # Error Types
//!
//! Custom error types for the NovAtel link using `thiserror`.

use std::time::Duration;

use thiserror::Error;

use crate::oem4::protocol::ResponseStatus;

/// Main error type for the NovAtel link
#[derive(Debug, Error)]
pub enum NovatelError {
    /// Serial device could not be opened. Fatal: the host application
    /// decides whether to retry or terminate.
    #[error("failed to open GPS serial port: {0}")]
    TransportOpen(String),

    /// Serial device rejected its line configuration. Fatal, like
    /// [`NovatelError::TransportOpen`].
    #[error("failed to configure GPS serial port: {0}")]
    TransportConfig(String),

    /// A timed read delivered fewer bytes than the current frame stage
    /// needs. The frame candidate is abandoned and the loop resynchronizes.
    #[error("short read while receiving {stage}: expected {expected} bytes, got {got}")]
    ShortRead {
        stage: &'static str,
        expected: usize,
        got: usize,
    },

    /// The trailing checksum did not match the one computed over the frame.
    #[error("checksum mismatch: received {received:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { received: u32, computed: u32 },

    /// A validated frame carried a message id this driver does not handle.
    /// Framing stayed intact, so no resynchronization is needed.
    #[error("unexpected message id {0} from receiver")]
    UnexpectedMessageId(u16),

    /// The receiver answered a command with a non-OK status.
    #[error("receiver error response: {0:?}")]
    ReceiverErrorResponse(ResponseStatus),

    /// No validated frame arrived within the staleness window. Triggers the
    /// watchdog restart sequence, not frame-level recovery.
    #[error("no data received from GPS for {0:?}, restarting telemetry logging")]
    StaleLink(Duration),

    /// Frame contents that cannot be interpreted (truncated header or
    /// payload shorter than its message layout).
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the NovAtel link
pub type Result<T> = std::result::Result<T, NovatelError>;
