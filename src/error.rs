//! Error types for the xbee library.

use thiserror::Error;

use crate::types::{AtCommandStatus, DeliveryStatus};

/// The main error type for xbee operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Serial port error.
    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame encoding/decoding error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Packet payload could not be parsed.
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),

    /// Invalid argument passed to an encoding helper or command.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Request timed out waiting for its response.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The connection was closed or broke while a request was outstanding.
    #[error("transport closed")]
    TransportClosed,

    /// Connection is not established.
    #[error("not connected")]
    NotConnected,

    /// The module answered an AT command with a non-OK status.
    #[error("AT command {command} failed: {status}")]
    AtCommand {
        command: String,
        status: AtCommandStatus,
    },

    /// A transmission was not delivered.
    #[error("transmit failed: {status}")]
    Transmit { status: DeliveryStatus },

    /// The module answered with an unexpected packet.
    #[error("protocol error: {message}")]
    Protocol { message: String },
}

impl Error {
    pub(crate) fn timeout(timeout: std::time::Duration) -> Self {
        Self::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Frame-level errors: anything wrong with the API envelope.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The byte where a frame should start was not the start delimiter.
    #[error("invalid start delimiter: skipped {skipped} byte(s)")]
    InvalidDelimiter { skipped: usize },

    /// The stream ended (or a new frame started) before the frame was complete.
    #[error("incomplete frame: expected {expected} bytes, got {got}")]
    Incomplete { expected: usize, got: usize },

    /// The checksum byte did not match the payload.
    #[error("checksum mismatch: computed 0x{computed:02x}, received 0x{received:02x}")]
    Checksum { computed: u8, received: u8 },

    /// Frame payload exceeds maximum size.
    #[error("frame too large: {size} bytes exceeds maximum {max}")]
    TooLarge { size: usize, max: usize },
}

/// Packet-level errors: a valid frame whose payload does not fit its type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    /// The frame carried no bytes at all, not even a frame type.
    #[error("empty packet")]
    Empty,

    /// Payload too short or structurally invalid for its frame type.
    #[error("malformed {name} packet (0x{frame_type:02x}): {reason}")]
    Malformed {
        frame_type: u8,
        name: &'static str,
        reason: String,
    },
}

/// Result type alias for xbee operations.
pub type Result<T> = std::result::Result<T, Error>;
