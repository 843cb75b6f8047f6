//! Protocol definitions for XBee API communication.
//!
//! This module contains the low-level protocol types including:
//! - Byte-level helpers (big-endian integers, checksums, escaping)
//! - API frame encoding/decoding
//! - Frame type identifiers
//! - The typed packet model

pub mod codec;
pub mod frame;
pub mod frame_type;
pub mod packet;

pub use codec::Checksum;
pub use frame::{
    DecodeState, ENVELOPE_SIZE, FrameDecoder, MAX_FRAME_SIZE, OperatingMode, START_DELIMITER,
    decode_frame, encode_frame,
};
pub use frame_type::FrameType;
pub use packet::{Packet, at_command_name};
