//! Local and remote AT command frames.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{ensure_len, get_addr16, get_addr64, get_command, rest};
use crate::error::PacketError;
use crate::protocol::FrameType;
use crate::types::{AtCommandStatus, RemoteAtOptions, XBee16BitAddress, XBee64BitAddress};

/// Returns the command name as text.
fn command_str(command: [u8; 2]) -> String {
    String::from_utf8_lossy(&command).into_owned()
}

/// Local AT command (`AtCommand` 0x08 and `AtCommandQueue` 0x09).
///
/// Format: `[frame_id:1] [command:2] [parameter...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtCommandPacket {
    /// Frame ID (0 = no response).
    pub frame_id: u8,
    /// Two-character command name.
    pub command: [u8; 2],
    /// Parameter value; empty to query.
    pub parameter: Bytes,
}

impl AtCommandPacket {
    const MIN_LEN: usize = 3;

    /// Creates a new AT command.
    #[must_use]
    pub fn new(frame_id: u8, command: [u8; 2], parameter: impl Into<Bytes>) -> Self {
        Self {
            frame_id,
            command,
            parameter: parameter.into(),
        }
    }

    /// Command name as text.
    #[must_use]
    pub fn command_str(&self) -> String {
        command_str(self.command)
    }

    pub(super) fn parse(frame_type: FrameType, data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(frame_type, data, Self::MIN_LEN)?;
        let mut cursor = data;
        Ok(Self {
            frame_id: cursor.get_u8(),
            command: get_command(&mut cursor),
            parameter: rest(&mut cursor),
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.frame_id);
        buf.put_slice(&self.command);
        buf.put_slice(&self.parameter);
    }
}

/// Local AT command response (0x88).
///
/// Format: `[frame_id:1] [command:2] [status:1] [value...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtCommandResponsePacket {
    /// Frame ID of the request.
    pub frame_id: u8,
    /// Two-character command name.
    pub command: [u8; 2],
    /// Command status.
    pub status: AtCommandStatus,
    /// Returned value; empty for set commands.
    pub value: Bytes,
}

impl AtCommandResponsePacket {
    const MIN_LEN: usize = 4;

    /// Command name as text.
    #[must_use]
    pub fn command_str(&self) -> String {
        command_str(self.command)
    }

    pub(super) fn parse(data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(FrameType::AtCommandResponse, data, Self::MIN_LEN)?;
        let mut cursor = data;
        Ok(Self {
            frame_id: cursor.get_u8(),
            command: get_command(&mut cursor),
            status: AtCommandStatus::from_byte(cursor.get_u8()),
            value: rest(&mut cursor),
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.frame_id);
        buf.put_slice(&self.command);
        buf.put_u8(self.status.to_byte());
        buf.put_slice(&self.value);
    }
}

/// Remote AT command request (0x17).
///
/// Format:
/// ```text
/// [frame_id:1] [dest64:8] [dest16:2] [options:1] [command:2] [parameter...]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAtCommandPacket {
    /// Frame ID (0 = no response).
    pub frame_id: u8,
    /// 64-bit destination address.
    pub destination64: XBee64BitAddress,
    /// 16-bit destination address (`FFFE` if unknown).
    pub destination16: XBee16BitAddress,
    /// Remote command options.
    pub options: RemoteAtOptions,
    /// Two-character command name.
    pub command: [u8; 2],
    /// Parameter value; empty to query.
    pub parameter: Bytes,
}

impl RemoteAtCommandPacket {
    const MIN_LEN: usize = 14;

    pub(super) fn parse(data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(FrameType::RemoteAtCommand, data, Self::MIN_LEN)?;
        let mut cursor = data;
        Ok(Self {
            frame_id: cursor.get_u8(),
            destination64: get_addr64(&mut cursor),
            destination16: get_addr16(&mut cursor),
            options: RemoteAtOptions::from_byte(cursor.get_u8()),
            command: get_command(&mut cursor),
            parameter: rest(&mut cursor),
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.frame_id);
        buf.put_slice(self.destination64.as_bytes());
        buf.put_slice(self.destination16.as_bytes());
        buf.put_u8(self.options.to_byte());
        buf.put_slice(&self.command);
        buf.put_slice(&self.parameter);
    }
}

/// Remote AT command response (0x97).
///
/// Format:
/// ```text
/// [frame_id:1] [src64:8] [src16:2] [command:2] [status:1] [value...]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAtCommandResponsePacket {
    /// Frame ID of the request.
    pub frame_id: u8,
    /// 64-bit address of the responding module.
    pub source64: XBee64BitAddress,
    /// 16-bit address of the responding module.
    pub source16: XBee16BitAddress,
    /// Two-character command name.
    pub command: [u8; 2],
    /// Command status.
    pub status: AtCommandStatus,
    /// Returned value.
    pub value: Bytes,
}

impl RemoteAtCommandResponsePacket {
    const MIN_LEN: usize = 14;

    /// Command name as text.
    #[must_use]
    pub fn command_str(&self) -> String {
        command_str(self.command)
    }

    pub(super) fn parse(data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(FrameType::RemoteAtCommandResponse, data, Self::MIN_LEN)?;
        let mut cursor = data;
        Ok(Self {
            frame_id: cursor.get_u8(),
            source64: get_addr64(&mut cursor),
            source16: get_addr16(&mut cursor),
            command: get_command(&mut cursor),
            status: AtCommandStatus::from_byte(cursor.get_u8()),
            value: rest(&mut cursor),
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.frame_id);
        buf.put_slice(self.source64.as_bytes());
        buf.put_slice(self.source16.as_bytes());
        buf.put_slice(&self.command);
        buf.put_u8(self.status.to_byte());
        buf.put_slice(&self.value);
    }
}
