//! Frames reporting received data, IO samples and node announcements.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{ensure_len, get_addr16, get_addr64, malformed, rest};
use crate::error::PacketError;
use crate::protocol::FrameType;
use crate::types::{
    DeviceType, DiscoveredNode, ExplicitAddressing, IoSample, ReceiveOptions, XBee16BitAddress,
    XBee64BitAddress, XBeeMessage,
};

/// Receive packet (0x90).
///
/// Format: `[src64:8] [src16:2] [options:1] [data...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivePacket {
    /// 64-bit source address.
    pub source64: XBee64BitAddress,
    /// 16-bit source address.
    pub source16: XBee16BitAddress,
    /// Receive options.
    pub options: ReceiveOptions,
    /// RF payload.
    pub data: Bytes,
}

impl ReceivePacket {
    const MIN_LEN: usize = 11;

    /// Converts the frame into a received message.
    #[must_use]
    pub fn to_message(&self) -> XBeeMessage {
        XBeeMessage {
            source64: Some(self.source64),
            source16: Some(self.source16),
            options: self.options,
            rssi: None,
            explicit: None,
            data: self.data.clone(),
        }
    }

    pub(super) fn parse(data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(FrameType::Receive, data, Self::MIN_LEN)?;
        let mut cursor = data;
        Ok(Self {
            source64: get_addr64(&mut cursor),
            source16: get_addr16(&mut cursor),
            options: ReceiveOptions::from_byte(cursor.get_u8()),
            data: rest(&mut cursor),
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_slice(self.source64.as_bytes());
        buf.put_slice(self.source16.as_bytes());
        buf.put_u8(self.options.to_byte());
        buf.put_slice(&self.data);
    }
}

/// Explicit RX indicator (0x91).
///
/// Format:
/// ```text
/// [src64:8] [src16:2] [src_ep:1] [dst_ep:1] [cluster:2] [profile:2]
/// [options:1] [data...]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitRxPacket {
    /// 64-bit source address.
    pub source64: XBee64BitAddress,
    /// 16-bit source address.
    pub source16: XBee16BitAddress,
    /// Application addressing.
    pub addressing: ExplicitAddressing,
    /// Receive options.
    pub options: ReceiveOptions,
    /// RF payload.
    pub data: Bytes,
}

impl ExplicitRxPacket {
    const MIN_LEN: usize = 17;

    /// Converts the frame into a received message.
    #[must_use]
    pub fn to_message(&self) -> XBeeMessage {
        XBeeMessage {
            source64: Some(self.source64),
            source16: Some(self.source16),
            options: self.options,
            rssi: None,
            explicit: Some(self.addressing),
            data: self.data.clone(),
        }
    }

    pub(super) fn parse(data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(FrameType::ExplicitRx, data, Self::MIN_LEN)?;
        let mut cursor = data;
        Ok(Self {
            source64: get_addr64(&mut cursor),
            source16: get_addr16(&mut cursor),
            addressing: ExplicitAddressing {
                source_endpoint: cursor.get_u8(),
                destination_endpoint: cursor.get_u8(),
                cluster_id: cursor.get_u16(),
                profile_id: cursor.get_u16(),
            },
            options: ReceiveOptions::from_byte(cursor.get_u8()),
            data: rest(&mut cursor),
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_slice(self.source64.as_bytes());
        buf.put_slice(self.source16.as_bytes());
        buf.put_u8(self.addressing.source_endpoint);
        buf.put_u8(self.addressing.destination_endpoint);
        buf.put_u16(self.addressing.cluster_id);
        buf.put_u16(self.addressing.profile_id);
        buf.put_u8(self.options.to_byte());
        buf.put_slice(&self.data);
    }
}

/// 802.15.4 receive with 64-bit source (0x80).
///
/// Format: `[src64:8] [rssi:1] [options:1] [data...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rx64Packet {
    /// 64-bit source address.
    pub source64: XBee64BitAddress,
    /// Received signal strength in -dBm.
    pub rssi: u8,
    /// Receive options.
    pub options: ReceiveOptions,
    /// RF payload.
    pub data: Bytes,
}

impl Rx64Packet {
    const MIN_LEN: usize = 10;

    /// Converts the frame into a received message.
    #[must_use]
    pub fn to_message(&self) -> XBeeMessage {
        XBeeMessage {
            source64: Some(self.source64),
            source16: None,
            options: self.options,
            rssi: Some(self.rssi),
            explicit: None,
            data: self.data.clone(),
        }
    }

    pub(super) fn parse(data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(FrameType::Rx64, data, Self::MIN_LEN)?;
        let mut cursor = data;
        Ok(Self {
            source64: get_addr64(&mut cursor),
            rssi: cursor.get_u8(),
            options: ReceiveOptions::from_byte(cursor.get_u8()),
            data: rest(&mut cursor),
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_slice(self.source64.as_bytes());
        buf.put_u8(self.rssi);
        buf.put_u8(self.options.to_byte());
        buf.put_slice(&self.data);
    }
}

/// 802.15.4 receive with 16-bit source (0x81).
///
/// Format: `[src16:2] [rssi:1] [options:1] [data...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rx16Packet {
    /// 16-bit source address.
    pub source16: XBee16BitAddress,
    /// Received signal strength in -dBm.
    pub rssi: u8,
    /// Receive options.
    pub options: ReceiveOptions,
    /// RF payload.
    pub data: Bytes,
}

impl Rx16Packet {
    const MIN_LEN: usize = 4;

    /// Converts the frame into a received message.
    #[must_use]
    pub fn to_message(&self) -> XBeeMessage {
        XBeeMessage {
            source64: None,
            source16: Some(self.source16),
            options: self.options,
            rssi: Some(self.rssi),
            explicit: None,
            data: self.data.clone(),
        }
    }

    pub(super) fn parse(data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(FrameType::Rx16, data, Self::MIN_LEN)?;
        let mut cursor = data;
        Ok(Self {
            source16: get_addr16(&mut cursor),
            rssi: cursor.get_u8(),
            options: ReceiveOptions::from_byte(cursor.get_u8()),
            data: rest(&mut cursor),
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_slice(self.source16.as_bytes());
        buf.put_u8(self.rssi);
        buf.put_u8(self.options.to_byte());
        buf.put_slice(&self.data);
    }
}

/// IO data sample RX indicator (0x92).
///
/// Format: `[src64:8] [src16:2] [options:1] [sample...]`, see
/// [`IoSample`] for the sample layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoSampleRxPacket {
    /// 64-bit source address.
    pub source64: XBee64BitAddress,
    /// 16-bit source address.
    pub source16: XBee16BitAddress,
    /// Receive options.
    pub options: ReceiveOptions,
    /// The sample.
    pub sample: IoSample,
}

impl IoSampleRxPacket {
    const MIN_LEN: usize = 11 + crate::types::io::IO_SAMPLE_HEADER_LEN;

    pub(super) fn parse(data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(FrameType::IoSampleRx, data, Self::MIN_LEN)?;
        let mut cursor = data;
        let source64 = get_addr64(&mut cursor);
        let source16 = get_addr16(&mut cursor);
        let options = ReceiveOptions::from_byte(cursor.get_u8());
        let sample = IoSample::parse(cursor).ok_or_else(|| {
            malformed(
                FrameType::IoSampleRx,
                "sample shorter than its channel masks".into(),
            )
        })?;
        Ok(Self {
            source64,
            source16,
            options,
            sample,
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_slice(self.source64.as_bytes());
        buf.put_slice(self.source16.as_bytes());
        buf.put_u8(self.options.to_byte());
        self.sample.write_to(buf);
    }
}

/// Node identification indicator (0x95), sent when a node announces itself.
///
/// Format:
/// ```text
/// [src64:8] [src16:2] [options:1] [remote16:2] [remote64:8] [NI:...\0]
/// [parent16:2] [device_type:1] [source_event:1] [profile:2]
/// [manufacturer:2] [trailer...]
/// ```
///
/// Newer firmware appends device type identifier and RSSI bytes; these
/// are kept verbatim in `trailer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentificationPacket {
    /// 64-bit address of the sender.
    pub source64: XBee64BitAddress,
    /// 16-bit address of the sender.
    pub source16: XBee16BitAddress,
    /// Receive options.
    pub options: ReceiveOptions,
    /// 16-bit address of the identified node.
    pub remote16: XBee16BitAddress,
    /// 64-bit address of the identified node.
    pub remote64: XBee64BitAddress,
    /// Node identifier as sent, without the terminating NUL.
    ///
    /// Must not contain NUL bytes.
    pub identifier: Bytes,
    /// Parent 16-bit address.
    pub parent16: XBee16BitAddress,
    /// Network role.
    pub device_type: DeviceType,
    /// What triggered the announcement (1 = button, 2 = join, 3 = power cycle).
    pub source_event: u8,
    /// Digi profile ID.
    pub profile_id: u16,
    /// Manufacturer ID.
    pub manufacturer_id: u16,
    /// Optional trailing fields.
    pub trailer: Bytes,
}

impl NodeIdentificationPacket {
    const FIXED_HEAD: usize = 21;
    const FIXED_TAIL: usize = 8;

    /// Node identifier as text.
    #[must_use]
    pub fn node_id(&self) -> String {
        String::from_utf8_lossy(&self.identifier).into_owned()
    }

    /// Converts the frame into a discovered node.
    #[must_use]
    pub fn to_node(&self) -> DiscoveredNode {
        DiscoveredNode {
            address16: self.remote16,
            address64: self.remote64,
            node_id: self.node_id(),
            parent: Some(self.parent16),
            device_type: Some(self.device_type),
            status: None,
            profile_id: Some(self.profile_id),
            manufacturer_id: Some(self.manufacturer_id),
        }
    }

    pub(super) fn parse(data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(
            FrameType::NodeIdentification,
            data,
            Self::FIXED_HEAD + 1 + Self::FIXED_TAIL,
        )?;
        let mut cursor = data;
        let source64 = get_addr64(&mut cursor);
        let source16 = get_addr16(&mut cursor);
        let options = ReceiveOptions::from_byte(cursor.get_u8());
        let remote16 = get_addr16(&mut cursor);
        let remote64 = get_addr64(&mut cursor);

        let Some(end) = cursor.iter().position(|&b| b == 0) else {
            return Err(malformed(
                FrameType::NodeIdentification,
                "node identifier is not terminated".into(),
            ));
        };
        let identifier = Bytes::copy_from_slice(&cursor[..end]);
        cursor.advance(end + 1);

        if cursor.remaining() < Self::FIXED_TAIL {
            return Err(malformed(
                FrameType::NodeIdentification,
                format!(
                    "need {} bytes after node identifier, got {}",
                    Self::FIXED_TAIL,
                    cursor.remaining()
                ),
            ));
        }

        Ok(Self {
            source64,
            source16,
            options,
            remote16,
            remote64,
            identifier,
            parent16: get_addr16(&mut cursor),
            device_type: DeviceType::from_byte(cursor.get_u8()),
            source_event: cursor.get_u8(),
            profile_id: cursor.get_u16(),
            manufacturer_id: cursor.get_u16(),
            trailer: rest(&mut cursor),
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_slice(self.source64.as_bytes());
        buf.put_slice(self.source16.as_bytes());
        buf.put_u8(self.options.to_byte());
        buf.put_slice(self.remote16.as_bytes());
        buf.put_slice(self.remote64.as_bytes());
        buf.put_slice(&self.identifier);
        buf.put_u8(0);
        buf.put_slice(self.parent16.as_bytes());
        buf.put_u8(self.device_type.to_byte());
        buf.put_u8(self.source_event);
        buf.put_u16(self.profile_id);
        buf.put_u16(self.manufacturer_id);
        buf.put_slice(&self.trailer);
    }
}

/// User data relay output (0xAD): data relayed from another interface.
///
/// Format: `[interface:1] [data...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDataRelayOutputPacket {
    /// Source interface.
    pub interface: u8,
    /// Payload.
    pub data: Bytes,
}

impl UserDataRelayOutputPacket {
    const MIN_LEN: usize = 1;

    pub(super) fn parse(data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(FrameType::UserDataRelayOutput, data, Self::MIN_LEN)?;
        let mut cursor = data;
        Ok(Self {
            interface: cursor.get_u8(),
            data: rest(&mut cursor),
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.interface);
        buf.put_slice(&self.data);
    }
}
