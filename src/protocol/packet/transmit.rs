//! Transmit requests and their status reports.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{ensure_len, get_addr16, get_addr64, rest};
use crate::error::PacketError;
use crate::protocol::FrameType;
use crate::types::{
    DeliveryStatus, DiscoveryStatus, TransmitOptions, XBee16BitAddress, XBee64BitAddress,
};

/// Interface numbers used by user data relay frames.
pub mod relay_interface {
    /// Serial port.
    pub const SERIAL: u8 = 0;
    /// Bluetooth Low Energy.
    pub const BLUETOOTH: u8 = 1;
    /// `MicroPython` interpreter.
    pub const MICROPYTHON: u8 = 2;
}

/// Transmit request (0x10).
///
/// Format:
/// ```text
/// [frame_id:1] [dest64:8] [dest16:2] [radius:1] [options:1] [data...]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmitRequestPacket {
    /// Frame ID (0 = no transmit status).
    pub frame_id: u8,
    /// 64-bit destination address.
    pub destination64: XBee64BitAddress,
    /// 16-bit destination address (`FFFE` if unknown).
    pub destination16: XBee16BitAddress,
    /// Maximum broadcast hops (0 = network maximum).
    pub broadcast_radius: u8,
    /// Transmit options.
    pub options: TransmitOptions,
    /// RF payload.
    pub data: Bytes,
}

impl TransmitRequestPacket {
    const MIN_LEN: usize = 13;

    pub(super) fn parse(data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(FrameType::TransmitRequest, data, Self::MIN_LEN)?;
        let mut cursor = data;
        Ok(Self {
            frame_id: cursor.get_u8(),
            destination64: get_addr64(&mut cursor),
            destination16: get_addr16(&mut cursor),
            broadcast_radius: cursor.get_u8(),
            options: TransmitOptions::from_byte(cursor.get_u8()),
            data: rest(&mut cursor),
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.frame_id);
        buf.put_slice(self.destination64.as_bytes());
        buf.put_slice(self.destination16.as_bytes());
        buf.put_u8(self.broadcast_radius);
        buf.put_u8(self.options.to_byte());
        buf.put_slice(&self.data);
    }
}

/// Explicit addressing transmit request (0x11).
///
/// Format:
/// ```text
/// [frame_id:1] [dest64:8] [dest16:2] [src_ep:1] [dst_ep:1] [cluster:2]
/// [profile:2] [radius:1] [options:1] [data...]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitAddressingPacket {
    /// Frame ID (0 = no transmit status).
    pub frame_id: u8,
    /// 64-bit destination address.
    pub destination64: XBee64BitAddress,
    /// 16-bit destination address.
    pub destination16: XBee16BitAddress,
    /// Source endpoint.
    pub source_endpoint: u8,
    /// Destination endpoint.
    pub destination_endpoint: u8,
    /// Cluster ID.
    pub cluster_id: u16,
    /// Profile ID.
    pub profile_id: u16,
    /// Maximum broadcast hops.
    pub broadcast_radius: u8,
    /// Transmit options.
    pub options: TransmitOptions,
    /// RF payload.
    pub data: Bytes,
}

impl ExplicitAddressingPacket {
    const MIN_LEN: usize = 19;

    pub(super) fn parse(data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(FrameType::ExplicitAddressing, data, Self::MIN_LEN)?;
        let mut cursor = data;
        Ok(Self {
            frame_id: cursor.get_u8(),
            destination64: get_addr64(&mut cursor),
            destination16: get_addr16(&mut cursor),
            source_endpoint: cursor.get_u8(),
            destination_endpoint: cursor.get_u8(),
            cluster_id: cursor.get_u16(),
            profile_id: cursor.get_u16(),
            broadcast_radius: cursor.get_u8(),
            options: TransmitOptions::from_byte(cursor.get_u8()),
            data: rest(&mut cursor),
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.frame_id);
        buf.put_slice(self.destination64.as_bytes());
        buf.put_slice(self.destination16.as_bytes());
        buf.put_u8(self.source_endpoint);
        buf.put_u8(self.destination_endpoint);
        buf.put_u16(self.cluster_id);
        buf.put_u16(self.profile_id);
        buf.put_u8(self.broadcast_radius);
        buf.put_u8(self.options.to_byte());
        buf.put_slice(&self.data);
    }
}

/// 802.15.4 transmit request with 64-bit destination (0x00).
///
/// Format: `[frame_id:1] [dest64:8] [options:1] [data...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tx64RequestPacket {
    /// Frame ID (0 = no TX status).
    pub frame_id: u8,
    /// 64-bit destination address.
    pub destination64: XBee64BitAddress,
    /// Transmit options.
    pub options: TransmitOptions,
    /// RF payload.
    pub data: Bytes,
}

impl Tx64RequestPacket {
    const MIN_LEN: usize = 10;

    pub(super) fn parse(data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(FrameType::Tx64Request, data, Self::MIN_LEN)?;
        let mut cursor = data;
        Ok(Self {
            frame_id: cursor.get_u8(),
            destination64: get_addr64(&mut cursor),
            options: TransmitOptions::from_byte(cursor.get_u8()),
            data: rest(&mut cursor),
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.frame_id);
        buf.put_slice(self.destination64.as_bytes());
        buf.put_u8(self.options.to_byte());
        buf.put_slice(&self.data);
    }
}

/// 802.15.4 transmit request with 16-bit destination (0x01).
///
/// Format: `[frame_id:1] [dest16:2] [options:1] [data...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tx16RequestPacket {
    /// Frame ID (0 = no TX status).
    pub frame_id: u8,
    /// 16-bit destination address.
    pub destination16: XBee16BitAddress,
    /// Transmit options.
    pub options: TransmitOptions,
    /// RF payload.
    pub data: Bytes,
}

impl Tx16RequestPacket {
    const MIN_LEN: usize = 4;

    pub(super) fn parse(data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(FrameType::Tx16Request, data, Self::MIN_LEN)?;
        let mut cursor = data;
        Ok(Self {
            frame_id: cursor.get_u8(),
            destination16: get_addr16(&mut cursor),
            options: TransmitOptions::from_byte(cursor.get_u8()),
            data: rest(&mut cursor),
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.frame_id);
        buf.put_slice(self.destination16.as_bytes());
        buf.put_u8(self.options.to_byte());
        buf.put_slice(&self.data);
    }
}

/// User data relay request (0x2D).
///
/// Format: `[frame_id:1] [interface:1] [data...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDataRelayPacket {
    /// Frame ID.
    pub frame_id: u8,
    /// Destination interface, see [`relay_interface`].
    pub interface: u8,
    /// Payload.
    pub data: Bytes,
}

impl UserDataRelayPacket {
    const MIN_LEN: usize = 2;

    pub(super) fn parse(data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(FrameType::UserDataRelay, data, Self::MIN_LEN)?;
        let mut cursor = data;
        Ok(Self {
            frame_id: cursor.get_u8(),
            interface: cursor.get_u8(),
            data: rest(&mut cursor),
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.frame_id);
        buf.put_u8(self.interface);
        buf.put_slice(&self.data);
    }
}

/// Transmit status (0x8B).
///
/// Format:
/// ```text
/// [frame_id:1] [dest16:2] [retries:1] [delivery:1] [discovery:1]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmitStatusPacket {
    /// Frame ID of the transmit request.
    pub frame_id: u8,
    /// 16-bit address the packet was delivered to.
    pub destination16: XBee16BitAddress,
    /// Number of application retries.
    pub retry_count: u8,
    /// Delivery status.
    pub delivery_status: DeliveryStatus,
    /// Discovery overhead.
    pub discovery_status: DiscoveryStatus,
}

impl TransmitStatusPacket {
    const MIN_LEN: usize = 6;

    pub(super) fn parse(data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(FrameType::TransmitStatus, data, Self::MIN_LEN)?;
        let mut cursor = data;
        Ok(Self {
            frame_id: cursor.get_u8(),
            destination16: get_addr16(&mut cursor),
            retry_count: cursor.get_u8(),
            delivery_status: DeliveryStatus::from_byte(cursor.get_u8()),
            discovery_status: DiscoveryStatus::from_byte(cursor.get_u8()),
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.frame_id);
        buf.put_slice(self.destination16.as_bytes());
        buf.put_u8(self.retry_count);
        buf.put_u8(self.delivery_status.to_byte());
        buf.put_u8(self.discovery_status.to_byte());
    }
}

/// 802.15.4 transmit status (0x89).
///
/// Format: `[frame_id:1] [status:1]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxStatusPacket {
    /// Frame ID of the transmit request.
    pub frame_id: u8,
    /// Delivery status.
    pub status: DeliveryStatus,
}

impl TxStatusPacket {
    const MIN_LEN: usize = 2;

    pub(super) fn parse(data: &[u8]) -> Result<Self, PacketError> {
        ensure_len(FrameType::TxStatus, data, Self::MIN_LEN)?;
        Ok(Self {
            frame_id: data[0],
            status: DeliveryStatus::from_byte(data[1]),
        })
    }

    pub(super) fn write_to(&self, buf: &mut BytesMut) {
        buf.put_u8(self.frame_id);
        buf.put_u8(self.status.to_byte());
    }
}
