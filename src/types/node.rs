//! Node and device information types.

use bytes::Buf;

use crate::protocol::codec;
use crate::types::address::{XBee16BitAddress, XBee64BitAddress};

/// Role of a node in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    /// Network coordinator.
    Coordinator,
    /// Router.
    Router,
    /// End device.
    EndDevice,
    /// Any other value.
    Other(u8),
}

impl DeviceType {
    /// Parses a device type from a byte.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            0 => Self::Coordinator,
            1 => Self::Router,
            2 => Self::EndDevice,
            other => Self::Other(other),
        }
    }

    /// Encodes the device type to its wire byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Self::Coordinator => 0,
            Self::Router => 1,
            Self::EndDevice => 2,
            Self::Other(byte) => byte,
        }
    }
}

/// A node found by network discovery (`ND`) or announced itself with a
/// node identification frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredNode {
    /// 16-bit network address.
    pub address16: XBee16BitAddress,
    /// 64-bit address.
    pub address64: XBee64BitAddress,
    /// Node identifier (`NI`).
    pub node_id: String,
    /// Parent network address (`FFFE` if none).
    pub parent: Option<XBee16BitAddress>,
    /// Network role.
    pub device_type: Option<DeviceType>,
    /// Status byte of the discovery response (reserved, usually 0).
    pub status: Option<u8>,
    /// Digi application profile ID.
    pub profile_id: Option<u16>,
    /// Manufacturer ID.
    pub manufacturer_id: Option<u16>,
}

impl DiscoveredNode {
    /// Parses the value of an `ND` command response.
    ///
    /// Format:
    /// ```text
    /// [MY:2] [SH:4] [SL:4] [NI:...\0]
    /// ([parent:2] [device_type:1] [status:1] [profile:2] [manufacturer:2])
    /// ```
    ///
    /// The trailing block is absent on 802.15.4 firmware.
    #[must_use]
    pub fn parse_discovery(value: &[u8]) -> Option<Self> {
        if value.len() < 10 {
            return None;
        }
        let mut cursor = value;
        let address16 = XBee16BitAddress::from_u16(cursor.get_u16());
        let high = cursor.get_u32();
        let low = cursor.get_u32();
        let (node_id, consumed) = codec::terminated_str(cursor);
        cursor.advance(consumed);

        let mut node = Self {
            address16,
            address64: XBee64BitAddress::from_parts(high, low),
            node_id,
            parent: None,
            device_type: None,
            status: None,
            profile_id: None,
            manufacturer_id: None,
        };

        if cursor.remaining() >= 8 {
            node.parent = Some(XBee16BitAddress::from_u16(cursor.get_u16()));
            node.device_type = Some(DeviceType::from_byte(cursor.get_u8()));
            node.status = Some(cursor.get_u8());
            node.profile_id = Some(cursor.get_u16());
            node.manufacturer_id = Some(cursor.get_u16());
        }

        Some(node)
    }
}

/// Identity of the local module, read when a device is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// 64-bit address (`SH` + `SL`).
    pub address64: XBee64BitAddress,
    /// 16-bit network address (`MY`), if the protocol has one.
    pub address16: Option<XBee16BitAddress>,
    /// Node identifier (`NI`).
    pub node_id: String,
    /// Firmware version (`VR`).
    pub firmware_version: u32,
    /// Hardware version (`HV`).
    pub hardware_version: u16,
}
