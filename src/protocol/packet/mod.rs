//! Typed API packets.
//!
//! A [`Packet`] is the parsed form of one frame payload: the frame type
//! byte followed by the type-specific fields. Every variant knows how to
//! write itself back, so `Packet::parse(&p.serialize())` yields `p`
//! again. Frame types this crate does not know are kept as
//! [`Packet::Unknown`] and re-serialize byte for byte.

mod at;
mod receive;
mod transmit;

use bytes::{Buf, BufMut, Bytes, BytesMut};

pub use at::{
    AtCommandPacket, AtCommandResponsePacket, RemoteAtCommandPacket,
    RemoteAtCommandResponsePacket,
};
pub use receive::{
    ExplicitRxPacket, IoSampleRxPacket, NodeIdentificationPacket, ReceivePacket, Rx16Packet,
    Rx64Packet, UserDataRelayOutputPacket,
};
pub use transmit::{
    ExplicitAddressingPacket, TransmitRequestPacket, TransmitStatusPacket, Tx16RequestPacket,
    Tx64RequestPacket, TxStatusPacket, UserDataRelayPacket, relay_interface,
};

use crate::error::{Error, FrameError, PacketError};
use crate::protocol::frame::{OperatingMode, encode_frame};
use crate::protocol::FrameType;
use crate::types::{ModemStatus, XBee16BitAddress, XBee64BitAddress};

/// One API frame payload, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    /// 802.15.4 transmit request, 64-bit destination (0x00).
    Tx64Request(Tx64RequestPacket),
    /// 802.15.4 transmit request, 16-bit destination (0x01).
    Tx16Request(Tx16RequestPacket),
    /// Local AT command (0x08).
    AtCommand(AtCommandPacket),
    /// Local AT command, queued (0x09).
    AtCommandQueue(AtCommandPacket),
    /// Transmit request (0x10).
    TransmitRequest(TransmitRequestPacket),
    /// Explicit addressing transmit request (0x11).
    ExplicitAddressing(ExplicitAddressingPacket),
    /// Remote AT command request (0x17).
    RemoteAtCommand(RemoteAtCommandPacket),
    /// User data relay (0x2D).
    UserDataRelay(UserDataRelayPacket),
    /// 802.15.4 receive, 64-bit source (0x80).
    Rx64(Rx64Packet),
    /// 802.15.4 receive, 16-bit source (0x81).
    Rx16(Rx16Packet),
    /// Local AT command response (0x88).
    AtCommandResponse(AtCommandResponsePacket),
    /// 802.15.4 transmit status (0x89).
    TxStatus(TxStatusPacket),
    /// Modem status (0x8A).
    ModemStatus(ModemStatus),
    /// Transmit status (0x8B).
    TransmitStatus(TransmitStatusPacket),
    /// Receive packet (0x90).
    Receive(ReceivePacket),
    /// Explicit RX indicator (0x91).
    ExplicitRx(ExplicitRxPacket),
    /// IO data sample RX indicator (0x92).
    IoSampleRx(IoSampleRxPacket),
    /// Node identification indicator (0x95).
    NodeIdentification(NodeIdentificationPacket),
    /// Remote AT command response (0x97).
    RemoteAtCommandResponse(RemoteAtCommandResponsePacket),
    /// User data relay output (0xAD).
    UserDataRelayOutput(UserDataRelayOutputPacket),
    /// A frame type this crate does not model.
    Unknown {
        /// Raw frame type byte.
        frame_type: u8,
        /// Everything after the frame type byte.
        data: Bytes,
    },
}

impl Packet {
    /// Parses a frame payload (frame type byte first).
    ///
    /// # Errors
    ///
    /// - `PacketError::Empty` for an empty payload
    /// - `PacketError::Malformed` if a known frame type is too short
    pub fn parse(payload: &[u8]) -> Result<Self, PacketError> {
        let Some((&type_byte, data)) = payload.split_first() else {
            return Err(PacketError::Empty);
        };

        let Some(frame_type) = FrameType::from_byte(type_byte) else {
            return Ok(Self::Unknown {
                frame_type: type_byte,
                data: Bytes::copy_from_slice(data),
            });
        };

        let packet = match frame_type {
            FrameType::Tx64Request => Self::Tx64Request(Tx64RequestPacket::parse(data)?),
            FrameType::Tx16Request => Self::Tx16Request(Tx16RequestPacket::parse(data)?),
            FrameType::AtCommand => Self::AtCommand(AtCommandPacket::parse(frame_type, data)?),
            FrameType::AtCommandQueue => {
                Self::AtCommandQueue(AtCommandPacket::parse(frame_type, data)?)
            }
            FrameType::TransmitRequest => {
                Self::TransmitRequest(TransmitRequestPacket::parse(data)?)
            }
            FrameType::ExplicitAddressing => {
                Self::ExplicitAddressing(ExplicitAddressingPacket::parse(data)?)
            }
            FrameType::RemoteAtCommand => {
                Self::RemoteAtCommand(RemoteAtCommandPacket::parse(data)?)
            }
            FrameType::UserDataRelay => Self::UserDataRelay(UserDataRelayPacket::parse(data)?),
            FrameType::Rx64 => Self::Rx64(Rx64Packet::parse(data)?),
            FrameType::Rx16 => Self::Rx16(Rx16Packet::parse(data)?),
            FrameType::AtCommandResponse => {
                Self::AtCommandResponse(AtCommandResponsePacket::parse(data)?)
            }
            FrameType::TxStatus => Self::TxStatus(TxStatusPacket::parse(data)?),
            FrameType::ModemStatus => {
                ensure_len(frame_type, data, 1)?;
                Self::ModemStatus(ModemStatus::from_byte(data[0]))
            }
            FrameType::TransmitStatus => Self::TransmitStatus(TransmitStatusPacket::parse(data)?),
            FrameType::Receive => Self::Receive(ReceivePacket::parse(data)?),
            FrameType::ExplicitRx => Self::ExplicitRx(ExplicitRxPacket::parse(data)?),
            FrameType::IoSampleRx => Self::IoSampleRx(IoSampleRxPacket::parse(data)?),
            FrameType::NodeIdentification => {
                Self::NodeIdentification(NodeIdentificationPacket::parse(data)?)
            }
            FrameType::RemoteAtCommandResponse => {
                Self::RemoteAtCommandResponse(RemoteAtCommandResponsePacket::parse(data)?)
            }
            FrameType::UserDataRelayOutput => {
                Self::UserDataRelayOutput(UserDataRelayOutputPacket::parse(data)?)
            }
        };

        Ok(packet)
    }

    /// Serializes the packet into a frame payload (frame type byte first).
    #[must_use]
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(32);
        buf.put_u8(self.frame_type());
        match self {
            Self::Tx64Request(p) => p.write_to(&mut buf),
            Self::Tx16Request(p) => p.write_to(&mut buf),
            Self::AtCommand(p) | Self::AtCommandQueue(p) => p.write_to(&mut buf),
            Self::TransmitRequest(p) => p.write_to(&mut buf),
            Self::ExplicitAddressing(p) => p.write_to(&mut buf),
            Self::RemoteAtCommand(p) => p.write_to(&mut buf),
            Self::UserDataRelay(p) => p.write_to(&mut buf),
            Self::Rx64(p) => p.write_to(&mut buf),
            Self::Rx16(p) => p.write_to(&mut buf),
            Self::AtCommandResponse(p) => p.write_to(&mut buf),
            Self::TxStatus(p) => p.write_to(&mut buf),
            Self::ModemStatus(status) => buf.put_u8(status.to_byte()),
            Self::TransmitStatus(p) => p.write_to(&mut buf),
            Self::Receive(p) => p.write_to(&mut buf),
            Self::ExplicitRx(p) => p.write_to(&mut buf),
            Self::IoSampleRx(p) => p.write_to(&mut buf),
            Self::NodeIdentification(p) => p.write_to(&mut buf),
            Self::RemoteAtCommandResponse(p) => p.write_to(&mut buf),
            Self::UserDataRelayOutput(p) => p.write_to(&mut buf),
            Self::Unknown { data, .. } => buf.put_slice(data),
        }
        buf.freeze()
    }

    /// Serializes the packet into a complete API frame.
    pub fn to_frame(&self, mode: OperatingMode) -> Result<Bytes, FrameError> {
        encode_frame(&self.serialize(), mode)
    }

    /// Raw frame type byte.
    #[must_use]
    pub const fn frame_type(&self) -> u8 {
        let frame_type = match self {
            Self::Tx64Request(_) => FrameType::Tx64Request,
            Self::Tx16Request(_) => FrameType::Tx16Request,
            Self::AtCommand(_) => FrameType::AtCommand,
            Self::AtCommandQueue(_) => FrameType::AtCommandQueue,
            Self::TransmitRequest(_) => FrameType::TransmitRequest,
            Self::ExplicitAddressing(_) => FrameType::ExplicitAddressing,
            Self::RemoteAtCommand(_) => FrameType::RemoteAtCommand,
            Self::UserDataRelay(_) => FrameType::UserDataRelay,
            Self::Rx64(_) => FrameType::Rx64,
            Self::Rx16(_) => FrameType::Rx16,
            Self::AtCommandResponse(_) => FrameType::AtCommandResponse,
            Self::TxStatus(_) => FrameType::TxStatus,
            Self::ModemStatus(_) => FrameType::ModemStatus,
            Self::TransmitStatus(_) => FrameType::TransmitStatus,
            Self::Receive(_) => FrameType::Receive,
            Self::ExplicitRx(_) => FrameType::ExplicitRx,
            Self::IoSampleRx(_) => FrameType::IoSampleRx,
            Self::NodeIdentification(_) => FrameType::NodeIdentification,
            Self::RemoteAtCommandResponse(_) => FrameType::RemoteAtCommandResponse,
            Self::UserDataRelayOutput(_) => FrameType::UserDataRelayOutput,
            Self::Unknown { frame_type, .. } => return *frame_type,
        };
        frame_type as u8
    }

    /// Known frame type, or `None` for [`Packet::Unknown`].
    #[must_use]
    pub const fn kind(&self) -> Option<FrameType> {
        FrameType::from_byte(self.frame_type())
    }

    /// Frame ID, for frame types that carry one.
    #[must_use]
    pub const fn frame_id(&self) -> Option<u8> {
        match self {
            Self::Tx64Request(p) => Some(p.frame_id),
            Self::Tx16Request(p) => Some(p.frame_id),
            Self::AtCommand(p) | Self::AtCommandQueue(p) => Some(p.frame_id),
            Self::TransmitRequest(p) => Some(p.frame_id),
            Self::ExplicitAddressing(p) => Some(p.frame_id),
            Self::RemoteAtCommand(p) => Some(p.frame_id),
            Self::UserDataRelay(p) => Some(p.frame_id),
            Self::AtCommandResponse(p) => Some(p.frame_id),
            Self::TxStatus(p) => Some(p.frame_id),
            Self::TransmitStatus(p) => Some(p.frame_id),
            Self::RemoteAtCommandResponse(p) => Some(p.frame_id),
            _ => None,
        }
    }

    /// Replaces the frame ID. Returns false if the frame type has none.
    pub const fn set_frame_id(&mut self, id: u8) -> bool {
        match self {
            Self::Tx64Request(p) => p.frame_id = id,
            Self::Tx16Request(p) => p.frame_id = id,
            Self::AtCommand(p) | Self::AtCommandQueue(p) => p.frame_id = id,
            Self::TransmitRequest(p) => p.frame_id = id,
            Self::ExplicitAddressing(p) => p.frame_id = id,
            Self::RemoteAtCommand(p) => p.frame_id = id,
            Self::UserDataRelay(p) => p.frame_id = id,
            Self::AtCommandResponse(p) => p.frame_id = id,
            Self::TxStatus(p) => p.frame_id = id,
            Self::TransmitStatus(p) => p.frame_id = id,
            Self::RemoteAtCommandResponse(p) => p.frame_id = id,
            _ => return false,
        }
        true
    }

    /// Frame types the module answers this request with.
    ///
    /// Empty for packets that get no correlated response.
    #[must_use]
    pub const fn response_types(&self) -> &'static [FrameType] {
        match self {
            Self::AtCommand(_) | Self::AtCommandQueue(_) => &[FrameType::AtCommandResponse],
            Self::RemoteAtCommand(_) => &[FrameType::RemoteAtCommandResponse],
            Self::TransmitRequest(_) | Self::ExplicitAddressing(_) => {
                &[FrameType::TransmitStatus]
            }
            Self::Tx64Request(_) | Self::Tx16Request(_) => &[FrameType::TxStatus],
            _ => &[],
        }
    }
}

/// Converts an AT command name ("NI", "ND", ...) into its two bytes.
pub fn at_command_name(name: &str) -> Result<[u8; 2], Error> {
    match name.as_bytes() {
        &[a, b] if a.is_ascii_graphic() && b.is_ascii_graphic() => {
            Ok([a.to_ascii_uppercase(), b.to_ascii_uppercase()])
        }
        _ => Err(Error::InvalidArgument {
            reason: format!("AT command must be 2 ASCII characters, got {name:?}"),
        }),
    }
}

pub(crate) fn malformed(frame_type: FrameType, reason: String) -> PacketError {
    PacketError::Malformed {
        frame_type: frame_type as u8,
        name: frame_type.name(),
        reason,
    }
}

fn ensure_len(frame_type: FrameType, data: &[u8], min: usize) -> Result<(), PacketError> {
    if data.len() < min {
        return Err(malformed(
            frame_type,
            format!("need at least {min} bytes after frame type, got {}", data.len()),
        ));
    }
    Ok(())
}

fn get_addr64(cursor: &mut &[u8]) -> XBee64BitAddress {
    let mut bytes = [0u8; 8];
    cursor.copy_to_slice(&mut bytes);
    XBee64BitAddress::new(bytes)
}

fn get_addr16(cursor: &mut &[u8]) -> XBee16BitAddress {
    let mut bytes = [0u8; 2];
    cursor.copy_to_slice(&mut bytes);
    XBee16BitAddress::new(bytes)
}

fn get_command(cursor: &mut &[u8]) -> [u8; 2] {
    let mut command = [0u8; 2];
    cursor.copy_to_slice(&mut command);
    command
}

fn rest(cursor: &mut &[u8]) -> Bytes {
    cursor.copy_to_bytes(cursor.remaining())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AtCommandStatus, DeliveryStatus, DeviceType, DiscoveryStatus, ExplicitAddressing,
        IoSample, ReceiveOptions, RemoteAtOptions, TransmitOptions,
    };

    const DEST: XBee64BitAddress = XBee64BitAddress::from_u64(0x0013_A200_40A1_B2C3);

    fn assert_roundtrip(packet: &Packet) {
        let bytes = packet.serialize();
        let parsed = Packet::parse(&bytes).unwrap();
        assert_eq!(&parsed, packet, "roundtrip of {bytes:02x?}");
    }

    fn sample_packets(data: &Bytes, addr64: XBee64BitAddress, addr16: XBee16BitAddress) -> Vec<Packet> {
        vec![
            Packet::Tx64Request(Tx64RequestPacket {
                frame_id: 1,
                destination64: addr64,
                options: TransmitOptions::NONE,
                data: data.clone(),
            }),
            Packet::Tx16Request(Tx16RequestPacket {
                frame_id: 255,
                destination16: addr16,
                options: TransmitOptions::DISABLE_ACK,
                data: data.clone(),
            }),
            Packet::AtCommand(AtCommandPacket::new(0, *b"NI", data.clone())),
            Packet::AtCommandQueue(AtCommandPacket::new(7, *b"D0", data.clone())),
            Packet::TransmitRequest(TransmitRequestPacket {
                frame_id: 0x52,
                destination64: addr64,
                destination16: addr16,
                broadcast_radius: 0,
                options: TransmitOptions::USE_EXTENDED_TIMEOUT,
                data: data.clone(),
            }),
            Packet::ExplicitAddressing(ExplicitAddressingPacket {
                frame_id: 1,
                destination64: addr64,
                destination16: addr16,
                source_endpoint: 0xE8,
                destination_endpoint: 0xE8,
                cluster_id: 0x0011,
                profile_id: 0xC105,
                broadcast_radius: 3,
                options: TransmitOptions::NONE,
                data: data.clone(),
            }),
            Packet::RemoteAtCommand(RemoteAtCommandPacket {
                frame_id: 9,
                destination64: addr64,
                destination16: addr16,
                options: RemoteAtOptions::APPLY_CHANGES,
                command: *b"D1",
                parameter: data.clone(),
            }),
            Packet::UserDataRelay(UserDataRelayPacket {
                frame_id: 3,
                interface: relay_interface::BLUETOOTH,
                data: data.clone(),
            }),
            Packet::Rx64(Rx64Packet {
                source64: addr64,
                rssi: 0x28,
                options: ReceiveOptions::NONE,
                data: data.clone(),
            }),
            Packet::Rx16(Rx16Packet {
                source16: addr16,
                rssi: 0xFF,
                options: ReceiveOptions::BROADCAST,
                data: data.clone(),
            }),
            Packet::AtCommandResponse(AtCommandResponsePacket {
                frame_id: 1,
                command: *b"SH",
                status: AtCommandStatus::Ok,
                value: data.clone(),
            }),
            Packet::TxStatus(TxStatusPacket {
                frame_id: 4,
                status: DeliveryStatus::MacAckFailure,
            }),
            Packet::ModemStatus(ModemStatus::JoinedNetwork),
            Packet::TransmitStatus(TransmitStatusPacket {
                frame_id: 0x52,
                destination16: addr16,
                retry_count: 0,
                delivery_status: DeliveryStatus::Success,
                discovery_status: DiscoveryStatus::Address,
            }),
            Packet::Receive(ReceivePacket {
                source64: addr64,
                source16: addr16,
                options: ReceiveOptions::ACKNOWLEDGED,
                data: data.clone(),
            }),
            Packet::ExplicitRx(ExplicitRxPacket {
                source64: addr64,
                source16: addr16,
                addressing: ExplicitAddressing {
                    source_endpoint: 0xE8,
                    destination_endpoint: 0xE6,
                    cluster_id: 0x0011,
                    profile_id: 0xC105,
                },
                options: ReceiveOptions::ACKNOWLEDGED,
                data: data.clone(),
            }),
            Packet::IoSampleRx(IoSampleRxPacket {
                source64: addr64,
                source16: addr16,
                options: ReceiveOptions::ACKNOWLEDGED,
                sample: IoSample {
                    sample_count: 1,
                    digital_mask: 0x0C00,
                    analog_mask: 0x81,
                    digital_values: Some(0x0400),
                    analog_values: vec![0x0000, 0xFFFF],
                },
            }),
            Packet::NodeIdentification(NodeIdentificationPacket {
                source64: addr64,
                source16: addr16,
                options: ReceiveOptions::BROADCAST,
                remote16: addr16,
                remote64: addr64,
                identifier: Bytes::from_static(b"SENSOR 1"),
                parent16: XBee16BitAddress::UNKNOWN,
                device_type: DeviceType::EndDevice,
                source_event: 1,
                profile_id: 0xC105,
                manufacturer_id: 0x101E,
                trailer: data.clone(),
            }),
            Packet::RemoteAtCommandResponse(RemoteAtCommandResponsePacket {
                frame_id: 9,
                source64: addr64,
                source16: addr16,
                command: *b"D1",
                status: AtCommandStatus::InvalidParameter,
                value: data.clone(),
            }),
            Packet::UserDataRelayOutput(UserDataRelayOutputPacket {
                interface: relay_interface::MICROPYTHON,
                data: data.clone(),
            }),
        ]
    }

    #[test]
    fn test_roundtrip_all_variants() {
        let payloads = [
            Bytes::new(),
            Bytes::from_static(b"ABC"),
            Bytes::from_static(&[0x7E, 0x7D, 0x11, 0x13, 0x00]),
        ];
        let addresses = [
            (XBee64BitAddress::COORDINATOR, XBee16BitAddress::COORDINATOR),
            (XBee64BitAddress::UNKNOWN, XBee16BitAddress::BROADCAST),
            (DEST, XBee16BitAddress::UNKNOWN),
        ];
        for data in &payloads {
            for &(addr64, addr16) in &addresses {
                for packet in sample_packets(data, addr64, addr16) {
                    assert_roundtrip(&packet);
                }
            }
        }
    }

    #[test]
    fn test_roundtrip_large_payload() {
        // Frame type byte + 13 header bytes + data = 65535.
        let data = Bytes::from(vec![0xA5; 65535 - 14]);
        let packet = Packet::TransmitRequest(TransmitRequestPacket {
            frame_id: 1,
            destination64: DEST,
            destination16: XBee16BitAddress::UNKNOWN,
            broadcast_radius: 0,
            options: TransmitOptions::NONE,
            data,
        });
        let frame = packet.to_frame(OperatingMode::Api).unwrap();
        assert_eq!(frame.len(), 65535 + 4);
        assert_eq!(&frame[1..3], &[0xFF, 0xFF]);
        assert_roundtrip(&packet);
    }

    #[test]
    fn test_transmit_request_frame_bytes() {
        let packet = Packet::TransmitRequest(TransmitRequestPacket {
            frame_id: 1,
            destination64: DEST,
            destination16: XBee16BitAddress::UNKNOWN,
            broadcast_radius: 0,
            options: TransmitOptions::NONE,
            data: Bytes::from_static(b"ABC"),
        });
        let frame = packet.to_frame(OperatingMode::Api).unwrap();
        assert_eq!(
            &frame[..],
            &[
                0x7E, 0x00, 0x11, 0x10, 0x01, 0x00, 0x13, 0xA2, 0x00, 0x40, 0xA1, 0xB2, 0xC3,
                0xFF, 0xFE, 0x00, 0x00, 0x41, 0x42, 0x43, 0x20,
            ]
        );
    }

    #[test]
    fn test_at_command_frame_bytes() {
        let packet = Packet::AtCommand(AtCommandPacket::new(1, *b"NI", Bytes::new()));
        let frame = packet.to_frame(OperatingMode::Api).unwrap();
        assert_eq!(&frame[..], &[0x7E, 0x00, 0x04, 0x08, 0x01, 0x4E, 0x49, 0x5F]);
    }

    #[test]
    fn test_unknown_frame_type_preserved() {
        let payload = [0xA1, 0x00, 0x7E, 0xFF, 0x42];
        let packet = Packet::parse(&payload).unwrap();
        assert_eq!(
            packet,
            Packet::Unknown {
                frame_type: 0xA1,
                data: Bytes::from_static(&[0x00, 0x7E, 0xFF, 0x42]),
            }
        );
        assert_eq!(packet.frame_type(), 0xA1);
        assert_eq!(packet.kind(), None);
        assert_eq!(&packet.serialize()[..], &payload);

        let bare = Packet::parse(&[0xFE]).unwrap();
        assert_eq!(&bare.serialize()[..], &[0xFE]);
    }

    #[test]
    fn test_empty_packet() {
        assert_eq!(Packet::parse(&[]), Err(PacketError::Empty));
    }

    #[test]
    fn test_truncated_known_types_are_malformed() {
        let data = Bytes::from_static(b"xy");
        for packet in sample_packets(&data, DEST, XBee16BitAddress::UNKNOWN) {
            let bytes = packet.serialize();
            // Drop the variable part and one more byte of the fixed header.
            let fixed = match &packet {
                Packet::IoSampleRx(_) => bytes.len() - 8,
                Packet::NodeIdentification(_) => bytes.len() - data.len() - 1,
                Packet::TxStatus(_) | Packet::TransmitStatus(_) | Packet::ModemStatus(_) => {
                    bytes.len() - 1
                }
                _ => bytes.len() - data.len() - 1,
            };
            let result = Packet::parse(&bytes[..fixed]);
            assert!(
                matches!(result, Err(PacketError::Malformed { .. })),
                "frame type 0x{:02x}: {result:?}",
                packet.frame_type()
            );
        }
    }

    #[test]
    fn test_node_identification_requires_terminator() {
        let mut payload = vec![0x95];
        payload.extend_from_slice(&[0x11; 21]);
        payload.extend_from_slice(b"NODE-NAME-NO-NUL");
        let result = Packet::parse(&payload);
        assert!(matches!(result, Err(PacketError::Malformed { frame_type: 0x95, .. })));
    }

    #[test]
    fn test_node_identification_keeps_raw_identifier() {
        let mut payload = vec![0x95];
        payload.extend_from_slice(&[0x11; 21]);
        payload.extend_from_slice(&[b'N', 0xFF, b'1', 0x00]);
        payload.extend_from_slice(&[0xFF, 0xFE, 0x01, 0x01, 0xC1, 0x05, 0x10, 0x1E]);

        let packet = Packet::parse(&payload).unwrap();
        let Packet::NodeIdentification(ni) = &packet else {
            panic!("unexpected packet: {packet:?}");
        };
        assert_eq!(&ni.identifier[..], &[b'N', 0xFF, b'1']);
        assert_eq!(ni.node_id(), "N\u{FFFD}1");
        assert_eq!(&packet.serialize()[..], &payload[..]);
    }

    #[test]
    fn test_frame_id_accessors() {
        let mut packet = Packet::AtCommand(AtCommandPacket::new(0, *b"NI", Bytes::new()));
        assert_eq!(packet.frame_id(), Some(0));
        assert!(packet.set_frame_id(42));
        assert_eq!(packet.frame_id(), Some(42));
        assert_eq!(packet.response_types(), &[FrameType::AtCommandResponse]);

        let mut status = Packet::ModemStatus(ModemStatus::HardwareReset);
        assert_eq!(status.frame_id(), None);
        assert!(!status.set_frame_id(1));
        assert!(status.response_types().is_empty());
    }

    #[test]
    fn test_at_command_name() {
        assert_eq!(at_command_name("ni").unwrap(), *b"NI");
        assert!(at_command_name("N").is_err());
        assert!(at_command_name("NID").is_err());
        assert!(at_command_name("N ").is_err());
    }
}
