//! In-memory module used by the tests.

use std::sync::Arc;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use crate::connection::{Connection, ConnectionConfig};
use crate::protocol::packet::{
    AtCommandResponsePacket, RemoteAtCommandResponsePacket, TransmitStatusPacket,
};
use crate::protocol::{FrameDecoder, OperatingMode, Packet};
use crate::reader::PacketReader;
use crate::types::{
    AtCommandStatus, DeliveryStatus, DiscoveryStatus, XBee16BitAddress, XBee64BitAddress,
};

/// The module side of a duplex pipe.
pub struct FakeModule {
    stream: DuplexStream,
    decoder: FrameDecoder,
    mode: OperatingMode,
}

impl FakeModule {
    pub fn new(stream: DuplexStream, mode: OperatingMode) -> Self {
        Self {
            stream,
            decoder: FrameDecoder::new(mode),
            mode,
        }
    }

    /// Next packet written by the host.
    pub async fn recv(&mut self) -> Packet {
        let mut buf = [0u8; 512];
        loop {
            if let Some(payload) = self.decoder.decode().unwrap() {
                return Packet::parse(&payload).unwrap();
            }
            let n = self.stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "host closed the stream");
            self.decoder.feed(&buf[..n]);
        }
    }

    pub async fn send(&mut self, packet: &Packet) {
        let frame = packet.to_frame(self.mode).unwrap();
        self.stream.write_all(&frame).await.unwrap();
    }

    /// Answers the next local AT command with `status` and `value`.
    pub async fn answer_at(&mut self, status: AtCommandStatus, value: &[u8]) -> Packet {
        let request = self.recv().await;
        let (frame_id, command) = match &request {
            Packet::AtCommand(p) | Packet::AtCommandQueue(p) => (p.frame_id, p.command),
            other => panic!("expected AT command, got {other:?}"),
        };
        self.send(&Packet::AtCommandResponse(AtCommandResponsePacket {
            frame_id,
            command,
            status,
            value: Bytes::copy_from_slice(value),
        }))
        .await;
        request
    }

    /// Answers the next remote AT command.
    pub async fn answer_remote_at(&mut self, status: AtCommandStatus, value: &[u8]) -> Packet {
        let request = self.recv().await;
        let Packet::RemoteAtCommand(p) = &request else {
            panic!("expected remote AT command, got {request:?}");
        };
        self.send(&Packet::RemoteAtCommandResponse(
            RemoteAtCommandResponsePacket {
                frame_id: p.frame_id,
                source64: p.destination64,
                source16: XBee16BitAddress::from_u16(0x1234),
                command: p.command,
                status,
                value: Bytes::copy_from_slice(value),
            },
        ))
        .await;
        request
    }

    /// Answers the next transmit request with a transmit status.
    pub async fn answer_transmit(&mut self, status: DeliveryStatus) -> Packet {
        let request = self.recv().await;
        let frame_id = request.frame_id().unwrap();
        self.send(&Packet::TransmitStatus(TransmitStatusPacket {
            frame_id,
            destination16: XBee16BitAddress::from_u16(0x1234),
            retry_count: 0,
            delivery_status: status,
            discovery_status: DiscoveryStatus::NoOverhead,
        }))
        .await;
        request
    }
}

/// A connection wired to a fake module, with its reader running.
pub async fn connect(config: &ConnectionConfig) -> (Arc<Connection>, PacketReader, FakeModule) {
    let connection = Arc::new(Connection::new(config));
    let (module, host) = tokio::io::duplex(4096);
    let (reader, writer) = tokio::io::split(host);
    connection.attach(Box::new(writer)).await;
    let reader = PacketReader::spawn(reader, config.mode, Arc::clone(connection.dispatcher()));
    (connection, reader, FakeModule::new(module, config.mode))
}

pub const REMOTE: XBee64BitAddress = XBee64BitAddress::from_u64(0x0013_A200_40A1_B2C3);
