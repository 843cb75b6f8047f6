//! Command handlers for XBee operations.
//!
//! This module provides high-level command functions that handle
//! the request/response protocol with the module.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::connection::Connection;
use crate::dispatch::PendingKey;
use crate::error::{Error, Result};
use crate::event::{Event, ListenerHandle, Listeners};
use crate::protocol::packet::{
    AtCommandPacket, ExplicitAddressingPacket, RemoteAtCommandPacket, TransmitRequestPacket,
    TransmitStatusPacket, UserDataRelayPacket,
};
use crate::protocol::{Packet, at_command_name};
use crate::types::{
    DiscoveredNode, ExplicitAddressing, IoSample, ModemStatus, RemoteAtOptions, TransmitOptions,
    XBee16BitAddress, XBee64BitAddress,
};

/// Default time to collect node discovery responses.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Extra time allowed for transmit status reports, which arrive only
/// after the module has finished its retries.
const TRANSMIT_TIMEOUT_MARGIN: Duration = Duration::from_secs(2);

/// Command handler for XBee operations.
#[derive(Clone)]
pub struct CommandHandler {
    connection: Arc<Connection>,
    timeout: Duration,
}

impl CommandHandler {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(connection: Arc<Connection>) -> Self {
        let timeout = connection.timeout();
        Self {
            connection,
            timeout,
        }
    }

    /// Sets the command timeout.
    pub const fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// The command timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    // ==================== Local AT Commands ====================

    /// Sends an AT command and returns the value of the response.
    ///
    /// # Errors
    ///
    /// - `Error::AtCommand` if the module answers with a non-OK status
    /// - `Error::Timeout` / `Error::TransportClosed` if no answer arrives
    pub async fn at_command(&self, command: &str, parameter: impl Into<Bytes>) -> Result<Bytes> {
        let packet = Packet::AtCommand(AtCommandPacket::new(
            0,
            at_command_name(command)?,
            parameter,
        ));
        self.local_at(packet).await
    }

    /// Sends a queued AT command; the change takes effect on `AC`.
    pub async fn queue_at_command(
        &self,
        command: &str,
        parameter: impl Into<Bytes>,
    ) -> Result<Bytes> {
        let packet = Packet::AtCommandQueue(AtCommandPacket::new(
            0,
            at_command_name(command)?,
            parameter,
        ));
        self.local_at(packet).await
    }

    /// Reads a parameter.
    pub async fn get_parameter(&self, command: &str) -> Result<Bytes> {
        self.at_command(command, Bytes::new()).await
    }

    /// Writes a parameter.
    pub async fn set_parameter(&self, command: &str, value: impl Into<Bytes>) -> Result<()> {
        self.at_command(command, value).await.map(drop)
    }

    /// Runs a command that takes no parameter.
    pub async fn execute_command(&self, command: &str) -> Result<()> {
        self.at_command(command, Bytes::new()).await.map(drop)
    }

    /// Applies queued parameter changes (`AC`).
    pub async fn apply_changes(&self) -> Result<()> {
        self.execute_command("AC").await
    }

    /// Writes parameters to non-volatile memory (`WR`).
    pub async fn write_changes(&self) -> Result<()> {
        self.execute_command("WR").await
    }

    /// Samples all enabled IO lines (`IS`).
    pub async fn read_io_sample(&self) -> Result<IoSample> {
        let value = self.get_parameter("IS").await?;
        IoSample::parse(&value).ok_or_else(|| Error::Protocol {
            message: format!("malformed IO sample: {}", hex::encode(&value)),
        })
    }

    async fn local_at(&self, packet: Packet) -> Result<Bytes> {
        let command = packet_command(&packet);
        let response = self.connection.send_and_wait(packet, self.timeout).await?;
        let Packet::AtCommandResponse(response) = response else {
            return Err(unexpected(&response));
        };
        if !response.status.is_ok() {
            return Err(Error::AtCommand {
                command,
                status: response.status,
            });
        }
        Ok(response.value)
    }

    // ==================== Remote AT Commands ====================

    /// Sends an AT command to a remote module and returns its value.
    pub async fn remote_at_command(
        &self,
        destination64: XBee64BitAddress,
        destination16: XBee16BitAddress,
        command: &str,
        parameter: impl Into<Bytes>,
        options: RemoteAtOptions,
    ) -> Result<Bytes> {
        let command_bytes = at_command_name(command)?;
        let packet = Packet::RemoteAtCommand(RemoteAtCommandPacket {
            frame_id: 0,
            destination64,
            destination16,
            options,
            command: command_bytes,
            parameter: parameter.into(),
        });

        let response = self
            .connection
            .send_and_wait(packet, self.timeout + TRANSMIT_TIMEOUT_MARGIN)
            .await?;
        let Packet::RemoteAtCommandResponse(response) = response else {
            return Err(unexpected(&response));
        };
        if !response.status.is_ok() {
            return Err(Error::AtCommand {
                command: command.to_ascii_uppercase(),
                status: response.status,
            });
        }
        Ok(response.value)
    }

    // ==================== Data Transmission ====================

    /// Sends data and waits for the transmit status.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transmit` if the module reports a delivery failure.
    pub async fn send_data(
        &self,
        destination64: XBee64BitAddress,
        destination16: XBee16BitAddress,
        data: impl Into<Bytes>,
        options: TransmitOptions,
    ) -> Result<TransmitStatusPacket> {
        let packet = Packet::TransmitRequest(TransmitRequestPacket {
            frame_id: 0,
            destination64,
            destination16,
            broadcast_radius: 0,
            options,
            data: data.into(),
        });
        self.transmit(packet).await
    }

    /// Sends data without waiting for a transmit status.
    pub async fn send_data_async(
        &self,
        destination64: XBee64BitAddress,
        destination16: XBee16BitAddress,
        data: impl Into<Bytes>,
        options: TransmitOptions,
    ) -> Result<()> {
        let packet = Packet::TransmitRequest(TransmitRequestPacket {
            frame_id: 0,
            destination64,
            destination16,
            broadcast_radius: 0,
            options,
            data: data.into(),
        });
        self.connection.send(&packet).await
    }

    /// Broadcasts data to every node on the network.
    pub async fn send_broadcast_data(&self, data: impl Into<Bytes>) -> Result<TransmitStatusPacket> {
        self.send_data(
            XBee64BitAddress::BROADCAST,
            XBee16BitAddress::UNKNOWN,
            data,
            TransmitOptions::NONE,
        )
        .await
    }

    /// Sends data with explicit application addressing.
    pub async fn send_explicit_data(
        &self,
        destination64: XBee64BitAddress,
        destination16: XBee16BitAddress,
        addressing: ExplicitAddressing,
        data: impl Into<Bytes>,
        options: TransmitOptions,
    ) -> Result<TransmitStatusPacket> {
        let packet = Packet::ExplicitAddressing(ExplicitAddressingPacket {
            frame_id: 0,
            destination64,
            destination16,
            source_endpoint: addressing.source_endpoint,
            destination_endpoint: addressing.destination_endpoint,
            cluster_id: addressing.cluster_id,
            profile_id: addressing.profile_id,
            broadcast_radius: 0,
            options,
            data: data.into(),
        });
        self.transmit(packet).await
    }

    /// Relays data to another interface of the local module.
    pub async fn send_user_data_relay(&self, interface: u8, data: impl Into<Bytes>) -> Result<()> {
        let packet = Packet::UserDataRelay(UserDataRelayPacket {
            frame_id: self.connection.next_frame_id(),
            interface,
            data: data.into(),
        });
        self.connection.send(&packet).await
    }

    async fn transmit(&self, packet: Packet) -> Result<TransmitStatusPacket> {
        let response = self
            .connection
            .send_and_wait(packet, self.timeout + TRANSMIT_TIMEOUT_MARGIN)
            .await?;
        let Packet::TransmitStatus(status) = response else {
            return Err(unexpected(&response));
        };
        if !status.delivery_status.is_success() {
            tracing::debug!("transmit {} failed: {}", status.frame_id, status.delivery_status);
            return Err(Error::Transmit {
                status: status.delivery_status,
            });
        }
        Ok(status)
    }

    // ==================== Network ====================

    /// Discovers the nodes of the network (`ND`).
    ///
    /// Collects responses until the module reports the end of discovery
    /// or `timeout` elapses. Results are queued by a dedicated listener,
    /// so a small event channel does not lose nodes.
    pub async fn discover_nodes(&self, timeout: Duration) -> Result<Vec<DiscoveredNode>> {
        if self.connection.dispatcher().is_closed() {
            return Err(Error::TransportClosed);
        }

        // Listen before sending so no response is missed
        let listeners = self.connection.dispatcher().listeners();
        let (results_tx, mut results) = mpsc::unbounded_channel();
        let _listener = ListenerGuard {
            listeners,
            handle: listeners.on_discovery(move |event| {
                let _ = results_tx.send(event.clone());
            }),
        };
        let mut lifecycle = listeners.subscribe();

        let frame_id = self.connection.next_frame_id();
        let packet = Packet::AtCommand(AtCommandPacket::new(frame_id, *b"ND", Bytes::new()));
        self.connection.send(&packet).await?;
        tracing::debug!("node discovery started (frame {frame_id})");

        let mut nodes = Vec::new();
        let collect = async {
            loop {
                let event = tokio::select! {
                    Some(event) = results.recv() => event,
                    event = lifecycle.recv() => match event {
                        Some(Event::ConnectionLost) | None => return Err(Error::TransportClosed),
                        Some(_) => continue,
                    },
                };
                match event {
                    Event::NodeDiscovered {
                        frame_id: Some(id),
                        node,
                    } if id == frame_id => {
                        tracing::debug!("discovered {} ({})", node.node_id, node.address64);
                        nodes.push(node);
                    }
                    Event::DiscoveryFinished { frame_id: id, status } if id == frame_id => {
                        if status.is_ok() {
                            return Ok(());
                        }
                        return Err(Error::AtCommand {
                            command: "ND".into(),
                            status,
                        });
                    }
                    _ => {}
                }
            }
        };

        match tokio::time::timeout(timeout, collect).await {
            Ok(result) => result?,
            Err(_) => tracing::debug!("node discovery window elapsed"),
        }
        Ok(nodes)
    }

    /// Waits for a modem status accepted by `accept`.
    pub async fn wait_for_modem_status<F>(&self, accept: F, timeout: Duration) -> Result<ModemStatus>
    where
        F: Fn(ModemStatus) -> bool + Send + Sync + 'static,
    {
        let pending = self.connection.dispatcher().register(modem_status_key(accept));
        match pending.wait(timeout).await? {
            Packet::ModemStatus(status) => Ok(status),
            other => Err(unexpected(&other)),
        }
    }

    /// Resets the module (`FR`) and waits for it to come back.
    pub async fn soft_reset(&self) -> Result<ModemStatus> {
        let reset = self
            .connection
            .dispatcher()
            .register(modem_status_key(ModemStatus::is_reset));
        self.execute_command("FR").await?;
        match reset.wait(self.timeout).await? {
            Packet::ModemStatus(status) => {
                tracing::info!("module reset: {status}");
                Ok(status)
            }
            other => Err(unexpected(&other)),
        }
    }
}

/// Unregisters a listener when dropped.
struct ListenerGuard<'a> {
    listeners: &'a Listeners,
    handle: ListenerHandle,
}

impl Drop for ListenerGuard<'_> {
    fn drop(&mut self) {
        self.listeners.unregister(self.handle);
    }
}

fn modem_status_key<F>(accept: F) -> PendingKey
where
    F: Fn(ModemStatus) -> bool + Send + Sync + 'static,
{
    PendingKey::predicate(move |packet| matches!(packet, Packet::ModemStatus(status) if accept(*status)))
}

fn packet_command(packet: &Packet) -> String {
    match packet {
        Packet::AtCommand(p) | Packet::AtCommandQueue(p) => p.command_str(),
        _ => String::new(),
    }
}

fn unexpected(packet: &Packet) -> Error {
    Error::Protocol {
        message: format!("unexpected response frame 0x{:02x}", packet.frame_type()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionConfig;
    use crate::event::ListenerKind;
    use crate::protocol::packet::AtCommandResponsePacket;
    use crate::testing::{self, REMOTE};
    use crate::types::{AtCommandStatus, DeliveryStatus};

    async fn handler() -> (CommandHandler, crate::reader::PacketReader, testing::FakeModule) {
        let config = ConnectionConfig::new().timeout(Duration::from_secs(1));
        let (connection, reader, module) = testing::connect(&config).await;
        (CommandHandler::new(connection), reader, module)
    }

    #[tokio::test]
    async fn test_get_parameter() {
        let (commands, _reader, mut module) = handler().await;
        let (value, request) = tokio::join!(
            commands.get_parameter("ni"),
            module.answer_at(AtCommandStatus::Ok, b"COORD")
        );
        assert_eq!(&value.unwrap()[..], b"COORD");
        match request {
            Packet::AtCommand(p) => {
                assert_eq!(p.command, *b"NI");
                assert!(p.parameter.is_empty());
                assert_ne!(p.frame_id, 0);
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_set_parameter_error_status() {
        let (commands, _reader, mut module) = handler().await;
        let (result, _) = tokio::join!(
            commands.set_parameter("PL", vec![0x09]),
            module.answer_at(AtCommandStatus::InvalidParameter, b"")
        );
        match result {
            Err(Error::AtCommand { command, status }) => {
                assert_eq!(command, "PL");
                assert_eq!(status, AtCommandStatus::InvalidParameter);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_command_name() {
        let (commands, _reader, _module) = handler().await;
        let result = commands.get_parameter("NID").await;
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
    }

    #[tokio::test]
    async fn test_queue_and_apply() {
        let (commands, _reader, mut module) = handler().await;
        let (queued, request) = tokio::join!(
            commands.queue_at_command("D0", vec![0x02]),
            module.answer_at(AtCommandStatus::Ok, b"")
        );
        queued.unwrap();
        assert!(matches!(request, Packet::AtCommandQueue(_)));

        let (applied, request) = tokio::join!(
            commands.apply_changes(),
            module.answer_at(AtCommandStatus::Ok, b"")
        );
        applied.unwrap();
        assert!(matches!(request, Packet::AtCommand(p) if p.command == *b"AC"));
    }

    #[tokio::test]
    async fn test_read_io_sample() {
        let (commands, _reader, mut module) = handler().await;
        let sample = [0x01, 0x00, 0x18, 0x82, 0x00, 0x08, 0x02, 0x25, 0x0B, 0xB8];
        let (result, _) = tokio::join!(
            commands.read_io_sample(),
            module.answer_at(AtCommandStatus::Ok, &sample)
        );
        let sample = result.unwrap();
        assert_eq!(sample.analog_value(1), Some(0x0225));
        assert_eq!(sample.supply_voltage(), Some(0x0BB8));
    }

    #[tokio::test]
    async fn test_remote_at_command() {
        let (commands, _reader, mut module) = handler().await;
        let (value, request) = tokio::join!(
            commands.remote_at_command(
                REMOTE,
                XBee16BitAddress::UNKNOWN,
                "D1",
                Bytes::new(),
                RemoteAtOptions::APPLY_CHANGES
            ),
            module.answer_remote_at(AtCommandStatus::Ok, &[0x04])
        );
        assert_eq!(&value.unwrap()[..], &[0x04]);
        match request {
            Packet::RemoteAtCommand(p) => {
                assert_eq!(p.destination64, REMOTE);
                assert_eq!(p.options, RemoteAtOptions::APPLY_CHANGES);
            }
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_data() {
        let (commands, _reader, mut module) = handler().await;
        let (status, request) = tokio::join!(
            commands.send_data(
                REMOTE,
                XBee16BitAddress::UNKNOWN,
                &b"hello"[..],
                TransmitOptions::NONE
            ),
            module.answer_transmit(DeliveryStatus::Success)
        );
        assert!(status.unwrap().delivery_status.is_success());
        match request {
            Packet::TransmitRequest(p) => assert_eq!(&p.data[..], b"hello"),
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_data_delivery_failure() {
        let (commands, _reader, mut module) = handler().await;
        let (result, _) = tokio::join!(
            commands.send_broadcast_data(&b"x"[..]),
            module.answer_transmit(DeliveryStatus::NetworkAckFailure)
        );
        assert!(matches!(
            result,
            Err(Error::Transmit {
                status: DeliveryStatus::NetworkAckFailure
            })
        ));
    }

    #[tokio::test]
    async fn test_send_explicit_data() {
        let (commands, _reader, mut module) = handler().await;
        let addressing = ExplicitAddressing {
            source_endpoint: 0xE8,
            destination_endpoint: 0xE8,
            cluster_id: 0x0011,
            profile_id: 0xC105,
        };
        let (status, request) = tokio::join!(
            commands.send_explicit_data(
                REMOTE,
                XBee16BitAddress::UNKNOWN,
                addressing,
                &b"x"[..],
                TransmitOptions::NONE
            ),
            module.answer_transmit(DeliveryStatus::Success)
        );
        status.unwrap();
        assert!(matches!(request, Packet::ExplicitAddressing(p) if p.cluster_id == 0x0011));
    }

    #[tokio::test]
    async fn test_send_without_response() {
        let (commands, _reader, mut module) = handler().await;
        commands
            .send_data_async(
                REMOTE,
                XBee16BitAddress::UNKNOWN,
                &b"x"[..],
                TransmitOptions::NONE,
            )
            .await
            .unwrap();
        assert_eq!(module.recv().await.frame_id(), Some(0));

        commands.send_user_data_relay(1, &b"ble"[..]).await.unwrap();
        assert!(matches!(module.recv().await, Packet::UserDataRelay(p) if p.interface == 1));
    }

    #[tokio::test]
    async fn test_discover_nodes() {
        let (commands, _reader, mut module) = handler().await;
        let module_task = async {
            let request = module.recv().await;
            let frame_id = request.frame_id().unwrap();
            let respond = |value: &'static [u8]| {
                Packet::AtCommandResponse(AtCommandResponsePacket {
                    frame_id,
                    command: *b"ND",
                    status: AtCommandStatus::Ok,
                    value: Bytes::from_static(value),
                })
            };
            module
                .send(&respond(&[
                    0x12, 0x34, 0x00, 0x13, 0xA2, 0x00, 0x40, 0xA1, 0xB2, 0xC3, b'A', 0x00,
                ]))
                .await;
            module
                .send(&respond(&[
                    0x56, 0x78, 0x00, 0x13, 0xA2, 0x00, 0x40, 0x00, 0x00, 0x01, b'B', 0x00,
                ]))
                .await;
            module.send(&respond(&[])).await;
        };

        let (nodes, ()) = tokio::join!(commands.discover_nodes(Duration::from_secs(5)), module_task);
        let nodes = nodes.unwrap();
        let names: Vec<&str> = nodes.iter().map(|n| n.node_id.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
        assert_eq!(nodes[0].address64, REMOTE);
    }

    #[tokio::test]
    async fn test_discover_nodes_with_small_event_buffer() {
        let config = ConnectionConfig::new()
            .timeout(Duration::from_secs(1))
            .event_capacity(1);
        let (connection, _reader, mut module) = testing::connect(&config).await;
        let commands = CommandHandler::new(connection);

        let module_task = async {
            let frame_id = module.recv().await.frame_id().unwrap();
            for (low, name) in [(1u8, b'A'), (2, b'B'), (3, b'C'), (4, b'D')] {
                let value = vec![
                    0x00, low, 0x00, 0x13, 0xA2, 0x00, 0x40, 0x00, 0x00, low, name, 0x00,
                ];
                module
                    .send(&Packet::AtCommandResponse(AtCommandResponsePacket {
                        frame_id,
                        command: *b"ND",
                        status: AtCommandStatus::Ok,
                        value: value.into(),
                    }))
                    .await;
            }
            module
                .send(&Packet::AtCommandResponse(AtCommandResponsePacket {
                    frame_id,
                    command: *b"ND",
                    status: AtCommandStatus::Ok,
                    value: Bytes::new(),
                }))
                .await;
        };

        let (nodes, ()) = tokio::join!(commands.discover_nodes(Duration::from_secs(5)), module_task);
        let names: Vec<String> = nodes.unwrap().into_iter().map(|n| n.node_id).collect();
        assert_eq!(names, ["A", "B", "C", "D"]);
        assert_eq!(
            commands
                .connection()
                .dispatcher()
                .listeners()
                .count(ListenerKind::Discovery),
            0
        );
    }

    #[tokio::test]
    async fn test_discover_nodes_connection_lost() {
        let (commands, _reader, mut module) = handler().await;
        let module_task = async move {
            module.recv().await;
            drop(module);
        };
        let (nodes, ()) = tokio::join!(commands.discover_nodes(Duration::from_secs(5)), module_task);
        assert!(matches!(nodes, Err(Error::TransportClosed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_discover_nodes_window_elapses() {
        let (commands, _reader, mut module) = handler().await;
        let (nodes, _) = tokio::join!(
            commands.discover_nodes(Duration::from_millis(200)),
            module.recv()
        );
        assert!(nodes.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_soft_reset() {
        let (commands, _reader, mut module) = handler().await;
        let module_task = async {
            module.answer_at(AtCommandStatus::Ok, b"").await;
            module
                .send(&Packet::ModemStatus(ModemStatus::WatchdogReset))
                .await;
        };
        let (status, ()) = tokio::join!(commands.soft_reset(), module_task);
        assert_eq!(status.unwrap(), ModemStatus::WatchdogReset);
    }

    #[tokio::test]
    async fn test_panicking_modem_status_filter_keeps_reader_alive() {
        let (commands, reader, mut module) = handler().await;
        let (result, ()) = tokio::join!(
            commands.wait_for_modem_status(
                |_| panic!("filter failure"),
                Duration::from_millis(200)
            ),
            module.send(&Packet::ModemStatus(ModemStatus::JoinedNetwork))
        );
        assert!(matches!(result, Err(Error::Timeout { .. })));
        assert!(reader.is_running());

        let (value, _) = tokio::join!(
            commands.get_parameter("NI"),
            module.answer_at(AtCommandStatus::Ok, b"ROUTER")
        );
        assert_eq!(&value.unwrap()[..], b"ROUTER");
    }

    #[tokio::test(start_paused = true)]
    async fn test_at_command_timeout() {
        let (commands, _reader, mut module) = handler().await;
        let (result, _) = tokio::join!(commands.get_parameter("NI"), module.recv());
        assert!(matches!(result, Err(Error::Timeout { timeout_ms: 1000 })));
        assert_eq!(commands.connection().dispatcher().pending_count(), 0);
    }
}
