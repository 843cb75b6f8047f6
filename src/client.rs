//! Main [`XBeeDevice`] client implementation.
//!
//! This module provides the high-level [`XBeeDevice`] that combines
//! transport, packet reader, dispatcher and commands into a unified
//! interface, plus [`RemoteXBeeDevice`] for modules reached over the air.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{Mutex, mpsc};

use crate::commands::CommandHandler;
use crate::connection::{Connection, ConnectionConfig};
use crate::error::{Error, Result};
use crate::event::{Event, ListenerHandle, Subscription};
use crate::protocol::{Packet, codec};
use crate::protocol::packet::TransmitStatusPacket;
use crate::reader::{PacketReader, ReaderStats};
use crate::transport::{SerialConfig, SerialTransport, Transport};
use crate::types::{
    DeviceInfo, IoSample, ModemStatus, RemoteAtOptions, TransmitOptions, XBee16BitAddress,
    XBee64BitAddress, XBeeMessage,
};

/// A local XBee module attached to the host.
pub struct XBeeDevice<T> {
    transport: T,
    config: ConnectionConfig,
    connection: Arc<Connection>,
    commands: CommandHandler,
    reader: Option<PacketReader>,
    info: Option<DeviceInfo>,
    data_queue: Mutex<mpsc::Receiver<XBeeMessage>>,
}

impl XBeeDevice<SerialTransport> {
    /// Creates a device for a serial port with default settings.
    ///
    /// # Arguments
    ///
    /// * `port` - Serial port path (e.g., "/dev/ttyUSB0")
    ///
    /// # Returns
    ///
    /// A new device (not yet open).
    #[must_use]
    pub fn serial(port: impl Into<String>) -> Self {
        Self::with_serial_config(SerialConfig::new(port))
    }

    /// Creates a device with custom serial configuration.
    #[must_use]
    pub fn with_serial_config(config: SerialConfig) -> Self {
        Self::new(SerialTransport::new(config), ConnectionConfig::default())
    }
}

impl<T: Transport> XBeeDevice<T> {
    /// Creates a device over `transport`.
    #[must_use]
    pub fn new(transport: T, config: ConnectionConfig) -> Self {
        let connection = Arc::new(Connection::new(&config));
        let commands = CommandHandler::new(Arc::clone(&connection));

        let (data_tx, data_rx) = mpsc::channel(config.receive_queue.max(1));
        connection.dispatcher().listeners().on_data(move |message| {
            if data_tx.try_send(message.clone()).is_err() {
                tracing::warn!("receive queue full, dropping message");
            }
        });

        Self {
            transport,
            config,
            connection,
            commands,
            reader: None,
            info: None,
            data_queue: Mutex::new(data_rx),
        }
    }

    /// Opens the transport, starts the packet reader and reads the
    /// identity of the module.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be opened or the module
    /// does not answer. The device is left closed in that case.
    pub async fn open(&mut self) -> Result<DeviceInfo> {
        if self.is_open() {
            return Err(Error::InvalidArgument {
                reason: "device is already open".into(),
            });
        }

        let (reader, writer) = self.transport.open().await?;
        self.connection.attach(writer).await;
        self.reader = Some(PacketReader::spawn(
            reader,
            self.config.mode,
            Arc::clone(self.connection.dispatcher()),
        ));

        match self.read_device_info().await {
            Ok(info) => {
                tracing::info!(
                    "opened {} \"{}\" (firmware {:x}, hardware {:x})",
                    info.address64,
                    info.node_id,
                    info.firmware_version,
                    info.hardware_version
                );
                self.info = Some(info.clone());
                Ok(info)
            }
            Err(e) => {
                tracing::warn!("module did not identify itself: {e}");
                if let Err(close_err) = self.close().await {
                    tracing::debug!("close after failed open: {close_err}");
                }
                Err(e)
            }
        }
    }

    async fn read_device_info(&self) -> Result<DeviceInfo> {
        let high = codec::bytes_to_u32(&self.commands.get_parameter("SH").await?)?;
        let low = codec::bytes_to_u32(&self.commands.get_parameter("SL").await?)?;

        // 802.15.4 modules with MY unset and some protocols have no 16-bit address
        let address16 = match self.commands.get_parameter("MY").await {
            Ok(value) => codec::bytes_to_u16(&value)
                .ok()
                .map(XBee16BitAddress::from_u16),
            Err(e) => {
                tracing::debug!("MY not available: {e}");
                None
            }
        };

        let node_id = String::from_utf8_lossy(&self.commands.get_parameter("NI").await?)
            .trim_end_matches('\0')
            .to_string();
        let firmware_version = codec::bytes_to_u32(&self.commands.get_parameter("VR").await?)?;
        let hardware_version = codec::bytes_to_u16(&self.commands.get_parameter("HV").await?)?;

        Ok(DeviceInfo {
            address64: XBee64BitAddress::from_parts(high, low),
            address16,
            node_id,
            firmware_version,
            hardware_version,
        })
    }

    /// Stops the reader, cancels pending requests and closes the transport.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(mut reader) = self.reader.take() {
            reader.stop().await;
        }
        self.connection.detach().await?;
        self.transport.close().await?;
        tracing::debug!("device closed");
        Ok(())
    }

    /// Returns true while the transport is open and the reader is running.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.transport.is_open() && self.reader.as_ref().is_some_and(PacketReader::is_running)
    }

    /// Identity read by the last successful [`open`](Self::open).
    #[must_use]
    pub const fn device_info(&self) -> Option<&DeviceInfo> {
        self.info.as_ref()
    }

    /// Returns the command handler for direct command access.
    #[must_use]
    pub const fn commands(&self) -> &CommandHandler {
        &self.commands
    }

    /// The connection shared by this device and its remotes.
    #[must_use]
    pub const fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Counters of the running reader.
    #[must_use]
    pub fn reader_stats(&self) -> Option<ReaderStats> {
        self.reader.as_ref().map(PacketReader::stats)
    }

    // ==================== Events ====================

    /// Subscribes to all events.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.connection.dispatcher().listeners().subscribe()
    }

    /// Registers a callback for received data.
    pub fn on_data<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&XBeeMessage) + Send + Sync + 'static,
    {
        self.connection.dispatcher().listeners().on_data(callback)
    }

    /// Registers a callback for IO samples.
    pub fn on_io_sample<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(XBee64BitAddress, &IoSample) + Send + Sync + 'static,
    {
        self.connection.dispatcher().listeners().on_io_sample(callback)
    }

    /// Registers a callback for modem status changes.
    pub fn on_modem_status<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(ModemStatus) + Send + Sync + 'static,
    {
        self.connection
            .dispatcher()
            .listeners()
            .on_modem_status(callback)
    }

    /// Registers a callback for discovery events.
    pub fn on_discovery<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.connection.dispatcher().listeners().on_discovery(callback)
    }

    /// Registers a callback for packets no other listener kind covers.
    pub fn on_packet<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&Packet) + Send + Sync + 'static,
    {
        self.connection.dispatcher().listeners().on_packet(callback)
    }

    /// Removes a listener.
    pub fn remove_listener(&self, handle: ListenerHandle) -> bool {
        self.connection.dispatcher().listeners().unregister(handle)
    }

    /// Waits for the next received message.
    ///
    /// # Errors
    ///
    /// Returns `Error::Timeout` if nothing arrives within `timeout`.
    pub async fn read_data(&self, timeout: Duration) -> Result<XBeeMessage> {
        let mut queue = self.data_queue.lock().await;
        match tokio::time::timeout(timeout, queue.recv()).await {
            Ok(Some(message)) => Ok(message),
            Ok(None) => Err(Error::TransportClosed),
            Err(_) => Err(Error::timeout(timeout)),
        }
    }

    // ==================== Remote Devices ====================

    /// Returns a handle to a remote module reached through this one.
    #[must_use]
    pub fn remote(&self, address64: XBee64BitAddress) -> RemoteXBeeDevice {
        RemoteXBeeDevice::new(self.commands.clone(), address64, XBee16BitAddress::UNKNOWN)
    }
}

/// A module reached over the air through a local device.
#[derive(Clone)]
pub struct RemoteXBeeDevice {
    commands: CommandHandler,
    address64: XBee64BitAddress,
    address16: XBee16BitAddress,
    options: RemoteAtOptions,
}

impl RemoteXBeeDevice {
    /// Creates a remote handle. Use [`XBeeDevice::remote`].
    #[must_use]
    pub const fn new(
        commands: CommandHandler,
        address64: XBee64BitAddress,
        address16: XBee16BitAddress,
    ) -> Self {
        Self {
            commands,
            address64,
            address16,
            options: RemoteAtOptions::APPLY_CHANGES,
        }
    }

    /// Sets the 16-bit address used for requests.
    #[must_use]
    pub const fn with_address16(mut self, address16: XBee16BitAddress) -> Self {
        self.address16 = address16;
        self
    }

    /// Sets the options of remote AT commands.
    #[must_use]
    pub const fn with_options(mut self, options: RemoteAtOptions) -> Self {
        self.options = options;
        self
    }

    /// 64-bit address of the remote module.
    #[must_use]
    pub const fn address64(&self) -> XBee64BitAddress {
        self.address64
    }

    /// Reads a parameter of the remote module.
    pub async fn get_parameter(&self, command: &str) -> Result<Bytes> {
        self.at_command(command, Bytes::new()).await
    }

    /// Writes a parameter of the remote module.
    pub async fn set_parameter(&self, command: &str, value: impl Into<Bytes>) -> Result<()> {
        self.at_command(command, value).await.map(drop)
    }

    /// Runs a command on the remote module.
    pub async fn execute_command(&self, command: &str) -> Result<()> {
        self.at_command(command, Bytes::new()).await.map(drop)
    }

    /// Samples the IO lines of the remote module.
    pub async fn read_io_sample(&self) -> Result<IoSample> {
        let value = self.get_parameter("IS").await?;
        IoSample::parse(&value).ok_or_else(|| Error::Protocol {
            message: format!("malformed IO sample from {}", self.address64),
        })
    }

    /// Sends data to the remote module and waits for the transmit status.
    pub async fn send_data(&self, data: impl Into<Bytes>) -> Result<TransmitStatusPacket> {
        self.commands
            .send_data(self.address64, self.address16, data, TransmitOptions::NONE)
            .await
    }

    async fn at_command(&self, command: &str, parameter: impl Into<Bytes>) -> Result<Bytes> {
        self.commands
            .remote_at_command(
                self.address64,
                self.address16,
                command,
                parameter,
                self.options,
            )
            .await
    }
}
