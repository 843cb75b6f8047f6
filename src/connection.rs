//! Connection context: writer, dispatcher and request helpers.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::dispatch::{Dispatcher, PendingKey};
use crate::error::{Error, Result};
use crate::protocol::{OperatingMode, Packet};
use crate::transport::BoxedWriter;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Default capacity of the received data queue.
pub const DEFAULT_RECEIVE_QUEUE: usize = 64;

/// Connection settings.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// API mode the module is configured for (`AP`).
    pub mode: OperatingMode,
    /// Timeout for synchronous requests.
    pub timeout: Duration,
    /// Capacity of the event broadcast channel.
    pub event_capacity: usize,
    /// Capacity of the queue behind `read_data`.
    pub receive_queue: usize,
}

impl ConnectionConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mode: OperatingMode::Api,
            timeout: DEFAULT_TIMEOUT,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            receive_queue: DEFAULT_RECEIVE_QUEUE,
        }
    }

    /// Sets the API mode.
    #[must_use]
    pub const fn mode(mut self, mode: OperatingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the event channel capacity.
    #[must_use]
    pub const fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Sets the received data queue capacity.
    #[must_use]
    pub const fn receive_queue(mut self, capacity: usize) -> Self {
        self.receive_queue = capacity;
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// One connection to a module.
///
/// Owns the frame ID allocator and pending table (through the
/// [`Dispatcher`]) and the write half of the transport.
pub struct Connection {
    mode: OperatingMode,
    timeout: Duration,
    dispatcher: Arc<Dispatcher>,
    writer: Mutex<Option<BoxedWriter>>,
}

impl Connection {
    /// Creates a detached connection.
    #[must_use]
    pub fn new(config: &ConnectionConfig) -> Self {
        Self {
            mode: config.mode,
            timeout: config.timeout,
            dispatcher: Arc::new(Dispatcher::new(config.event_capacity)),
            writer: Mutex::new(None),
        }
    }

    /// API mode used for framing.
    #[must_use]
    pub const fn mode(&self) -> OperatingMode {
        self.mode
    }

    /// Default request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The dispatcher fed by this connection's reader.
    #[must_use]
    pub const fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Returns the next frame ID.
    pub fn next_frame_id(&self) -> u8 {
        self.dispatcher.next_frame_id()
    }

    /// Installs the write half of an open transport and accepts
    /// requests again.
    pub async fn attach(&self, writer: BoxedWriter) {
        *self.writer.lock().await = Some(writer);
        self.dispatcher.reopen();
    }

    /// Removes and shuts down the write half.
    pub async fn detach(&self) -> Result<()> {
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            writer.shutdown().await?;
        }
        Ok(())
    }

    /// Returns true if a writer is attached.
    pub async fn is_attached(&self) -> bool {
        self.writer.lock().await.is_some()
    }

    /// Encodes and writes one packet.
    ///
    /// The writer lock is held for exactly one frame.
    pub async fn send(&self, packet: &Packet) -> Result<()> {
        let frame = packet.to_frame(self.mode)?;
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!("sending frame: {}", hex::encode(&frame));
        writer.write_all(&frame).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Sends `packet` and waits for the first packet matching `key`.
    ///
    /// The wait is registered before the frame is written. Fails with
    /// `Error::TransportClosed` without writing once the reader has stopped.
    pub async fn request(
        &self,
        packet: &Packet,
        key: PendingKey,
        timeout: Duration,
    ) -> Result<Packet> {
        if self.dispatcher.is_closed() {
            return Err(Error::TransportClosed);
        }
        let pending = self.dispatcher.register(key);
        self.send(packet).await?;
        pending.wait(timeout).await
    }

    /// Sends a request and waits for its correlated response.
    ///
    /// A frame ID of 0 is replaced by a freshly allocated one.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidArgument` if the packet type gets no response
    /// - `Error::Timeout` if no response arrives in time
    /// - `Error::TransportClosed` if the connection is lost while waiting
    pub async fn send_and_wait(&self, mut packet: Packet, timeout: Duration) -> Result<Packet> {
        if packet.frame_id() == Some(0) {
            packet.set_frame_id(self.next_frame_id());
        }
        let key = PendingKey::for_request(&packet).ok_or_else(|| Error::InvalidArgument {
            reason: format!(
                "frame type 0x{:02x} has no correlated response",
                packet.frame_type()
            ),
        })?;
        self.request(&packet, key, timeout).await
    }
}
