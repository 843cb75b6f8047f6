//! Background task turning the transport byte stream into packets.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::dispatch::Dispatcher;
use crate::protocol::{DecodeState, FrameDecoder, OperatingMode, Packet};

/// Read buffer size.
const READ_BUFFER_SIZE: usize = 1024;

/// Where the reader is in the byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReaderState {
    /// Created, not yet reading.
    Idle,
    /// Waiting for a start delimiter.
    SeekingDelimiter,
    /// Inside the length field.
    ReadingLength,
    /// Inside the payload.
    ReadingPayload,
    /// Waiting for the checksum byte.
    ReadingChecksum,
    /// Handing a packet to the dispatcher.
    Dispatching,
    /// Stopped; the transport closed or the reader was shut down.
    Stopped,
}

impl From<DecodeState> for ReaderState {
    fn from(state: DecodeState) -> Self {
        match state {
            DecodeState::SeekingDelimiter => Self::SeekingDelimiter,
            DecodeState::ReadingLength => Self::ReadingLength,
            DecodeState::ReadingPayload => Self::ReadingPayload,
            DecodeState::ReadingChecksum => Self::ReadingChecksum,
        }
    }
}

/// Reader counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReaderStats {
    /// Bytes read from the transport.
    pub bytes_read: u64,
    /// Frames with a valid envelope.
    pub frames: u64,
    /// Packets handed to the dispatcher.
    pub packets: u64,
    /// Framing errors (bad delimiter, checksum, truncated frame).
    pub frame_errors: u64,
    /// Valid frames whose payload did not parse.
    pub packet_errors: u64,
}

#[derive(Debug, Default)]
struct Counters {
    bytes_read: AtomicU64,
    frames: AtomicU64,
    packets: AtomicU64,
    frame_errors: AtomicU64,
    packet_errors: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ReaderStats {
        ReaderStats {
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            frames: self.frames.load(Ordering::Relaxed),
            packets: self.packets.load(Ordering::Relaxed),
            frame_errors: self.frame_errors.load(Ordering::Relaxed),
            packet_errors: self.packet_errors.load(Ordering::Relaxed),
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Handle to a running packet reader task.
///
/// Dropping the handle aborts the task.
pub struct PacketReader {
    state: watch::Receiver<ReaderState>,
    shutdown: watch::Sender<bool>,
    counters: Arc<Counters>,
    task: Option<JoinHandle<()>>,
}

impl PacketReader {
    /// Spawns a reader over `reader`, dispatching every decoded packet.
    pub fn spawn<R>(reader: R, mode: OperatingMode, dispatcher: Arc<Dispatcher>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let (state_tx, state) = watch::channel(ReaderState::Idle);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let counters = Arc::new(Counters::default());

        let task = tokio::spawn(run(
            reader,
            FrameDecoder::new(mode),
            dispatcher,
            state_tx,
            shutdown_rx,
            Arc::clone(&counters),
        ));

        Self {
            state,
            shutdown,
            counters,
            task: Some(task),
        }
    }

    /// Current reader state.
    #[must_use]
    pub fn state(&self) -> ReaderState {
        *self.state.borrow()
    }

    /// Receiver that observes state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ReaderState> {
        self.state.clone()
    }

    /// Returns true until the reader has stopped.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() != ReaderState::Stopped
    }

    /// Snapshot of the reader counters.
    #[must_use]
    pub fn stats(&self) -> ReaderStats {
        self.counters.snapshot()
    }

    /// Stops the reader and waits for the task to finish.
    pub async fn stop(&mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("reader task failed: {e}");
            }
        }
    }
}

impl Drop for PacketReader {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = self.shutdown.send(true);
            task.abort();
        }
    }
}

/// Runs when the reader task ends, however it ends.
///
/// A requested shutdown only cancels pending requests. Any other exit,
/// including a panic on the reader task, is reported as connection loss.
struct ExitGuard<'a> {
    dispatcher: &'a Dispatcher,
    state: &'a watch::Sender<ReaderState>,
    shutdown: watch::Receiver<bool>,
}

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        self.state.send_replace(ReaderState::Stopped);
        if *self.shutdown.borrow() {
            self.dispatcher.cancel_all();
        } else {
            tracing::error!("packet reader stopped, connection lost");
            self.dispatcher.connection_lost();
        }
    }
}

async fn run<R>(
    mut reader: R,
    mut decoder: FrameDecoder,
    dispatcher: Arc<Dispatcher>,
    state: watch::Sender<ReaderState>,
    shutdown: watch::Receiver<bool>,
    counters: Arc<Counters>,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let mut guard = ExitGuard {
        dispatcher: &dispatcher,
        state: &state,
        shutdown,
    };
    state.send_replace(ReaderState::SeekingDelimiter);
    tracing::debug!("packet reader started ({:?})", decoder.mode());

    loop {
        let read = tokio::select! {
            biased;
            _ = guard.shutdown.changed() => {
                tracing::debug!("packet reader received shutdown signal");
                return;
            }
            read = reader.read(&mut buf) => read,
        };

        let n = match read {
            Ok(0) => {
                tracing::debug!("transport closed");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                tracing::error!("transport read error: {e}");
                return;
            }
        };

        tracing::trace!("received {n} bytes");
        counters
            .bytes_read
            .fetch_add(u64::try_from(n).unwrap_or(u64::MAX), Ordering::Relaxed);
        decoder.feed(&buf[..n]);

        loop {
            match decoder.decode() {
                Ok(Some(payload)) => {
                    bump(&counters.frames);
                    tracing::trace!("decoded frame: {}", hex::encode(&payload));
                    match Packet::parse(&payload) {
                        Ok(packet) => {
                            bump(&counters.packets);
                            state.send_replace(ReaderState::Dispatching);
                            dispatcher.dispatch(packet);
                        }
                        Err(e) => {
                            bump(&counters.packet_errors);
                            tracing::warn!("dropping unparseable packet: {e}");
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    bump(&counters.frame_errors);
                    tracing::warn!("frame decode error: {e}");
                }
            }
        }

        state.send_replace(decoder.state().into());
    }
}
