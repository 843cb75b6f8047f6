//! Request/response correlation and listener dispatch.
//!
//! Every decoded packet goes through [`Dispatcher::dispatch`]. If a
//! registered [`PendingRequest`] expects it, the waiting task receives
//! the packet and nobody else sees it. Otherwise the packet is turned
//! into an [`Event`] for listeners and subscribers.
//!
//! A response that arrives after its request timed out no longer has a
//! pending entry, so it falls through to the listeners like any other
//! unsolicited packet.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::oneshot;

use crate::error::{Error, Result};
use crate::event::{Event, Listeners};
use crate::protocol::{FrameType, Packet};

/// Allocates frame IDs in `1..=255`; 0 is reserved for "no response".
#[derive(Debug)]
pub struct FrameIdAllocator {
    last: AtomicU8,
}

impl FrameIdAllocator {
    /// Creates an allocator whose first ID is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            last: AtomicU8::new(0),
        }
    }

    const fn advance(id: u8) -> u8 {
        if id == u8::MAX { 1 } else { id + 1 }
    }

    /// Returns the next frame ID, wrapping from 255 to 1.
    pub fn next_id(&self) -> u8 {
        match self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |id| {
                Some(Self::advance(id))
            }) {
            Ok(previous) | Err(previous) => Self::advance(previous),
        }
    }
}

impl Default for FrameIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

type Predicate = Box<dyn Fn(&Packet) -> bool + Send + Sync>;

/// What a pending request is waiting for.
pub enum PendingKey {
    /// A response with this frame ID and one of these frame types.
    Response {
        frame_id: u8,
        frame_types: &'static [FrameType],
    },
    /// The first packet the predicate accepts.
    Predicate(Predicate),
}

impl PendingKey {
    /// Key for the response to `packet`, if it has a nonzero frame ID and
    /// a response frame type.
    #[must_use]
    pub fn for_request(packet: &Packet) -> Option<Self> {
        let frame_id = packet.frame_id().filter(|&id| id != 0)?;
        let frame_types = packet.response_types();
        if frame_types.is_empty() {
            return None;
        }
        Some(Self::Response {
            frame_id,
            frame_types,
        })
    }

    /// Key matching the first packet `predicate` accepts.
    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&Packet) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Box::new(predicate))
    }

    fn matches(&self, packet: &Packet) -> bool {
        match self {
            Self::Response {
                frame_id,
                frame_types,
            } => {
                packet.frame_id() == Some(*frame_id)
                    && packet
                        .kind()
                        .is_some_and(|kind| frame_types.contains(&kind))
            }
            Self::Predicate(predicate) => catch_unwind(AssertUnwindSafe(|| predicate(packet)))
                .unwrap_or_else(|_| {
                    tracing::warn!("pending request predicate panicked, treating as no match");
                    false
                }),
        }
    }
}

impl std::fmt::Debug for PendingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Response {
                frame_id,
                frame_types,
            } => f
                .debug_struct("Response")
                .field("frame_id", frame_id)
                .field("frame_types", frame_types)
                .finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

struct PendingEntry {
    id: u64,
    key: PendingKey,
    created: Instant,
    slot: oneshot::Sender<Result<Packet>>,
}

/// A registered wait for one response.
///
/// Dropping it before the response arrives removes the registration.
pub struct PendingRequest {
    id: u64,
    receiver: oneshot::Receiver<Result<Packet>>,
    dispatcher: Arc<Dispatcher>,
}

impl PendingRequest {
    /// Waits for the response.
    ///
    /// # Errors
    ///
    /// - `Error::Timeout` if nothing matched within `timeout`
    /// - `Error::TransportClosed` if the connection was lost first
    pub async fn wait(mut self, timeout: Duration) -> Result<Packet> {
        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::TransportClosed),
            Err(_) => {
                tracing::debug!("pending request {} timed out after {timeout:?}", self.id);
                Err(Error::timeout(timeout))
            }
        }
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        self.dispatcher.remove(self.id);
    }
}

/// Correlates responses with requests and fans out everything else.
pub struct Dispatcher {
    frame_ids: FrameIdAllocator,
    next_pending: AtomicU64,
    pending: Mutex<Vec<PendingEntry>>,
    closed: AtomicBool,
    listeners: Listeners,
}

impl Dispatcher {
    /// Creates a dispatcher whose event channel holds `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            frame_ids: FrameIdAllocator::new(),
            next_pending: AtomicU64::new(1),
            pending: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            listeners: Listeners::new(capacity),
        }
    }

    /// Returns the next frame ID.
    pub fn next_frame_id(&self) -> u8 {
        self.frame_ids.next_id()
    }

    /// The listener registry.
    #[must_use]
    pub const fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    /// Number of outstanding requests.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Returns true once the reader has stopped, until [`reopen`](Self::reopen).
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Accepts requests again after a new transport was attached.
    pub fn reopen(&self) {
        self.closed.store(false, Ordering::Release);
    }

    /// Registers a wait for a packet matching `key`.
    ///
    /// Register before writing the request so a fast response is not missed.
    /// While the dispatcher is closed the request fails immediately with
    /// `Error::TransportClosed`.
    pub fn register(self: &Arc<Self>, key: PendingKey) -> PendingRequest {
        let id = self.next_pending.fetch_add(1, Ordering::Relaxed);
        let (slot, receiver) = oneshot::channel();
        {
            let mut pending = self.lock();
            if self.is_closed() {
                tracing::debug!("pending request {id} rejected, reader stopped");
                let _ = slot.send(Err(Error::TransportClosed));
            } else {
                tracing::trace!("registering pending request {id}: {key:?}");
                pending.push(PendingEntry {
                    id,
                    key,
                    created: Instant::now(),
                    slot,
                });
            }
        }
        PendingRequest {
            id,
            receiver,
            dispatcher: Arc::clone(self),
        }
    }

    /// Routes one decoded packet.
    ///
    /// The oldest matching pending request consumes the packet. Anything
    /// unmatched is emitted as an event.
    pub fn dispatch(&self, packet: Packet) {
        let entry = {
            let mut pending = self.lock();
            pending
                .iter()
                .position(|entry| entry.key.matches(&packet))
                .map(|index| pending.remove(index))
        };

        let packet = match entry {
            Some(entry) => {
                tracing::trace!(
                    "request {} answered after {:?}",
                    entry.id,
                    entry.created.elapsed()
                );
                match entry.slot.send(Ok(packet)) {
                    Ok(()) => return,
                    // The waiter gave up between matching and delivery.
                    Err(Ok(packet)) => packet,
                    Err(Err(_)) => return,
                }
            }
            None => packet,
        };

        self.listeners.emit(Event::from_packet(packet));
    }

    /// Fails every outstanding request with `Error::TransportClosed` and
    /// rejects new ones until [`reopen`](Self::reopen).
    pub fn cancel_all(&self) {
        let drained: Vec<PendingEntry> = {
            let mut pending = self.lock();
            self.closed.store(true, Ordering::Release);
            std::mem::take(&mut *pending)
        };
        if !drained.is_empty() {
            tracing::debug!("cancelling {} pending requests", drained.len());
        }
        for entry in drained {
            let _ = entry.slot.send(Err(Error::TransportClosed));
        }
    }

    /// Called by the reader when the transport fails or closes.
    pub fn connection_lost(&self) {
        self.cancel_all();
        self.listeners.emit(Event::ConnectionLost);
    }

    fn remove(&self, id: u64) {
        self.lock().retain(|entry| entry.id != id);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PendingEntry>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
