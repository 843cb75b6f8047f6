//! Event system for unsolicited packets.
//!
//! Packets that do not answer an outstanding request become [`Event`]s.
//! They are delivered two ways: synchronously to callbacks registered
//! per [`ListenerKind`], and through a broadcast channel to async
//! [`Subscription`]s.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;

use crate::protocol::Packet;
use crate::types::{
    AtCommandStatus, DiscoveredNode, IoSample, ModemStatus, XBee16BitAddress, XBee64BitAddress,
    XBeeMessage,
};

/// AT command whose responses carry discovery results.
const NODE_DISCOVERY_COMMAND: [u8; 2] = *b"ND";

/// Event types that can be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// RF data received (0x90, 0x91, 0x80, 0x81).
    DataReceived(XBeeMessage),
    /// IO sample received from a remote module.
    IoSampleReceived {
        source64: XBee64BitAddress,
        source16: XBee16BitAddress,
        sample: IoSample,
    },
    /// Modem status reported by the local module.
    ModemStatus(ModemStatus),
    /// A node answered a discovery request, or announced itself.
    ///
    /// `frame_id` is the frame ID of the `ND` request, or `None` for
    /// node identification frames.
    NodeDiscovered {
        frame_id: Option<u8>,
        node: DiscoveredNode,
    },
    /// The module finished a discovery request.
    DiscoveryFinished {
        frame_id: u8,
        status: AtCommandStatus,
    },
    /// Any other packet no request was waiting for.
    Packet(Packet),
    /// The reader stopped because the transport failed or closed.
    ConnectionLost,
}

impl Event {
    /// Converts an unmatched packet into the event listeners receive.
    #[must_use]
    pub fn from_packet(packet: Packet) -> Self {
        match packet {
            Packet::Receive(p) => Self::DataReceived(p.to_message()),
            Packet::ExplicitRx(p) => Self::DataReceived(p.to_message()),
            Packet::Rx64(p) => Self::DataReceived(p.to_message()),
            Packet::Rx16(p) => Self::DataReceived(p.to_message()),
            Packet::IoSampleRx(p) => Self::IoSampleReceived {
                source64: p.source64,
                source16: p.source16,
                sample: p.sample,
            },
            Packet::ModemStatus(status) => Self::ModemStatus(status),
            Packet::NodeIdentification(p) => Self::NodeDiscovered {
                frame_id: None,
                node: p.to_node(),
            },
            Packet::AtCommandResponse(p) if p.command == NODE_DISCOVERY_COMMAND => {
                if p.value.is_empty() || !p.status.is_ok() {
                    return Self::DiscoveryFinished {
                        frame_id: p.frame_id,
                        status: p.status,
                    };
                }
                match DiscoveredNode::parse_discovery(&p.value) {
                    Some(node) => Self::NodeDiscovered {
                        frame_id: Some(p.frame_id),
                        node,
                    },
                    None => {
                        tracing::warn!("malformed ND response: {}", hex::encode(&p.value));
                        Self::Packet(Packet::AtCommandResponse(p))
                    }
                }
            }
            other => Self::Packet(other),
        }
    }

    /// Listener kind this event is delivered to.
    ///
    /// `ConnectionLost` only reaches async subscribers.
    #[must_use]
    pub const fn kind(&self) -> Option<ListenerKind> {
        match self {
            Self::DataReceived(_) => Some(ListenerKind::Data),
            Self::IoSampleReceived { .. } => Some(ListenerKind::IoSample),
            Self::ModemStatus(_) => Some(ListenerKind::ModemStatus),
            Self::NodeDiscovered { .. } | Self::DiscoveryFinished { .. } => {
                Some(ListenerKind::Discovery)
            }
            Self::Packet(_) => Some(ListenerKind::Packet),
            Self::ConnectionLost => None,
        }
    }
}

/// Category of listener callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    /// Received RF data.
    Data,
    /// Received IO samples.
    IoSample,
    /// Modem status changes.
    ModemStatus,
    /// Discovery results and node announcements.
    Discovery,
    /// Packets not covered by the other kinds.
    Packet,
}

/// Handle returned when registering a listener, used to unregister it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle {
    kind: ListenerKind,
    id: u64,
}

impl ListenerHandle {
    /// Kind the listener was registered for.
    #[must_use]
    pub const fn kind(&self) -> ListenerKind {
        self.kind
    }
}

type Callback = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Clone)]
struct Slot {
    id: u64,
    active: Arc<AtomicBool>,
    callback: Callback,
}

/// A subscription to events.
pub struct Subscription {
    receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Receives the next event.
    ///
    /// Returns `None` once the event source is gone. Events missed
    /// because the subscriber fell behind are skipped.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("subscription lagged, skipped {missed} events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Listener registry and event fan-out.
pub struct Listeners {
    next_id: AtomicU64,
    slots: Mutex<HashMap<ListenerKind, Vec<Slot>>>,
    sender: broadcast::Sender<Event>,
}

impl Listeners {
    /// Creates an empty registry whose broadcast channel holds `capacity` events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            next_id: AtomicU64::new(1),
            slots: Mutex::new(HashMap::new()),
            sender,
        }
    }

    /// Registers a callback for received data.
    pub fn on_data<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&XBeeMessage) + Send + Sync + 'static,
    {
        self.register(ListenerKind::Data, move |event| {
            if let Event::DataReceived(message) = event {
                callback(message);
            }
        })
    }

    /// Registers a callback for IO samples.
    pub fn on_io_sample<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(XBee64BitAddress, &IoSample) + Send + Sync + 'static,
    {
        self.register(ListenerKind::IoSample, move |event| {
            if let Event::IoSampleReceived {
                source64, sample, ..
            } = event
            {
                callback(*source64, sample);
            }
        })
    }

    /// Registers a callback for modem status changes.
    pub fn on_modem_status<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(ModemStatus) + Send + Sync + 'static,
    {
        self.register(ListenerKind::ModemStatus, move |event| {
            if let Event::ModemStatus(status) = event {
                callback(*status);
            }
        })
    }

    /// Registers a callback for discovery events.
    pub fn on_discovery<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.register(ListenerKind::Discovery, callback)
    }

    /// Registers a callback for packets no other kind covers.
    pub fn on_packet<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn(&Packet) + Send + Sync + 'static,
    {
        self.register(ListenerKind::Packet, move |event| {
            if let Event::Packet(packet) = event {
                callback(packet);
            }
        })
    }

    /// Registers a raw event callback for `kind`.
    pub fn register<F>(&self, kind: ListenerKind, callback: F) -> ListenerHandle
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Slot {
            id,
            active: Arc::new(AtomicBool::new(true)),
            callback: Arc::new(callback),
        };
        self.lock().entry(kind).or_default().push(slot);
        tracing::trace!("registered {kind:?} listener {id}");
        ListenerHandle { kind, id }
    }

    /// Removes a listener. Returns false if it was not registered.
    ///
    /// Once this returns the callback is not started again, though an
    /// invocation already running on another task may still finish.
    pub fn unregister(&self, handle: ListenerHandle) -> bool {
        let mut slots = self.lock();
        let Some(list) = slots.get_mut(&handle.kind) else {
            return false;
        };
        let Some(index) = list.iter().position(|slot| slot.id == handle.id) else {
            return false;
        };
        let slot = list.remove(index);
        slot.active.store(false, Ordering::Release);
        true
    }

    /// Number of listeners registered for `kind`.
    #[must_use]
    pub fn count(&self, kind: ListenerKind) -> usize {
        self.lock().get(&kind).map_or(0, Vec::len)
    }

    /// Subscribes to all events.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Delivers an event to its listeners and to subscribers.
    ///
    /// Listeners run on the calling task against a snapshot of the
    /// registry, so callbacks may register or unregister listeners.
    /// A panicking callback is logged and skipped.
    pub fn emit(&self, event: Event) {
        if let Some(kind) = event.kind() {
            let snapshot = self.lock().get(&kind).cloned().unwrap_or_default();
            for slot in snapshot {
                if !slot.active.load(Ordering::Acquire) {
                    continue;
                }
                let callback = &slot.callback;
                if catch_unwind(AssertUnwindSafe(|| callback(&event))).is_err() {
                    tracing::warn!("{kind:?} listener {} panicked", slot.id);
                }
            }
        }

        // No receivers is fine
        let _ = self.sender.send(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ListenerKind, Vec<Slot>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::protocol::packet::{AtCommandResponsePacket, ReceivePacket};
    use crate::types::ReceiveOptions;

    fn receive(data: &'static [u8]) -> Packet {
        Packet::Receive(ReceivePacket {
            source64: XBee64BitAddress::from_u64(0x0013_A200_4000_0001),
            source16: XBee16BitAddress::from_u16(0x1234),
            options: ReceiveOptions::ACKNOWLEDGED,
            data: Bytes::from_static(data),
        })
    }

    fn nd_response(frame_id: u8, value: &'static [u8]) -> Packet {
        Packet::AtCommandResponse(AtCommandResponsePacket {
            frame_id,
            command: *b"ND",
            status: AtCommandStatus::Ok,
            value: Bytes::from_static(value),
        })
    }

    #[test]
    fn test_event_mapping() {
        assert_eq!(
            Event::from_packet(receive(b"hi")).kind(),
            Some(ListenerKind::Data)
        );
        assert_eq!(
            Event::from_packet(Packet::ModemStatus(ModemStatus::JoinedNetwork)),
            Event::ModemStatus(ModemStatus::JoinedNetwork)
        );
        assert_eq!(
            Event::from_packet(nd_response(5, b"")),
            Event::DiscoveryFinished {
                frame_id: 5,
                status: AtCommandStatus::Ok
            }
        );

        let ni = Packet::AtCommandResponse(AtCommandResponsePacket {
            frame_id: 1,
            command: *b"NI",
            status: AtCommandStatus::Ok,
            value: Bytes::from_static(b"X"),
        });
        assert!(matches!(Event::from_packet(ni), Event::Packet(_)));
    }

    #[test]
    fn test_nd_response_becomes_node() {
        let value: &'static [u8] = &[
            0x12, 0x34, 0x00, 0x13, 0xA2, 0x00, 0x40, 0xA1, 0xB2, 0xC3, b'N', b'1', 0x00,
        ];
        match Event::from_packet(nd_response(7, value)) {
            Event::NodeDiscovered { frame_id, node } => {
                assert_eq!(frame_id, Some(7));
                assert_eq!(node.node_id, "N1");
                assert_eq!(node.address16, XBee16BitAddress::from_u16(0x1234));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_listener_receives_only_its_kind() {
        let listeners = Listeners::new(8);
        let data = Arc::new(AtomicUsize::new(0));
        let modem = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&data);
        listeners.on_data(move |message| {
            assert_eq!(&message.data[..], b"hi");
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&modem);
        listeners.on_modem_status(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        listeners.emit(Event::from_packet(receive(b"hi")));
        listeners.emit(Event::from_packet(receive(b"hi")));
        listeners.emit(Event::ModemStatus(ModemStatus::HardwareReset));

        assert_eq!(data.load(Ordering::SeqCst), 2);
        assert_eq!(modem.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let listeners = Listeners::new(8);
        let calls = Arc::new(AtomicUsize::new(0));

        listeners.on_data(|_| panic!("listener failure"));
        let counter = Arc::clone(&calls);
        listeners.on_data(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        listeners.emit(Event::from_packet(receive(b"a")));
        listeners.emit(Event::from_packet(receive(b"b")));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unregister_during_dispatch() {
        let listeners = Arc::new(Listeners::new(8));
        let second_calls = Arc::new(AtomicUsize::new(0));
        let second_handle = Arc::new(Mutex::new(None::<ListenerHandle>));

        // The first listener removes the second before it runs.
        let registry = Arc::clone(&listeners);
        let handle_slot = Arc::clone(&second_handle);
        listeners.on_data(move |_| {
            if let Some(handle) = handle_slot.lock().unwrap().take() {
                assert!(registry.unregister(handle));
            }
        });
        let counter = Arc::clone(&second_calls);
        let handle = listeners.on_data(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        *second_handle.lock().unwrap() = Some(handle);

        listeners.emit(Event::from_packet(receive(b"x")));
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
        assert_eq!(listeners.count(ListenerKind::Data), 1);
        assert!(!listeners.unregister(handle));
    }

    #[tokio::test]
    async fn test_subscription() {
        let listeners = Listeners::new(16);
        let mut sub = listeners.subscribe();

        listeners.emit(Event::ConnectionLost);

        let event = tokio::time::timeout(Duration::from_millis(100), sub.recv())
            .await
            .unwrap();
        assert_eq!(event, Some(Event::ConnectionLost));
    }
}
