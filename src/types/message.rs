//! Received data messages.

use bytes::Bytes;

use crate::types::address::{XBee16BitAddress, XBee64BitAddress};
use crate::types::options::ReceiveOptions;

/// Application addressing of an explicit (`ExplicitRx`) message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExplicitAddressing {
    /// Source endpoint.
    pub source_endpoint: u8,
    /// Destination endpoint.
    pub destination_endpoint: u8,
    /// Cluster ID.
    pub cluster_id: u16,
    /// Profile ID.
    pub profile_id: u16,
}

/// Data received from another module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XBeeMessage {
    /// 64-bit address of the sender, if the frame carried one.
    pub source64: Option<XBee64BitAddress>,
    /// 16-bit address of the sender, if the frame carried one.
    pub source16: Option<XBee16BitAddress>,
    /// Receive options.
    pub options: ReceiveOptions,
    /// Signal strength in -dBm (802.15.4 frames only).
    pub rssi: Option<u8>,
    /// Application addressing (explicit frames only).
    pub explicit: Option<ExplicitAddressing>,
    /// Payload.
    pub data: Bytes,
}

impl XBeeMessage {
    /// Returns true if the message was sent as a broadcast.
    #[must_use]
    pub const fn is_broadcast(&self) -> bool {
        self.options.is_broadcast()
    }

    /// Returns the payload as UTF-8 text (lossy).
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}
