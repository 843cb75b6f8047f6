//! # xbee
//!
//! A Rust host library for Digi XBee radio modules in API mode.
//!
//! This library talks to a module over USB/Serial (or any async byte
//! stream), framing packets in API or API-escaped mode and correlating
//! requests with their responses.
//!
//! ## Features
//!
//! - Async/await based API using Tokio
//! - Typed packet model for the common API frame types
//! - Request/response correlation by frame ID, plus callback and
//!   channel based delivery of unsolicited packets
//! - Comprehensive error handling
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use xbee::{XBee64BitAddress, XBeeDevice};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), xbee::Error> {
//!     // Open the local module
//!     let mut device = XBeeDevice::serial("/dev/ttyUSB0");
//!     let info = device.open().await?;
//!     println!("Opened {} ({})", info.node_id, info.address64);
//!
//!     // Print whatever arrives over the air
//!     device.on_data(|message| println!("{}: {}", message.data.len(), message.text()));
//!
//!     // Talk to a remote module
//!     let remote = device.remote(XBee64BitAddress::from_u64(0x0013_A200_40A1_B2C3));
//!     remote.send_data(&b"hello"[..]).await?;
//!
//!     // Or wait for the next message
//!     let message = device.read_data(Duration::from_secs(5)).await?;
//!     println!("Received: {}", message.text());
//!
//!     device.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`protocol`] - Byte helpers, API frames and the typed packet model
//! - [`types`] - Data structures (addresses, status codes, IO samples, nodes)
//! - [`transport`] - Transport implementations (USB/Serial and generic streams)
//! - [`reader`] - Background task turning the byte stream into packets
//! - [`dispatch`] - Frame ID allocation and request/response correlation
//! - [`event`] - Listener callbacks and subscriptions for unsolicited packets
//! - [`connection`] - Writer, dispatcher and request helpers for one module
//! - [`commands`] - Command handler for module operations
//! - [`client`] - High-level [`XBeeDevice`] and [`RemoteXBeeDevice`]

pub mod client;
pub mod commands;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod protocol;
pub mod reader;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports for convenience
pub use client::{RemoteXBeeDevice, XBeeDevice};
pub use commands::CommandHandler;
pub use connection::{Connection, ConnectionConfig};
pub use dispatch::{Dispatcher, FrameIdAllocator, PendingKey, PendingRequest};
pub use error::{Error, FrameError, PacketError, Result};
pub use event::{Event, ListenerHandle, ListenerKind, Listeners, Subscription};
pub use protocol::{FrameDecoder, FrameType, OperatingMode, Packet};
pub use reader::{PacketReader, ReaderState, ReaderStats};
pub use transport::{SerialConfig, SerialTransport, StreamTransport, Transport, serial::list_ports};
pub use types::{
    AtCommandStatus, DeliveryStatus, DeviceInfo, DeviceType, DiscoveredNode, DiscoveryStatus,
    ExplicitAddressing, IoSample, IoValue, ModemStatus, ReceiveOptions, RemoteAtOptions,
    TransmitOptions, XBee16BitAddress, XBee64BitAddress, XBeeMessage,
};
