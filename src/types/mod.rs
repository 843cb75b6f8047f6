//! Data types for XBee entities.
//!
//! This module contains the core data structures used throughout the library:
//! - 64-bit and 16-bit addresses
//! - Status codes and option bit fields
//! - IO samples
//! - Received messages and discovered nodes

pub mod address;
pub mod io;
pub mod message;
pub mod node;
pub mod options;
pub mod status;

pub use address::{XBee16BitAddress, XBee64BitAddress};
pub use io::{IoSample, IoValue};
pub use message::{ExplicitAddressing, XBeeMessage};
pub use node::{DeviceInfo, DeviceType, DiscoveredNode};
pub use options::{ReceiveOptions, RemoteAtOptions, TransmitOptions};
pub use status::{AtCommandStatus, DeliveryStatus, DiscoveryStatus, ModemStatus};
