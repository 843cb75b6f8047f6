//! Transport layer for XBee communication.
//!
//! A transport opens a byte stream to the module and hands back its read
//! and write halves. The read half feeds the packet reader, the write
//! half is shared by all senders.

pub mod serial;
pub mod stream;

use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;

/// Read half of an open transport.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Write half of an open transport.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Trait for transport implementations.
pub trait Transport: Send + Sync {
    /// Opens the transport and returns its read and write halves.
    fn open(&mut self) -> BoxFuture<'_, Result<(BoxedReader, BoxedWriter)>>;

    /// Closes the transport.
    fn close(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Returns true if open.
    fn is_open(&self) -> bool;
}

pub use serial::{SerialConfig, SerialTransport};
pub use stream::StreamTransport;
