//! Transport over any async byte stream.
//!
//! Useful for TCP bridges, pseudo-terminals and in-memory pipes in tests.

use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Error, Result};
use crate::transport::{BoxedReader, BoxedWriter, Transport};

/// Wraps an `AsyncRead + AsyncWrite` stream. It can be opened once.
pub struct StreamTransport<S> {
    stream: Option<S>,
    open: bool,
}

impl<S> StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static,
{
    /// Creates a transport over `stream`.
    #[must_use]
    pub const fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
            open: false,
        }
    }
}

impl<S> Transport for StreamTransport<S>
where
    S: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static,
{
    fn open(&mut self) -> BoxFuture<'_, Result<(BoxedReader, BoxedWriter)>> {
        Box::pin(async move {
            let stream = self.stream.take().ok_or_else(|| {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::NotConnected,
                    "stream was already opened",
                ))
            })?;
            let (reader, writer) = tokio::io::split(stream);
            self.open = true;
            tracing::debug!("stream transport open");
            Ok((Box::new(reader) as BoxedReader, Box::new(writer) as BoxedWriter))
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.open = false;
            Ok(())
        })
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn test_open_once() {
        let (mut module, host) = tokio::io::duplex(64);
        let mut transport = StreamTransport::new(host);
        assert!(!transport.is_open());

        let (mut reader, mut writer) = transport.open().await.unwrap();
        assert!(transport.is_open());

        writer.write_all(&[0x7E]).await.unwrap();
        let mut byte = [0u8; 1];
        module.read_exact(&mut byte).await.unwrap();
        assert_eq!(byte, [0x7E]);

        module.write_all(&[0x42]).await.unwrap();
        reader.read_exact(&mut byte).await.unwrap();
        assert_eq!(byte, [0x42]);

        transport.close().await.unwrap();
        assert!(!transport.is_open());
        assert!(matches!(transport.open().await, Err(Error::Io(_))));
    }
}
