//! Serial port transport.
//!
//! XBee modules are usually attached through a USB/serial adapter.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::io::AsyncReadExt;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, StopBits};

use crate::error::{Error, Result};
use crate::transport::{BoxedReader, BoxedWriter, Transport};

/// Factory default baud rate of XBee modules (`BD=3`).
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default delay after opening the port.
pub const DEFAULT_CONNECTION_DELAY: Duration = Duration::from_millis(100);

/// Configuration for serial transport.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0" or "COM3").
    pub port: String,
    /// Baud rate.
    pub baud_rate: u32,
    /// Data bits.
    pub data_bits: DataBits,
    /// Parity.
    pub parity: Parity,
    /// Stop bits.
    pub stop_bits: StopBits,
    /// Flow control.
    pub flow_control: FlowControl,
    /// Delay after opening, during which stale input is discarded.
    pub connection_delay: Duration,
}

impl SerialConfig {
    /// Creates a new serial configuration with default settings (9600 8N1).
    #[must_use]
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            connection_delay: DEFAULT_CONNECTION_DELAY,
        }
    }

    /// Sets the baud rate.
    #[must_use]
    pub const fn baud_rate(mut self, rate: u32) -> Self {
        self.baud_rate = rate;
        self
    }

    /// Sets the parity.
    #[must_use]
    pub const fn parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }

    /// Sets the stop bits.
    #[must_use]
    pub const fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Sets the flow control.
    #[must_use]
    pub const fn flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }

    /// Sets the connection delay.
    #[must_use]
    pub const fn connection_delay(mut self, delay: Duration) -> Self {
        self.connection_delay = delay;
        self
    }
}

/// Serial transport for XBee communication.
pub struct SerialTransport {
    config: SerialConfig,
    open: bool,
}

impl SerialTransport {
    /// Creates a new serial transport with the given configuration.
    #[must_use]
    pub const fn new(config: SerialConfig) -> Self {
        Self {
            config,
            open: false,
        }
    }

    /// Creates a new serial transport for the given port with default settings.
    #[must_use]
    pub fn with_port(port: impl Into<String>) -> Self {
        Self::new(SerialConfig::new(port))
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &SerialConfig {
        &self.config
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> BoxFuture<'_, Result<(BoxedReader, BoxedWriter)>> {
        Box::pin(async move {
            tracing::info!(
                "opening serial port {} at {} baud",
                self.config.port,
                self.config.baud_rate
            );

            let mut stream = tokio_serial::new(&self.config.port, self.config.baud_rate)
                .data_bits(self.config.data_bits)
                .parity(self.config.parity)
                .stop_bits(self.config.stop_bits)
                .flow_control(self.config.flow_control)
                .open_native_async()
                .map_err(Error::Serial)?;

            // Discard whatever the adapter buffered before we opened it
            let deadline = tokio::time::Instant::now() + self.config.connection_delay;
            let mut buf = [0u8; 256];
            let mut drained = 0usize;
            while let Ok(Ok(n)) =
                tokio::time::timeout_at(deadline, stream.read(&mut buf)).await
            {
                if n == 0 {
                    break;
                }
                drained += n;
            }
            if drained > 0 {
                tracing::debug!("drained {drained} stale bytes from serial buffer");
            }

            let (reader, writer) = tokio::io::split(stream);
            self.open = true;
            tracing::info!("serial port open");
            Ok((Box::new(reader) as BoxedReader, Box::new(writer) as BoxedWriter))
        })
    }

    fn close(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            if self.open {
                tracing::info!("closing serial port {}", self.config.port);
                self.open = false;
            }
            Ok(())
        })
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Lists available serial ports.
///
/// # Errors
///
/// Returns an error if the port list cannot be retrieved.
pub fn list_ports() -> Result<Vec<String>> {
    let ports = tokio_serial::available_ports().map_err(Error::Serial)?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_config_defaults() {
        let config = SerialConfig::new("/dev/ttyUSB0");
        assert_eq!(config.port, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.data_bits, DataBits::Eight);
        assert_eq!(config.parity, Parity::None);
        assert_eq!(config.flow_control, FlowControl::None);
    }

    #[test]
    fn test_serial_config_builder() {
        let config = SerialConfig::new("COM3")
            .baud_rate(115_200)
            .flow_control(FlowControl::Hardware)
            .connection_delay(Duration::ZERO);
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.flow_control, FlowControl::Hardware);
        assert_eq!(config.connection_delay, Duration::ZERO);
    }

    #[test]
    fn test_transport_starts_closed() {
        let transport = SerialTransport::with_port("/dev/ttyUSB0");
        assert!(!transport.is_open());
        assert_eq!(transport.config().port, "/dev/ttyUSB0");
    }

    #[test]
    #[ignore = "Requires /sys/class/tty - not available in sandboxed builds"]
    fn test_list_ports() {
        let _ = list_ports();
    }
}
