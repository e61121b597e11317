//! Serial port transport for KCP instruments.
//!
//! [`SerialTransport`] implements [`Transport`] for RS-232 ports and USB
//! virtual COM ports. KERN balances ship configured for 9600 baud, 8 data
//! bits, no parity, one stop bit; other rates (1200 to 38400) are selectable
//! on the instrument's menu and must match [`SerialConfig::baud_rate`].
//!
//! # Example
//!
//! ```no_run
//! use kcplib_transport::{SerialConfig, SerialTransport};
//! use kcplib_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> kcplib_core::Result<()> {
//! let config = SerialConfig { baud_rate: 19200, ..Default::default() };
//! let mut transport = SerialTransport::open_with_config("COM3", config).await?;
//!
//! transport.send(b"SI\r\n").await?;
//! let mut buf = [0u8; 64];
//! let n = transport.receive(&mut buf, Duration::from_millis(500)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use kcplib_core::error::{Error, Result};
use kcplib_core::transport::Transport;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Baud rate KERN instruments use out of the box.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Serial line settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Baud rate; must match the instrument's interface menu.
    pub baud_rate: u32,
    /// Data bits per character.
    pub data_bits: DataBits,
    /// Stop bits per character.
    pub stop_bits: StopBits,
    /// Parity mode.
    pub parity: Parity,
    /// Flow control mode.
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Seven,
    Eight,
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    /// XON/XOFF.
    Software,
    /// RTS/CTS.
    Hardware,
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Software => tokio_serial::FlowControl::Software,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}

/// Serial port transport.
pub struct SerialTransport {
    /// `None` once closed.
    port: Option<SerialStream>,
    port_name: String,
}

impl SerialTransport {
    /// Open `port` at `baud_rate` with 8N1 framing and no flow control.
    pub async fn open(port: &str, baud_rate: u32) -> Result<Self> {
        let config = SerialConfig {
            baud_rate,
            ..Default::default()
        };
        Self::open_with_config(port, config).await
    }

    /// Open `port` with explicit line settings.
    pub async fn open_with_config(port: &str, config: SerialConfig) -> Result<Self> {
        tracing::debug!(
            port = %port,
            baud_rate = config.baud_rate,
            data_bits = ?config.data_bits,
            parity = ?config.parity,
            "opening serial port"
        );

        let stream = tokio_serial::new(port, config.baud_rate)
            .data_bits(config.data_bits.into())
            .stop_bits(config.stop_bits.into())
            .parity(config.parity.into())
            .flow_control(config.flow_control.into())
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %port, error = %e, "failed to open serial port");
                Error::Transport(format!("failed to open serial port {port}: {e}"))
            })?;

        tracing::info!(port = %port, baud_rate = config.baud_rate, "serial port open");

        Ok(Self {
            port: Some(stream),
            port_name: port.to_string(),
        })
    }

    /// The port path this transport was opened on.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(port = %self.port_name, bytes = data.len(), "sending");

        port.write_all(data).await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "serial write failed");
            map_io_error(e)
        })?;
        port.flush().await.map_err(map_io_error)?;
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let port = self.port.as_mut().ok_or(Error::NotConnected)?;

        match tokio::time::timeout(timeout, port.read(buf)).await {
            Ok(Ok(n)) => {
                tracing::trace!(
                    port = %self.port_name,
                    data = %String::from_utf8_lossy(&buf[..n]).escape_debug(),
                    "received"
                );
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::error!(port = %self.port_name, error = %e, "serial read failed");
                Err(map_io_error(e))
            }
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut port) = self.port.take() {
            if let Err(e) = port.flush().await {
                tracing::warn!(port = %self.port_name, error = %e, "flush before close failed");
            }
            tracing::info!(port = %self.port_name, "serial port closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.port.is_some() {
            tracing::debug!(port = %self.port_name, "serial transport dropped while open");
        }
    }
}

fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::BrokenPipe | ErrorKind::NotConnected => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}
