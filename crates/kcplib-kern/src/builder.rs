//! KernBalanceBuilder -- fluent builder for constructing [`KernLabBalance`]
//! instances.
//!
//! Separates configuration from construction so that callers can set up the
//! link (serial port or TCP device server), timeouts and engine bounds
//! before the transport is opened.
//!
//! # Example
//!
//! ```no_run
//! use kcplib_kern::KernBalanceBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> kcplib_core::Result<()> {
//! let mut balance = KernBalanceBuilder::new()
//!     .serial_port("/dev/ttyUSB0")
//!     .baud_rate(9600)
//!     .response_timeout(Duration::from_millis(800))
//!     .build()
//!     .await?;
//! let weight = balance.weigh_stable().await?;
//! println!("{weight}");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use tracing::debug;

use kcplib_core::error::{Error, Result};
use kcplib_core::transport::Transport;
use kcplib_core::{Connection, DEFAULT_MAX_CONTINUATIONS, Device, DeviceSettings};
use kcplib_text_io::{ConnectionConfig, TransportConnection};
use kcplib_transport::{SerialTransport, TcpTransport};

use crate::balance::{BalanceSettings, DEFAULT_STREAM_STALL_GRACE, KernLabBalance};

/// Fluent builder for [`KernLabBalance`].
///
/// Defaults match a balance fresh from the factory: 9600 baud, a one second
/// response timeout and at most 64 staged frames per exchange.
pub struct KernBalanceBuilder {
    serial_port: Option<String>,
    baud_rate: u32,
    tcp_address: Option<String>,
    response_timeout: Duration,
    max_continuations: u32,
    address: Option<u8>,
    stream_stall_grace: Duration,
}

impl KernBalanceBuilder {
    pub fn new() -> Self {
        KernBalanceBuilder {
            serial_port: None,
            baud_rate: kcplib_transport::serial::DEFAULT_BAUD_RATE,
            tcp_address: None,
            response_timeout: ConnectionConfig::default().response_timeout,
            max_continuations: DEFAULT_MAX_CONTINUATIONS,
            address: None,
            stream_stall_grace: DEFAULT_STREAM_STALL_GRACE,
        }
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the default baud rate (9600).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.baud_rate = baud;
        self
    }

    /// Connect over TCP to `host:port` instead of a serial port.
    pub fn tcp_address(mut self, addr: &str) -> Self {
        self.tcp_address = Some(addr.to_string());
        self
    }

    /// Set how long a single read waits for the balance (default: 1s).
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Bound the number of continuation requests per exchange (default: 64).
    pub fn max_continuations(mut self, n: u32) -> Self {
        self.max_continuations = n;
        self
    }

    /// Stamp request frames with a device address.
    pub fn address(mut self, address: u8) -> Self {
        self.address = Some(address);
        self
    }

    /// How long a weight stream may stay silent past its interval
    /// (default: 2s).
    pub fn stream_stall_grace(mut self, grace: Duration) -> Self {
        self.stream_stall_grace = grace;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.response_timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "response_timeout must be non-zero".into(),
            ));
        }
        if self.baud_rate == 0 {
            return Err(Error::InvalidParameter("baud_rate must be non-zero".into()));
        }
        if self.serial_port.is_some() && self.tcp_address.is_some() {
            return Err(Error::InvalidParameter(
                "serial_port and tcp_address are mutually exclusive".into(),
            ));
        }
        Ok(())
    }

    fn device_settings(&self) -> DeviceSettings {
        DeviceSettings {
            address: self.address,
            max_continuations: self.max_continuations,
        }
    }

    fn balance_settings(&self) -> BalanceSettings {
        BalanceSettings {
            stream_stall_grace: self.stream_stall_grace,
        }
    }

    /// Build a [`KernLabBalance`] over a caller-provided frame connection.
    ///
    /// The link settings (port, baud rate, timeout) do not apply here.
    pub fn build_with_connection<C: Connection>(self, connection: C) -> Result<KernLabBalance<C>> {
        self.validate()?;
        let device = Device::with_settings(connection, self.device_settings());
        Ok(KernLabBalance::with_settings(device, self.balance_settings()))
    }

    /// Build a [`KernLabBalance`] with a caller-provided transport.
    ///
    /// This is the primary entry point for testing (pass a `MockTransport`
    /// from `kcplib-test-harness`) and for callers that manage the
    /// transport lifecycle directly.
    pub async fn build_with_transport(
        self,
        transport: Box<dyn Transport>,
    ) -> Result<KernLabBalance<TransportConnection>> {
        self.validate()?;
        let connection = TransportConnection::new(
            transport,
            ConnectionConfig {
                response_timeout: self.response_timeout,
            },
        );
        self.build_with_connection(connection)
    }

    /// Open the configured link and build a [`KernLabBalance`] over it.
    ///
    /// Requires either [`serial_port()`](Self::serial_port) or
    /// [`tcp_address()`](Self::tcp_address).
    pub async fn build(self) -> Result<KernLabBalance<TransportConnection>> {
        self.validate()?;

        let transport: Box<dyn Transport> = match (&self.tcp_address, &self.serial_port) {
            (Some(addr), _) => {
                debug!(addr = %addr, "building balance over TCP");
                Box::new(TcpTransport::connect(addr).await?)
            }
            (None, Some(port)) => {
                debug!(port = %port, baud_rate = self.baud_rate, "building balance over serial");
                Box::new(SerialTransport::open(port, self.baud_rate).await?)
            }
            (None, None) => {
                return Err(Error::InvalidParameter(
                    "serial_port or tcp_address is required for build()".into(),
                ));
            }
        };
        self.build_with_transport(transport).await
    }
}

impl Default for KernBalanceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kcplib_core::InstrumentDriver;
    use kcplib_test_harness::{MockConnection, MockTransport};

    #[tokio::test]
    async fn builder_defaults() {
        let balance = KernBalanceBuilder::new()
            .build_with_transport(Box::new(MockTransport::new()))
            .await
            .unwrap();

        assert_eq!(balance.device().settings().max_continuations, 64);
        assert_eq!(balance.device().settings().address, None);
        assert_eq!(
            balance.device().connection().config().response_timeout,
            Duration::from_secs(1)
        );
        assert_eq!(balance.settings().stream_stall_grace, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn builder_custom_settings() {
        let balance = KernBalanceBuilder::new()
            .response_timeout(Duration::from_millis(250))
            .max_continuations(8)
            .address(3)
            .stream_stall_grace(Duration::from_millis(500))
            .build_with_transport(Box::new(MockTransport::new()))
            .await
            .unwrap();

        assert_eq!(balance.device().settings().max_continuations, 8);
        assert_eq!(balance.device().settings().address, Some(3));
        assert_eq!(
            balance.device().connection().config().response_timeout,
            Duration::from_millis(250)
        );
        assert_eq!(
            balance.settings().stream_stall_grace,
            Duration::from_millis(500)
        );
    }

    #[tokio::test]
    async fn builder_end_to_end_over_transport() {
        let mut mock = MockTransport::new();
        mock.expect(b"T\r\n", b"T A S 0.50 g\r\n");
        let mut balance = KernBalanceBuilder::new()
            .build_with_transport(Box::new(mock))
            .await
            .unwrap();

        assert_eq!(balance.tare().await.unwrap().weight_value, 0.5);
    }

    #[test]
    fn builder_over_connection() {
        let balance = KernBalanceBuilder::new()
            .max_continuations(2)
            .build_with_connection(MockConnection::new())
            .unwrap();
        assert_eq!(balance.device().settings().max_continuations, 2);
    }

    #[tokio::test]
    async fn zero_timeout_rejected() {
        let result = KernBalanceBuilder::new()
            .response_timeout(Duration::ZERO)
            .build_with_transport(Box::new(MockTransport::new()))
            .await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn zero_baud_rejected() {
        let result = KernBalanceBuilder::new()
            .serial_port("/dev/ttyUSB0")
            .baud_rate(0)
            .build()
            .await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn serial_and_tcp_are_exclusive() {
        let result = KernBalanceBuilder::new()
            .serial_port("/dev/ttyUSB0")
            .tcp_address("127.0.0.1:4001")
            .build()
            .await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn build_requires_a_link() {
        let result = KernBalanceBuilder::new().build().await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn build_over_tcp() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let n = stream.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"Z\r\n");
            stream.write_all(b"Z A\r\n").await.unwrap();
        });

        let mut balance = KernBalanceBuilder::new()
            .tcp_address(&addr)
            .build()
            .await
            .unwrap();
        balance.zero().await.unwrap();
        server.await.unwrap();
    }
}
