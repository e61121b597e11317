//! TCP transport for networked KCP instruments.
//!
//! [`TcpTransport`] implements [`Transport`] over a TCP stream. Balances in
//! a lab network usually sit behind an Ethernet-to-serial device server that
//! passes the KCP byte stream through unchanged, so the same codec runs on
//! top of either transport.
//!
//! # Example
//!
//! ```no_run
//! use kcplib_transport::TcpTransport;
//! use kcplib_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> kcplib_core::Result<()> {
//! let mut transport = TcpTransport::connect("192.168.10.20:4001").await?;
//! transport.send(b"I4\r\n").await?;
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_secs(1)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use kcplib_core::error::{Error, Result};
use kcplib_core::transport::Transport;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP transport.
#[derive(Debug)]
pub struct TcpTransport {
    /// `None` once closed.
    stream: Option<TcpStream>,
    addr: String,
}

impl TcpTransport {
    /// Connect to `addr` (`host:port`) with [`DEFAULT_CONNECT_TIMEOUT`].
    pub async fn connect(addr: &str) -> Result<Self> {
        Self::connect_with_timeout(addr, DEFAULT_CONNECT_TIMEOUT).await
    }

    /// Connect to `addr`, giving up after `timeout`.
    pub async fn connect_with_timeout(addr: &str, timeout: Duration) -> Result<Self> {
        tracing::debug!(addr = %addr, timeout_ms = timeout.as_millis(), "connecting");

        let stream = match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
            Err(_) => {
                tracing::error!(addr = %addr, "connect timed out");
                return Err(Error::Timeout);
            }
            Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => {
                return Err(Error::Transport(format!("connection refused: {addr}")));
            }
            Ok(Err(e)) => {
                tracing::error!(addr = %addr, error = %e, "connect failed");
                return Err(Error::Io(e));
            }
            Ok(Ok(stream)) => stream,
        };

        // Frames are a handful of bytes; do not wait to coalesce them.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(addr = %addr, error = %e, "failed to set TCP_NODELAY");
        }

        tracing::info!(addr = %addr, "connected");
        Ok(Self::from_stream(stream, addr.to_string()))
    }

    /// Wrap an already-connected stream. `addr` is used for logging.
    pub fn from_stream(stream: TcpStream, addr: String) -> Self {
        Self {
            stream: Some(stream),
            addr,
        }
    }

    /// The peer address label.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(addr = %self.addr, bytes = data.len(), "sending");

        stream.write_all(data).await.map_err(|e| {
            tracing::error!(addr = %self.addr, error = %e, "write failed");
            map_io_error(e)
        })?;
        stream.flush().await.map_err(map_io_error)
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        match tokio::time::timeout(timeout, stream.read(buf)).await {
            // A zero-length read is the peer closing the connection.
            Ok(Ok(0)) => {
                tracing::warn!(addr = %self.addr, "peer closed connection");
                Err(Error::ConnectionLost)
            }
            Ok(Ok(n)) => {
                tracing::trace!(
                    addr = %self.addr,
                    data = %String::from_utf8_lossy(&buf[..n]).escape_debug(),
                    "received"
                );
                Ok(n)
            }
            Ok(Err(e)) => {
                tracing::error!(addr = %self.addr, error = %e, "read failed");
                Err(map_io_error(e))
            }
            Err(_) => Err(Error::Timeout),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.shutdown().await {
                tracing::warn!(addr = %self.addr, error = %e, "shutdown failed");
            }
            tracing::info!(addr = %self.addr, "connection closed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}

fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::NotConnected => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn listener() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    #[tokio::test]
    async fn request_and_reply_over_loopback() {
        let (listener, addr) = listener().await;

        // Plays a balance answering one serial number query.
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 64];
            let n = stream.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"I4\r\n");
            stream.write_all(b"I4 A \"123\"\r\n").await.unwrap();
        });

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        assert!(transport.is_connected());
        assert_eq!(transport.addr(), addr);
        transport.send(b"I4\r\n").await.unwrap();

        let mut buf = [0u8; 64];
        let mut received = Vec::new();
        while !received.ends_with(b"\r\n") {
            let n = transport
                .receive(&mut buf, Duration::from_secs(2))
                .await
                .unwrap();
            received.extend_from_slice(&buf[..n]);
        }
        assert_eq!(received, b"I4 A \"123\"\r\n");

        transport.close().await.unwrap();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn connect_refused() {
        let (listener, addr) = listener().await;
        drop(listener);

        match TcpTransport::connect(&addr).await {
            Err(Error::Transport(msg)) => assert!(msg.contains("connection refused")),
            other => panic!("expected refused, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn silent_peer_times_out() {
        let (listener, addr) = listener().await;
        let server = tokio::spawn(async move {
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        let mut buf = [0u8; 16];
        let result = transport.receive(&mut buf, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(Error::Timeout)));
        server.abort();
    }

    #[tokio::test]
    async fn peer_close_is_connection_lost() {
        let (listener, addr) = listener().await;
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        server.await.unwrap();

        let mut buf = [0u8; 16];
        let result = transport.receive(&mut buf, Duration::from_secs(2)).await;
        assert!(matches!(result, Err(Error::ConnectionLost)), "{result:?}");
    }

    #[tokio::test]
    async fn closed_transport_rejects_io() {
        let (listener, addr) = listener().await;
        let server = tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let mut transport = TcpTransport::connect(&addr).await.unwrap();
        transport.close().await.unwrap();
        assert!(!transport.is_connected());
        assert!(matches!(transport.send(b"T\r\n").await, Err(Error::NotConnected)));

        let mut buf = [0u8; 16];
        assert!(matches!(
            transport.receive(&mut buf, Duration::from_millis(10)).await,
            Err(Error::NotConnected)
        ));
        server.await.unwrap();
    }
}
