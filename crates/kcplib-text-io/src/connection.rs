//! [`Connection`] over a byte [`Transport`].
//!
//! [`TransportConnection`] encodes each request with the text codec, writes
//! it to the transport, and reads until one complete response line has been
//! decoded. Bytes received past the end of that line stay in a persistent
//! buffer, so frames that arrive together (a streaming balance easily
//! delivers several readings in one read) are handed out one per call, in
//! order.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use kcplib_core::connection::Connection;
use kcplib_core::error::{Error, Result};
use kcplib_core::frame::{RequestFrame, ResponseFrame};
use kcplib_core::transport::Transport;

use crate::protocol::{self, DecodeResult};

/// Maximum buffered bytes without a complete line before the buffer is
/// reset. KCP lines are well under 100 bytes.
pub const MAX_BUF: usize = 8192;

/// Settings for a [`TransportConnection`].
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// How long a single read may wait for bytes before failing with
    /// [`Error::Timeout`].
    pub response_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        ConnectionConfig {
            response_timeout: Duration::from_millis(1000),
        }
    }
}

/// A frame-level connection layered on a byte transport.
pub struct TransportConnection {
    transport: Box<dyn Transport>,
    config: ConnectionConfig,
    buffer: Vec<u8>,
}

impl TransportConnection {
    /// Wrap `transport` using `config`.
    pub fn new(transport: Box<dyn Transport>, config: ConnectionConfig) -> Self {
        TransportConnection {
            transport,
            config,
            buffer: Vec::new(),
        }
    }

    /// The connection settings.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Whether the underlying transport reports itself connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Number of received bytes not yet decoded into a frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Close the transport and drop any buffered bytes.
    pub async fn close(&mut self) -> Result<()> {
        self.buffer.clear();
        self.transport.close().await
    }

    /// Release the transport. Buffered bytes are discarded.
    pub fn into_transport(self) -> Box<dyn Transport> {
        self.transport
    }

    /// Read until one complete frame is available.
    ///
    /// Cancel-safe: the only suspension point is the transport read, and
    /// bytes are moved into the persistent buffer as soon as it returns.
    async fn read_frame(&mut self) -> Result<ResponseFrame> {
        let mut recv_buf = [0u8; 256];

        loop {
            match protocol::decode_response(&self.buffer) {
                DecodeResult::Response { frame, consumed } => {
                    self.buffer.drain(..consumed);
                    trace!(
                        command = %frame.command_id,
                        status = ?frame.status,
                        args = frame.arguments.len(),
                        "decoded frame"
                    );
                    return Ok(frame);
                }
                DecodeResult::Malformed(consumed) => {
                    let line: Vec<u8> = self.buffer.drain(..consumed).collect();
                    let line = String::from_utf8_lossy(&line);
                    debug!(line = %line.trim_end(), "discarding malformed line");
                    return Err(Error::Decode(format!(
                        "malformed frame: {:?}",
                        line.trim_end()
                    )));
                }
                DecodeResult::Incomplete => {}
            }

            let n = self
                .transport
                .receive(&mut recv_buf, self.config.response_timeout)
                .await?;
            if n == 0 {
                return Err(Error::ConnectionLost);
            }
            self.buffer.extend_from_slice(&recv_buf[..n]);

            // Bounded buffer: noise on the line must not grow it forever.
            if self.buffer.len() > MAX_BUF {
                warn!(len = self.buffer.len(), "receive buffer overflow, clearing");
                self.buffer.clear();
                return Err(Error::Decode("receive buffer overflow".into()));
            }
        }
    }
}

#[async_trait]
impl Connection for TransportConnection {
    async fn transceive(&mut self, request: &RequestFrame) -> Result<ResponseFrame> {
        if !request.is_continuation() {
            let bytes = protocol::encode_request(request)?;
            trace!(
                command = %request.command_id,
                data = %String::from_utf8_lossy(&bytes).trim_end(),
                "sending frame"
            );
            self.transport.send(&bytes).await?;
        }
        self.read_frame().await
    }
}
