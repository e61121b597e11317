//! Mock byte transport for deterministic testing of the frame codec.
//!
//! [`MockTransport`] implements the [`Transport`] trait with pre-loaded
//! request/response pairs, plus bytes queued for delivery without any
//! request (what a balance in continuous-transmission mode sends). This lets
//! you test line framing and [`Connection`](kcplib_core::Connection)
//! behaviour without a real instrument.
//!
//! # Example
//!
//! ```
//! use kcplib_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // When the connection sends this request, deliver this response.
//! mock.expect(b"I4\r\n", b"I4 B\r\nI4 A \"123\"\r\n");
//! // Readings that arrive without a request.
//! mock.queue_incoming(b"S S 100.00 g\r\n");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use kcplib_core::error::{Error, Result};
use kcplib_core::transport::Transport;

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// The bytes to deliver once the matching request is received.
    response: Vec<u8>,
}

/// A mock [`Transport`] for testing without hardware.
///
/// Expectations are consumed in order. When `send()` is called, the sent
/// data is recorded and matched against the next expectation; its response
/// is appended to the inbound queue. Each `receive()` call returns bytes
/// from at most one queued chunk, so a test controls how a frame is split
/// across reads.
///
/// When nothing is queued, `receive()` waits out its timeout and returns
/// [`Error::Timeout`], like a silent serial line.
#[derive(Debug)]
pub struct MockTransport {
    /// Ordered queue of expected request/response pairs.
    expectations: VecDeque<Expectation>,
    /// Byte chunks waiting to be read.
    inbound: VecDeque<Vec<u8>>,
    /// Whether the transport is "connected".
    connected: bool,
    /// Log of all bytes sent through this transport.
    sent_log: Vec<Vec<u8>>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            inbound: VecDeque::new(),
            connected: true,
            sent_log: Vec::new(),
        }
    }

    /// Add an expected request/response pair.
    ///
    /// An empty `response` models an instrument that stays silent.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Queue bytes that arrive without being requested.
    pub fn queue_incoming(&mut self, data: &[u8]) {
        if !data.is_empty() {
            self.inbound.push_back(data.to_vec());
        }
    }

    /// Return a reference to all data that has been sent through this transport.
    ///
    /// Each element is the byte slice from one `send()` call.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Return the number of queued bytes not yet read.
    pub fn pending_bytes(&self) -> usize {
        self.inbound.iter().map(Vec::len).sum()
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` and `receive()` calls will
    /// return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        self.sent_log.push(data.to_vec());

        let expectation = self
            .expectations
            .pop_front()
            .ok_or_else(|| Error::Transport("no more expectations in mock transport".into()))?;
        if data != expectation.request.as_slice() {
            return Err(Error::Transport(format!(
                "unexpected send data: expected {:?}, got {:?}",
                String::from_utf8_lossy(&expectation.request),
                String::from_utf8_lossy(data)
            )));
        }
        self.queue_incoming(&expectation.response);
        Ok(())
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        let Some(chunk) = self.inbound.front_mut() else {
            tokio::time::sleep(timeout).await;
            return Err(Error::Timeout);
        };

        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        chunk.drain(..n);
        if chunk.is_empty() {
            self.inbound.pop_front();
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.inbound.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(5);

    #[tokio::test]
    async fn mock_transport_basic_send_receive() {
        let mut mock = MockTransport::new();
        mock.expect(b"U g\r\n", b"U A\r\n");

        mock.send(b"U g\r\n").await.unwrap();

        let mut buf = [0u8; 64];
        let n = mock.receive(&mut buf, SHORT).await.unwrap();
        assert_eq!(&buf[..n], b"U A\r\n");
    }

    #[tokio::test]
    async fn mock_transport_tracks_sent_data() {
        let mut mock = MockTransport::new();
        mock.expect(b"T\r\n", b"");
        mock.expect(b"Z\r\n", b"");

        mock.send(b"T\r\n").await.unwrap();
        mock.send(b"Z\r\n").await.unwrap();

        assert_eq!(mock.sent_data().len(), 2);
        assert_eq!(mock.sent_data()[1], b"Z\r\n");
    }

    #[tokio::test]
    async fn mock_transport_wrong_data_errors() {
        let mut mock = MockTransport::new();
        mock.expect(b"T\r\n", b"T A\r\n");

        let result = mock.send(b"Z\r\n").await;
        assert!(matches!(result.unwrap_err(), Error::Transport(_)));
    }

    #[tokio::test]
    async fn mock_transport_no_expectations_errors() {
        let mut mock = MockTransport::new();
        assert!(matches!(
            mock.send(b"T\r\n").await.unwrap_err(),
            Error::Transport(_)
        ));
    }

    #[tokio::test]
    async fn mock_transport_receive_without_data_times_out() {
        let mut mock = MockTransport::new();
        let mut buf = [0u8; 64];

        let result = mock.receive(&mut buf, SHORT).await;
        assert!(matches!(result.unwrap_err(), Error::Timeout));
    }

    #[tokio::test]
    async fn mock_transport_chunks_are_read_separately() {
        let mut mock = MockTransport::new();
        mock.queue_incoming(b"S S 1");
        mock.queue_incoming(b".0 g\r\n");
        assert_eq!(mock.pending_bytes(), 11);

        let mut buf = [0u8; 64];
        let n = mock.receive(&mut buf, SHORT).await.unwrap();
        assert_eq!(&buf[..n], b"S S 1");
        let n = mock.receive(&mut buf, SHORT).await.unwrap();
        assert_eq!(&buf[..n], b".0 g\r\n");
        assert_eq!(mock.pending_bytes(), 0);
    }

    #[tokio::test]
    async fn mock_transport_partial_receive() {
        let mut mock = MockTransport::new();
        mock.queue_incoming(b"ABCD");

        let mut buf = [0u8; 2];
        let n = mock.receive(&mut buf, SHORT).await.unwrap();
        assert_eq!(&buf[..n], b"AB");
        let n = mock.receive(&mut buf, SHORT).await.unwrap();
        assert_eq!(&buf[..n], b"CD");
    }

    #[tokio::test]
    async fn mock_transport_disconnect() {
        let mut mock = MockTransport::new();
        assert!(mock.is_connected());

        mock.close().await.unwrap();
        assert!(!mock.is_connected());

        let result = mock.send(b"T\r\n").await;
        assert!(matches!(result.unwrap_err(), Error::NotConnected));

        let mut buf = [0u8; 8];
        let result = mock.receive(&mut buf, SHORT).await;
        assert!(matches!(result.unwrap_err(), Error::NotConnected));
    }

    #[tokio::test]
    async fn mock_transport_remaining_expectations() {
        let mut mock = MockTransport::new();
        mock.expect(b"T\r\n", b"T A\r\n");
        mock.expect(b"Z\r\n", b"Z A\r\n");
        assert_eq!(mock.remaining_expectations(), 2);

        mock.send(b"T\r\n").await.unwrap();
        assert_eq!(mock.remaining_expectations(), 1);
    }
}
