//! Transport trait for instrument communication.
//!
//! The [`Transport`] trait abstracts over the physical link to an instrument.
//! Implementations exist for serial ports, TCP sockets (serial device servers),
//! and mock transports for testing.
//!
//! The frame codec and [`Connection`](crate::connection::Connection)
//! implementations in `kcplib-text-io` operate on a `Transport` rather than
//! directly on a serial port, enabling both real hardware control and
//! deterministic unit testing with `MockTransport` from the
//! `kcplib-test-harness` crate.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to an instrument.
///
/// Implementations handle buffering and error recovery at the physical
/// layer. Protocol-level concerns (line framing, status tags) are handled by
/// the codec that consumes this trait.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the instrument.
    ///
    /// Implementations should block until all bytes have been written to
    /// the underlying transport (serial TX buffer, TCP socket, etc.).
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the instrument into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if no data is received within the deadline.
    ///
    /// Must be cancel-safe: dropping the returned future before it completes
    /// must not lose bytes.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
