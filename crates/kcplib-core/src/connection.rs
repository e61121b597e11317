//! Frame-level connection trait.
//!
//! A [`Connection`] is the only collaborator the [`Device`](crate::device::Device)
//! engine talks to: it accepts a [`RequestFrame`] and hands back the matching
//! [`ResponseFrame`]. `kcplib-text-io` provides `TransportConnection`, which
//! layers the text codec over a byte [`Transport`](crate::transport::Transport);
//! `kcplib-test-harness` provides a scripted `MockConnection`.

use async_trait::async_trait;

use crate::error::Result;
use crate::frame::{RequestFrame, ResponseFrame};

/// Exclusive-access, frame-level link to one instrument.
///
/// The protocol has no request identifiers, so at most one exchange may be
/// outstanding at a time. `&mut self` enforces that for a single owner;
/// callers sharing a connection must serialize access themselves.
#[async_trait]
pub trait Connection: Send {
    /// Send `request` (nothing, for a continuation frame) and return the
    /// next response frame.
    ///
    /// Fails with a transport-class [`Error`](crate::error::Error) rather
    /// than hanging when the link is faulty. For continuation frames the
    /// returned future must be cancel-safe: dropping it must not lose a
    /// partially received frame.
    async fn transceive(&mut self, request: &RequestFrame) -> Result<ResponseFrame>;
}

#[async_trait]
impl<C: Connection + ?Sized> Connection for Box<C> {
    async fn transceive(&mut self, request: &RequestFrame) -> Result<ResponseFrame> {
        (**self).transceive(request).await
    }
}
