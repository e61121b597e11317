//! Device -- the generic KCP request engine.
//!
//! A [`Device`] owns one [`Connection`] and drives complete exchanges over
//! it. An instrument answers every request with zero or more `B` (begun)
//! frames followed by exactly one terminal frame (`A`, `L` or `I`). The
//! engine consumes the begun frames itself by issuing continuation
//! requests, so callers only ever see the terminal outcome:
//!
//! ```text
//! caller ──► make_request(I4) ──► transceive("I4")        ◄── I4 B
//!                                 transceive(continuation) ◄── I4 A "123"
//!        ◄── [Text("123")]
//! ```
//!
//! The begun loop is bounded by [`DeviceSettings::max_continuations`] so an
//! instrument stuck in a staged state cannot hang the caller.

use tracing::{debug, trace, warn};

use crate::command::Command;
use crate::connection::Connection;
use crate::decode::{DecodedValue, decode_fields};
use crate::error::{Error, Result};
use crate::frame::{RequestFrame, ResponseFrame, ResponseStatus};

/// Default bound on continuation requests per exchange.
pub const DEFAULT_MAX_CONTINUATIONS: u32 = 64;

/// Per-device engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSettings {
    /// Address stamped on every request frame.
    pub address: Option<u8>,
    /// Maximum continuation requests issued while waiting for a terminal
    /// frame before failing with [`Error::ProtocolTimeout`].
    pub max_continuations: u32,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        DeviceSettings {
            address: None,
            max_continuations: DEFAULT_MAX_CONTINUATIONS,
        }
    }
}

/// The staged outcome of one exchange.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Exchange {
    /// Decoded payloads of begun frames that carried arguments, in order.
    pub progress: Vec<Vec<DecodedValue>>,
    /// Decoded arguments of the terminal accepted frame.
    pub result: Vec<DecodedValue>,
}

/// Long-lived handle to one instrument.
///
/// Holds no in-flight state between calls. Every exchange method takes
/// `&mut self`, which keeps a single owner from interleaving two exchanges
/// on the connection.
pub struct Device<C> {
    connection: C,
    settings: DeviceSettings,
}

impl<C: Connection> Device<C> {
    /// Wrap `connection` with default settings.
    pub fn new(connection: C) -> Self {
        Self::with_settings(connection, DeviceSettings::default())
    }

    /// Wrap `connection` with explicit settings.
    pub fn with_settings(connection: C, settings: DeviceSettings) -> Self {
        Device {
            connection,
            settings,
        }
    }

    /// The engine settings.
    pub fn settings(&self) -> &DeviceSettings {
        &self.settings
    }

    /// Borrow the underlying connection.
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Mutably borrow the underlying connection.
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// Release the underlying connection.
    pub fn into_connection(self) -> C {
        self.connection
    }

    /// Run one exchange and return the decoded terminal arguments.
    ///
    /// Begun frames are consumed internally. A terminal `L` or `I` fails with
    /// [`Error::Protocol`] carrying the diagnostic arguments verbatim;
    /// connection failures are returned unchanged.
    pub async fn make_request<K>(&mut self, command: &K, arguments: &[&str]) -> Result<Vec<DecodedValue>>
    where
        K: Command + ?Sized,
    {
        Ok(self.make_staged_request(command, arguments).await?.result)
    }

    /// Run one exchange and return the begun payloads alongside the result.
    pub async fn make_staged_request<K>(&mut self, command: &K, arguments: &[&str]) -> Result<Exchange>
    where
        K: Command + ?Sized,
    {
        let token = command.token();
        let layout = command.response_fields();
        let address = self.settings.address;

        debug!(command = token, ?arguments, "sending request");
        let request = RequestFrame::new(address, token, arguments);
        let mut frame = self.connection.transceive(&request).await?;

        let mut progress = Vec::new();
        // A bad begun payload fails the exchange, but only once the
        // terminal frame is off the line.
        let mut progress_error: Option<Error> = None;
        let mut continuations: u32 = 0;

        loop {
            if frame.command_id != token {
                // Late acknowledgment of an earlier command, or a reading
                // from a stream that was not cancelled.
                warn!(
                    expected = token,
                    received = %frame.command_id,
                    "skipping frame for another command"
                );
            } else {
                match frame.status {
                    Some(ResponseStatus::Accepted) => {
                        if let Some(e) = progress_error {
                            return Err(e);
                        }
                        let result = decode_fields(layout, &frame.arguments)?;
                        debug!(command = token, continuations, "request accepted");
                        return Ok(Exchange { progress, result });
                    }
                    Some(status @ (ResponseStatus::LogicalError | ResponseStatus::InternalError)) => {
                        debug!(command = token, %status, "request rejected");
                        return Err(Error::rejected(token, status, frame.arguments));
                    }
                    Some(ResponseStatus::Begun) => {
                        trace!(command = token, continuations, "request begun");
                        if !frame.arguments.is_empty() {
                            match decode_fields(layout, &frame.arguments) {
                                Ok(values) => progress.push(values),
                                Err(e) => {
                                    warn!(command = token, error = %e, "undecodable begun payload");
                                    progress_error.get_or_insert(e);
                                }
                            }
                        }
                    }
                    None => {
                        trace!(command = token, "skipping untagged frame");
                    }
                }
            }

            if continuations >= self.settings.max_continuations {
                return Err(Error::ProtocolTimeout {
                    command: token.to_string(),
                    frames: continuations + 1,
                });
            }
            continuations += 1;
            frame = self
                .connection
                .transceive(&RequestFrame::continuation(address))
                .await?;
        }
    }

    /// Send one request and return the first response frame as received,
    /// without interpreting its status.
    pub async fn send_frame<K>(&mut self, command: &K, arguments: &[&str]) -> Result<ResponseFrame>
    where
        K: Command + ?Sized,
    {
        let request = RequestFrame::new(self.settings.address, command.token(), arguments);
        debug!(command = command.token(), ?arguments, "sending raw frame");
        self.connection.transceive(&request).await
    }

    /// Retrieve the next frame the instrument sends, transmitting nothing.
    ///
    /// Cancel-safe when the connection's continuation read is.
    pub async fn next_frame(&mut self) -> Result<ResponseFrame> {
        let request = RequestFrame::continuation(self.settings.address);
        self.connection.transceive(&request).await
    }
}
