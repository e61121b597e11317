//! Error types for kcplib.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer, protocol-layer, and
//! decoding errors are all captured here.

use crate::frame::ResponseStatus;

/// The error type for all kcplib operations.
///
/// Variants fall into four groups:
///
/// - transport failures (`Transport`, `Timeout`, `NotConnected`,
///   `ConnectionLost`, `Io`), propagated unchanged from the connection;
/// - instrument rejections (`Protocol`), carrying the terminal status and the
///   raw diagnostic arguments verbatim;
/// - `ProtocolTimeout`, when an instrument keeps answering `B` (begun) past
///   the configured continuation bound;
/// - `Decode`, when a response's byte groups do not match the expected shape.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (serial port, TCP socket).
    #[error("transport error: {0}")]
    Transport(String),

    /// The instrument answered with a terminal `L` (logical error) or `I`
    /// (internal error) status.
    #[error("instrument rejected {command}: {status}")]
    Protocol {
        /// Command token of the rejected request (e.g. `"U"`).
        command: String,
        /// Terminal status tag, either `LogicalError` or `InternalError`.
        status: ResponseStatus,
        /// Diagnostic argument byte groups from the terminal frame.
        diagnostics: Vec<Vec<u8>>,
    },

    /// The instrument did not reach a terminal status within the configured
    /// number of continuation frames.
    #[error("no terminal response to {command} after {frames} frames")]
    ProtocolTimeout {
        /// Command token of the unfinished request.
        command: String,
        /// Number of non-terminal frames consumed before giving up.
        frames: u32,
    },

    /// A response did not match the expected value shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// Timed out waiting for bytes from the instrument.
    ///
    /// This typically indicates the instrument is powered off, the baud rate
    /// is wrong, or the cable is disconnected.
    #[error("timeout waiting for response")]
    Timeout,

    /// An invalid parameter was passed to a driver operation or builder.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No connection to the instrument has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the instrument was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build a protocol rejection for `command` from a terminal error frame.
    pub fn rejected(command: &str, status: ResponseStatus, diagnostics: Vec<Vec<u8>>) -> Self {
        Error::Protocol {
            command: command.to_string(),
            status,
            diagnostics,
        }
    }

    /// Returns `true` for failures of the underlying connection.
    ///
    /// `ProtocolTimeout` is not included: the link worked, the instrument
    /// just never finished.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Transport(_)
                | Error::Timeout
                | Error::NotConnected
                | Error::ConnectionLost
                | Error::Io(_)
        )
    }

    /// The terminal status carried by a [`Error::Protocol`] rejection.
    pub fn status(&self) -> Option<ResponseStatus> {
        match self {
            Error::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Diagnostic arguments of a rejection rendered as text, one entry per
    /// byte group. Non-UTF-8 bytes are replaced.
    pub fn diagnostic_text(&self) -> Vec<String> {
        match self {
            Error::Protocol { diagnostics, .. } => diagnostics
                .iter()
                .map(|group| String::from_utf8_lossy(group).into_owned())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
