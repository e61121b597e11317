//! Request and response frame records.
//!
//! Frames are the opaque records exchanged through a
//! [`Connection`](crate::connection::Connection). Their wire encoding belongs
//! to the codec (see `kcplib-text-io`); the engine only relies on the shapes
//! defined here.

use std::fmt;

/// Status tag carried by a response frame.
///
/// Every request produces zero or more [`Begun`](ResponseStatus::Begun)
/// frames followed by exactly one terminal frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    /// Intermediate acknowledgment (`B`); more frames follow.
    Begun,
    /// Final acceptance (`A`).
    Accepted,
    /// Logical error or invalid parameter (`L`).
    LogicalError,
    /// Internal or technical error on the instrument (`I`).
    InternalError,
}

impl ResponseStatus {
    /// All status tags in wire order.
    pub const ALL: [ResponseStatus; 4] = [
        ResponseStatus::Begun,
        ResponseStatus::Accepted,
        ResponseStatus::LogicalError,
        ResponseStatus::InternalError,
    ];

    /// The single-letter wire token for this status.
    pub fn token(self) -> &'static str {
        match self {
            ResponseStatus::Begun => "B",
            ResponseStatus::Accepted => "A",
            ResponseStatus::LogicalError => "L",
            ResponseStatus::InternalError => "I",
        }
    }

    /// Parse a wire token. Returns `None` for anything that is not a status
    /// tag (e.g. the stability marker of a streamed weight frame).
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.token() == token)
    }

    /// Returns `true` for statuses that end an exchange.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ResponseStatus::Begun)
    }

    /// Returns `true` for the two rejection statuses.
    pub fn is_error(self) -> bool {
        matches!(
            self,
            ResponseStatus::LogicalError | ResponseStatus::InternalError
        )
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseStatus::Begun => "begun",
            ResponseStatus::Accepted => "accepted",
            ResponseStatus::LogicalError => "logical error",
            ResponseStatus::InternalError => "internal error",
        };
        write!(f, "{} ({})", name, self.token())
    }
}

/// A request to the instrument.
///
/// Built once per call and never reused. A *continuation* frame (empty
/// command id, no arguments) asks the connection for the next staged
/// response without transmitting anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    /// Device address, for connections that multiplex several instruments.
    /// Point-to-point links ignore it.
    pub address: Option<u8>,
    /// Command token (e.g. `"U"`, `"I4"`); empty for a continuation.
    pub command_id: String,
    /// Positional argument tokens.
    pub arguments: Vec<String>,
}

impl RequestFrame {
    /// Build a command request.
    pub fn new(address: Option<u8>, command_id: &str, arguments: &[&str]) -> Self {
        RequestFrame {
            address,
            command_id: command_id.to_string(),
            arguments: arguments.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Build a continuation request for the next staged response.
    pub fn continuation(address: Option<u8>) -> Self {
        RequestFrame {
            address,
            command_id: String::new(),
            arguments: Vec::new(),
        }
    }

    /// Returns `true` if this frame only retrieves the next staged response.
    pub fn is_continuation(&self) -> bool {
        self.command_id.is_empty()
    }
}

/// A response from the instrument.
///
/// `status` is `None` for untagged data frames, such as readings pushed by
/// an instrument in continuous-transmission mode. Untagged frames are never
/// terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    /// Command token echoed by the instrument.
    pub command_id: String,
    /// Status tag, if the frame carries one.
    pub status: Option<ResponseStatus>,
    /// Raw argument byte groups, in protocol order.
    pub arguments: Vec<Vec<u8>>,
}

impl ResponseFrame {
    /// Build a status-tagged response.
    pub fn tagged(command_id: &str, status: ResponseStatus, arguments: &[&[u8]]) -> Self {
        ResponseFrame {
            command_id: command_id.to_string(),
            status: Some(status),
            arguments: arguments.iter().map(|a| a.to_vec()).collect(),
        }
    }

    /// Build an untagged data frame.
    pub fn untagged(command_id: &str, arguments: &[&[u8]]) -> Self {
        ResponseFrame {
            command_id: command_id.to_string(),
            status: None,
            arguments: arguments.iter().map(|a| a.to_vec()).collect(),
        }
    }

    /// Shorthand for an `A` response.
    pub fn accepted(command_id: &str, arguments: &[&[u8]]) -> Self {
        Self::tagged(command_id, ResponseStatus::Accepted, arguments)
    }

    /// Shorthand for a `B` response.
    pub fn begun(command_id: &str, arguments: &[&[u8]]) -> Self {
        Self::tagged(command_id, ResponseStatus::Begun, arguments)
    }

    /// Returns `true` if this frame ends an exchange.
    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(ResponseStatus::is_terminal)
    }
}
