//! Scripted frame-level connection for driver tests.
//!
//! [`MockConnection`] skips the byte codec entirely: tests script which
//! request frames the driver must send and which response frames come back.
//! Replies are appended to a single inbound queue, so frames queued earlier
//! (an in-flight weight reading, say) are delivered before the reply to a
//! later request, exactly as on a real serial line.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;

use kcplib_core::connection::Connection;
use kcplib_core::error::{Error, Result};
use kcplib_core::frame::{RequestFrame, ResponseFrame};

/// One scripted inbound event.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Deliver a frame.
    Frame(ResponseFrame),
    /// Fail the read with [`Error::Timeout`].
    Timeout,
    /// Fail the read with [`Error::ConnectionLost`].
    ConnectionLost,
}

impl From<ResponseFrame> for Reply {
    fn from(frame: ResponseFrame) -> Self {
        Reply::Frame(frame)
    }
}

#[derive(Debug)]
struct Expectation {
    command_id: String,
    arguments: Vec<String>,
    replies: Vec<Reply>,
}

/// A scripted [`Connection`].
///
/// Non-continuation requests must match the next expectation exactly
/// (command and arguments); a mismatch fails the exchange with
/// [`Error::Transport`]. Continuation requests transmit nothing and simply
/// take the next inbound reply. An empty inbound queue behaves like a
/// silent line: the read waits `silence` and then times out.
#[derive(Debug)]
pub struct MockConnection {
    expectations: VecDeque<Expectation>,
    inbound: VecDeque<Reply>,
    sent: Vec<RequestFrame>,
    silence: Duration,
}

impl MockConnection {
    /// Create an empty script.
    pub fn new() -> Self {
        MockConnection {
            expectations: VecDeque::new(),
            inbound: VecDeque::new(),
            sent: Vec::new(),
            silence: Duration::from_millis(100),
        }
    }

    /// Expect `command` with `arguments`, answered by `replies` in order.
    pub fn expect<R>(&mut self, command: &str, arguments: &[&str], replies: R) -> &mut Self
    where
        R: IntoIterator,
        R::Item: Into<Reply>,
    {
        self.expectations.push_back(Expectation {
            command_id: command.to_string(),
            arguments: arguments.iter().map(|a| a.to_string()).collect(),
            replies: replies.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Queue a reply that arrives without a request.
    pub fn push(&mut self, reply: impl Into<Reply>) -> &mut Self {
        self.inbound.push_back(reply.into());
        self
    }

    /// How long a read waits on an empty queue before timing out.
    pub fn set_silence(&mut self, silence: Duration) -> &mut Self {
        self.silence = silence;
        self
    }

    /// Every request frame seen so far, continuations included.
    pub fn sent_frames(&self) -> &[RequestFrame] {
        &self.sent
    }

    /// Command tokens of the non-continuation requests seen so far.
    pub fn sent_commands(&self) -> Vec<&str> {
        self.sent
            .iter()
            .filter(|r| !r.is_continuation())
            .map(|r| r.command_id.as_str())
            .collect()
    }

    /// Number of expectations not yet consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Number of inbound replies not yet delivered.
    pub fn pending_replies(&self) -> usize {
        self.inbound.len()
    }
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn transceive(&mut self, request: &RequestFrame) -> Result<ResponseFrame> {
        self.sent.push(request.clone());

        if !request.is_continuation() {
            let expectation = self.expectations.pop_front().ok_or_else(|| {
                Error::Transport(format!(
                    "no more expectations in mock connection (got {})",
                    request.command_id
                ))
            })?;
            if expectation.command_id != request.command_id
                || expectation.arguments != request.arguments
            {
                return Err(Error::Transport(format!(
                    "unexpected request: expected {} {:?}, got {} {:?}",
                    expectation.command_id,
                    expectation.arguments,
                    request.command_id,
                    request.arguments
                )));
            }
            self.inbound.extend(expectation.replies);
        }

        match self.inbound.pop_front() {
            Some(Reply::Frame(frame)) => Ok(frame),
            Some(Reply::Timeout) => Err(Error::Timeout),
            Some(Reply::ConnectionLost) => Err(Error::ConnectionLost),
            None => {
                tokio::time::sleep(self.silence).await;
                Err(Error::Timeout)
            }
        }
    }
}
