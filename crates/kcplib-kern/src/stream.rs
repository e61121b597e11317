//! Continuous weight readout.
//!
//! After `SIR <ms>` is accepted, the balance pushes one untagged weight
//! frame per interval on the same connection, without further requests,
//! until it receives the cancel command `@`. [`WeightStream`] turns that
//! into a pull-driven sequence of readings:
//!
//! ```text
//! Idle ──activate──► Activating ──SIR A──► Streaming ──cancel──► Cancelling ──@ A──► Idle
//!                        │                    │                      │
//!                        └──── L / I ─────────┴──── L / I ───────────┴──────────────► Idle
//! ```
//!
//! Cancellation goes through a [`CancellationToken`]: firing it interrupts
//! a pending read and `@` is sent. At most one reading already in flight is
//! still yielded; later ones are dropped. The sequence ends (`None`) on the
//! balance's acknowledgment, or with [`Error::ProtocolTimeout`] if no
//! acknowledgment arrives within interval plus stall grace of sending `@`.
//!
//! Dropping an active stream without cancelling leaves the balance
//! transmitting; the drop is logged as a warning.

use std::time::Duration;

use futures::Stream;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use kcplib_core::{
    Command, Connection, Device, DeviceCommand, Error, ResponseFrame, ResponseStatus, Result,
};

use crate::commands::{self, BalanceCommand};
use crate::types::WeightValue;

/// Lifecycle of a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No session running.
    Idle,
    /// `SIR` sent, waiting for its terminal status.
    Activating,
    /// Readings are arriving.
    Streaming,
    /// `@` sent, waiting for its acknowledgment.
    Cancelling,
}

/// A running (or finished) weight readout on a balance.
///
/// Created by [`KernLabBalance::stream_weight`](crate::KernLabBalance::stream_weight),
/// which activates it. Holds the balance's device exclusively until dropped.
pub struct WeightStream<'a, C: Connection> {
    device: &'a mut Device<C>,
    interval: Duration,
    stall_grace: Duration,
    state: StreamState,
    cancel: CancellationToken,
    last_frame: Instant,
    cancel_sent: Instant,
    cancel_frames: u32,
    in_flight_taken: bool,
}

enum Pull {
    Cancel,
    Frame(Result<ResponseFrame>),
}

enum Step {
    Skip,
    Item(Result<WeightValue>),
    Done,
}

impl<'a, C: Connection> WeightStream<'a, C> {
    pub(crate) fn new(device: &'a mut Device<C>, interval: Duration, stall_grace: Duration) -> Self {
        WeightStream {
            device,
            interval,
            stall_grace,
            state: StreamState::Idle,
            cancel: CancellationToken::new(),
            last_frame: Instant::now(),
            cancel_sent: Instant::now(),
            cancel_frames: 0,
            in_flight_taken: false,
        }
    }

    /// Current session state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// The configured reading interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// A token that cancels this session when fired, usable from another
    /// task. A fresh token is issued on every activation.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Request cancellation. Takes effect on the next pull.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Send `SIR` and enter [`StreamState::Streaming`] once it is accepted.
    ///
    /// Only valid from [`StreamState::Idle`], so a finished stream can be
    /// restarted with the same interval. On failure the state returns to
    /// idle and the error is returned unchanged.
    pub async fn activate(&mut self) -> Result<()> {
        if self.state != StreamState::Idle {
            return Err(Error::InvalidParameter(format!(
                "weight stream already active ({:?})",
                self.state
            )));
        }
        let interval = commands::interval_argument(self.interval)?;

        self.cancel = CancellationToken::new();
        self.state = StreamState::Activating;
        debug!(interval_ms = %interval, "activating weight stream");

        match self
            .device
            .make_request(
                &BalanceCommand::SendWeightValueImmediatelyAndRepeat,
                &[interval.as_str()],
            )
            .await
        {
            Ok(_) => {
                self.state = StreamState::Streaming;
                self.last_frame = Instant::now();
                Ok(())
            }
            Err(e) => {
                self.state = StreamState::Idle;
                Err(e)
            }
        }
    }

    /// Pull the next reading.
    ///
    /// Yields `Err` items for malformed or overload readings and keeps
    /// going. Returns `None` once the session is idle: after the cancel
    /// acknowledgment, or after a rejection, connection failure or missing
    /// acknowledgment has been yielded.
    pub async fn next(&mut self) -> Option<Result<WeightValue>> {
        loop {
            let pulled = match self.state {
                StreamState::Idle | StreamState::Activating => return None,
                StreamState::Streaming => {
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => Pull::Cancel,
                        frame = self.device.next_frame() => Pull::Frame(frame),
                    }
                }
                StreamState::Cancelling => Pull::Frame(self.device.next_frame().await),
            };

            let step = match pulled {
                Pull::Cancel => {
                    debug!("cancelling weight stream");
                    self.state = StreamState::Cancelling;
                    self.cancel_sent = Instant::now();
                    self.cancel_frames = 0;
                    self.in_flight_taken = false;
                    let reply = self.device.send_frame(&DeviceCommand::Cancel, &[]).await;
                    self.on_reply(reply)
                }
                Pull::Frame(reply) => self.on_reply(reply),
            };

            match step {
                Step::Skip if self.cancel_overdue() => {
                    warn!(
                        frames = self.cancel_frames,
                        "balance did not acknowledge cancel"
                    );
                    self.state = StreamState::Idle;
                    return Some(Err(Error::ProtocolTimeout {
                        command: DeviceCommand::Cancel.token().to_string(),
                        frames: self.cancel_frames,
                    }));
                }
                Step::Skip => continue,
                Step::Item(item) => return Some(item),
                Step::Done => return None,
            }
        }
    }

    /// Adapt into a [`futures::Stream`]. Pin it before polling.
    pub fn into_stream(self) -> impl Stream<Item = Result<WeightValue>> + 'a {
        futures::stream::unfold(self, |mut stream| async move {
            let item = stream.next().await?;
            Some((item, stream))
        })
    }

    fn on_reply(&mut self, reply: Result<ResponseFrame>) -> Step {
        match reply {
            Ok(frame) => {
                self.last_frame = Instant::now();
                if self.state == StreamState::Cancelling {
                    self.cancel_frames += 1;
                }
                self.on_frame(frame)
            }
            // One bad line; the readings after it are still good.
            Err(e @ Error::Decode(_)) => Step::Item(Err(e)),
            Err(Error::Timeout) if self.state == StreamState::Cancelling || !self.stalled() => {
                trace!("no reading yet");
                Step::Skip
            }
            Err(e) => {
                debug!(error = %e, state = ?self.state, "weight stream failed");
                self.state = StreamState::Idle;
                Step::Item(Err(e))
            }
        }
    }

    fn on_frame(&mut self, frame: ResponseFrame) -> Step {
        let Some(status) = frame.status else {
            if self.state == StreamState::Cancelling {
                if self.in_flight_taken {
                    trace!("dropping reading sent after cancel");
                    return Step::Skip;
                }
                self.in_flight_taken = true;
            }
            return Step::Item(commands::parse_weight(&frame.arguments));
        };

        if status.is_error() {
            debug!(command = %frame.command_id, %status, "weight stream rejected");
            self.state = StreamState::Idle;
            return Step::Item(Err(Error::rejected(
                &frame.command_id,
                status,
                frame.arguments,
            )));
        }

        let cancel_ack = self.state == StreamState::Cancelling
            && status == ResponseStatus::Accepted
            && frame.command_id == DeviceCommand::Cancel.token();
        if cancel_ack {
            debug!("weight stream cancelled");
            self.state = StreamState::Idle;
            return Step::Done;
        }

        trace!(command = %frame.command_id, %status, "ignoring frame during stream");
        Step::Skip
    }

    fn stalled(&self) -> bool {
        self.last_frame.elapsed() >= self.interval + self.stall_grace
    }

    fn cancel_overdue(&self) -> bool {
        self.state == StreamState::Cancelling
            && self.cancel_sent.elapsed() >= self.interval + self.stall_grace
    }
}

impl<C: Connection> Drop for WeightStream<'_, C> {
    fn drop(&mut self) {
        if matches!(self.state, StreamState::Streaming | StreamState::Cancelling) {
            warn!(
                state = ?self.state,
                "weight stream dropped before the balance acknowledged a cancel; it is still transmitting"
            );
        }
    }
}
