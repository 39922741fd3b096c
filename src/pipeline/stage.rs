//! Stage plumbing shared by every pipeline participant.
//!
//! A stage is anything that exposes a [`CancelSignal`] and an output stream of
//! [`Message`]s. Downstream stages receive both through [`Pipeliner::pipeline`]
//! and bind to them, which is how chains are built.

use crate::line::Line;
use crate::pipeline::signal::CancelSignal;
use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Sender};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Default capacity for stage output channels.
pub const STAGE_CHANNEL_CAPACITY: usize = 256;

/// Explicit end-of-stream marker. Distinguishes a producer that finished
/// normally from one that simply went quiet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndMark {
    pub reason: String,
}

impl EndMark {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Item carried on stage streams.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Line(Line),
    End(EndMark),
}

impl Message {
    pub fn into_line(self) -> Option<Line> {
        match self {
            Message::Line(l) => Some(l),
            Message::End(_) => None,
        }
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Message::End(_))
    }
}

/// Create a stage output channel. Capacity 0 gives a rendezvous channel.
pub fn stage_channel(capacity: usize) -> (Sender<Message>, Receiver<Message>) {
    bounded(capacity)
}

/// Capability exposed by every stage.
pub trait Pipeliner: Send + Sync {
    /// The `(cancel, output)` pair a downstream stage binds to.
    fn pipeline(&self) -> (CancelSignal, Receiver<Message>);

    /// Cancel this stage (and everything sharing its signal).
    fn cancel(&self) {
        self.pipeline().0.cancel();
    }

    /// The current output stream.
    fn output(&self) -> Receiver<Message> {
        self.pipeline().1
    }
}

#[derive(Debug, Clone)]
struct StageOutput {
    cancel: CancelSignal,
    output: Receiver<Message>,
}

/// Reusable stage state: the cancellation signal a stage honors and the
/// receiving end of the stream it currently produces.
///
/// The sending end is owned by whichever thread is producing, so the stream
/// closes exactly when that thread finishes.
#[derive(Debug)]
pub struct SimplePipeline {
    state: Mutex<StageOutput>,
}

impl SimplePipeline {
    /// A stage with a fresh signal and an already-closed output stream.
    pub fn new() -> Self {
        let (_, output) = stage_channel(0);
        Self {
            state: Mutex::new(StageOutput {
                cancel: CancelSignal::new(),
                output,
            }),
        }
    }

    /// A stage bound to an existing output stream.
    pub fn with_output(output: Receiver<Message>) -> Self {
        Self {
            state: Mutex::new(StageOutput {
                cancel: CancelSignal::new(),
                output,
            }),
        }
    }

    pub fn cancel_signal(&self) -> CancelSignal {
        self.lock().cancel.clone()
    }

    pub fn set_cancel_signal(&self, cancel: CancelSignal) {
        self.lock().cancel = cancel;
    }

    /// Replace the output stream, returning the previous one.
    pub fn replace_output(&self, output: Receiver<Message>) -> Receiver<Message> {
        std::mem::replace(&mut self.lock().output, output)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StageOutput> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SimplePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeliner for SimplePipeline {
    fn pipeline(&self) -> (CancelSignal, Receiver<Message>) {
        let state = self.lock();
        (state.cancel.clone(), state.output.clone())
    }
}

/// Send `msg` unless `cancel` fires first.
///
/// Returns false when the stage should stop: cancelled before or during the
/// send, or the receiving side is gone. Neither case is an error; the consumer
/// went away on purpose.
pub fn send_or_cancel(tx: &Sender<Message>, msg: Message, cancel: &CancelSignal) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    select! {
        send(tx, msg) -> res => res.is_ok(),
        recv(cancel.receiver()) -> _ => false,
    }
}

/// Collect the lines of a stream until it closes or carries an end mark.
///
/// Gives up once `timeout` has elapsed overall, returning what arrived.
pub fn drain_lines(rx: &Receiver<Message>, timeout: Duration) -> Vec<Line> {
    let deadline = Instant::now() + timeout;
    let mut lines = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(Message::Line(line)) => lines.push(line),
            Ok(Message::End(mark)) => {
                tracing::trace!("drain_lines: end mark ({})", mark.reason);
                break;
            }
            Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!("drain_lines: timed out after {} lines", lines.len());
                break;
            }
        }
    }
    lines
}
