//! Generic forwarding loop run by every consuming stage.
//!
//! The loop waits on the cancellation signal and the input stream at the same
//! time. A line goes through the stage's transform and, unless the transform
//! drops it, on to the output stream. The output stream is closed when the
//! loop returns, whatever the reason.

use crate::line::Line;
use crate::pipeline::error::PipelineResult;
use crate::pipeline::signal::CancelSignal;
use crate::pipeline::stage::{send_or_cancel, Message};
use crossbeam_channel::{select, Receiver, Sender};

/// Per-line transform. `Err` drops the line.
pub type Transform = Box<dyn FnMut(Line) -> PipelineResult<Line> + Send>;

/// Hook run once when the input is exhausted.
pub type OnEnd = Box<dyn FnOnce() + Send>;

/// Callbacks for one accept operation.
pub struct PipelineCtx {
    on_incoming: Transform,
    on_end: Option<OnEnd>,
}

impl PipelineCtx {
    pub fn new<F>(on_incoming: F) -> Self
    where
        F: FnMut(Line) -> PipelineResult<Line> + Send + 'static,
    {
        Self {
            on_incoming: Box::new(on_incoming),
            on_end: None,
        }
    }

    pub fn on_end<E>(mut self, on_end: E) -> Self
    where
        E: FnOnce() + Send + 'static,
    {
        self.on_end = Some(Box::new(on_end));
        self
    }
}

/// How a forwarding loop finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// Input ended and the on-end hook ran.
    Completed { forwarded: usize },
    /// Cancelled, or the downstream receiver went away.
    Cancelled { forwarded: usize },
}

/// Forward `input` to `output` through `ctx` until end of input or
/// cancellation. Consumes `output`, so the stream closes on return.
pub fn accept_pipeline(
    cancel: CancelSignal,
    input: Receiver<Message>,
    output: Sender<Message>,
    mut ctx: PipelineCtx,
) -> ForwardOutcome {
    tracing::trace!("accept_pipeline: START");
    let mut forwarded = 0usize;

    let outcome = loop {
        select! {
            recv(cancel.receiver()) -> _ => {
                tracing::trace!("accept_pipeline: detected cancel request. Bailing out");
                break ForwardOutcome::Cancelled { forwarded };
            }
            recv(input) -> msg => match msg {
                Ok(Message::Line(line)) => {
                    // Both arms may be ready at once; cancellation wins.
                    if cancel.is_cancelled() {
                        break ForwardOutcome::Cancelled { forwarded };
                    }
                    match (ctx.on_incoming)(line) {
                        Ok(line) => {
                            tracing::trace!("accept_pipeline: forwarding to out channel");
                            if !send_or_cancel(&output, Message::Line(line), &cancel) {
                                break ForwardOutcome::Cancelled { forwarded };
                            }
                            forwarded += 1;
                        }
                        Err(e) => tracing::trace!("accept_pipeline: {}", e),
                    }
                }
                Ok(Message::End(_)) | Err(_) => {
                    tracing::trace!("accept_pipeline: detected end of input. Bailing out");
                    if let Some(on_end) = ctx.on_end.take() {
                        on_end();
                    }
                    break ForwardOutcome::Completed { forwarded };
                }
            }
        }
    };

    drop(output);
    tracing::trace!("accept_pipeline: END ({:?})", outcome);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::error::PipelineError;
    use crate::pipeline::stage::{drain_lines, stage_channel, EndMark};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn line(id: u64, text: &str) -> Line {
        Line::new(id, text, false)
    }

    #[test]
    fn test_forwards_everything_in_order() {
        let (in_tx, in_rx) = stage_channel(8);
        let (out_tx, out_rx) = stage_channel(8);
        let ends = Arc::new(AtomicUsize::new(0));
        let ends_hook = ends.clone();

        let handle = thread::spawn(move || {
            accept_pipeline(
                CancelSignal::new(),
                in_rx,
                out_tx,
                PipelineCtx::new(Ok).on_end(move || {
                    ends_hook.fetch_add(1, Ordering::SeqCst);
                }),
            )
        });

        for (i, text) in ["a", "b", "c"].iter().enumerate() {
            in_tx.send(Message::Line(line(i as u64, text))).unwrap();
        }
        drop(in_tx);

        let lines = drain_lines(&out_rx, Duration::from_secs(5));
        let texts: Vec<_> = lines.iter().map(|l| l.display_string()).collect();
        assert_eq!(texts, ["a", "b", "c"]);
        assert_eq!(
            handle.join().unwrap(),
            ForwardOutcome::Completed { forwarded: 3 }
        );
        assert_eq!(ends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transform_error_drops_line() {
        let (in_tx, in_rx) = stage_channel(8);
        let (out_tx, out_rx) = stage_channel(8);

        let handle = thread::spawn(move || {
            accept_pipeline(
                CancelSignal::new(),
                in_rx,
                out_tx,
                PipelineCtx::new(|l: Line| {
                    if l.display_string().starts_with('#') {
                        Err(PipelineError::Dropped("comment".into()))
                    } else {
                        Ok(l)
                    }
                }),
            )
        });

        in_tx.send(Message::Line(line(0, "keep"))).unwrap();
        in_tx.send(Message::Line(line(1, "# skip"))).unwrap();
        in_tx.send(Message::Line(line(2, "also"))).unwrap();
        drop(in_tx);

        let lines = drain_lines(&out_rx, Duration::from_secs(5));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].display_string(), "also");
        assert_eq!(
            handle.join().unwrap(),
            ForwardOutcome::Completed { forwarded: 2 }
        );
    }

    #[test]
    fn test_end_mark_counts_as_end_of_input() {
        let (in_tx, in_rx) = stage_channel(8);
        let (out_tx, out_rx) = stage_channel(8);
        in_tx.send(Message::Line(line(0, "a"))).unwrap();
        in_tx.send(Message::End(EndMark::new("end of input"))).unwrap();

        // The input sender stays alive; the end mark alone finishes the loop.
        let outcome = accept_pipeline(CancelSignal::new(), in_rx, out_tx, PipelineCtx::new(Ok));
        assert_eq!(outcome, ForwardOutcome::Completed { forwarded: 1 });
        assert_eq!(drain_lines(&out_rx, Duration::from_secs(1)).len(), 1);
        drop(in_tx);
    }

    #[test]
    fn test_cancel_before_input() {
        let (_in_tx, in_rx) = stage_channel(8);
        let (out_tx, out_rx) = stage_channel(8);
        let cancel = CancelSignal::new();
        cancel.cancel();

        let called = Arc::new(AtomicUsize::new(0));
        let called_hook = called.clone();
        let outcome = accept_pipeline(
            cancel,
            in_rx,
            out_tx,
            PipelineCtx::new(Ok).on_end(move || {
                called_hook.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(outcome, ForwardOutcome::Cancelled { forwarded: 0 });
        assert!(out_rx.recv().is_err());
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_wins_over_pending_input() {
        let (in_tx, in_rx) = stage_channel(8);
        let (out_tx, out_rx) = stage_channel(8);
        for i in 0..5 {
            in_tx.send(Message::Line(line(i, "x"))).unwrap();
        }
        let cancel = CancelSignal::new();
        cancel.cancel();

        let outcome = accept_pipeline(cancel, in_rx, out_tx, PipelineCtx::new(Ok));
        assert_eq!(outcome, ForwardOutcome::Cancelled { forwarded: 0 });
        assert!(out_rx.try_recv().is_err());
    }

    #[test]
    fn test_cancel_mid_stream_stops_forwarding() {
        let (in_tx, in_rx) = stage_channel(0);
        let (out_tx, out_rx) = stage_channel(0);
        let cancel = CancelSignal::new();
        let c = cancel.clone();

        let handle = thread::spawn(move || accept_pipeline(c, in_rx, out_tx, PipelineCtx::new(Ok)));

        in_tx.send(Message::Line(line(0, "first"))).unwrap();
        let first = out_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(first.into_line().unwrap().display_string(), "first");

        cancel.cancel();
        let outcome = handle.join().unwrap();
        assert_eq!(outcome, ForwardOutcome::Cancelled { forwarded: 1 });

        // The forwarder is gone; nothing further arrives and the stream is closed.
        assert!(in_tx.send(Message::Line(line(1, "late"))).is_err());
        assert!(out_rx.recv().is_err());
    }
}
