//! Source: the ingestion stage.
//!
//! Reads newline-delimited records from an external byte stream into a
//! [`MemoryBuffer`], then publishes them to downstream stages.
//!
//! # Lifecycle
//!
//! - [`Source::setup`] runs the ingest exactly once, even when called from
//!   several threads; late callers block until it finishes. The input handle
//!   is taken by that run and never read again.
//! - [`Source::ready`] fires once the first record is stored, so the UI can
//!   render before the whole input has arrived.
//! - [`Source::start`] replays the stored records onto the output stream and
//!   finishes with an [`EndMark`].
//!
//! While ingesting, a ticker coalesces "new record" hints: the hub is asked to
//! redraw at most once per tick, plus once more at the end if a hint is still
//! pending.

use crate::buffer::{Buffer, MemoryBuffer};
use crate::config::SourceConfig;
use crate::error::Result;
use crate::hub::Hub;
use crate::line::Line;
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::signal::{CancelSignal, ReadySignal};
use crate::pipeline::stage::{
    send_or_cancel, stage_channel, EndMark, Message, Pipeliner, SimplePipeline,
    STAGE_CHANNEL_CAPACITY,
};
use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Once, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

type Input = Box<dyn Read + Send>;

/// Ingestion stage and buffer of everything read from the input.
pub struct Source {
    buffer: MemoryBuffer,
    input: Mutex<Option<Input>>,
    enable_sep: bool,
    redraw_interval: Duration,
    ready: ReadySignal,
    setup_once: Once,
    stage: SimplePipeline,
    output_tx: Mutex<Option<Sender<Message>>>,
}

impl Source {
    /// Create a source over `input`. Nothing is read until [`Source::setup`].
    pub fn new<R: Read + Send + 'static>(input: R, enable_sep: bool) -> Self {
        let config = SourceConfig {
            enable_sep,
            ..SourceConfig::default()
        };
        Self::with_config(input, &config, STAGE_CHANNEL_CAPACITY)
    }

    pub fn with_config<R: Read + Send + 'static>(
        input: R,
        config: &SourceConfig,
        channel_capacity: usize,
    ) -> Self {
        let (tx, rx) = stage_channel(channel_capacity);
        Self {
            buffer: MemoryBuffer::new(),
            // Note that the input may be closed after setup, so it is never reopened.
            input: Mutex::new(Some(Box::new(input))),
            enable_sep: config.enable_sep,
            redraw_interval: config.redraw_interval(),
            ready: ReadySignal::new(),
            setup_once: Once::new(),
            stage: SimplePipeline::with_output(rx),
            output_tx: Mutex::new(Some(tx)),
        }
    }

    /// Read the whole input into the buffer. Only the first call does any
    /// work; concurrent callers wait for it to finish.
    pub fn setup(&self, hub: Option<&dyn Hub>) {
        self.setup_once.call_once(|| self.ingest(hub));
    }

    pub fn is_setup(&self) -> bool {
        self.setup_once.is_completed()
    }

    /// Fires as soon as the first line has been stored.
    pub fn ready(&self) -> &ReadySignal {
        &self.ready
    }

    pub fn line_count(&self) -> usize {
        self.buffer.size()
    }

    /// Replay every stored line onto the output stream on a new thread,
    /// honoring `cancel`, then send an end mark. One-shot.
    pub fn start(&self, cancel: &CancelSignal) -> PipelineResult<JoinHandle<()>> {
        let tx = self
            .output_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(tx) = tx else {
            tracing::warn!("Source.start called twice");
            return Err(PipelineError::AlreadyStarted);
        };

        self.stage.set_cancel_signal(cancel.clone());
        let lines = self.buffer.snapshot();
        let cancel = cancel.clone();

        Ok(std::thread::spawn(move || stream_lines(lines, tx, cancel)))
    }

    fn ingest(&self, hub: Option<&dyn Hub>) {
        let input = self
            .input
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(input) = input else {
            return;
        };

        let dirty = AtomicBool::new(false);
        let (done_tx, done_rx) = bounded::<()>(0);

        std::thread::scope(|scope| {
            let dirty = &dirty;
            let interval = self.redraw_interval;
            scope.spawn(move || redraw_loop(hub, dirty, &done_rx, interval));

            let count = self.read_lines(input, dirty);
            tracing::info!("Read all from source ({} lines)", count);

            // Disconnecting `done` stops the ticker after a final flush.
            drop(done_tx);
        });
    }

    fn read_lines(&self, input: Input, dirty: &AtomicBool) -> u64 {
        let mut reader = BufReader::new(input);
        let mut raw = Vec::new();
        let mut count = 0u64;

        loop {
            raw.clear();
            match reader.read_until(b'\n', &mut raw) {
                Ok(0) => break,
                Ok(_) => {
                    let line = Line::new(count, decode_line(&raw), self.enable_sep);
                    self.buffer.append(line);
                    count += 1;
                    if count == 1 {
                        // Others may now render: at least one line is buffered.
                        self.ready.fire();
                    }
                    dirty.store(true, Ordering::Release);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("Failed to read from source after {} lines: {}", count, e);
                    break;
                }
            }
        }
        count
    }
}

/// Strip the line terminator (`\n` or `\r\n`) and decode, replacing invalid
/// UTF-8 sequences.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

fn flush_redraw(hub: Option<&dyn Hub>, dirty: &AtomicBool) {
    if !dirty.swap(false, Ordering::AcqRel) {
        return;
    }
    if let Some(hub) = hub {
        if !hub.exec_query() {
            hub.send_draw();
        }
    }
}

fn redraw_loop(
    hub: Option<&dyn Hub>,
    dirty: &AtomicBool,
    done: &Receiver<()>,
    interval: Duration,
) {
    let ticker = tick(interval);
    loop {
        select! {
            recv(done) -> _ => {
                flush_redraw(hub, dirty);
                return;
            }
            recv(ticker) -> _ => flush_redraw(hub, dirty),
        }
    }
}

fn stream_lines(lines: Vec<Line>, tx: Sender<Message>, cancel: CancelSignal) {
    tracing::debug!("Source.start: streaming {} lines", lines.len());
    let mut sent = 0usize;
    let mut cancelled = false;
    for line in lines {
        if !send_or_cancel(&tx, Message::Line(line), &cancel) {
            cancelled = true;
            break;
        }
        sent += 1;
    }

    let mark = Message::End(EndMark::new("end of input"));
    if cancelled {
        // Best effort: the consumer may already be gone.
        let _ = tx.try_send(mark);
    } else {
        send_or_cancel(&tx, mark, &cancel);
    }
    tracing::debug!("Source.start: END (sent {} lines, cancelled: {})", sent, cancelled);
}

impl Buffer for Source {
    fn size(&self) -> usize {
        self.buffer.size()
    }

    fn line_at(&self, index: usize) -> Result<Line> {
        self.buffer.line_at(index)
    }
}

impl Pipeliner for Source {
    fn pipeline(&self) -> (CancelSignal, Receiver<Message>) {
        self.stage.pipeline()
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source")
            .field("lines", &self.buffer.size())
            .field("enable_sep", &self.enable_sep)
            .field("ready", &self.ready.is_ready())
            .field("setup", &self.setup_once.is_completed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::MockHub;
    use crate::pipeline::stage::drain_lines;
    use std::io::Cursor;
    use std::sync::Arc;

    fn source(text: &str) -> Source {
        Source::new(Cursor::new(text.as_bytes().to_vec()), false)
    }

    #[test]
    fn test_decode_line_terminators() {
        assert_eq!(decode_line(b"abc\n"), "abc");
        assert_eq!(decode_line(b"abc\r\n"), "abc");
        assert_eq!(decode_line(b"abc"), "abc");
        assert_eq!(decode_line(b"\n"), "");
        assert_eq!(decode_line(b"a\xffb\n"), "a\u{fffd}b");
    }

    #[test]
    fn test_setup_reads_all_lines() {
        let src = source("a\nb\r\nc");
        assert!(!src.ready().is_ready());
        src.setup(None);
        assert!(src.is_setup());
        assert!(src.ready().is_ready());
        assert_eq!(src.size(), 3);
        assert_eq!(src.line_at(1).unwrap().display_string(), "b");
        assert_eq!(src.line_at(2).unwrap().display_string(), "c");
        assert_eq!(src.line_at(2).unwrap().id(), 2);
    }

    #[test]
    fn test_setup_runs_once() {
        let src = source("a\nb\n");
        src.setup(None);
        src.setup(None);
        assert_eq!(src.size(), 2);
    }

    #[test]
    fn test_empty_input_never_ready() {
        let src = source("");
        src.setup(None);
        assert_eq!(src.size(), 0);
        assert!(!src.ready().is_ready());
    }

    #[test]
    fn test_separator_enabled() {
        let src = Source::new(Cursor::new(b"shown\0out\n".to_vec()), true);
        src.setup(None);
        let line = src.line_at(0).unwrap();
        assert_eq!(line.display_string(), "shown");
        assert_eq!(line.output(), "out");
    }

    #[test]
    fn test_fast_input_coalesces_to_one_draw() {
        let mut hub = MockHub::new();
        hub.expect_exec_query().times(1).returning(|| false);
        hub.expect_send_draw().times(1).return_const(());

        let src = source("a\nb\nc\nd\n");
        src.setup(Some(&hub));
        assert_eq!(src.size(), 4);
    }

    #[test]
    fn test_active_query_suppresses_draw() {
        let mut hub = MockHub::new();
        hub.expect_exec_query().times(1).returning(|| true);
        hub.expect_send_draw().never();

        let src = source("a\n");
        src.setup(Some(&hub));
    }

    #[test]
    fn test_no_draw_for_empty_input() {
        let mut hub = MockHub::new();
        hub.expect_exec_query().never();
        hub.expect_send_draw().never();

        source("").setup(Some(&hub));
    }

    #[test]
    fn test_start_streams_then_end_mark() {
        let src = source("a\nb\nc\n");
        src.setup(None);
        let handle = src.start(&CancelSignal::new()).unwrap();

        let rx = src.output();
        let mut got = Vec::new();
        while let Ok(msg) = rx.recv_timeout(Duration::from_secs(5)) {
            let end = msg.is_end();
            got.push(msg);
            if end {
                break;
            }
        }
        handle.join().unwrap();

        assert_eq!(got.len(), 4);
        assert!(got[3].is_end());
        assert_eq!(
            got[0].clone().into_line().unwrap().display_string(),
            "a"
        );
    }

    #[test]
    fn test_start_twice_fails() {
        let src = source("a\n");
        src.setup(None);
        let cancel = CancelSignal::new();
        src.start(&cancel).unwrap().join().unwrap();
        assert_eq!(src.start(&cancel).unwrap_err(), PipelineError::AlreadyStarted);
    }

    #[test]
    fn test_start_cancelled_sends_nothing_but_end_mark() {
        let src = Arc::new(source("a\nb\nc\n"));
        src.setup(None);
        let cancel = CancelSignal::new();
        cancel.cancel();

        src.start(&cancel).unwrap().join().unwrap();
        let rx = src.output();
        assert!(rx.try_recv().unwrap().is_end());
        assert!(drain_lines(&rx, Duration::from_millis(50)).is_empty());
    }

    #[test]
    fn test_start_shares_cancel_signal() {
        let src = source("a\n");
        let cancel = CancelSignal::new();
        src.start(&cancel).unwrap().join().unwrap();
        assert!(src.pipeline().0.same_signal(&cancel));
    }
}
