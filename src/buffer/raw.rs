//! RawLineBuffer: appendable buffer that is also a pipeline stage.
//!
//! As a stage it binds to an upstream `(cancel, output)` pair, stores every
//! line it receives and forwards it downstream. It can later replay what it
//! holds onto a fresh stream. With a capacity set, the oldest lines are
//! evicted and registered dependent buffers are told how many went away.

use crate::buffer::{Buffer, DependentBuffers, LineBuffer};
use crate::config::BufferConfig;
use crate::error::{LineSieveError, Result};
use crate::line::Line;
use crate::pipeline::forward::{accept_pipeline, PipelineCtx};
use crate::pipeline::signal::CancelSignal;
use crate::pipeline::stage::{
    send_or_cancel, stage_channel, Message, Pipeliner, SimplePipeline, STAGE_CHANNEL_CAPACITY,
};
use crossbeam_channel::Receiver;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::JoinHandle;

/// Appendable, optionally bounded line buffer.
#[derive(Debug)]
pub struct RawLineBuffer {
    lines: RwLock<VecDeque<Line>>,
    /// Maximum number of lines kept. 0 = unbounded.
    capacity: AtomicUsize,
    stage: SimplePipeline,
    dependents: Mutex<DependentBuffers>,
    completed: AtomicBool,
    channel_capacity: usize,
}

impl RawLineBuffer {
    /// Unbounded buffer.
    pub fn new() -> Self {
        Self {
            lines: RwLock::new(VecDeque::new()),
            capacity: AtomicUsize::new(0),
            stage: SimplePipeline::new(),
            dependents: Mutex::new(DependentBuffers::new()),
            completed: AtomicBool::new(false),
            channel_capacity: STAGE_CHANNEL_CAPACITY,
        }
    }

    pub fn from_config(config: &BufferConfig) -> Self {
        let buffer = Self {
            channel_capacity: config.channel_capacity,
            ..Self::new()
        };
        buffer.set_capacity(config.capacity);
        buffer
    }

    /// Bound the buffer to `capacity` lines. 0 removes the bound. Takes effect
    /// on the next append.
    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::Relaxed);
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    /// Store `line`, evicting from the head if the buffer is over capacity.
    ///
    /// Dependents are renumbered before the write lock is released, so no
    /// reader sees the shifted storage through a stale view.
    pub fn append(&self, line: Line) -> Line {
        tracing::trace!("RawLineBuffer.append: {}", line.display_string());
        let mut lines = self.write_lines();
        lines.push_back(line.clone());
        let capacity = self.capacity();
        if capacity > 0 && lines.len() > capacity {
            let diff = lines.len() - capacity;
            lines.drain(..diff);
            self.lock_dependents().invalidate_up_to(diff);
        }
        line
    }

    /// Consume `upstream`'s stream on a new thread, storing every line and
    /// forwarding it on this buffer's own output stream.
    pub fn accept(self: &Arc<Self>, upstream: &dyn Pipeliner) -> JoinHandle<()> {
        let (cancel, incoming) = upstream.pipeline();
        let (tx, rx) = stage_channel(self.channel_capacity);
        self.stage.set_cancel_signal(cancel.clone());
        self.stage.replace_output(rx);
        self.completed.store(false, Ordering::Release);

        let appender = Arc::clone(self);
        let finisher = Arc::clone(self);
        let ctx = PipelineCtx::new(move |line| Ok(appender.append(line)))
            .on_end(move || finisher.on_end());

        std::thread::spawn(move || {
            accept_pipeline(cancel, incoming, tx, ctx);
        })
    }

    /// Re-emit the stored lines, in order, on a fresh output stream.
    ///
    /// Iterates a snapshot taken when the thread starts; lines appended while
    /// replaying may or may not be included. Stops early on cancellation and
    /// always closes the stream.
    pub fn replay(self: &Arc<Self>) -> JoinHandle<()> {
        let (tx, rx) = stage_channel(self.channel_capacity);
        self.stage.replace_output(rx);
        let cancel = self.stage.cancel_signal();
        let this = Arc::clone(self);

        std::thread::spawn(move || {
            tracing::debug!("RawLineBuffer.replay: START");
            let snapshot: Vec<Line> = this.read_lines().iter().cloned().collect();
            let mut replayed = 0usize;
            for line in snapshot {
                if !send_or_cancel(&tx, Message::Line(line), &cancel) {
                    break;
                }
                replayed += 1;
            }
            tracing::debug!("RawLineBuffer.replay: END (Replayed {} lines)", replayed);
        })
    }

    /// Register a buffer to be notified of evictions.
    pub fn register<B: LineBuffer + 'static>(&self, buffer: &Arc<B>) {
        self.lock_dependents().register(buffer);
    }

    pub fn unregister<B: LineBuffer + ?Sized>(&self, buffer: &Arc<B>) -> bool {
        self.lock_dependents().unregister(buffer)
    }

    /// Number of registered dependents that are still alive.
    pub fn dependent_count(&self) -> usize {
        let mut dependents = self.lock_dependents();
        dependents.prune();
        dependents.len()
    }

    /// Whether the last accepted stream reached its end.
    pub fn is_complete(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Current cancellation signal of this stage.
    pub fn cancel_signal(&self) -> CancelSignal {
        self.stage.cancel_signal()
    }

    fn on_end(&self) {
        self.completed.store(true, Ordering::Release);
        tracing::debug!("RawLineBuffer: input complete ({} lines)", self.size());
    }

    fn read_lines(&self) -> std::sync::RwLockReadGuard<'_, VecDeque<Line>> {
        self.lines.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lines(&self) -> std::sync::RwLockWriteGuard<'_, VecDeque<Line>> {
        self.lines.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_dependents(&self) -> MutexGuard<'_, DependentBuffers> {
        self.dependents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for RawLineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Buffer for RawLineBuffer {
    fn size(&self) -> usize {
        self.read_lines().len()
    }

    fn line_at(&self, index: usize) -> Result<Line> {
        let lines = self.read_lines();
        lines
            .get(index)
            .cloned()
            .ok_or(LineSieveError::OutOfRange {
                index,
                size: lines.len(),
            })
    }
}

impl LineBuffer for RawLineBuffer {
    fn append(&self, line: Line) -> Line {
        RawLineBuffer::append(self, line)
    }

    fn invalidate_up_to(&self, _count: usize) -> Result<()> {
        // This buffer is the authority; nothing upstream can invalidate it.
        Ok(())
    }
}

impl Pipeliner for RawLineBuffer {
    fn pipeline(&self) -> (CancelSignal, Receiver<Message>) {
        self.stage.pipeline()
    }
}
