//! Close-once broadcast signals.
//!
//! A signal is a zero-capacity channel whose only sender is dropped when the
//! signal fires. Every clone of the receiver then observes a disconnect, so
//! any number of threads can wait on it, poll it, or race it inside
//! `crossbeam_channel::select!` alongside real work. Firing is guarded so a
//! second fire is a harmless no-op.

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

#[derive(Debug)]
struct Latch {
    trigger: Mutex<Option<Sender<()>>>,
    done: Receiver<()>,
}

impl Latch {
    fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            trigger: Mutex::new(Some(tx)),
            done: rx,
        }
    }

    /// Returns true for the call that actually fired the latch.
    fn fire(&self) -> bool {
        let sender = self
            .trigger
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        sender.is_some()
    }

    fn is_fired(&self) -> bool {
        matches!(self.done.try_recv(), Err(TryRecvError::Disconnected))
    }

    fn wait(&self) {
        // Nothing is ever sent, so this only returns on disconnect.
        let _ = self.done.recv();
    }

    fn wait_timeout(&self, timeout: Duration) -> bool {
        matches!(
            self.done.recv_timeout(timeout),
            Err(RecvTimeoutError::Disconnected)
        )
    }
}

/// Idempotent "cancel now" broadcast shared by every stage of a chain.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    inner: Arc<Latch>,
}

impl CancelSignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Latch::new()),
        }
    }

    /// Fire the signal. Returns false if it had already been cancelled.
    pub fn cancel(&self) -> bool {
        let fired = self.inner.fire();
        if fired {
            tracing::debug!("Cancellation requested");
        }
        fired
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_fired()
    }

    /// Receiver that becomes ready (disconnected) once cancelled. Meant for
    /// `select!` arms; it never yields a value.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.inner.done
    }

    /// Block until cancelled.
    pub fn wait(&self) {
        self.inner.wait();
    }

    /// Block until cancelled or `timeout` elapses. Returns true if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.inner.wait_timeout(timeout)
    }

    /// Whether both handles refer to the same signal.
    pub fn same_signal(&self, other: &CancelSignal) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot "at least one record is available" notification.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    inner: Arc<Latch>,
}

impl ReadySignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Latch::new()),
        }
    }

    /// Mark ready. Returns true only for the call that fired it.
    pub fn fire(&self) -> bool {
        self.inner.fire()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.is_fired()
    }

    /// Receiver that becomes ready (disconnected) once fired.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.inner.done
    }

    pub fn wait(&self) {
        self.inner.wait();
    }

    /// Returns true if the signal fired before `timeout` elapsed.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        self.inner.wait_timeout(timeout)
    }
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}
