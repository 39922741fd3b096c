//! Thread boundary between the pipeline and the UI.
//!
//! The UI side is an external collaborator. The pipeline only needs two
//! things from it, expressed by [`Hub`]: a way to re-run the active query and
//! a way to request a redraw. [`ChannelHub`] implements it over a crossbeam
//! channel; the UI thread drains the matching [`HubReceiver`].

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// UI collaborator receiving redraw requests.
#[cfg_attr(test, mockall::automock)]
pub trait Hub: Send + Sync {
    /// Re-run the active query, if any. Returns true when a query ran (the
    /// query's own results trigger a redraw), false when there is none.
    fn exec_query(&self) -> bool;

    /// Ask the UI to redraw.
    fn send_draw(&self);
}

/// Messages sent from the pipeline to the UI thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubMessage {
    /// New input arrived and no query consumed it.
    Draw,
    /// The active query should be re-run against the grown buffer.
    ExecQuery,
}

/// Channel capacity for pipeline → UI messages.
const HUB_CHANNEL_CAPACITY: usize = 64;

/// Pipeline-side hub backed by a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelHub {
    tx: Sender<HubMessage>,
    query_active: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
}

/// UI-side handle for a [`ChannelHub`].
#[derive(Debug)]
pub struct HubReceiver {
    rx: Receiver<HubMessage>,
    query_active: Arc<AtomicBool>,
}

impl ChannelHub {
    /// Create a connected `(hub, receiver)` pair.
    pub fn new() -> (Self, HubReceiver) {
        let (tx, rx) = bounded(HUB_CHANNEL_CAPACITY);
        let query_active = Arc::new(AtomicBool::new(false));
        (
            Self {
                tx,
                query_active: query_active.clone(),
                dropped: Arc::new(AtomicU64::new(0)),
            },
            HubReceiver { rx, query_active },
        )
    }

    /// Requests dropped because the UI had not caught up.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn post(&self, msg: HubMessage) {
        // A full channel already holds a pending request that covers this one.
        if let Err(TrySendError::Full(_)) = self.tx.try_send(msg) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl Hub for ChannelHub {
    fn exec_query(&self) -> bool {
        if !self.query_active.load(Ordering::Acquire) {
            return false;
        }
        self.post(HubMessage::ExecQuery);
        true
    }

    fn send_draw(&self) {
        tracing::debug!("Hub: redraw requested");
        self.post(HubMessage::Draw);
    }
}

impl HubReceiver {
    /// Tell the pipeline whether a query is currently active.
    pub fn set_query_active(&self, active: bool) {
        self.query_active.store(active, Ordering::Release);
    }

    /// Drain all pending messages.
    pub fn drain(&self) -> Vec<HubMessage> {
        let mut msgs = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            msgs.push(msg);
        }
        msgs
    }

    /// Try to receive a single message without blocking.
    pub fn try_recv(&self) -> Option<HubMessage> {
        self.rx.try_recv().ok()
    }

    /// The raw receiver, for use in `select!`.
    pub fn receiver(&self) -> &Receiver<HubMessage> {
        &self.rx
    }
}
