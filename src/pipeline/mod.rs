//! Cancellable producer/consumer stages.
//!
//! Lines flow between stages over bounded crossbeam channels. Every stage
//! exposes a [`CancelSignal`] and an output stream; the next stage binds to
//! that pair and runs [`accept_pipeline`] on its own thread.
//!
//! # Architecture
//!
//! ```text
//! [Source] ──(cancel, rx)──► [RawLineBuffer] ──(cancel, rx)──► [consumer]
//!     │                            │
//!     └──────── one shared CancelSignal, cancelling stops the chain
//! ```
//!
//! # Design
//!
//! - **Close-once signals**: cancellation is a dropped sender, observed by any
//!   number of waiters and usable as a `select!` arm.
//! - **Sends race cancellation**: a producer never blocks past a cancel.
//! - **Closing means done**: a stage drops its sender exactly when it will
//!   emit nothing more. Sources additionally send an [`EndMark`].

pub mod error;
pub mod forward;
pub mod signal;
pub mod stage;

pub use error::{PipelineError, PipelineResult};
pub use forward::{accept_pipeline, ForwardOutcome, OnEnd, PipelineCtx, Transform};
pub use signal::{CancelSignal, ReadySignal};
pub use stage::{
    drain_lines, send_or_cancel, stage_channel, EndMark, Message, Pipeliner, SimplePipeline,
    STAGE_CHANNEL_CAPACITY,
};
