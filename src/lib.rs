//! # linesieve: line buffering and filtering pipeline
//!
//! The data plane of an interactive line-selection tool. Input records are
//! ingested from a byte stream while the UI keeps querying what has arrived so
//! far, so every piece here is built for concurrent feeding and re-reading.
//!
//! ## Architecture
//!
//! - **Source**: reads the input on the caller's thread, stores lines in a
//!   mutex-protected buffer, signals readiness and coalesced redraws
//! - **Pipeline**: cancellable stages connected by crossbeam channels
//! - **Buffers**: a bounded raw buffer that re-buffers a stage's stream, and
//!   filtered views (pages, selections) that never copy records
//! - **Hub**: the boundary to the UI, which receives redraw requests
//!
//! ## Example
//!
//! ```no_run
//! use linesieve::{Buffer, CancelSignal, FilteredBuffer, Pipeliner, RawLineBuffer, Source};
//! use std::sync::Arc;
//!
//! let source = Arc::new(Source::new(std::io::stdin(), false));
//! source.setup(None);
//!
//! let cancel = CancelSignal::new();
//! let raw = Arc::new(RawLineBuffer::new());
//! source.start(&cancel).expect("first start");
//! let forwarder = raw.accept(&*source);
//!
//! // Nobody downstream of `raw` here; drain its stream so it never blocks.
//! for _ in raw.output() {}
//! forwarder.join().expect("forwarder thread");
//!
//! let first_page = FilteredBuffer::page(raw.clone(), 1, 20);
//! for i in 0..first_page.size() {
//!     println!("{}", first_page.line_at(i).expect("in range"));
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod hub;
pub mod line;
pub mod pipeline;
pub mod source;

// Re-export commonly used types
pub use buffer::{Buffer, DependentBuffers, FilteredBuffer, LineBuffer, MemoryBuffer, RawLineBuffer};
pub use config::AppConfig;
pub use error::{LineSieveError, Result};
pub use hub::{ChannelHub, Hub, HubMessage, HubReceiver};
pub use line::Line;
pub use pipeline::{CancelSignal, EndMark, Message, PipelineError, Pipeliner, ReadySignal};
pub use source::Source;
