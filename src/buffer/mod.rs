//! Line buffers and views.
//!
//! - [`MemoryBuffer`]: mutex-protected append-only store fed by the source.
//! - [`RawLineBuffer`]: appendable, optionally bounded buffer that is also a
//!   pipeline stage.
//! - [`FilteredBuffer`]: read-only projection over another buffer.
//! - [`DependentBuffers`]: buffers to notify when an authoritative buffer
//!   evicts records.
//!
//! Readers only ever go through [`Buffer`]: `size()` plus `line_at(i)`, where
//! `0..size()` is the valid domain at the instant of the call.

pub mod dependents;
pub mod filtered;
pub mod memory;
pub mod raw;

pub use dependents::DependentBuffers;
pub use filtered::FilteredBuffer;
pub use memory::MemoryBuffer;
pub use raw::RawLineBuffer;

use crate::error::Result;
use crate::line::Line;

/// Read-only, index-addressable collection of lines.
pub trait Buffer: Send + Sync {
    /// Number of lines currently held.
    fn size(&self) -> usize;

    /// Line at `index`, or `OutOfRange` when `index >= size()`.
    fn line_at(&self, index: usize) -> Result<Line>;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

/// A buffer that can sit in a [`DependentBuffers`] registry.
pub trait LineBuffer: Buffer {
    /// Offer a line to the buffer. Returns the line unchanged.
    fn append(&self, line: Line) -> Line;

    /// The upstream buffer dropped its first `count` records; indices below
    /// `count` are gone and every later index moved down by `count`.
    ///
    /// Called while the upstream buffer is write-locked: implementations
    /// must not read the upstream buffer from here.
    fn invalidate_up_to(&self, count: usize) -> Result<()>;
}

/// Collect every line of a buffer, in order. Stops at the first failed lookup,
/// which only happens if the buffer shrinks while being read.
pub fn collect_lines(buffer: &dyn Buffer) -> Vec<Line> {
    (0..buffer.size())
        .map_while(|i| buffer.line_at(i).ok())
        .collect()
}
