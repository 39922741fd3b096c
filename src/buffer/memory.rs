//! MemoryBuffer: the mutable base the source appends to.
//!
//! Size queries, lookups and appends all take the same lock, so a reader never
//! sees a size that disagrees with the records it can fetch. The lock lives in
//! the buffer itself and the type is not `Clone`: share it by
//! reference or `Arc`, never by copying.

use crate::buffer::Buffer;
use crate::error::{LineSieveError, Result};
use crate::line::Line;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Mutex-protected, append-only line store.
#[derive(Debug, Default)]
pub struct MemoryBuffer {
    lines: Mutex<Vec<Line>>,
}

impl MemoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append at the tail.
    pub fn append(&self, line: Line) {
        self.lock().push(line);
    }

    /// Copy of the current records, taken under the lock.
    pub fn snapshot(&self) -> Vec<Line> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Line>> {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Buffer for MemoryBuffer {
    fn size(&self) -> usize {
        self.lock().len()
    }

    fn line_at(&self, index: usize) -> Result<Line> {
        let lines = self.lock();
        if lines.is_empty() {
            return Err(LineSieveError::EmptyBuffer);
        }
        lines
            .get(index)
            .cloned()
            .ok_or(LineSieveError::OutOfRange {
                index,
                size: lines.len(),
            })
    }
}
