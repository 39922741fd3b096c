//! FilteredBuffer: read-only projection over another buffer.
//!
//! A view holds an ordered selection of source indices and resolves lookups
//! through it, so paginated or query-filtered subsets never copy records.
//! Registered as a dependent of its source, it renumbers its selection when
//! the source evicts from the head: evicted entries are dropped and the rest
//! shift down, so the view keeps showing the records that survived.
//!
//! Every renumbering bumps a generation counter. A lookup that raced an
//! eviction sees the counter move and resolves again against the new
//! selection, so it never returns a record the view did not select.

use crate::buffer::{Buffer, LineBuffer};
use crate::error::{LineSieveError, Result};
use crate::line::Line;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

#[derive(Debug)]
struct Selection {
    indices: Vec<usize>,
    /// Number of renumberings applied so far.
    generation: u64,
}

/// Read-only view over a source buffer.
pub struct FilteredBuffer {
    src: Arc<dyn Buffer>,
    selection: RwLock<Selection>,
}

impl FilteredBuffer {
    /// View of page `page` (1-based) of `src`, `page_size` lines per page.
    ///
    /// A page starting past the end of `src` gives an empty view. Page 0 is
    /// treated as page 1.
    pub fn page(src: Arc<dyn Buffer>, page: usize, page_size: usize) -> Self {
        let size = src.size();
        let start = page_size.saturating_mul(page.saturating_sub(1));
        let selection = if start > size {
            Vec::new()
        } else {
            let end = start.saturating_add(page_size).min(size);
            (start..end).collect()
        };
        Self::with_selection(src, selection)
    }

    /// View of the given source indices, in the given order.
    pub fn with_selection(src: Arc<dyn Buffer>, selection: Vec<usize>) -> Self {
        Self {
            src,
            selection: RwLock::new(Selection {
                indices: selection,
                generation: 0,
            }),
        }
    }

    /// Source index backing view index `index`.
    pub fn source_index(&self, index: usize) -> Option<usize> {
        self.read_selection().indices.get(index).copied()
    }

    /// Copy of the current selection.
    pub fn selection(&self) -> Vec<usize> {
        self.read_selection().indices.clone()
    }

    pub fn source(&self) -> &Arc<dyn Buffer> {
        &self.src
    }

    fn read_selection(&self) -> RwLockReadGuard<'_, Selection> {
        self.selection.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Buffer for FilteredBuffer {
    fn size(&self) -> usize {
        self.read_selection().indices.len()
    }

    /// Note that view index `i` may correspond to a totally different index
    /// in the source buffer.
    fn line_at(&self, index: usize) -> Result<Line> {
        loop {
            let (src_index, generation) = {
                let selection = self.read_selection();
                let src_index = *selection.indices.get(index).ok_or(LineSieveError::OutOfRange {
                    index,
                    size: selection.indices.len(),
                })?;
                (src_index, selection.generation)
            };

            // The selection lock is not held across the source lookup, so an
            // eviction may land in between; retry against the new selection.
            let line = self.src.line_at(src_index);
            if self.read_selection().generation == generation {
                return line;
            }
        }
    }
}

impl LineBuffer for FilteredBuffer {
    /// Views are never sinks; the line is handed back untouched.
    fn append(&self, line: Line) -> Line {
        line
    }

    fn invalidate_up_to(&self, count: usize) -> Result<()> {
        let mut selection = self
            .selection
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = selection.indices.len();
        selection.indices.retain(|&i| i >= count);
        for i in selection.indices.iter_mut() {
            *i -= count;
        }
        selection.generation += 1;
        tracing::trace!(
            "FilteredBuffer: invalidated up to {} ({} -> {} entries)",
            count,
            before,
            selection.indices.len()
        );
        Ok(())
    }
}

impl std::fmt::Debug for FilteredBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilteredBuffer")
            .field("src_size", &self.src.size())
            .field("selection", &self.read_selection().indices)
            .finish()
    }
}
