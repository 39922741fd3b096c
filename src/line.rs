//! Line records.
//!
//! A [`Line`] is one input record. It is immutable once built and cheap to
//! clone: every clone shares the same allocation, so buffers, views and
//! channels can all hold the same record without copying its text.

use std::fmt;
use std::sync::Arc;

/// Separator splitting the displayed part of a record from its output part.
pub const NULL_SEPARATOR: char = '\0';

#[derive(Debug, PartialEq, Eq, Hash)]
struct RawLine {
    id: u64,
    buf: String,
    /// Byte offset of the NUL separator, when separator handling is on.
    sep_loc: Option<usize>,
}

/// One immutable input record plus its display form.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Line(Arc<RawLine>);

impl Line {
    /// Build a record. With `enable_sep`, text after the first NUL byte is
    /// the output form and text before it is what gets displayed.
    pub fn new(id: u64, text: impl Into<String>, enable_sep: bool) -> Self {
        let buf = text.into();
        let sep_loc = if enable_sep {
            buf.find(NULL_SEPARATOR)
        } else {
            None
        };
        Self(Arc::new(RawLine { id, buf, sep_loc }))
    }

    /// Ingest sequence number assigned by whoever created the record.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// The full record text, separator included.
    pub fn buffer(&self) -> &str {
        &self.0.buf
    }

    /// Text shown to the user.
    pub fn display_string(&self) -> &str {
        match self.0.sep_loc {
            Some(loc) => &self.0.buf[..loc],
            None => &self.0.buf,
        }
    }

    /// Text emitted when the record is selected.
    pub fn output(&self) -> &str {
        match self.0.sep_loc {
            Some(loc) => &self.0.buf[loc + NULL_SEPARATOR.len_utf8()..],
            None => &self.0.buf,
        }
    }

    /// Whether both handles point at the very same record allocation.
    pub fn ptr_eq(a: &Line, b: &Line) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl fmt::Debug for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line({}, {:?})", self.0.id, self.0.buf)
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_string())
    }
}
