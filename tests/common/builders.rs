//! Test data builders for creating test objects

use linesieve::config::SourceConfig;
use linesieve::{RawLineBuffer, Source};
use std::io::Cursor;
use std::sync::Arc;

/// Builder for sources over in-memory input
pub struct SourceBuilder {
    input: Vec<u8>,
    enable_sep: bool,
    redraw_interval_ms: u64,
    channel_capacity: usize,
}

impl SourceBuilder {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.as_bytes().to_vec(),
            enable_sep: false,
            redraw_interval_ms: 10,
            channel_capacity: 16,
        }
    }

    pub fn enable_sep(mut self, enable_sep: bool) -> Self {
        self.enable_sep = enable_sep;
        self
    }

    pub fn redraw_interval_ms(mut self, ms: u64) -> Self {
        self.redraw_interval_ms = ms;
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn build(self) -> Arc<Source> {
        let config = SourceConfig {
            enable_sep: self.enable_sep,
            redraw_interval_ms: self.redraw_interval_ms,
        };
        Arc::new(Source::with_config(
            Cursor::new(self.input),
            &config,
            self.channel_capacity,
        ))
    }
}

/// Raw buffer with the given capacity (0 = unbounded)
pub fn raw_buffer(capacity: usize) -> Arc<RawLineBuffer> {
    let buffer = Arc::new(RawLineBuffer::new());
    buffer.set_capacity(capacity);
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use linesieve::Buffer;

    #[test]
    fn test_source_builder() {
        let source = SourceBuilder::new("a\x00x\n").enable_sep(true).build();
        source.setup(None);
        assert_eq!(source.size(), 1);
        assert_eq!(source.line_at(0).unwrap().output(), "x");
    }
}
