//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use linesieve::buffer::collect_lines;
use linesieve::Buffer;
use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_millis(100)
}

/// Display strings of every line in `buffer`, in order
pub fn texts(buffer: &dyn Buffer) -> Vec<String> {
    collect_lines(buffer)
        .iter()
        .map(|l| l.display_string().to_string())
        .collect()
}

/// Newline-terminated input of `n` numbered lines: "line 0\nline 1\n..."
pub fn numbered_input(n: usize) -> String {
    (0..n).map(|i| format!("line {}\n", i)).collect()
}
