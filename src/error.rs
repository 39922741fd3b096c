//! Error handling for linesieve
//!
//! This module defines the crate-wide error type and a Result alias.
//! Buffer lookups report failures through [`LineSieveError`]; none of
//! these conditions is fatal, callers decide how to recover.

use thiserror::Error;

/// Main error type for linesieve operations
#[derive(Error, Debug)]
pub enum LineSieveError {
    /// A lookup asked for an index outside `0..size`
    #[error("Specified index {index} is out of range (size {size})")]
    OutOfRange { index: usize, size: usize },

    /// A lookup was made against a buffer holding no records
    #[error("Empty buffer")]
    EmptyBuffer,

    /// A dependent buffer could not apply an invalidation
    #[error("Invalidation error: {0}")]
    Invalidation(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<LineSieveError>,
    },
}

impl LineSieveError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        LineSieveError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for linesieve operations
pub type Result<T> = std::result::Result<T, LineSieveError>;
