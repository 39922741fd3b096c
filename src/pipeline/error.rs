//! Pipeline-specific error types.

use thiserror::Error;

/// Errors that can occur within the pipeline system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Returned by a transform to drop the current line. Never surfaced past
    /// the forwarding stage.
    #[error("Line dropped: {0}")]
    Dropped(String),

    #[error("Stage already started")]
    AlreadyStarted,
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
