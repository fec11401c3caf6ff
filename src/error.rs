//! Error types for the allocation game

use crate::game::types::TaskId;
use thiserror::Error;

/// Errors that can occur while running the allocation game
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("missing allocation for task {0}")]
    IncompleteSubmission(TaskId),
    #[error("allocation from unknown task {0}")]
    UnexpectedSubmission(TaskId),
    #[error("task {0} already submitted this round")]
    DuplicateSubmission(TaskId),
    #[error("expected length {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("state error: {0}")]
    State(String),
}

/// A specialized Result type for allocation game operations
pub type Result<T> = std::result::Result<T, Error>;
