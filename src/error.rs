//! Session-facing error types

use thiserror::Error;

/// Input the session could not use. Recoverable, no state change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("nothing to send: text is empty and no images are staged")]
    EmptySubmission,
    #[error("none of the {rejected} selected file(s) is an image")]
    NoValidImages { rejected: usize },
    #[error("no staged image at index {index} (staged: {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Errors returned to the UI by [`crate::runtime::SessionHandle`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("a request is already in progress")]
    Busy,
    #[error("invalid species selection: {0}")]
    InvalidSelection(String),
    #[error("session has stopped")]
    Closed,
}
