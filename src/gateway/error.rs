//! Gateway error types

use thiserror::Error;

/// Backend call failure with classification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: GatewayErrorKind,
    /// Human-readable reason, shown to the user
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: GatewayErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Transport, message)
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Status(status), message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorKind::Decode, message)
    }

    /// Map a reqwest send/read failure
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::transport(format!("Request timeout: {err}"))
        } else if err.is_connect() {
            Self::transport(format!("Connection failed: {err}"))
        } else {
            Self::transport(format!("Request failed: {err}"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// Connection, timeout or body transfer failure
    Transport,
    /// Non-2xx response
    Status(u16),
    /// 2xx response whose body could not be parsed
    Decode,
}

/// Failure of the classify-images call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(transparent)]
pub struct ClassificationError(#[from] pub GatewayError);

/// Failure of the question-answering call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(transparent)]
pub struct QaError(#[from] pub GatewayError);

impl ClassificationError {
    pub fn kind(&self) -> GatewayErrorKind {
        self.0.kind
    }
}

impl QaError {
    pub fn kind(&self) -> GatewayErrorKind {
        self.0.kind
    }
}
