//! Error types for the reconciler

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("patch failed: {0}")]
    Patch(String),

    #[error("temporary error: {message}")]
    Temporary { message: String },

    #[error("permanent error: {message}")]
    Permanent { message: String },

    #[error("fatal error: {0}")]
    Fatal(String),

    #[error("cancelled")]
    Cancelled,

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn patch(message: impl Into<String>) -> Self {
        Self::Patch(message.into())
    }

    pub fn temporary(message: impl Into<String>) -> Self {
        Self::Temporary {
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::Permanent {
            message: message.into(),
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }

    /// Errors that must never be absorbed by throttling.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_) | Self::Cancelled)
    }

    /// Handler failures that a worker may retry after a backoff.
    pub fn is_throttleable(&self) -> bool {
        matches!(
            self,
            Self::Temporary { .. } | Self::Permanent { .. } | Self::Patch(_) | Self::IoError(_)
        )
    }
}
