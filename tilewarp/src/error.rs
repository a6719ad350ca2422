//! Error types for tile production.
//!
//! Errors are categorized by where they arise so callers can decide whether a
//! failure is local to one source tile (substitute a blank tile and carry on)
//! or fatal to the whole request.

use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigFileError;

/// Errors that can occur while producing a tile.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TileError {
    /// A required option is missing or malformed. Raised before any work starts.
    #[error("validation error: {0}")]
    Validation(String),

    /// Non-success response or transport failure
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    /// The per-request abort timer fired
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    /// The owning task was cancelled
    #[error("task cancelled")]
    Cancelled,

    /// Corrupt, undersized or undecodable payload
    #[error("data error: {0}")]
    Data(String),

    /// Internal invariant violated
    #[error("internal error: {0}")]
    Inner(String),
}

impl TileError {
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Returns true if this error must abort the whole request rather than
    /// being replaced by a blank source tile.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Inner(_))
    }

    /// Stable short name of the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "ValidationError",
            Self::Network { .. } => "NetworkError",
            Self::Timeout { .. } => "TimeoutError",
            Self::Cancelled => "CancelError",
            Self::Data(_) => "DataError",
            Self::Inner(_) => "InnerError",
        }
    }
}

impl From<image::ImageError> for TileError {
    fn from(err: image::ImageError) -> Self {
        TileError::Data(format!("image codec: {}", err))
    }
}

impl From<std::io::Error> for TileError {
    fn from(err: std::io::Error) -> Self {
        TileError::Data(format!("i/o: {}", err))
    }
}

impl From<ConfigFileError> for TileError {
    fn from(err: ConfigFileError) -> Self {
        TileError::Validation(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type TileResult<T> = Result<T, TileError>;
