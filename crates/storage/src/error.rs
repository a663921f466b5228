//! Load error types.

use thiserror::Error;

/// Why a load did not produce a value.
///
/// Results are shared between every caller of a key, so the error is
/// `Clone` and carries messages rather than source errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("network error: {0}")]
    Network(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The load was aborted. Never cached.
    #[error("load cancelled")]
    Cancelled,

    #[error("decode error: {0}")]
    Decode(String),
}

impl LoadError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LoadError::Cancelled)
    }
}
