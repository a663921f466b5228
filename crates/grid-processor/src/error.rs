//! Error types for tile processing.

use thiserror::Error;

/// Errors that can occur while processing a tile.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridProcessorError {
    /// The tile payload could not be decoded.
    #[error("failed to decode tile: {0}")]
    DecodeFailure(String),

    /// The land/sea mask or its quad-tree index could not be loaded.
    #[error("failed to load mask: {0}")]
    MaskLoadFailure(String),

    /// Grids or images with mismatched dimensions were combined.
    #[error("invalid tile geometry: {0}")]
    InvalidGeometry(String),
}

impl GridProcessorError {
    /// Create a DecodeFailure error.
    pub fn decode_failure(msg: impl Into<String>) -> Self {
        Self::DecodeFailure(msg.into())
    }

    /// Create a MaskLoadFailure error.
    pub fn mask_load_failure(msg: impl Into<String>) -> Self {
        Self::MaskLoadFailure(msg.into())
    }
}

impl From<image::ImageError> for GridProcessorError {
    fn from(err: image::ImageError) -> Self {
        Self::DecodeFailure(err.to_string())
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
