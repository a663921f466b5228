//! Error types for layer sessions.

use grid_processor::GridProcessorError;
use storage::LoadError;
use thiserror::Error;
use wx_common::WxError;

/// Why a tile could not be produced.
///
/// Tiles outside the dataset or cut by the mask are not errors; see
/// [`TileOutcome::Empty`](crate::TileOutcome::Empty).
#[derive(Error, Debug)]
pub enum TileError {
    /// Fetching or decoding a payload failed, or the load was aborted.
    #[error("tile unavailable: {0}")]
    Load(#[from] LoadError),

    #[error("tile processing failed: {0}")]
    Processing(#[from] GridProcessorError),

    #[error("metadata error: {0}")]
    Metadata(#[from] WxError),
}

impl TileError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TileError::Load(e) if e.is_cancelled())
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, TileError>;
