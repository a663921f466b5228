//! Per-tile results handed to the renderer.

use std::sync::Arc;

use grid_processor::{RasterGrid, StreamlinePath};
use wx_common::TileCoord;

/// A decoded and processed tile.
#[derive(Debug, Clone)]
pub struct TileBundle {
    pub coord: TileCoord,
    /// One grid for scalar variables; magnitude, u and v for vectors.
    pub grids: Vec<RasterGrid>,
    /// Empty unless the style asks for streamlines on a vector variable.
    pub streamlines: Vec<StreamlinePath>,
}

impl TileBundle {
    pub fn is_vector(&self) -> bool {
        self.grids.len() == 3
    }

    /// The grid colored by the color table: the data or the magnitude.
    pub fn primary(&self) -> Option<&RasterGrid> {
        self.grids.first()
    }
}

/// Why a request produced no tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// The tile lies outside every dataset boundary.
    OutOfBoundaries,
    /// The active mask hides the whole tile.
    MaskCut,
}

/// Result of a successful tile request.
///
/// Bundles are shared with the session's processed-tile cache.
#[derive(Debug, Clone)]
pub enum TileOutcome {
    Tile(Arc<TileBundle>),
    Empty(EmptyReason),
}

impl TileOutcome {
    pub fn bundle(&self) -> Option<&TileBundle> {
        match self {
            TileOutcome::Tile(bundle) => Some(bundle),
            TileOutcome::Empty(_) => None,
        }
    }

    pub fn into_bundle(self) -> Option<Arc<TileBundle>> {
        match self {
            TileOutcome::Tile(bundle) => Some(bundle),
            TileOutcome::Empty(_) => None,
        }
    }

    pub fn empty_reason(&self) -> Option<EmptyReason> {
        match self {
            TileOutcome::Tile(_) => None,
            TileOutcome::Empty(reason) => Some(*reason),
        }
    }
}
