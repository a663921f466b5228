//! Layer sessions for wx-tiles.
//!
//! A [`LayerSession`] turns data-service tiles into render-ready grids:
//!
//! ```text
//! load_tile(z, x, y)
//!      │
//!      ├─► boundaries ──► Empty(OutOfBoundaries)
//!      ├─► quad-tree ───► Empty(MaskCut)
//!      │
//!      ├─► processed-tile cache ──► Tile (same style and time)
//!      │
//!      ├─► split_coords ──► fetch + decode 1-2 parent tiles (memoized)
//!      ├─► blur ──► resample ──► mask (mixed tiles)
//!      └─► magnitude + streamlines (vectors)
//!               │
//!               ▼
//!          TileBundle
//! ```

pub mod bundle;
pub mod config;
pub mod error;
pub mod session;
pub mod uri;

pub use bundle::{EmptyReason, TileBundle, TileOutcome};
pub use config::PipelineConfig;
pub use error::{Result, TileError};
pub use session::LayerSession;
pub use uri::{expand_template, tile_uri, LayerId};
