//! Tile processing for weather and ocean raster tiles.
//!
//! Tiles travel as 258x258 RGBA PNG images holding 16-bit samples and a
//! value range. This crate turns them into grids ready for rendering:
//!
//! ```text
//! PNG bytes
//!      │
//!      ▼
//! codec::decode ──► IntegralGrid (samples + summed-area tables)
//!      │
//!      ├─► IntegralGrid::blur(radius)        box blur, no-data aware
//!      │
//!      ├─► resample / resample_degree        sub-tiles of a parent tile
//!      │
//!      ├─► mask::apply_mask                  land/sea cut
//!      │
//!      └─► vector::magnitude                 u/v ──► |(u, v)|
//!               │
//!               ▼
//!          streamline::trace_streamlines
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{decode, resample, VectorSample, trace_streamlines};
//!
//! let mut u = decode(&u_png)?;
//! u.blur(2);
//! let u = resample(u.into_raster(), split.sub);
//! ```

pub mod codec;
pub mod error;
pub mod mask;
pub mod raster;
pub mod resample;
pub mod streamline;
pub mod vector;

// Re-export commonly used types at crate root
pub use codec::{decode, decode_pixels, decode_rgba, PixelBuffer};
pub use error::{GridProcessorError, Result};
pub use mask::{apply_mask, MaskImage, QTree, TileClass, SEA_THRESHOLD};
pub use raster::{IntegralGrid, RasterGrid, DATA_SIZE, GRID_SIZE, NO_DATA};
pub use resample::{blend_degrees, resample, resample_angle, resample_degree};
pub use streamline::{trace_streamlines, StreamPoint, StreamlineParams, StreamlinePath};
pub use vector::{magnitude, VectorSample, MAGNITUDE_HEADROOM};
