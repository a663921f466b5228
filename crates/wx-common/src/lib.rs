//! Common types and utilities shared across the wx-tiles crates.

pub mod bbox;
pub mod dataset;
pub mod error;
pub mod registry;
pub mod style;
pub mod tile;
pub mod units;

pub use bbox::BoundingBox;
pub use dataset::{DatasetMeta, VariableMeta};
pub use error::{WxError, WxResult};
pub use registry::Registry;
pub use style::{ColorStyle, StrictStyle};
pub use tile::{split_coords, SplitCoords, SubCoord, TileCoord};
pub use units::{UnitConverter, UnitDef};
