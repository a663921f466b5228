//! Tile loading for wx-tiles.
//!
//! Provides:
//! - [`TileFetcher`]: the byte source for tiles, masks and quad-trees
//! - [`Memoized`]: a keyed cache that shares one in-flight load per key
//! - [`AbortableLoader`]: a memoized loader whose in-flight loads can be
//!   cancelled without poisoning the cache

pub mod error;
pub mod fetcher;
pub mod loader;
pub mod memoize;

pub use error::LoadError;
pub use fetcher::{MemoryFetcher, TileFetcher};
pub use loader::AbortableLoader;
pub use memoize::{LoaderStats, Memoized};
