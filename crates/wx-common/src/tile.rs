//! Slippy-map tile coordinates and parent/sub-tile geometry.
//!
//! Data tiles are only produced down to a dataset's native max zoom. Deeper
//! requests are served from the covering native tile: [`split_coords`]
//! returns that parent plus a [`SubCoord`] locating the request inside it.

use crate::BoundingBox;
use serde::{Deserialize, Serialize};

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u32,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Get the parent tile (zoom - 1).
    pub fn parent(&self) -> Option<TileCoord> {
        if self.z == 0 {
            return None;
        }
        Some(TileCoord {
            z: self.z - 1,
            x: self.x / 2,
            y: self.y / 2,
        })
    }

    /// Get the four children tiles (zoom + 1), in quad-tree child order.
    pub fn children(&self) -> [TileCoord; 4] {
        let x = self.x * 2;
        let y = self.y * 2;
        let z = self.z + 1;
        [
            TileCoord { z, x, y },
            TileCoord { z, x: x + 1, y },
            TileCoord { z, x, y: y + 1 },
            TileCoord {
                z,
                x: x + 1,
                y: y + 1,
            },
        ]
    }

    /// Ancestor of this tile at zoom `z` (`z <= self.z`).
    pub fn ancestor(&self, z: u32) -> TileCoord {
        let shift = self.z.saturating_sub(z);
        TileCoord {
            z: self.z - shift,
            x: self.x.checked_shr(shift).unwrap_or(0),
            y: self.y.checked_shr(shift).unwrap_or(0),
        }
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Position of an over-zoomed request inside its native parent tile.
///
/// `z` is the zoom difference; `x` and `y` index one of the `2^z × 2^z`
/// sub-squares of the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubCoord {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

impl SubCoord {
    /// Number of sub-squares along one side of the parent tile.
    pub fn divisions(&self) -> f64 {
        2f64.powi(self.z.min(i32::MAX as u32) as i32)
    }
}

/// Result of [`split_coords`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitCoords {
    /// Tile to fetch from the data service.
    pub parent: TileCoord,
    /// Where the request sits inside `parent`; `None` when no split was needed.
    pub sub: Option<SubCoord>,
}

/// Map a requested tile onto the tile that actually holds its data.
pub fn split_coords(tile: TileCoord, native_max_zoom: u32) -> SplitCoords {
    if tile.z <= native_max_zoom {
        return SplitCoords {
            parent: tile,
            sub: None,
        };
    }
    let dz = tile.z - native_max_zoom;
    let mask = 1u32.checked_shl(dz).map_or(u32::MAX, |bit| bit - 1);
    SplitCoords {
        parent: tile.ancestor(native_max_zoom),
        sub: Some(SubCoord {
            z: dz,
            x: tile.x & mask,
            y: tile.y & mask,
        }),
    }
}

/// Convert Web Mercator tile coordinates to lat/lon bounds.
pub fn tile_to_latlon_bounds(coord: &TileCoord) -> BoundingBox {
    let n = 2f64.powi(coord.z as i32);

    let lon_min = coord.x as f64 / n * 360.0 - 180.0;
    let lon_max = (coord.x + 1) as f64 / n * 360.0 - 180.0;

    let lat_max = (std::f64::consts::PI * (1.0 - 2.0 * coord.y as f64 / n))
        .sinh()
        .atan()
        .to_degrees();
    let lat_min = (std::f64::consts::PI * (1.0 - 2.0 * (coord.y + 1) as f64 / n))
        .sinh()
        .atan()
        .to_degrees();

    BoundingBox::new(lon_min, lat_min, lon_max, lat_max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_split_at_or_below_native_zoom() {
        let tile = TileCoord::new(5, 10, 12);
        let split = split_coords(tile, 5);
        assert_eq!(split.parent, tile);
        assert!(split.sub.is_none());
    }

    #[test]
    fn test_split_two_levels_deeper() {
        // z=7 tile (45, 22) sits in the z=5 tile (11, 5)
        let split = split_coords(TileCoord::new(7, 45, 22), 5);
        assert_eq!(split.parent, TileCoord::new(5, 11, 5));
        assert_eq!(split.sub, Some(SubCoord { z: 2, x: 1, y: 2 }));
        assert_eq!(split.sub.unwrap().divisions(), 4.0);
    }

    #[test]
    fn test_split_beyond_u32_shift() {
        let split = split_coords(TileCoord::new(40, 5, 7), 3);
        assert_eq!(split.parent, TileCoord::new(3, 0, 0));
        assert_eq!(split.sub, Some(SubCoord { z: 37, x: 5, y: 7 }));
        assert_eq!(split.sub.unwrap().divisions(), 2f64.powi(37));
    }

    #[test]
    fn test_children_order() {
        let children = TileCoord::new(1, 1, 0).children();
        assert_eq!(children[0], TileCoord::new(2, 2, 0));
        assert_eq!(children[1], TileCoord::new(2, 3, 0));
        assert_eq!(children[2], TileCoord::new(2, 2, 1));
        assert_eq!(children[3], TileCoord::new(2, 3, 1));
        for child in children {
            assert_eq!(child.parent(), Some(TileCoord::new(1, 1, 0)));
        }
    }

    #[test]
    fn test_world_tile_bounds() {
        let bounds = tile_to_latlon_bounds(&TileCoord::new(0, 0, 0));
        assert!((bounds.min_x + 180.0).abs() < 1e-9);
        assert!((bounds.max_x - 180.0).abs() < 1e-9);
        assert!((bounds.max_y - 85.0511).abs() < 1e-3);
    }
}
