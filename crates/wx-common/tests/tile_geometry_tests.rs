//! Tests for tile splitting and dataset coverage.

use wx_common::bbox::BoundingBox;
use wx_common::dataset::{Boundary, DatasetMeta};
use wx_common::tile::{split_coords, tile_to_latlon_bounds, SubCoord, TileCoord};

// ============================================================================
// split_coords tests
// ============================================================================

#[test]
fn test_split_every_child_of_native_tile() {
    let native = TileCoord::new(3, 5, 2);
    for (i, child) in native.children().iter().enumerate() {
        let split = split_coords(*child, 3);
        assert_eq!(split.parent, native);
        let sub = split.sub.unwrap();
        assert_eq!(sub.z, 1);
        assert_eq!((sub.y << 1) | sub.x, i as u32);
    }
}

#[test]
fn test_split_deep_request() {
    // z=10 request with native zoom 4: 6 levels of over-zoom
    let tile = TileCoord::new(10, 1000, 333);
    let split = split_coords(tile, 4);
    assert_eq!(split.parent, TileCoord::new(4, 1000 >> 6, 333 >> 6));
    assert_eq!(
        split.sub,
        Some(SubCoord {
            z: 6,
            x: 1000 & 63,
            y: 333 & 63,
        })
    );
}

#[test]
fn test_split_reassembles_request() {
    let tile = TileCoord::new(9, 301, 170);
    let split = split_coords(tile, 6);
    let sub = split.sub.unwrap();
    assert_eq!((split.parent.x << sub.z) | sub.x, tile.x);
    assert_eq!((split.parent.y << sub.z) | sub.y, tile.y);
}

// ============================================================================
// Coverage tests
// ============================================================================

#[test]
fn test_sub_tile_bounds_nest_in_parent() {
    let parent = tile_to_latlon_bounds(&TileCoord::new(4, 7, 6));
    for child in TileCoord::new(4, 7, 6).children() {
        let b = tile_to_latlon_bounds(&child);
        assert!(b.min_x >= parent.min_x - 1e-9 && b.max_x <= parent.max_x + 1e-9);
        assert!(b.min_y >= parent.min_y - 1e-9 && b.max_y <= parent.max_y + 1e-9);
    }
}

#[test]
fn test_global_dataset_covers_everything() {
    let meta = DatasetMeta {
        max_zoom: 4,
        variables_meta: Default::default(),
        boundaries: vec![],
        times: vec![],
    };
    assert!(meta.intersects_tile(&TileCoord::new(6, 63, 0)));
}

#[test]
fn test_regional_dataset_excludes_far_tiles() {
    let meta = DatasetMeta {
        max_zoom: 4,
        variables_meta: Default::default(),
        boundaries: vec![Boundary {
            west: 165.0,
            south: -48.0,
            east: 179.0,
            north: -34.0,
        }],
        times: vec![],
    };
    let nz = BoundingBox::new(170.0, -45.0, 175.0, -40.0);
    assert!(BoundingBox::from(meta.boundaries[0]).intersects_lonlat(&nz));
    assert!(!meta.intersects_tile(&TileCoord::new(3, 0, 0)));
    assert!(meta.intersects_tile(&TileCoord::new(3, 7, 5)));
}
