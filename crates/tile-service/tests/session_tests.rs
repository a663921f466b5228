//! End-to-end tests for layer sessions over an in-memory data service.

use std::sync::Arc;
use std::time::Duration;

use grid_processor::{QTree, NO_DATA};
use storage::{LoadError, MemoryFetcher, TileFetcher};
use test_utils::{
    assert_approx_eq, create_constant_raw, create_value_grid, encode_mask_png, encode_tile_png,
    DATASET_META_JSON, REGISTRY_JSON,
};
use tile_service::{
    tile_uri, EmptyReason, LayerId, LayerSession, PipelineConfig, TileBundle, TileError,
    TileOutcome,
};
use wx_common::{ColorStyle, DatasetMeta, Registry, TileCoord};

const BASE: &str = "mem://data";
const T0: &str = "2024-01-01T00:00:00Z";
const T1: &str = "2024-01-01T03:00:00Z";

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn layer(variable: &str) -> LayerId {
    LayerId::new("gfs", "run1", variable)
}

fn config() -> PipelineConfig {
    PipelineConfig {
        data_base_url: BASE.to_string(),
        ..Default::default()
    }
}

fn meta() -> DatasetMeta {
    DatasetMeta::from_json(DATASET_META_JSON).unwrap()
}

fn global_meta() -> DatasetMeta {
    let mut meta = meta();
    meta.boundaries.clear();
    meta
}

fn registry() -> Arc<Registry> {
    Arc::new(Registry::from_json(REGISTRY_JSON).unwrap())
}

fn named(style: &str) -> ColorStyle {
    ColorStyle {
        parent: Some(style.to_string()),
        ..Default::default()
    }
}

fn put_tile(
    fetcher: &MemoryFetcher,
    variable: &str,
    time: &str,
    coord: TileCoord,
    raw: &[u16],
    range: (f32, f32),
) {
    fetcher.insert(
        tile_uri(BASE, &layer(variable), variable, time, coord),
        encode_tile_png(raw, range.0, range.1),
    );
}

fn session(
    fetcher: &Arc<MemoryFetcher>,
    config: PipelineConfig,
    meta: DatasetMeta,
    variable: &str,
    style: &str,
) -> LayerSession {
    init_tracing();
    LayerSession::new(
        config,
        registry(),
        Arc::new(meta),
        Arc::clone(fetcher) as Arc<dyn TileFetcher>,
        layer(variable),
        &named(style),
        None,
    )
    .unwrap()
}

fn bundle(outcome: TileOutcome) -> Arc<TileBundle> {
    outcome.into_bundle().expect("expected a tile")
}

// ============================================================================
// Scalar tiles
// ============================================================================

#[tokio::test]
async fn test_scalar_tile_is_decoded_and_memoized() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let coord = TileCoord::new(2, 1, 1);
    let raw = create_value_grid(220.0, 320.0, |x, _| Some(250.0 + x as f64 / 10.0));
    put_tile(&fetcher, "air_temperature", T1, coord, &raw, (220.0, 320.0));

    let session = session(&fetcher, config(), meta(), "air_temperature", "temperature");
    let first = bundle(session.load_tile(coord).await.unwrap());
    let second = bundle(session.load_tile(coord).await.unwrap());

    assert_eq!(first.grids.len(), 1);
    assert!(first.streamlines.is_empty());
    assert_eq!(first.grids[0].raw, raw);
    assert_eq!(second.grids[0].raw, raw);
    assert_eq!(fetcher.fetch_count(), 1);
}

#[tokio::test]
async fn test_tile_outside_boundaries_is_empty() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let session = session(&fetcher, config(), meta(), "air_temperature", "temperature");

    let outcome = session.load_tile(TileCoord::new(2, 3, 3)).await.unwrap();

    assert_eq!(outcome.empty_reason(), Some(EmptyReason::OutOfBoundaries));
    assert_eq!(fetcher.fetch_count(), 0);
}

#[tokio::test]
async fn test_overzoomed_tile_resamples_parent() {
    let fetcher = Arc::new(MemoryFetcher::new());
    put_tile(
        &fetcher,
        "air_temperature",
        T1,
        TileCoord::new(3, 3, 2),
        &create_constant_raw(30000),
        (220.0, 320.0),
    );
    let session = session(&fetcher, config(), meta(), "air_temperature", "temperature");

    let tile = bundle(session.load_tile(TileCoord::new(5, 12, 8)).await.unwrap());

    assert!(tile.grids[0].raw.iter().all(|&r| r == 30000));
    assert_eq!(fetcher.fetch_count(), 1);
}

#[tokio::test]
async fn test_blur_radius_from_style_is_applied() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let coord = TileCoord::new(2, 1, 1);
    let raw = create_value_grid(220.0, 320.0, |x, y| {
        Some(if (x + y) % 2 == 0 { 260.0 } else { 280.0 })
    });
    put_tile(&fetcher, "air_temperature", T1, coord, &raw, (220.0, 320.0));

    let session = session(&fetcher, config(), meta(), "air_temperature", "temperature_smooth");
    let tile = bundle(session.load_tile(coord).await.unwrap());

    // A checkerboard averages out towards the middle value.
    let value = tile.grids[0].value_at(100, 100).unwrap();
    assert_approx_eq!(value, 270.0, 1.0);
}

#[tokio::test]
async fn test_decode_failure_is_a_typed_error() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let coord = TileCoord::new(2, 1, 1);
    fetcher.insert(
        tile_uri(BASE, &layer("air_temperature"), "air_temperature", T1, coord),
        &b"not a png"[..],
    );
    let session = session(&fetcher, config(), meta(), "air_temperature", "temperature");

    let result = session.load_tile(coord).await;
    assert!(matches!(result, Err(TileError::Load(LoadError::Decode(_)))));
}

// ============================================================================
// Batch loading
// ============================================================================

#[tokio::test]
async fn test_batch_settles_each_tile_independently() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let good = TileCoord::new(2, 1, 1);
    let missing = TileCoord::new(2, 2, 1);
    let outside = TileCoord::new(2, 3, 3);
    put_tile(&fetcher, "air_temperature", T1, good, &create_constant_raw(100), (220.0, 320.0));
    let session = session(&fetcher, config(), meta(), "air_temperature", "temperature");

    let results = session.load_tiles(&[good, missing, outside]).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, good);
    assert!(results[0].1.as_ref().unwrap().bundle().is_some());
    assert!(matches!(
        results[1].1,
        Err(TileError::Load(LoadError::NotFound(_)))
    ));
    assert_eq!(
        results[2].1.as_ref().unwrap().empty_reason(),
        Some(EmptyReason::OutOfBoundaries)
    );
}

// ============================================================================
// Vector tiles
// ============================================================================

#[tokio::test]
async fn test_vector_tile_has_magnitude_and_streamlines() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let coord = TileCoord::new(2, 1, 1);
    let u = create_value_grid(-40.0, 40.0, |_, _| Some(10.0));
    let v = create_value_grid(-40.0, 40.0, |_, _| Some(0.0));
    put_tile(&fetcher, "wind_u", T1, coord, &u, (-40.0, 40.0));
    put_tile(&fetcher, "wind_v", T1, coord, &v, (-40.0, 40.0));

    let session = session(&fetcher, config(), meta(), "wind", "wind_knots");
    let tile = bundle(session.load_tile(coord).await.unwrap());

    assert!(tile.is_vector());
    assert_eq!(tile.grids.len(), 3);
    assert_eq!(fetcher.fetch_count(), 2);
    // Seeds every 32 pixels.
    assert_eq!(tile.streamlines.len(), 64);

    let clut = session.clut().await;
    assert_eq!(clut.units, "knots");
    let magnitude = tile.primary().unwrap();
    assert_approx_eq!(magnitude.data_max, clut.data_max, 1e-6);
    let knots = clut.in_style_units(magnitude.raw_at(128, 128)).unwrap();
    assert_approx_eq!(knots, 19.4384, 0.01);
}

#[tokio::test]
async fn test_repeated_loads_share_processed_tile() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let coord = TileCoord::new(2, 1, 1);
    let u = create_value_grid(-40.0, 40.0, |_, _| Some(10.0));
    let v = create_value_grid(-40.0, 40.0, |_, _| Some(5.0));
    put_tile(&fetcher, "wind_u", T1, coord, &u, (-40.0, 40.0));
    put_tile(&fetcher, "wind_v", T1, coord, &v, (-40.0, 40.0));

    let session = session(&fetcher, config(), meta(), "wind", "wind_knots");
    let first = bundle(session.load_tile(coord).await.unwrap());
    let second = bundle(session.load_tile(coord).await.unwrap());
    assert!(Arc::ptr_eq(&first, &second));

    // A style change rebuilds the bundle from the memoized grids.
    session.set_style_named("wind_knots").await.unwrap();
    let restyled = bundle(session.load_tile(coord).await.unwrap());
    assert!(!Arc::ptr_eq(&first, &restyled));
    assert_eq!(restyled.streamlines.len(), first.streamlines.len());
    assert_eq!(fetcher.fetch_count(), 2);
}

// ============================================================================
// Masking
// ============================================================================

fn mask_config() -> PipelineConfig {
    PipelineConfig {
        qtree_url: Some("mem://mask/qtree.txt".to_string()),
        mask_url: Some("mem://mask/{z}/{x}/{y}.png".to_string()),
        mask_depth: 0,
        ..config()
    }
}

fn put_mask(fetcher: &MemoryFetcher) {
    // Sea on the western half of the world at zoom 2.
    let tree = QTree::from_leaves(2, |t| t.x < 2);
    fetcher.insert("mem://mask/qtree.txt", tree.encode().into_bytes());
    fetcher.insert("mem://mask/0/0/0.png", encode_mask_png(0, |x, _| x < 128));
}

#[tokio::test]
async fn test_land_tile_is_cut_by_mask() {
    let fetcher = Arc::new(MemoryFetcher::new());
    put_mask(&fetcher);
    let session = session(&fetcher, mask_config(), global_meta(), "air_temperature", "sea_only");

    let outcome = session.load_tile(TileCoord::new(2, 3, 0)).await.unwrap();
    assert_eq!(outcome.empty_reason(), Some(EmptyReason::MaskCut));
}

#[tokio::test]
async fn test_sea_tile_is_not_masked() {
    let fetcher = Arc::new(MemoryFetcher::new());
    put_mask(&fetcher);
    let coord = TileCoord::new(2, 0, 1);
    put_tile(&fetcher, "air_temperature", T1, coord, &create_constant_raw(700), (220.0, 320.0));
    let session = session(&fetcher, mask_config(), global_meta(), "air_temperature", "sea_only");

    let tile = bundle(session.load_tile(coord).await.unwrap());
    assert!(tile.grids[0].raw.iter().all(|&r| r == 700));
}

#[tokio::test]
async fn test_mixed_tile_gets_pixel_mask() {
    let fetcher = Arc::new(MemoryFetcher::new());
    put_mask(&fetcher);
    let coord = TileCoord::new(0, 0, 0);
    put_tile(&fetcher, "air_temperature", T1, coord, &create_constant_raw(700), (220.0, 320.0));
    let session = session(&fetcher, mask_config(), global_meta(), "air_temperature", "sea_only");

    let tile = bundle(session.load_tile(coord).await.unwrap());
    let grid = &tile.grids[0];
    assert_eq!(grid.raw_at(20, 100), 700);
    assert_eq!(grid.raw_at(200, 100), NO_DATA);
    assert!(session.masking_enabled());
}

#[tokio::test]
async fn test_missing_quad_tree_disables_masking() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let coord = TileCoord::new(2, 3, 0);
    put_tile(&fetcher, "air_temperature", T1, coord, &create_constant_raw(700), (220.0, 320.0));
    let session = session(&fetcher, mask_config(), global_meta(), "air_temperature", "sea_only");

    let outcome = session.load_tile(coord).await.unwrap();

    assert!(outcome.bundle().is_some());
    assert!(!session.masking_enabled());
}

// ============================================================================
// Session state
// ============================================================================

#[tokio::test]
async fn test_set_time_switches_tiles() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let coord = TileCoord::new(2, 1, 1);
    put_tile(&fetcher, "air_temperature", T0, coord, &create_constant_raw(100), (220.0, 320.0));
    put_tile(&fetcher, "air_temperature", T1, coord, &create_constant_raw(200), (220.0, 320.0));
    let session = session(&fetcher, config(), meta(), "air_temperature", "temperature");

    assert_eq!(session.time().await, T1);
    let later = bundle(session.load_tile(coord).await.unwrap());
    session.set_time(T0).await.unwrap();
    let earlier = bundle(session.load_tile(coord).await.unwrap());

    assert_eq!(later.grids[0].raw_at(5, 5), 200);
    assert_eq!(earlier.grids[0].raw_at(5, 5), 100);
    assert!(session.set_time("1999-01-01T00:00:00Z").await.is_err());
}

#[tokio::test]
async fn test_set_style_rebuilds_color_table() {
    let fetcher = Arc::new(MemoryFetcher::new());
    let session = session(&fetcher, config(), meta(), "air_temperature", "temperature");
    assert_eq!(session.clut().await.units, "C");

    // Knots cannot display temperatures: the table falls back to data units.
    session.set_style_named("wind_knots").await.unwrap();
    assert_eq!(session.clut().await.units, "K");
    assert_eq!(session.style().await.name, "wind_knots");

    let legend = session.legend(128).await;
    assert_eq!(legend.colors.len(), 128);
}

#[tokio::test]
async fn test_abort_cancels_and_allows_retry() {
    let fetcher = Arc::new(MemoryFetcher::new().with_latency(Duration::from_millis(200)));
    let coord = TileCoord::new(2, 1, 1);
    put_tile(&fetcher, "air_temperature", T1, coord, &create_constant_raw(300), (220.0, 320.0));
    let session = Arc::new(session(&fetcher, config(), meta(), "air_temperature", "temperature"));

    let in_flight = {
        let session = Arc::clone(&session);
        tokio::spawn(async move { session.load_tile(coord).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    session.abort().await;

    let aborted = in_flight.await.unwrap();
    assert!(matches!(&aborted, Err(e) if e.is_cancelled()));

    let retried = bundle(session.load_tile(coord).await.unwrap());
    assert_eq!(retried.grids[0].raw_at(1, 1), 300);
    assert_eq!(fetcher.fetch_count(), 2);
}
