//! Common test fixtures for wx-tiles tests.
//!
//! Registry documents and dataset metadata in the formats the data service
//! publishes them.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

/// Dataset metadata with a scalar temperature, a wind vector, a wave
/// direction and a regional boundary over the North Atlantic.
pub const DATASET_META_JSON: &str = r#"{
    "max_zoom": 3,
    "variables_meta": {
        "air_temperature": { "units": "K", "min": 220.0, "max": 320.0 },
        "wind_u": { "units": "m/s", "min": -40.0, "max": 40.0 },
        "wind_v": { "units": "m/s", "min": -40.0, "max": 40.0 },
        "wind": { "units": "m/s", "min": -40.0, "max": 40.0, "vector": ["wind_u", "wind_v"] },
        "wave_direction": { "units": "degree", "min": 0.0, "max": 360.0 }
    },
    "boundaries": [
        { "west": -80.0, "south": 0.0, "east": 20.0, "north": 70.0 }
    ],
    "times": ["2024-01-01T00:00:00Z", "2024-01-01T03:00:00Z"]
}"#;

/// A registry with a small style inheritance chain.
pub const REGISTRY_JSON: &str = r##"{
    "styles": {
        "temperature": {
            "color_scheme": "thermal",
            "units": "C",
            "levels": [-20.0, -10.0, 0.0, 10.0, 20.0, 30.0]
        },
        "temperature_smooth": {
            "parent": "temperature",
            "blur_radius": 2,
            "isolines": "#000000"
        },
        "wind_knots": {
            "units": "knots",
            "streamlines": "inverted",
            "stream_line_grid_step": 32,
            "stream_line_steps": 100
        },
        "sea_only": {
            "parent": "temperature",
            "mask": "land"
        }
    },
    "color_schemes": {
        "mono": ["#000000", "#ffffff"]
    },
    "units": {
        "beaufort_step": { "base": "m/s", "scale": 3.0 }
    }
}"##;

/// Writes `contents` to `name` in a fresh temporary directory.
///
/// The directory lives as long as the returned guard.
pub fn write_temp_file(name: &str, contents: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write temp file");
    (dir, path)
}
