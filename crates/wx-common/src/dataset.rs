//! Dataset and variable metadata published by the data service.

use crate::tile::{tile_to_latlon_bounds, TileCoord};
use crate::{BoundingBox, WxError, WxResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata for one variable of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableMeta {
    /// Units of the decoded samples (e.g. "m/s", "K")
    pub units: String,

    /// Minimum physical value across the dataset instance
    pub min: f64,

    /// Maximum physical value across the dataset instance
    pub max: f64,

    /// For vector variables: names of the `[u, v]` component variables
    #[serde(default)]
    pub vector: Option<[String; 2]>,
}

/// A lon/lat rectangle covered by the dataset. `west > east` crosses the
/// antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl From<Boundary> for BoundingBox {
    fn from(b: Boundary) -> Self {
        BoundingBox::new(b.west, b.south, b.east, b.north)
    }
}

/// Metadata for one dataset instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMeta {
    /// Deepest zoom level tiles are produced for
    pub max_zoom: u32,

    /// Variables keyed by name
    pub variables_meta: HashMap<String, VariableMeta>,

    /// Covered areas; empty means global coverage
    #[serde(default)]
    pub boundaries: Vec<Boundary>,

    /// Available time steps, as the data service names them
    #[serde(default)]
    pub times: Vec<String>,
}

impl DatasetMeta {
    /// Parse dataset metadata from JSON.
    pub fn from_json(json: &str) -> WxResult<Self> {
        let meta: DatasetMeta = serde_json::from_str(json)?;
        meta.validate()?;
        Ok(meta)
    }

    /// Check that every vector variable names components that exist.
    pub fn validate(&self) -> WxResult<()> {
        for (name, var) in &self.variables_meta {
            if var.max < var.min {
                return Err(WxError::InvalidMetadata(format!(
                    "{}: max {} < min {}",
                    name, var.max, var.min
                )));
            }
            if let Some(components) = &var.vector {
                for component in components {
                    if !self.variables_meta.contains_key(component) {
                        return Err(WxError::InvalidMetadata(format!(
                            "{}: vector component '{}' missing",
                            name, component
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn variable(&self, name: &str) -> WxResult<&VariableMeta> {
        self.variables_meta
            .get(name)
            .ok_or_else(|| WxError::VariableNotFound(name.to_string()))
    }

    /// Variables to fetch for `name`: the two components of a vector, or
    /// the variable itself.
    pub fn components(&self, name: &str) -> WxResult<Vec<String>> {
        let var = self.variable(name)?;
        Ok(match &var.vector {
            Some([u, v]) => vec![u.clone(), v.clone()],
            None => vec![name.to_string()],
        })
    }

    /// Physical range and units used to build a color table for `name`.
    ///
    /// For vectors this is the union of the component ranges.
    pub fn data_range(&self, name: &str) -> WxResult<(String, f64, f64)> {
        let var = self.variable(name)?;
        match &var.vector {
            Some([u, v]) => {
                let u = self.variable(u)?;
                let v = self.variable(v)?;
                Ok((u.units.clone(), u.min.min(v.min), u.max.max(v.max)))
            }
            None => Ok((var.units.clone(), var.min, var.max)),
        }
    }

    pub fn is_vector(&self, name: &str) -> bool {
        self.variables_meta
            .get(name)
            .map(|v| v.vector.is_some())
            .unwrap_or(false)
    }

    /// Whether a tile overlaps any dataset boundary.
    pub fn intersects_tile(&self, coord: &TileCoord) -> bool {
        if self.boundaries.is_empty() {
            return true;
        }
        let tile = tile_to_latlon_bounds(coord);
        self.boundaries
            .iter()
            .any(|b| BoundingBox::from(*b).intersects_lonlat(&tile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const META: &str = r#"{
        "max_zoom": 5,
        "variables_meta": {
            "wind.u": {"units": "m/s", "min": -30, "max": 25},
            "wind.v": {"units": "m/s", "min": -20, "max": 35},
            "wind": {"units": "m/s", "min": 0, "max": 40, "vector": ["wind.u", "wind.v"]},
            "air.temperature": {"units": "K", "min": 220, "max": 320}
        },
        "boundaries": [{"west": 160, "south": -50, "east": -170, "north": -30}],
        "times": ["2026-10-19T00:00:00Z"]
    }"#;

    #[test]
    fn test_parse_and_components() {
        let meta = DatasetMeta::from_json(META).unwrap();
        assert!(meta.is_vector("wind"));
        assert_eq!(meta.components("wind").unwrap(), vec!["wind.u", "wind.v"]);
        assert_eq!(
            meta.components("air.temperature").unwrap(),
            vec!["air.temperature"]
        );
        assert!(matches!(
            meta.variable("nope"),
            Err(WxError::VariableNotFound(_))
        ));
    }

    #[test]
    fn test_vector_data_range() {
        let meta = DatasetMeta::from_json(META).unwrap();
        let (units, min, max) = meta.data_range("wind").unwrap();
        assert_eq!(units, "m/s");
        assert_eq!(min, -30.0);
        assert_eq!(max, 35.0);
    }

    #[test]
    fn test_boundaries() {
        let meta = DatasetMeta::from_json(META).unwrap();
        // z=2 tile covering the south-west Pacific near New Zealand
        assert!(meta.intersects_tile(&TileCoord::new(2, 3, 2)));
        // z=2 tile over Europe
        assert!(!meta.intersects_tile(&TileCoord::new(2, 2, 1)));
    }

    #[test]
    fn test_missing_component_rejected() {
        let json = r#"{"max_zoom": 3, "variables_meta": {
            "current": {"units": "m/s", "min": 0, "max": 2, "vector": ["cu", "cv"]}
        }}"#;
        assert!(DatasetMeta::from_json(json).is_err());
    }
}
