//! Lon/lat boxes for dataset coverage checks.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in degrees (x = longitude, y = latitude).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Check if this bbox intersects another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Split a longitude range that crosses the antimeridian (`min_x > max_x`)
    /// into its two halves. Ranges that do not cross are returned as-is.
    pub fn split_antimeridian(&self) -> Vec<BoundingBox> {
        if self.min_x <= self.max_x {
            return vec![*self];
        }
        vec![
            BoundingBox::new(self.min_x, self.min_y, 180.0, self.max_y),
            BoundingBox::new(-180.0, self.min_y, self.max_x, self.max_y),
        ]
    }

    /// Intersection test in lon/lat space that understands boxes crossing
    /// the antimeridian on either side.
    pub fn intersects_lonlat(&self, other: &BoundingBox) -> bool {
        self.split_antimeridian().iter().any(|a| {
            other
                .split_antimeridian()
                .iter()
                .any(|b| a.intersects(b))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touching_edges_do_not_intersect() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let overlapping = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        let touching = BoundingBox::new(10.0, 0.0, 20.0, 10.0);

        assert!(a.intersects(&overlapping));
        assert!(!a.intersects(&touching));
    }

    #[test]
    fn test_antimeridian_split() {
        let pacific = BoundingBox::new(160.0, -50.0, -140.0, 50.0);
        let parts = pacific.split_antimeridian();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].max_x, 180.0);
        assert_eq!(parts[1].min_x, -180.0);

        let fiji = BoundingBox::new(175.0, -20.0, 179.0, -15.0);
        let hawaii = BoundingBox::new(-160.0, 18.0, -154.0, 23.0);
        let europe = BoundingBox::new(-15.0, 35.0, 45.0, 72.0);
        assert!(pacific.intersects_lonlat(&fiji));
        assert!(pacific.intersects_lonlat(&hawaii));
        assert!(!pacific.intersects_lonlat(&europe));
    }
}
