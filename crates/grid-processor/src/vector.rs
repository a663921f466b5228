//! Vector fields built from u/v component grids.

use crate::error::{GridProcessorError, Result};
use crate::raster::{RasterGrid, MAX_RAW, NO_DATA};

/// Headroom applied to the component range to bound the magnitude range.
///
/// `sqrt(2)` rounded up: `|(u, v)| <= sqrt(2) * max(|u|, |v|)`.
pub const MAGNITUDE_HEADROOM: f64 = 1.42;

/// Magnitude and components of a vector field.
#[derive(Debug, Clone)]
pub struct VectorSample {
    /// Length of `(u, v)`, raw 0 where either component is missing.
    pub magnitude: RasterGrid,
    pub u: RasterGrid,
    pub v: RasterGrid,
}

impl VectorSample {
    /// Build the magnitude grid for a pair of component grids.
    pub fn new(u: RasterGrid, v: RasterGrid) -> Result<Self> {
        let magnitude = magnitude(&u, &v)?;
        Ok(Self { magnitude, u, v })
    }

    /// Components and magnitude at a grid index, `None` when missing.
    #[inline]
    pub fn at(&self, index: usize) -> Option<(f64, f64, f64)> {
        let l = self.magnitude.decode(self.magnitude.raw[index])?;
        let u = self.u.decode(self.u.raw[index])?;
        let v = self.v.decode(self.v.raw[index])?;
        Some((u, v, l))
    }
}

/// Per-pixel vector length of two component grids.
///
/// The result ranges over `[0, 1.42 * max(|u|, |v|)]` of the component
/// ranges. Pixels where either component is missing are missing.
pub fn magnitude(u: &RasterGrid, v: &RasterGrid) -> Result<RasterGrid> {
    if u.raw.len() != v.raw.len() {
        return Err(GridProcessorError::InvalidGeometry(format!(
            "component grids differ in size: {} vs {}",
            u.raw.len(),
            v.raw.len()
        )));
    }

    let bound = (-u.data_min)
        .max(u.data_max)
        .max(-v.data_min)
        .max(v.data_max);
    let mut out = RasterGrid::empty(0.0, MAGNITUDE_HEADROOM * bound);

    for (i, (&ru, &rv)) in u.raw.iter().zip(v.raw.iter()).enumerate() {
        if ru == NO_DATA || rv == NO_DATA {
            continue;
        }
        let uu = u.data_min + ru as f64 * u.data_scale;
        let vv = v.data_min + rv as f64 * v.data_scale;
        let length = uu.hypot(vv);
        out.raw[i] = if out.data_scale > 0.0 {
            (length / out.data_scale).round().clamp(1.0, MAX_RAW as f64) as u16
        } else {
            1
        };
    }

    Ok(out)
}
