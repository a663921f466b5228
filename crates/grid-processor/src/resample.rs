//! Parent tile resampling.
//!
//! When a request is deeper than the dataset's native zoom, the parent tile
//! is cut into `2^z x 2^z` sub-tiles and the requested one is resampled back
//! to a full 258x258 grid with no-data aware bilinear interpolation.

use wx_common::SubCoord;

use crate::raster::{RasterGrid, DATA_SIZE, GRID_SIZE, NO_DATA};

/// Step just under one source pixel per `2^z` output pixels, so the last
/// output pixel never reads past the parent grid.
const STEP_NUMERATOR: f64 = 0.9999999;

/// How corner values are combined.
trait Blend {
    fn mix(a: f64, b: f64, t: f64) -> f64;
    fn average(a: f64, b: f64) -> f64 {
        Self::mix(a, b, 0.5)
    }
}

/// Plain linear interpolation.
struct Linear;

impl Blend for Linear {
    #[inline]
    fn mix(a: f64, b: f64, t: f64) -> f64 {
        a + (b - a) * t
    }
}

/// Interpolation along the shortest arc of the circle, in degrees.
struct Circular;

impl Blend for Circular {
    #[inline]
    fn mix(a: f64, b: f64, t: f64) -> f64 {
        blend_degrees(a, b, t)
    }
}

/// Blend two angles in degrees along the shortest arc, result in `[0, 360)`.
pub fn blend_degrees(start: f64, end: f64, t: f64) -> f64 {
    let delta = ((end - start) % 360.0 + 540.0) % 360.0 - 180.0;
    (start + delta * t).rem_euclid(360.0)
}

/// Resample the `sub` rectangle of a parent grid to a full grid.
///
/// With no sub-tile the grid is returned unchanged.
pub fn resample(grid: RasterGrid, sub: Option<SubCoord>) -> RasterGrid {
    match sub {
        None => grid,
        Some(sub) => resample_with::<Linear>(&grid, sub, |raw| raw as f64, |v| {
            v.round().clamp(1.0, u16::MAX as f64) as u16
        }),
    }
}

/// Resample a grid holding angles in degrees.
///
/// Samples are decoded to degrees, blended circularly so that 359 and 1
/// meet at 0 rather than 180, and re-encoded.
pub fn resample_degree(grid: RasterGrid, sub: Option<SubCoord>) -> RasterGrid {
    resample_angle(grid, sub, 1.0)
}

/// Resample a grid of angles measured in units of `degrees_per_unit`
/// degrees (1 for degrees, `180/pi` for radians).
///
/// Blended angles are brought back into `[data_min, data_min + turn)`, so
/// signed ranges such as `[-180, 180]` keep their sign.
pub fn resample_angle(grid: RasterGrid, sub: Option<SubCoord>, degrees_per_unit: f64) -> RasterGrid {
    let Some(sub) = sub else {
        return grid;
    };
    let (min, scale) = (grid.data_min, grid.data_scale);
    let turn = 360.0 / degrees_per_unit;
    resample_with::<Circular>(
        &grid,
        sub,
        |raw| (min + raw as f64 * scale) * degrees_per_unit,
        |deg| {
            if scale == 0.0 {
                return 1;
            }
            let value = min + (deg / degrees_per_unit - min).rem_euclid(turn);
            ((value - min) / scale).round().clamp(1.0, u16::MAX as f64) as u16
        },
    )
}

fn resample_with<B: Blend>(
    grid: &RasterGrid,
    sub: SubCoord,
    to_value: impl Fn(u16) -> f64,
    to_raw: impl Fn(f64) -> u16,
) -> RasterGrid {
    let divisions = sub.divisions();
    let step = STEP_NUMERATOR / divisions;
    let origin_x = sub.x as f64 * DATA_SIZE as f64 / divisions + 1.0 - step;
    let origin_y = sub.y as f64 * DATA_SIZE as f64 / divisions + 1.0 - step;

    let mut out = RasterGrid::empty(grid.data_min, grid.data_max);

    for j in 0..GRID_SIZE {
        let py = origin_y + j as f64 * step;
        for i in 0..GRID_SIZE {
            let px = origin_x + i as f64 * step;
            if let Some(value) = sample::<B>(grid, px, py, &to_value) {
                out.raw[RasterGrid::index(i, j)] = to_raw(value);
            }
        }
    }

    out
}

/// No-data aware bilinear sample at a fractional position of the padded grid.
fn sample<B: Blend>(
    grid: &RasterGrid,
    px: f64,
    py: f64,
    to_value: &impl Fn(u16) -> f64,
) -> Option<f64> {
    let last = (GRID_SIZE - 1) as f64;
    let px = px.clamp(0.0, last);
    let py = py.clamp(0.0, last);
    let x0 = px.floor() as usize;
    let y0 = py.floor() as usize;
    let x1 = (x0 + 1).min(GRID_SIZE - 1);
    let y1 = (y0 + 1).min(GRID_SIZE - 1);

    let corner = |x: usize, y: usize| {
        let raw = grid.raw_at(x, y);
        (raw != NO_DATA).then(|| to_value(raw))
    };

    interpolate_corners::<B>(
        [corner(x0, y0), corner(x1, y0), corner(x0, y1), corner(x1, y1)],
        px - x0 as f64,
        py - y0 as f64,
    )
}

/// Bilinear interpolation of `[top_left, top_right, bottom_left, bottom_right]`
/// with missing corners reconstructed from the valid ones.
fn interpolate_corners<B: Blend>(corners: [Option<f64>; 4], fx: f64, fy: f64) -> Option<f64> {
    let [a, b, c, d] = corners;
    let valid = corners.iter().filter(|v| v.is_some()).count();

    let (a, b, c, d) = match (valid, a, b, c, d) {
        (0, ..) => return None,
        (1, ..) => return a.or(b).or(c).or(d),
        // Two valid corners on one edge: copy that edge onto the other.
        (2, Some(a), Some(b), None, None) => (a, b, a, b),
        (2, None, None, Some(c), Some(d)) => (c, d, c, d),
        (2, Some(a), None, Some(c), None) => (a, a, c, c),
        (2, None, Some(b), None, Some(d)) => (b, b, d, d),
        // Diagonal pairs and single gaps: a missing corner is the average of
        // its two edge neighbours, both of which are valid here.
        _ => {
            let a = a.unwrap_or_else(|| B::average(b.unwrap_or(0.0), c.unwrap_or(0.0)));
            let b = b.unwrap_or_else(|| B::average(a, d.unwrap_or(0.0)));
            let c = c.unwrap_or_else(|| B::average(a, d.unwrap_or(0.0)));
            let d = d.unwrap_or_else(|| B::average(b, c));
            (a, b, c, d)
        }
    };

    let top = B::mix(a, b, fx);
    let bottom = B::mix(c, d, fx);
    Some(B::mix(top, bottom, fy))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blend_degrees_shortest_arc() {
        let mid = blend_degrees(359.0, 1.0, 0.5);
        assert!(mid.abs() < 1e-9 || (mid - 360.0).abs() < 1e-9);
        assert!((blend_degrees(10.0, 20.0, 0.5) - 15.0).abs() < 1e-9);
        assert!((blend_degrees(350.0, 10.0, 0.25) - 355.0).abs() < 1e-9);
        assert!((blend_degrees(90.0, 270.0, 0.0) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpolate_all_valid() {
        let v = interpolate_corners::<Linear>(
            [Some(0.0), Some(10.0), Some(20.0), Some(30.0)],
            0.5,
            0.5,
        );
        assert_eq!(v, Some(15.0));
    }

    #[test]
    fn test_interpolate_no_valid_corner() {
        assert_eq!(interpolate_corners::<Linear>([None; 4], 0.3, 0.3), None);
    }

    #[test]
    fn test_interpolate_single_valid_corner() {
        let v = interpolate_corners::<Linear>([None, None, Some(7.0), None], 0.9, 0.1);
        assert_eq!(v, Some(7.0));
    }

    #[test]
    fn test_interpolate_valid_edge() {
        // Only the top edge is valid: interpolation runs along it only.
        let v = interpolate_corners::<Linear>([Some(0.0), Some(10.0), None, None], 0.25, 0.9);
        assert_eq!(v, Some(2.5));
        let v = interpolate_corners::<Linear>([None, Some(4.0), None, Some(8.0)], 0.1, 0.5);
        assert_eq!(v, Some(6.0));
    }

    #[test]
    fn test_interpolate_missing_corner() {
        // d is reconstructed as the average of b and c.
        let v = interpolate_corners::<Linear>([Some(0.0), Some(10.0), Some(10.0), None], 1.0, 1.0);
        assert_eq!(v, Some(10.0));
        // Diagonal pair: b and c both become the average of a and d.
        let v = interpolate_corners::<Linear>([Some(0.0), None, None, Some(20.0)], 1.0, 0.0);
        assert_eq!(v, Some(10.0));
    }

    #[test]
    fn test_resample_none_returns_input() {
        let mut grid = RasterGrid::empty(0.0, 1.0);
        grid.raw[42] = 9;
        let out = resample(grid.clone(), None);
        assert_eq!(out, grid);
    }
}
