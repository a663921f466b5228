//! Streamline tracing through a vector field.
//!
//! Seeds sit on a regular grid over the tile. From each seed the field is
//! integrated forward and backward in tile pixel space (`0..=256` on both
//! axes, y pointing down), recomputing the direction only when the tracer
//! enters a new cell.

use tracing::debug;

use crate::raster::{RasterGrid, DATA_SIZE};
use crate::vector::VectorSample;

/// Parameters of a streamline trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamlineParams {
    /// Distance between seeds, in tile pixels.
    pub grid_step: u32,
    /// Maximum number of integration sub-steps per direction.
    pub steps: u32,
    /// Multiplier on the step length.
    pub speed_factor: f64,
    /// Rotation added to the flow direction, in degrees.
    pub add_degrees: f64,
}

impl Default for StreamlineParams {
    fn default() -> Self {
        Self {
            grid_step: 64,
            steps: 300,
            speed_factor: 1.0,
            add_degrees: 0.0,
        }
    }
}

/// A point in tile pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StreamPoint {
    pub x: f32,
    pub y: f32,
}

impl StreamPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// One traced streamline.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamlinePath {
    /// Points in flow order.
    pub points: Vec<StreamPoint>,
    /// Index of the seed inside `points`.
    pub seed_index: usize,
    /// Animation offset in `[0, 1)`, derived from the seed position.
    pub phase: f32,
}

impl StreamlinePath {
    /// Position along the path for animation time `t`.
    ///
    /// `t` wraps at 1 and is shifted by the path's phase, so the same time
    /// always yields the same position.
    pub fn position_at(&self, t: f32) -> StreamPoint {
        let last = self.points.len().saturating_sub(1);
        if last == 0 {
            return self.points.first().copied().unwrap_or_default();
        }
        let s = (t + self.phase).rem_euclid(1.0) * last as f32;
        let i = (s.floor() as usize).min(last - 1);
        let f = s - i as f32;
        let (a, b) = (self.points[i], self.points[i + 1]);
        StreamPoint::new(a.x + (b.x - a.x) * f, a.y + (b.y - a.y) * f)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Trace streamlines from every seed with data.
///
/// Paths with two points or fewer are dropped.
pub fn trace_streamlines(field: &VectorSample, params: &StreamlineParams) -> Vec<StreamlinePath> {
    let grid_step = params.grid_step.max(1) as usize;
    let max_magnitude = field.magnitude.data_max;
    if max_magnitude <= 0.0 || params.steps == 0 {
        return Vec::new();
    }

    let tracer = Tracer {
        field,
        factor: params.speed_factor / max_magnitude,
        rotation: params.add_degrees.to_radians(),
        steps: params.steps,
        record_every: (params.steps / 10).max(1),
    };

    let mut paths = Vec::new();
    let mut seed_y = grid_step / 2;
    while seed_y < DATA_SIZE {
        let mut seed_x = grid_step / 2;
        while seed_x < DATA_SIZE {
            let seed = StreamPoint::new(seed_x as f32, seed_y as f32);
            if let Some(path) = tracer.trace(seed) {
                paths.push(path);
            }
            seed_x += grid_step;
        }
        seed_y += grid_step;
    }

    debug!(paths = paths.len(), grid_step, steps = params.steps, "Traced streamlines");
    paths
}

struct Tracer<'a> {
    field: &'a VectorSample,
    factor: f64,
    rotation: f64,
    steps: u32,
    record_every: u32,
}

impl Tracer<'_> {
    fn trace(&self, seed: StreamPoint) -> Option<StreamlinePath> {
        self.velocity(seed.x, seed.y)?;

        let mut backward = self.integrate(seed, -1.0);
        let forward = self.integrate(seed, 1.0);
        if backward.len() + forward.len() < 2 {
            return None;
        }

        backward.reverse();
        let seed_index = backward.len();
        let mut points = backward;
        points.push(seed);
        points.extend(forward);

        Some(StreamlinePath {
            points,
            seed_index,
            phase: seed_phase(seed),
        })
    }

    /// Step `(dx, dy)` for the cell under `(x, y)`, `None` on missing data.
    fn velocity(&self, x: f32, y: f32) -> Option<(f64, f64)> {
        let (u, v, magnitude) = self.field.at(cell_index(x, y))?;
        let angle = u.atan2(v) + self.rotation;
        let length = self.factor * magnitude;
        Some((length * angle.sin(), length * angle.cos()))
    }

    /// Points visited along one direction, excluding the seed.
    fn integrate(&self, seed: StreamPoint, direction: f64) -> Vec<StreamPoint> {
        let limit = DATA_SIZE as f64;
        let (mut x, mut y) = (seed.x as f64, seed.y as f64);
        let mut cell = (x.floor(), y.floor());
        let (mut dx, mut dy) = match self.velocity(seed.x, seed.y) {
            Some(step) => step,
            None => return Vec::new(),
        };

        let mut points = Vec::new();
        for i in 1..=self.steps {
            x += direction * dx;
            y -= direction * dy;
            if !(0.0..=limit).contains(&x) || !(0.0..=limit).contains(&y) {
                break;
            }

            let next = (x.floor(), y.floor());
            if next != cell {
                cell = next;
                match self.velocity(x as f32, y as f32) {
                    Some(step) => (dx, dy) = step,
                    None => break,
                }
            }

            if i % self.record_every == 0 {
                points.push(StreamPoint::new(x as f32, y as f32));
            }
        }
        points
    }
}

/// Grid index of the cell holding a tile pixel position.
#[inline]
fn cell_index(x: f32, y: f32) -> usize {
    let cx = (x.max(0.0).floor() as usize).min(DATA_SIZE);
    let cy = (y.max(0.0).floor() as usize).min(DATA_SIZE);
    RasterGrid::index(cx + 1, cy + 1)
}

/// Deterministic phase in `[0, 1)` for a seed.
fn seed_phase(seed: StreamPoint) -> f32 {
    let h = (seed.x as u32)
        .wrapping_mul(73_856_093)
        ^ (seed.y as u32).wrapping_mul(19_349_663);
    (h % 1000) as f32 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_at_wraps() {
        let path = StreamlinePath {
            points: vec![StreamPoint::new(0.0, 0.0), StreamPoint::new(10.0, 0.0)],
            seed_index: 0,
            phase: 0.0,
        };
        assert_eq!(path.position_at(0.5), StreamPoint::new(5.0, 0.0));
        assert_eq!(path.position_at(1.25), StreamPoint::new(2.5, 0.0));
        assert_eq!(path.position_at(0.0), StreamPoint::new(0.0, 0.0));
    }

    #[test]
    fn test_seed_phase_is_stable() {
        let seed = StreamPoint::new(32.0, 96.0);
        assert_eq!(seed_phase(seed), seed_phase(seed));
        assert!((0.0..1.0).contains(&seed_phase(seed)));
    }

    #[test]
    fn test_cell_index_includes_halo_offset() {
        assert_eq!(cell_index(0.0, 0.0), RasterGrid::index(1, 1));
        assert_eq!(cell_index(256.0, 256.0), RasterGrid::index(257, 257));
        assert_eq!(cell_index(10.7, 3.2), RasterGrid::index(11, 4));
    }
}
