//! Raw raster grids and summed-area tables.
//!
//! Every tile is a 258x258 grid of 16-bit samples: the 256x256 data area plus
//! a one pixel halo copied from the neighbouring tiles. A raw sample of `0`
//! means "no data"; any other sample decodes linearly between the grid's
//! `data_min` and `data_max`.

/// Width and height of the data area of a tile.
pub const DATA_SIZE: usize = 256;

/// Width and height of a tile including the one pixel halo.
pub const GRID_SIZE: usize = DATA_SIZE + 2;

/// Raw sample value reserved for missing data.
pub const NO_DATA: u16 = 0;

/// Largest raw sample value.
pub const MAX_RAW: u16 = u16::MAX;

/// Largest blur radius accepted by [`IntegralGrid::blur`].
///
/// A 255x255 window of 65535 samples still fits in a `u32` sum.
pub const MAX_BLUR_RADIUS: u32 = 127;

/// A decoded 258x258 grid of raw samples with its value range.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterGrid {
    /// Row-major raw samples, `GRID_SIZE * GRID_SIZE` entries.
    pub raw: Vec<u16>,
    /// Physical value of raw sample `0` (and the lower bound of the range).
    pub data_min: f64,
    /// Physical value of raw sample `65535`.
    pub data_max: f64,
    /// `(data_max - data_min) / 65535`.
    pub data_scale: f64,
}

impl RasterGrid {
    /// Create a grid from raw samples and a value range.
    ///
    /// Returns `None` when `raw` does not hold exactly `GRID_SIZE * GRID_SIZE`
    /// samples.
    pub fn new(raw: Vec<u16>, data_min: f64, data_max: f64) -> Option<Self> {
        if raw.len() != GRID_SIZE * GRID_SIZE {
            return None;
        }
        Some(Self {
            raw,
            data_min,
            data_max,
            data_scale: (data_max - data_min) / MAX_RAW as f64,
        })
    }

    /// A grid with no valid samples.
    pub fn empty(data_min: f64, data_max: f64) -> Self {
        Self {
            raw: vec![NO_DATA; GRID_SIZE * GRID_SIZE],
            data_min,
            data_max,
            data_scale: (data_max - data_min) / MAX_RAW as f64,
        }
    }

    /// Row-major index of a padded pixel.
    #[inline]
    pub fn index(x: usize, y: usize) -> usize {
        y * GRID_SIZE + x
    }

    /// Raw sample at a padded pixel.
    #[inline]
    pub fn raw_at(&self, x: usize, y: usize) -> u16 {
        self.raw[Self::index(x, y)]
    }

    /// Physical value of a raw sample, `None` for no data.
    #[inline]
    pub fn decode(&self, raw: u16) -> Option<f64> {
        if raw == NO_DATA {
            None
        } else {
            Some(self.data_min + raw as f64 * self.data_scale)
        }
    }

    /// Physical value at a padded pixel.
    pub fn value_at(&self, x: usize, y: usize) -> Option<f64> {
        self.decode(self.raw_at(x, y))
    }

    /// Encode a physical value back into a valid raw sample.
    ///
    /// Valid values never encode to the no-data sample, so the result is
    /// clamped to `1..=65535`.
    pub fn encode(&self, value: f64) -> u16 {
        if self.data_scale == 0.0 || !value.is_finite() {
            return 1;
        }
        ((value - self.data_min) / self.data_scale)
            .round()
            .clamp(1.0, MAX_RAW as f64) as u16
    }

    /// Number of samples that carry data.
    pub fn valid_count(&self) -> usize {
        self.raw.iter().filter(|&&r| r != NO_DATA).count()
    }
}

/// A raster grid with summed-area tables over its original samples.
///
/// The tables are built once at decode time and are never updated, so
/// [`blur`](Self::blur) always works from the unblurred data and blurring
/// with radius 0 restores the original samples.
#[derive(Debug, Clone)]
pub struct IntegralGrid {
    grid: RasterGrid,
    sum_table: Vec<u32>,
    non_zero_count_table: Vec<u32>,
    blur_radius: u32,
}

impl IntegralGrid {
    /// Build summed-area tables for a grid.
    pub fn new(grid: RasterGrid) -> Self {
        let sum_table = summed_area(&grid.raw, |r| r as u32);
        let non_zero_count_table = summed_area(&grid.raw, |r| (r != NO_DATA) as u32);
        Self {
            grid,
            sum_table,
            non_zero_count_table,
            blur_radius: 0,
        }
    }

    /// The current (possibly blurred) samples.
    pub fn raster(&self) -> &RasterGrid {
        &self.grid
    }

    /// Consume the tables and keep the current samples.
    pub fn into_raster(self) -> RasterGrid {
        self.grid
    }

    /// Radius of the last applied blur.
    pub fn blur_radius(&self) -> u32 {
        self.blur_radius
    }

    /// Inclusive summed-area table of the original raw samples.
    pub fn sum_table(&self) -> &[u32] {
        &self.sum_table
    }

    /// Inclusive summed-area table of the original non-zero indicator.
    pub fn non_zero_count_table(&self) -> &[u32] {
        &self.non_zero_count_table
    }

    /// Box blur the interior of the grid, ignoring no-data samples.
    ///
    /// Each interior data pixel becomes the integer mean of the non-zero
    /// original samples in a window of half size `radius`, shrunk near the
    /// edges so that it stays inside the padded grid. Halo pixels and
    /// no-data pixels are left as they are. Calling this again with the
    /// current radius does nothing.
    pub fn blur(&mut self, radius: u32) {
        let radius = radius.min(MAX_BLUR_RADIUS);
        if radius == self.blur_radius {
            return;
        }

        let r = radius as usize;
        for y in 1..GRID_SIZE - 1 {
            let ry = r.min(y - 1).min(GRID_SIZE - 1 - y);
            for x in 1..GRID_SIZE - 1 {
                let idx = RasterGrid::index(x, y);
                // The current sample is zero exactly when the original was.
                if self.grid.raw[idx] == NO_DATA {
                    continue;
                }
                let rx = r.min(x - 1).min(GRID_SIZE - 1 - x);
                let (x0, y0, x1, y1) = (x - rx, y - ry, x + rx, y + ry);

                let sum = window_sum(&self.sum_table, x0, y0, x1, y1);
                let count = window_sum(&self.non_zero_count_table, x0, y0, x1, y1);
                if count == 0 {
                    continue;
                }
                // Every counted sample is >= 1, so the mean is too.
                self.grid.raw[idx] = (sum / count).min(MAX_RAW as u32) as u16;
            }
        }

        self.blur_radius = radius;
    }
}

/// Inclusive summed-area table: `T[y][x]` is the sum over `[0..=y] x [0..=x]`.
///
/// Arithmetic wraps, which keeps window differences exact as long as the
/// true window sum fits in a `u32`.
fn summed_area(raw: &[u16], value: impl Fn(u16) -> u32) -> Vec<u32> {
    let mut table = vec![0u32; GRID_SIZE * GRID_SIZE];

    // First row and first column are plain prefix sums.
    table[0] = value(raw[0]);
    for x in 1..GRID_SIZE {
        table[x] = table[x - 1].wrapping_add(value(raw[x]));
    }
    for y in 1..GRID_SIZE {
        let i = y * GRID_SIZE;
        table[i] = table[i - GRID_SIZE].wrapping_add(value(raw[i]));
    }

    for y in 1..GRID_SIZE {
        for x in 1..GRID_SIZE {
            let i = y * GRID_SIZE + x;
            table[i] = value(raw[i])
                .wrapping_add(table[i - GRID_SIZE])
                .wrapping_add(table[i - 1])
                .wrapping_sub(table[i - GRID_SIZE - 1]);
        }
    }

    table
}

/// Sum over the inclusive window `[x0..=x1] x [y0..=y1]`, with `x0, y0 >= 1`.
#[inline]
fn window_sum(table: &[u32], x0: usize, y0: usize, x1: usize, y1: usize) -> u32 {
    table[y1 * GRID_SIZE + x1]
        .wrapping_sub(table[(y0 - 1) * GRID_SIZE + x1])
        .wrapping_sub(table[y1 * GRID_SIZE + x0 - 1])
        .wrapping_add(table[(y0 - 1) * GRID_SIZE + x0 - 1])
}
