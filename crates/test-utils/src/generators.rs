//! Test data generators for synthetic tile payloads.
//!
//! Tiles are 258x258 grids of 16-bit samples (the 256x256 data area plus a
//! one pixel halo). These helpers build sample grids and encode them the
//! way the data service does: red/green carry the sample, the blue channel
//! of the first eight pixels carries the value range.

use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder};

/// Width and height of an encoded tile, halo included.
pub const TILE_GRID_SIZE: usize = 258;

/// Width and height of a mask tile.
pub const MASK_SIZE: usize = 256;

/// Creates a tile-sized grid of raw samples from a function of the padded
/// pixel position.
///
/// # Example
///
/// ```
/// use test_utils::{create_raw_grid, TILE_GRID_SIZE};
///
/// let raw = create_raw_grid(|x, _y| x as u16);
/// assert_eq!(raw.len(), TILE_GRID_SIZE * TILE_GRID_SIZE);
/// assert_eq!(raw[5], 5);
/// ```
pub fn create_raw_grid(mut f: impl FnMut(usize, usize) -> u16) -> Vec<u16> {
    let mut raw = Vec::with_capacity(TILE_GRID_SIZE * TILE_GRID_SIZE);
    for y in 0..TILE_GRID_SIZE {
        for x in 0..TILE_GRID_SIZE {
            raw.push(f(x, y));
        }
    }
    raw
}

/// Creates a grid where every sample is `raw`.
pub fn create_constant_raw(raw: u16) -> Vec<u16> {
    vec![raw; TILE_GRID_SIZE * TILE_GRID_SIZE]
}

/// Creates a west-to-east gradient of valid samples from 1 to 65535.
pub fn create_gradient_raw() -> Vec<u16> {
    let last = (TILE_GRID_SIZE - 1) as f64;
    create_raw_grid(|x, _| (1.0 + x as f64 / last * 65534.0).round() as u16)
}

/// Raw sample for a physical value in `[min, max]`, never the no-data sample.
pub fn raw_for_value(value: f64, min: f64, max: f64) -> u16 {
    if max <= min {
        return 1;
    }
    ((value - min) / (max - min) * 65535.0)
        .round()
        .clamp(1.0, 65535.0) as u16
}

/// Creates a grid of physical values; `None` becomes the no-data sample.
pub fn create_value_grid(min: f64, max: f64, f: impl Fn(usize, usize) -> Option<f64>) -> Vec<u16> {
    create_raw_grid(|x, y| f(x, y).map_or(0, |v| raw_for_value(v, min, max)))
}

/// Encodes raw samples and a value range as RGBA bytes.
///
/// # Panics
///
/// Panics if `raw` is not a full tile grid.
pub fn encode_tile_rgba(raw: &[u16], min: f32, max: f32) -> Vec<u8> {
    assert_eq!(raw.len(), TILE_GRID_SIZE * TILE_GRID_SIZE, "not a tile grid");

    let mut bytes = Vec::with_capacity(raw.len() * 4);
    for &sample in raw {
        let [lo, hi] = sample.to_le_bytes();
        bytes.extend_from_slice(&[lo, hi, 0, 255]);
    }

    for (i, b) in min.to_le_bytes().into_iter().enumerate() {
        bytes[i * 4 + 2] = b;
    }
    for (i, b) in max.to_le_bytes().into_iter().enumerate() {
        bytes[(4 + i) * 4 + 2] = b;
    }
    bytes
}

/// Encodes raw samples and a value range as a PNG tile.
pub fn encode_tile_png(raw: &[u16], min: f32, max: f32) -> Vec<u8> {
    let rgba = encode_tile_rgba(raw, min, max);
    encode_png(&rgba, TILE_GRID_SIZE)
}

/// Encodes a 256x256 mask tile; sea pixels get 255 in `channel`, land 0.
pub fn encode_mask_png(channel: usize, is_sea: impl Fn(usize, usize) -> bool) -> Vec<u8> {
    let mut rgba = vec![0u8; MASK_SIZE * MASK_SIZE * 4];
    for y in 0..MASK_SIZE {
        for x in 0..MASK_SIZE {
            let i = (y * MASK_SIZE + x) * 4;
            rgba[i + 3] = 255;
            if is_sea(x, y) {
                rgba[i + channel] = 255;
            }
        }
    }
    encode_png(&rgba, MASK_SIZE)
}

fn encode_png(rgba: &[u8], size: usize) -> Vec<u8> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(rgba, size as u32, size as u32, ColorType::Rgba8)
        .expect("PNG encoding of an in-memory buffer");
    png
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_tile_rgba_header() {
        let bytes = encode_tile_rgba(&create_constant_raw(0x1234), -1.5, 2.5);
        assert_eq!(&bytes[0..2], &[0x34, 0x12]);
        let min = f32::from_le_bytes([bytes[2], bytes[6], bytes[10], bytes[14]]);
        let max = f32::from_le_bytes([bytes[18], bytes[22], bytes[26], bytes[30]]);
        assert_eq!(min, -1.5);
        assert_eq!(max, 2.5);
    }

    #[test]
    fn test_gradient_is_valid_everywhere() {
        let raw = create_gradient_raw();
        assert!(raw.iter().all(|&r| r >= 1));
        assert_eq!(raw[0], 1);
        assert_eq!(raw[TILE_GRID_SIZE - 1], 65535);
    }

    #[test]
    fn test_raw_for_value() {
        assert_eq!(raw_for_value(0.0, 0.0, 10.0), 1);
        assert_eq!(raw_for_value(10.0, 0.0, 10.0), 65535);
        assert_eq!(raw_for_value(5.0, 0.0, 10.0), 32768);
    }

    #[test]
    fn test_png_starts_with_signature() {
        let png = encode_mask_png(0, |x, _| x < 10);
        assert_eq!(&png[1..4], b"PNG");
    }
}
