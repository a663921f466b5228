//! Tile payload decoding.
//!
//! Tiles arrive as 258x258 RGBA PNG images:
//!
//! - red and green hold the low and high byte of each 16-bit sample
//! - the blue channel of pixels 0..4 holds `data_min` as a little-endian `f32`
//! - the blue channel of pixels 4..8 holds `data_max` as a little-endian `f32`
//! - alpha is ignored

use tracing::{debug, instrument};

use crate::error::{GridProcessorError, Result};
use crate::raster::{IntegralGrid, RasterGrid, GRID_SIZE};

/// An RGBA8 pixel buffer with typed views over the same bytes.
///
/// Pixel `i` occupies bytes `4i..4i+4` in `R, G, B, A` order. The views read
/// those bytes little-endian, so `sample` is `R | G << 8` and `packed` is
/// `R | G << 8 | B << 16 | A << 24` on every platform.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    bytes: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap RGBA bytes. The length must be `width * height * 4`.
    pub fn new(width: usize, height: usize, bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() != width * height * 4 {
            return Err(GridProcessorError::InvalidGeometry(format!(
                "expected {} RGBA bytes for {}x{}, got {}",
                width * height * 4,
                width,
                height,
                bytes.len()
            )));
        }
        Ok(Self {
            width,
            height,
            bytes,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte view.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// One channel (0 = R .. 3 = A) of pixel `i`.
    #[inline]
    pub fn channel(&self, i: usize, channel: usize) -> u8 {
        self.bytes[i * 4 + channel]
    }

    /// 16-bit view: the red and green bytes of pixel `i`.
    #[inline]
    pub fn sample(&self, i: usize) -> u16 {
        u16::from_le_bytes([self.bytes[i * 4], self.bytes[i * 4 + 1]])
    }

    /// 32-bit view: all four bytes of pixel `i`.
    #[inline]
    pub fn packed(&self, i: usize) -> u32 {
        let b = &self.bytes[i * 4..i * 4 + 4];
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    }

    /// Read an `f32` stored in the blue channel of four consecutive pixels.
    fn header_f32(&self, first_pixel: usize) -> f32 {
        f32::from_le_bytes([
            self.channel(first_pixel, 2),
            self.channel(first_pixel + 1, 2),
            self.channel(first_pixel + 2, 2),
            self.channel(first_pixel + 3, 2),
        ])
    }
}

/// Decode a PNG tile payload.
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn decode(bytes: &[u8]) -> Result<IntegralGrid> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = image.dimensions();
    let pixels = PixelBuffer::new(width as usize, height as usize, image.into_raw())?;
    decode_pixels(&pixels)
}

/// Decode raw RGBA bytes of a tile payload.
pub fn decode_rgba(width: usize, height: usize, rgba: Vec<u8>) -> Result<IntegralGrid> {
    decode_pixels(&PixelBuffer::new(width, height, rgba)?)
}

/// Decode an RGBA pixel buffer into a grid with summed-area tables.
pub fn decode_pixels(pixels: &PixelBuffer) -> Result<IntegralGrid> {
    if pixels.width() != GRID_SIZE || pixels.height() != GRID_SIZE {
        return Err(GridProcessorError::decode_failure(format!(
            "tile must be {}x{}, got {}x{}",
            GRID_SIZE,
            GRID_SIZE,
            pixels.width(),
            pixels.height()
        )));
    }

    let data_min = pixels.header_f32(0);
    let data_max = pixels.header_f32(4);
    if !data_min.is_finite() || !data_max.is_finite() {
        return Err(GridProcessorError::decode_failure(
            "tile header holds a non-finite value range",
        ));
    }

    let raw: Vec<u16> = (0..pixels.len()).map(|i| pixels.sample(i)).collect();
    let grid = RasterGrid::new(raw, data_min as f64, data_max as f64).ok_or_else(|| {
        GridProcessorError::decode_failure("tile sample count does not match its size")
    })?;

    debug!(
        data_min = grid.data_min,
        data_max = grid.data_max,
        valid = grid.valid_count(),
        "Decoded tile"
    );

    Ok(IntegralGrid::new(grid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_views_share_bytes() {
        let pixels = PixelBuffer::new(1, 1, vec![0x34, 0x12, 0xAB, 0xFF]).unwrap();
        assert_eq!(pixels.sample(0), 0x1234);
        assert_eq!(pixels.packed(0), 0xFFAB_1234);
        assert_eq!(pixels.channel(0, 2), 0xAB);
    }

    #[test]
    fn test_pixel_buffer_rejects_bad_length() {
        assert!(matches!(
            PixelBuffer::new(2, 2, vec![0; 15]),
            Err(GridProcessorError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_size() {
        let result = decode_rgba(4, 4, vec![0; 64]);
        assert!(matches!(result, Err(GridProcessorError::DecodeFailure(_))));
    }

    #[test]
    fn test_decode_rejects_garbage_png() {
        assert!(matches!(
            decode(b"not a png"),
            Err(GridProcessorError::DecodeFailure(_))
        ));
    }
}
