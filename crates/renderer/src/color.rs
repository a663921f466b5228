//! RGBA colors: parsing, mixing and packing.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Color value in RGBA format.
///
/// `#[repr(C)]` so a slice of colors can be viewed as `r, g, b, a` bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable, Serialize, Deserialize)]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// Parse `#rgb`, `#rrggbb`, `#rrggbbaa` or a small set of names.
    pub fn parse(s: &str) -> Option<Color> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }
        named_color(s)
    }

    /// Pack as a `u32` whose little-endian bytes are `[r, g, b, a]`.
    pub fn to_packed(self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, self.a])
    }

    /// Inverse of [`Color::to_packed`].
    pub fn from_packed(packed: u32) -> Self {
        let [r, g, b, a] = packed.to_le_bytes();
        Self { r, g, b, a }
    }

    /// Linear interpolation towards `other`; `t` is clamped to [0, 1].
    pub fn mix(self, other: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let lerp = |a: u8, b: u8| -> u8 { (a as f64 * (1.0 - t) + b as f64 * t).round() as u8 };
        Color::new(
            lerp(self.r, other.r),
            lerp(self.g, other.g),
            lerp(self.b, other.b),
            lerp(self.a, other.a),
        )
    }

    /// RGB complement with the same alpha.
    pub fn inverted(self) -> Color {
        Color::new(255 - self.r, 255 - self.g, 255 - self.b, self.a)
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let r = channel(&hex[0..1])?;
            let g = channel(&hex[1..2])?;
            let b = channel(&hex[2..3])?;
            Some(Color::new(r * 17, g * 17, b * 17, 255))
        }
        6 => Some(Color::new(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            255,
        )),
        8 => Some(Color::new(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        )),
        _ => None,
    }
}

fn named_color(name: &str) -> Option<Color> {
    let (r, g, b, a) = match name.to_lowercase().as_str() {
        "transparent" => (0, 0, 0, 0),
        "black" => (0, 0, 0, 255),
        "white" => (255, 255, 255, 255),
        "red" => (255, 0, 0, 255),
        "green" => (0, 255, 0, 255),
        "blue" => (0, 0, 255, 255),
        "yellow" => (255, 255, 0, 255),
        "cyan" => (0, 255, 255, 255),
        "magenta" => (255, 0, 255, 255),
        "orange" => (255, 165, 0, 255),
        "purple" => (128, 0, 128, 255),
        "gray" | "grey" => (128, 128, 128, 255),
        _ => return None,
    };
    Some(Color::new(r, g, b, a))
}

/// Sample an evenly spaced palette at `t` in [0, 1], blending neighbours.
pub fn sample_palette(palette: &[Color], t: f64) -> Color {
    match palette.len() {
        0 => Color::transparent(),
        1 => palette[0],
        n => {
            let pos = t.clamp(0.0, 1.0) * (n - 1) as f64;
            let i = (pos.floor() as usize).min(n - 2);
            palette[i].mix(palette[i + 1], pos - i as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parsing() {
        assert_eq!(Color::parse("#FF5500"), Some(Color::new(255, 85, 0, 255)));
        assert_eq!(Color::parse("#f50"), Some(Color::new(255, 85, 0, 255)));
        assert_eq!(Color::parse("#00000080"), Some(Color::new(0, 0, 0, 128)));
        assert_eq!(Color::parse("red"), Some(Color::new(255, 0, 0, 255)));
        assert_eq!(Color::parse("#12"), None);
        assert_eq!(Color::parse("chartreuse-ish"), None);
    }

    #[test]
    fn test_packing_byte_order() {
        let c = Color::new(1, 2, 3, 4);
        assert_eq!(c.to_packed().to_le_bytes(), [1, 2, 3, 4]);
        assert_eq!(Color::from_packed(c.to_packed()), c);
        let slice = [c, Color::new(5, 6, 7, 8)];
        let bytes: &[u8] = bytemuck::cast_slice(&slice);
        assert_eq!(bytes, &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_mix_and_palette() {
        let black = Color::new(0, 0, 0, 255);
        let white = Color::new(255, 255, 255, 255);
        assert_eq!(black.mix(white, 0.5), Color::new(128, 128, 128, 255));
        assert_eq!(sample_palette(&[black, white], 0.0), black);
        assert_eq!(sample_palette(&[black, white], 1.0), white);
        assert_eq!(black.inverted(), Color::new(255, 255, 255, 255));
    }
}
