//! Color lookup table (CLUT) for raw 16-bit tile samples.
//!
//! Tiles carry raw codes `0..=65535` where `0` means "no data" and any other
//! code decodes to `data_min + code * data_scale`. Because every tile of a
//! variable shares the same `[data_min, data_max]`, colors and isoline bands
//! can be precomputed once per style for all 65536 codes.

use crate::color::Color;
use crate::legend::{control_points, ControlPoint, Legend, Tick};
use tracing::debug;
use wx_common::style::{ColorMode, FillMode, StrictStyle};
use wx_common::{Registry, UnitConverter};

/// Number of distinct raw sample codes.
pub const RAW_CODES: usize = 65536;

/// Raw code reserved for "no data".
pub const NO_DATA: u16 = 0;

/// Headroom applied to the largest vector component so the magnitude of
/// any `(u, v)` pair fits the packed range.
pub const VECTOR_MAGNITUDE_HEADROOM: f64 = 1.42;

/// Raw code of a physical value, clamped into the encodable range.
pub fn raw_code(value: f64, data_min: f64, data_max: f64) -> u16 {
    let span = data_max - data_min;
    if span <= 0.0 {
        return 0;
    }
    (65535.0 * ((value - data_min) / span).clamp(0.0, 1.0)).round() as u16
}

/// Precomputed per-raw-code colors and isoline bands for one style and one
/// data range.
#[derive(Debug, Clone)]
pub struct Clut {
    /// Raw code -> isoline band index
    pub level_index: Vec<u32>,
    /// Raw code -> packed RGBA (see [`Color::to_packed`])
    pub color_index: Vec<u32>,
    /// Data units -> style units
    pub data_to_style: UnitConverter,
    /// Data units -> knots (identity when the data is not a speed)
    pub data_to_knots: UnitConverter,
    /// Units values are displayed in
    pub units: String,
    pub data_units: String,
    pub data_min: f64,
    pub data_max: f64,
    pub data_scale: f64,
    /// Raw-code thresholds of the control points, ascending
    pub thresholds: Vec<u16>,
    pub ticks: Vec<Tick>,
    points: Vec<ControlPoint>,
    fill: FillMode,
    show_below_min: bool,
    show_above_max: bool,
}

impl Clut {
    /// Build the table for `style` over `[data_min, data_max]` in `data_units`.
    ///
    /// For vector variables the range is replaced by the magnitude range
    /// `[0, 1.42 * max(|min|, |max|)]`, matching the synthesized magnitude
    /// grid. Unknown or incompatible units degrade to the identity
    /// conversion and display in the data units.
    pub fn build(
        style: &StrictStyle,
        registry: &Registry,
        data_units: &str,
        data_range: (f64, f64),
        is_vector: bool,
    ) -> Clut {
        let (data_min, data_max) = if is_vector {
            let extent = (-data_range.0).max(data_range.1);
            (0.0, VECTOR_MAGNITUDE_HEADROOM * extent)
        } else {
            data_range
        };
        let data_scale = (data_max - data_min) / 65535.0;

        let (data_to_style, units) = if style.units.is_empty() {
            (UnitConverter::identity(), data_units.to_string())
        } else {
            match registry.converter_with(data_units, &style.units, &style.extra_units) {
                Some(conv) => (conv, style.units.clone()),
                None => {
                    debug!(
                        from = data_units,
                        to = %style.units,
                        "No unit conversion available, displaying data units"
                    );
                    (UnitConverter::identity(), data_units.to_string())
                }
            }
        };
        let data_to_knots = registry
            .converter_with(data_units, "knots", &style.extra_units)
            .unwrap_or_default();

        let style_range = (data_to_style.apply(data_min), data_to_style.apply(data_max));
        let style_range = (
            style_range.0.min(style_range.1),
            style_range.0.max(style_range.1),
        );
        let points = control_points(style, registry, style_range);

        let thresholds: Vec<u16> = points
            .iter()
            .map(|p| raw_code(data_to_style.invert(p.value), data_min, data_max))
            .collect();

        let mut clut = Clut {
            level_index: build_level_index(&thresholds),
            color_index: vec![0; RAW_CODES],
            data_to_style,
            data_to_knots,
            units,
            data_units: data_units.to_string(),
            data_min,
            data_max,
            data_scale,
            thresholds,
            ticks: Vec::new(),
            points,
            fill: style.fill,
            show_below_min: style.show_below_min,
            show_above_max: style.show_above_max,
        };
        clut.fill_colors();
        clut
    }

    fn fill_colors(&mut self) {
        let legend = Legend::build(RAW_CODES, &self.points, self.fill, &self.units);
        self.ticks = legend.ticks.clone();
        if self.fill == FillMode::None {
            return;
        }
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first.value, last.value),
            _ => return,
        };
        let span = last - first;
        let below = legend.colors[0].to_packed();
        let above = legend.colors[RAW_CODES - 1].to_packed();

        for code in 1..RAW_CODES {
            let value = self
                .data_to_style
                .apply(self.data_min + code as f64 * self.data_scale);
            self.color_index[code] = if value < first {
                if self.show_below_min {
                    below
                } else {
                    0
                }
            } else if value > last {
                if self.show_above_max {
                    above
                } else {
                    0
                }
            } else if span > 0.0 {
                let pos = ((value - first) / span * (RAW_CODES - 1) as f64).round() as usize;
                legend.colors[pos.min(RAW_CODES - 1)].to_packed()
            } else {
                legend.colors[0].to_packed()
            };
        }
        self.color_index[NO_DATA as usize] = 0;
    }

    /// A legend strip of `size` entries with this table's ramp and ticks.
    pub fn legend(&self, size: usize) -> Legend {
        let mut legend = Legend::build(size, &self.points, self.fill, &self.units);
        legend.show_below_min = self.show_below_min;
        legend.show_above_max = self.show_above_max;
        legend
    }

    pub fn color_of(&self, raw: u16) -> Color {
        Color::from_packed(self.color_index[raw as usize])
    }

    /// Color of an isoline, vector or streamline drawn over `raw`.
    ///
    /// `None` when the overlay is off, the code is "no data", or a custom
    /// color does not parse.
    pub fn overlay_color(&self, mode: &ColorMode, raw: u16) -> Option<Color> {
        if raw == NO_DATA {
            return None;
        }
        match mode {
            ColorMode::None => None,
            ColorMode::Inverted => Some(self.color_of(raw).inverted()),
            ColorMode::Fill => Some(self.color_of(raw)),
            ColorMode::Custom(literal) => Color::parse(literal),
        }
    }

    pub fn level_of(&self, raw: u16) -> u32 {
        self.level_index[raw as usize]
    }

    /// Physical value of a raw code in data units; `None` for "no data".
    pub fn value_of(&self, raw: u16) -> Option<f64> {
        (raw != NO_DATA).then(|| self.data_min + raw as f64 * self.data_scale)
    }

    /// Physical value of a raw code in style units; `None` for "no data".
    pub fn in_style_units(&self, raw: u16) -> Option<f64> {
        self.value_of(raw).map(|v| self.data_to_style.apply(v))
    }

    /// Convert a value in data units to knots.
    pub fn knots_of(&self, value: f64) -> f64 {
        self.data_to_knots.apply(value)
    }

    /// The color table as little-endian `r, g, b, a` bytes per code.
    pub fn color_bytes(&self) -> Vec<u8> {
        self.color_index
            .iter()
            .flat_map(|packed| packed.to_le_bytes())
            .collect()
    }
}

/// Step function over raw codes: codes below `thresholds[1]` are band 0,
/// `thresholds[j] <= code < thresholds[j + 1]` is band `j`, and codes at or
/// after the last threshold are band `thresholds.len() - 1`.
pub fn build_level_index(thresholds: &[u16]) -> Vec<u32> {
    let mut index = vec![0u32; RAW_CODES];
    let last_band = thresholds.len().saturating_sub(1);
    let mut band = 0;
    for (code, slot) in index.iter_mut().enumerate() {
        while band < last_band && code >= thresholds[band + 1] as usize {
            band += 1;
        }
        *slot = band as u32;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use wx_common::ColorStyle;

    #[test]
    fn test_raw_code_clamps() {
        assert_eq!(raw_code(-5.0, 0.0, 10.0), 0);
        assert_eq!(raw_code(5.0, 0.0, 10.0), 32768);
        assert_eq!(raw_code(50.0, 0.0, 10.0), 65535);
        assert_eq!(raw_code(1.0, 1.0, 1.0), 0);
    }

    #[test]
    fn test_level_index_steps() {
        let index = build_level_index(&[100, 200, 300]);
        assert_eq!(index[0], 0);
        assert_eq!(index[99], 0);
        assert_eq!(index[199], 0);
        assert_eq!(index[200], 1);
        assert_eq!(index[299], 1);
        assert_eq!(index[300], 2);
        assert_eq!(index[65535], 2);
    }

    #[test]
    fn test_no_data_is_transparent() {
        let registry = Registry::new();
        let style = registry.resolve_style(&ColorStyle::default());
        let clut = Clut::build(&style, &registry, "K", (250.0, 300.0), false);
        assert_eq!(clut.color_index[0], 0);
        assert!(clut.color_index[1..].iter().any(|&c| c != 0));
        assert_eq!(clut.value_of(0), None);
    }

    #[test]
    fn test_hidden_out_of_range() {
        let registry = Registry::new();
        let style = registry.resolve_style(&ColorStyle {
            levels: Some(vec![10.0, 20.0]),
            show_below_min: Some(false),
            show_above_max: Some(false),
            ..Default::default()
        });
        let clut = Clut::build(&style, &registry, "m", (0.0, 30.0), false);
        assert_eq!(clut.color_of(raw_code(5.0, 0.0, 30.0)), Color::transparent());
        assert_eq!(clut.color_of(raw_code(25.0, 0.0, 30.0)), Color::transparent());
        assert_ne!(clut.color_of(raw_code(15.0, 0.0, 30.0)), Color::transparent());
    }

    #[test]
    fn test_vector_range() {
        let registry = Registry::new();
        let style = registry.resolve_style(&ColorStyle::default());
        let clut = Clut::build(&style, &registry, "m/s", (-30.0, 20.0), true);
        assert_eq!(clut.data_min, 0.0);
        assert!((clut.data_max - 42.6).abs() < 1e-9);
    }
}
