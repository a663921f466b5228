//! Color ramps and legends.
//!
//! A style describes its colors as control points `(value, color)` in style
//! units, either explicitly (`color_map`) or as a palette spread evenly over
//! the style's levels. A [`Legend`] is that ramp rasterized onto `size`
//! entries between the first and last control point, plus labelled ticks.

use crate::color::{sample_palette, Color};
use crate::numbers::format_label;
use tracing::debug;
use wx_common::style::{FillMode, StrictStyle};
use wx_common::Registry;

/// Number of levels generated when a style does not list any.
pub const AUTO_LEVEL_COUNT: usize = 10;

/// A point of a color ramp, in style units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    pub value: f64,
    pub color: Color,
}

/// A labelled position on a legend.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub value: f64,
    pub label: String,
    pub color: Color,
    /// Index into [`Legend::colors`]
    pub pos: usize,
}

/// A rasterized color ramp.
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub size: usize,
    pub colors: Vec<Color>,
    pub ticks: Vec<Tick>,
    pub units: String,
    pub show_below_min: bool,
    pub show_above_max: bool,
}

impl Legend {
    /// Rasterize `points` onto `size` entries.
    ///
    /// Gradient fills blend consecutive control colors; solid fills hold
    /// each control color until the next control point.
    pub fn build(size: usize, points: &[ControlPoint], fill: FillMode, units: &str) -> Legend {
        let size = size.max(1);
        let mut legend = Legend {
            size,
            colors: vec![Color::transparent(); size],
            ticks: Vec::with_capacity(points.len()),
            units: units.to_string(),
            show_below_min: true,
            show_above_max: true,
        };
        let (first, last) = match (points.first(), points.last()) {
            (Some(first), Some(last)) => (first.value, last.value),
            _ => return legend,
        };
        let span = last - first;
        let steps = (size - 1).max(1) as f64;

        let mut segment = 0;
        for (i, slot) in legend.colors.iter_mut().enumerate() {
            let value = first + span * i as f64 / steps;
            while segment + 1 < points.len() - 1 && value >= points[segment + 1].value {
                segment += 1;
            }
            *slot = ramp_color(points, segment, value, fill);
        }

        for point in points {
            let pos = if span > 0.0 {
                ((point.value - first) / span * steps).round() as usize
            } else {
                0
            };
            legend.ticks.push(Tick {
                value: point.value,
                label: format_label(point.value),
                color: point.color,
                pos: pos.min(size - 1),
            });
        }
        legend
    }

    /// Colors as `r, g, b, a` bytes.
    pub fn color_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.colors)
    }
}

fn ramp_color(points: &[ControlPoint], segment: usize, value: f64, fill: FillMode) -> Color {
    let low = points[segment];
    let Some(high) = points.get(segment + 1) else {
        return low.color;
    };
    if value >= high.value {
        return high.color;
    }
    match fill {
        FillMode::Solid => low.color,
        FillMode::Gradient | FillMode::None => {
            let width = high.value - low.value;
            if width <= 0.0 {
                return high.color;
            }
            low.color.mix(high.color, (value - low.value) / width)
        }
    }
}

/// Evenly spaced "nice" levels covering `[min, max]`.
///
/// The step is the smallest of `{1, 2, 2.5, 5} * 10^k` giving at most
/// `count` levels.
pub fn nice_levels(min: f64, max: f64, count: usize) -> Vec<f64> {
    if !(max > min) || count < 2 {
        return vec![min];
    }
    let rough = (max - min) / (count - 1) as f64;
    let magnitude = 10f64.powf(rough.log10().floor());
    let step = [1.0, 2.0, 2.5, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|&step| step >= rough)
        .unwrap_or(10.0 * magnitude);

    let start = (min / step).ceil() * step;
    let mut levels = Vec::new();
    let mut level = start;
    while level <= max + step * 1e-9 {
        // Snap away accumulated float error (0.30000000000000004 -> 0.3)
        levels.push((level / step).round() * step);
        level += step;
    }
    if levels.len() < 2 {
        return vec![min, max];
    }
    levels
}

/// Control points of a style for data spanning `range` (style units).
pub fn control_points(
    style: &StrictStyle,
    registry: &Registry,
    range: (f64, f64),
) -> Vec<ControlPoint> {
    if let Some(map) = &style.color_map {
        let mut points: Vec<ControlPoint> = map
            .iter()
            .map(|(value, color)| ControlPoint {
                value: *value,
                color: parse_or_transparent(color),
            })
            .collect();
        points.sort_by(|a, b| a.value.total_cmp(&b.value));
        return points;
    }

    let mut levels = match &style.levels {
        Some(levels) if !levels.is_empty() => levels.clone(),
        _ => nice_levels(range.0, range.1, AUTO_LEVEL_COUNT),
    };
    levels.sort_by(|a, b| a.total_cmp(b));

    let palette: Vec<Color> = match &style.colors {
        Some(colors) if !colors.is_empty() => colors.iter().map(|c| parse_or_transparent(c)).collect(),
        _ => registry
            .scheme_or_default(&style.color_scheme)
            .iter()
            .map(|c| parse_or_transparent(c))
            .collect(),
    };

    let last = (levels.len().max(2) - 1) as f64;
    levels
        .iter()
        .enumerate()
        .map(|(i, &value)| ControlPoint {
            value,
            color: sample_palette(&palette, i as f64 / last),
        })
        .collect()
}

/// Build a legend of `size` entries for a style over `range` (style units).
pub fn build_legend(
    size: usize,
    style: &StrictStyle,
    registry: &Registry,
    range: (f64, f64),
) -> Legend {
    let points = control_points(style, registry, range);
    let mut legend = Legend::build(size, &points, style.fill, &style.units);
    legend.show_below_min = style.show_below_min;
    legend.show_above_max = style.show_above_max;
    legend
}

fn parse_or_transparent(color: &str) -> Color {
    Color::parse(color).unwrap_or_else(|| {
        debug!(color, "Unparseable color in style, using transparent");
        Color::transparent()
    })
}
