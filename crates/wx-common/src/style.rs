//! Declarative visual styles for weather tiles.
//!
//! A [`ColorStyle`] is a partial description: every field is optional and
//! styles may name a `parent`. The [`crate::Registry`] resolves the parent
//! chain into a [`StrictStyle`] with every field populated, merging
//! `defaults <- parent <- explicit` so an absent field always inherits.

use crate::units::UnitDef;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of the built-in root style.
pub const BASE_STYLE: &str = "base";

/// How the raster is filled between levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Colors interpolated between control points
    #[default]
    Gradient,
    /// One flat color per level band
    Solid,
    /// No fill (isolines / vectors only)
    None,
}

/// Glyph used for vector fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorType {
    #[default]
    None,
    Arrows,
    Barbs,
    Points,
}

/// Which surface the land/sea mask hides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskMode {
    #[default]
    None,
    /// Hide land, show sea
    Land,
    /// Hide sea, show land
    Sea,
}

/// Color source for isolines, vectors and streamlines.
///
/// Serialized as a plain string: `"none"`, `"inverted"`, `"fill"` or any
/// color literal such as `"#ff8800"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColorMode {
    #[default]
    None,
    /// Inverse of the fill color underneath
    Inverted,
    /// Same color as the fill
    Fill,
    /// Fixed color literal
    Custom(String),
}

impl ColorMode {
    pub fn is_none(&self) -> bool {
        matches!(self, ColorMode::None)
    }
}

impl From<String> for ColorMode {
    fn from(s: String) -> Self {
        match s.as_str() {
            "" | "none" => ColorMode::None,
            "inverted" => ColorMode::Inverted,
            "fill" => ColorMode::Fill,
            _ => ColorMode::Custom(s),
        }
    }
}

impl From<ColorMode> for String {
    fn from(mode: ColorMode) -> Self {
        match mode {
            ColorMode::None => "none".to_string(),
            ColorMode::Inverted => "inverted".to_string(),
            ColorMode::Fill => "fill".to_string(),
            ColorMode::Custom(s) => s,
        }
    }
}

/// A partial style. Absent fields inherit from the parent chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorStyle {
    pub name: Option<String>,
    pub parent: Option<String>,
    pub fill: Option<FillMode>,
    pub isolines: Option<ColorMode>,
    pub isoline_text: Option<bool>,
    pub vectors: Option<VectorType>,
    pub vector_color: Option<ColorMode>,
    pub vector_factor: Option<f64>,
    pub streamlines: Option<ColorMode>,
    pub stream_line_speed_factor: Option<f64>,
    pub stream_line_grid_step: Option<u32>,
    pub stream_line_steps: Option<u32>,
    pub stream_line_static: Option<bool>,
    pub show_below_min: Option<bool>,
    pub show_above_max: Option<bool>,
    pub color_scheme: Option<String>,
    pub colors: Option<Vec<String>>,
    /// Explicit `(value, color)` control points in style units
    pub color_map: Option<Vec<(f64, String)>>,
    pub levels: Option<Vec<f64>>,
    pub blur_radius: Option<u32>,
    pub add_degrees: Option<f64>,
    pub units: Option<String>,
    pub extra_units: Option<HashMap<String, UnitDef>>,
    pub mask: Option<MaskMode>,
}

macro_rules! overlay_fields {
    ($base:ident, $over:ident, $($field:ident),* $(,)?) => {
        $(
            if $over.$field.is_some() {
                $base.$field = $over.$field.clone();
            }
        )*
    };
}

impl ColorStyle {
    /// Parse a single style from JSON.
    pub fn from_json(json: &str) -> crate::WxResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Lay `over` on top of `self`: every field present in `over` wins.
    /// `parent` is not inherited.
    pub fn merge(mut self, over: &ColorStyle) -> ColorStyle {
        overlay_fields!(
            self,
            over,
            name,
            fill,
            isolines,
            isoline_text,
            vectors,
            vector_color,
            vector_factor,
            streamlines,
            stream_line_speed_factor,
            stream_line_grid_step,
            stream_line_steps,
            stream_line_static,
            show_below_min,
            show_above_max,
            color_scheme,
            colors,
            color_map,
            levels,
            blur_radius,
            add_degrees,
            units,
            extra_units,
            mask,
        );
        self.parent = over.parent.clone();
        self
    }
}

/// A fully resolved style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrictStyle {
    pub name: String,
    pub fill: FillMode,
    pub isolines: ColorMode,
    pub isoline_text: bool,
    pub vectors: VectorType,
    pub vector_color: ColorMode,
    pub vector_factor: f64,
    pub streamlines: ColorMode,
    pub stream_line_speed_factor: f64,
    pub stream_line_grid_step: u32,
    pub stream_line_steps: u32,
    pub stream_line_static: bool,
    pub show_below_min: bool,
    pub show_above_max: bool,
    pub color_scheme: String,
    pub colors: Option<Vec<String>>,
    pub color_map: Option<Vec<(f64, String)>>,
    pub levels: Option<Vec<f64>>,
    pub blur_radius: u32,
    pub add_degrees: f64,
    /// Display units; empty means "use the data units"
    pub units: String,
    pub extra_units: HashMap<String, UnitDef>,
    pub mask: MaskMode,
}

impl Default for StrictStyle {
    fn default() -> Self {
        Self {
            name: BASE_STYLE.to_string(),
            fill: FillMode::Gradient,
            isolines: ColorMode::None,
            isoline_text: true,
            vectors: VectorType::None,
            vector_color: ColorMode::Inverted,
            vector_factor: 1.0,
            streamlines: ColorMode::None,
            stream_line_speed_factor: 1.0,
            stream_line_grid_step: 64,
            stream_line_steps: 300,
            stream_line_static: false,
            show_below_min: true,
            show_above_max: true,
            color_scheme: "default".to_string(),
            colors: None,
            color_map: None,
            levels: None,
            blur_radius: 0,
            add_degrees: 0.0,
            units: String::new(),
            extra_units: HashMap::new(),
            mask: MaskMode::None,
        }
    }
}

impl StrictStyle {
    /// Populate every field of `style`, taking defaults for absent ones.
    pub fn from_partial(style: &ColorStyle) -> Self {
        let d = StrictStyle::default();
        Self {
            name: style.name.clone().unwrap_or(d.name),
            fill: style.fill.unwrap_or(d.fill),
            isolines: style.isolines.clone().unwrap_or(d.isolines),
            isoline_text: style.isoline_text.unwrap_or(d.isoline_text),
            vectors: style.vectors.unwrap_or(d.vectors),
            vector_color: style.vector_color.clone().unwrap_or(d.vector_color),
            vector_factor: style.vector_factor.unwrap_or(d.vector_factor),
            streamlines: style.streamlines.clone().unwrap_or(d.streamlines),
            stream_line_speed_factor: style
                .stream_line_speed_factor
                .unwrap_or(d.stream_line_speed_factor),
            stream_line_grid_step: style
                .stream_line_grid_step
                .filter(|&step| step > 0)
                .unwrap_or(d.stream_line_grid_step),
            stream_line_steps: style
                .stream_line_steps
                .filter(|&steps| steps > 0)
                .unwrap_or(d.stream_line_steps),
            stream_line_static: style.stream_line_static.unwrap_or(d.stream_line_static),
            show_below_min: style.show_below_min.unwrap_or(d.show_below_min),
            show_above_max: style.show_above_max.unwrap_or(d.show_above_max),
            color_scheme: style.color_scheme.clone().unwrap_or(d.color_scheme),
            colors: style.colors.clone(),
            color_map: style.color_map.clone(),
            levels: style.levels.clone(),
            blur_radius: style.blur_radius.unwrap_or(d.blur_radius),
            add_degrees: style.add_degrees.unwrap_or(d.add_degrees),
            units: style.units.clone().unwrap_or(d.units),
            extra_units: style.extra_units.clone().unwrap_or(d.extra_units),
            mask: style.mask.unwrap_or(d.mask),
        }
    }

    /// The built-in root style as a partial style.
    pub fn to_partial(&self) -> ColorStyle {
        ColorStyle {
            name: Some(self.name.clone()),
            parent: None,
            fill: Some(self.fill),
            isolines: Some(self.isolines.clone()),
            isoline_text: Some(self.isoline_text),
            vectors: Some(self.vectors),
            vector_color: Some(self.vector_color.clone()),
            vector_factor: Some(self.vector_factor),
            streamlines: Some(self.streamlines.clone()),
            stream_line_speed_factor: Some(self.stream_line_speed_factor),
            stream_line_grid_step: Some(self.stream_line_grid_step),
            stream_line_steps: Some(self.stream_line_steps),
            stream_line_static: Some(self.stream_line_static),
            show_below_min: Some(self.show_below_min),
            show_above_max: Some(self.show_above_max),
            color_scheme: Some(self.color_scheme.clone()),
            colors: self.colors.clone(),
            color_map: self.color_map.clone(),
            levels: self.levels.clone(),
            blur_radius: Some(self.blur_radius),
            add_degrees: Some(self.add_degrees),
            units: Some(self.units.clone()),
            extra_units: Some(self.extra_units.clone()),
            mask: Some(self.mask),
        }
    }

    /// Whether streamlines should be traced for vector tiles.
    pub fn wants_streamlines(&self) -> bool {
        !self.streamlines.is_none()
    }
}
