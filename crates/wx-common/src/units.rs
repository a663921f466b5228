//! Physical units and affine conversions between them.
//!
//! Every unit is defined relative to a base unit of the same dimension:
//! `value_in_base = value * scale + offset`. Two units convert into each
//! other only when they share a base.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Base unit of all angular units. Variables in these units are resampled
/// with circular interpolation.
pub const ANGULAR_BASE: &str = "degree";

/// Definition of a unit relative to its base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDef {
    /// Name of the base unit (dimension identifier)
    pub base: String,

    /// Multiplier into the base unit
    #[serde(default = "default_scale")]
    pub scale: f64,

    /// Added after scaling (e.g. 273.15 for Celsius -> Kelvin)
    #[serde(default)]
    pub offset: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl UnitDef {
    pub fn new(base: impl Into<String>, scale: f64, offset: f64) -> Self {
        Self {
            base: base.into(),
            scale,
            offset,
        }
    }

    pub fn is_angular(&self) -> bool {
        self.base == ANGULAR_BASE
    }
}

/// Affine conversion `y = x * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConverter {
    pub scale: f64,
    pub offset: f64,
}

impl Default for UnitConverter {
    fn default() -> Self {
        Self::identity()
    }
}

impl UnitConverter {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
        }
    }

    /// Converter from `from` into `to`, or `None` when the units measure
    /// different dimensions or a scale is degenerate.
    pub fn between(from: &UnitDef, to: &UnitDef) -> Option<Self> {
        if from.base != to.base || to.scale == 0.0 || from.scale == 0.0 {
            return None;
        }
        Some(Self {
            scale: from.scale / to.scale,
            offset: (from.offset - to.offset) / to.scale,
        })
    }

    pub fn apply(&self, value: f64) -> f64 {
        value * self.scale + self.offset
    }

    /// Reverse conversion (target units back into source units).
    pub fn invert(&self, value: f64) -> f64 {
        (value - self.offset) / self.scale
    }

    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }
}

/// Units known without any configuration.
pub fn builtin_units() -> HashMap<String, UnitDef> {
    let table: &[(&str, &str, f64, f64)] = &[
        // speed
        ("m/s", "m/s", 1.0, 0.0),
        ("knots", "m/s", 0.514444, 0.0),
        ("kn", "m/s", 0.514444, 0.0),
        ("km/h", "m/s", 1.0 / 3.6, 0.0),
        ("mph", "m/s", 0.44704, 0.0),
        // temperature
        ("K", "K", 1.0, 0.0),
        ("C", "K", 1.0, 273.15),
        ("F", "K", 5.0 / 9.0, 273.15 - 32.0 * 5.0 / 9.0),
        // length
        ("m", "m", 1.0, 0.0),
        ("cm", "m", 0.01, 0.0),
        ("mm", "m", 0.001, 0.0),
        ("km", "m", 1000.0, 0.0),
        ("ft", "m", 0.3048, 0.0),
        ("in", "m", 0.0254, 0.0),
        // pressure
        ("Pa", "Pa", 1.0, 0.0),
        ("hPa", "Pa", 100.0, 0.0),
        ("mb", "Pa", 100.0, 0.0),
        ("kPa", "Pa", 1000.0, 0.0),
        // precipitation rate
        ("mm/h", "mm/h", 1.0, 0.0),
        ("in/h", "mm/h", 25.4, 0.0),
        // angles
        ("degree", ANGULAR_BASE, 1.0, 0.0),
        ("deg", ANGULAR_BASE, 1.0, 0.0),
        ("rad", ANGULAR_BASE, 180.0 / std::f64::consts::PI, 0.0),
        // time
        ("s", "s", 1.0, 0.0),
        ("min", "s", 60.0, 0.0),
        ("h", "s", 3600.0, 0.0),
        // dimensionless
        ("%", "%", 1.0, 0.0),
        ("fraction", "%", 100.0, 0.0),
    ];

    table
        .iter()
        .map(|(name, base, scale, offset)| (name.to_string(), UnitDef::new(*base, *scale, *offset)))
        .collect()
}
