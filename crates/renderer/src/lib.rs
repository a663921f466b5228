//! Color tables for weather tile rendering.
//!
//! Turns a resolved style and a variable's data range into:
//! - a [`Clut`] mapping every raw 16-bit sample to a packed color and an
//!   isoline band index
//! - a [`Legend`] strip with labelled ticks
//!
//! Drawing pixels is left to the consumer of these tables.

pub mod clut;
pub mod color;
pub mod legend;
pub mod numbers;

pub use clut::{raw_code, Clut, NO_DATA, RAW_CODES};
pub use color::Color;
pub use legend::{build_legend, control_points, nice_levels, ControlPoint, Legend, Tick};
pub use numbers::format_label;
