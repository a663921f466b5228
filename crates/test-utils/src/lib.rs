//! Fixtures and tile builders shared by the wx-tiles test suites.
//!
//! - [`generators`] builds raw 258x258 grids and encodes them the way the
//!   data service does (PNG tiles with the value range in the blue channel)
//!   plus 256x256 land/sea mask tiles.
//! - [`fixtures`] holds a dataset description and a style registry that
//!   agree with each other, and a temp-file helper for config loading.
//!
//! Pull it in as a dev-dependency: `test-utils = { path = "../test-utils" }`.

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

/// Asserts `|left - right| <= epsilon`, comparing as `f64`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}
