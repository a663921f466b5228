//! Compact number formatting for legend and isoline labels.

/// Format a value for a label.
///
/// - `0` prints as `0`
/// - magnitudes below 0.1 use scientific notation with two decimals
/// - otherwise the shortest representation, truncated (not rounded) to two
///   decimals when it has more
pub fn format_label(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    if value.abs() < 0.1 {
        return format!("{:.2e}", value);
    }

    let text = value.to_string();
    match text.split_once('.') {
        Some((int_part, decimals)) if decimals.len() > 2 => {
            format!("{}.{}", int_part, &decimals[..2])
        }
        _ => text,
    }
}
