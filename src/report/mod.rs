//! Reporting engine (spec §4.5, component C8): flat per-thread/merged text
//! reports and DOT call-graph export. Every function returns a `String` (or
//! writes to a file for the DOT exporters) rather than printing directly, so
//! callers — the demo binary or a test — choose where the text goes.

pub mod dot;
pub mod flat;

/// Self-time percentage buckets used by the DOT exporters, matching the
/// original's `get_color_for_percentage` thresholds.
pub(crate) fn color_for_percentage(percent: f64) -> &'static str {
    if percent > 20.0 {
        "#FF0000"
    } else if percent > 10.0 {
        "#FF8800"
    } else if percent > 5.0 {
        "#FFFF00"
    } else if percent > 1.0 {
        "#88FF88"
    } else {
        "#AAAAFF"
    }
}
