//! # Volume Engine
//!
//! Pure computation for trapezoidal-prism measurements: parses free-form
//! feet.inches strings, reduces repeated on-site readings to a single value,
//! derives the trapezoidal cross-section width, and computes volume in cubic
//! feet and cubic meters.
//!
//! ## Design Philosophy
//!
//! - **Total**: every function here accepts arbitrary strings and never
//!   returns an error. The caller is a live data-entry surface; a half-typed
//!   field must compute to zero, not crash.
//! - **Stateless**: no hidden state, no clock, no randomness. Identical
//!   inputs produce bit-identical outputs.
//! - **Zero on failure**: unparseable or degenerate input degrades to 0 at
//!   every stage.
//!
//! ## Feet.Inches Notation
//!
//! Digits after a single decimal point denote inches (base 12), not decimal
//! feet: `"5.6"` is 5 ft 6 in = 5.5 ft, and `"5.10"` is 5 ft 10 in ≈ 5.833 ft.
//! A string without a decimal point is plain decimal feet.
//!
//! ## Example
//!
//! ```rust
//! use volbook_core::engine::compute_volume;
//!
//! let vol = compute_volume("10", "5+5+5", "4+4+4", "6");
//! assert!((vol.vol_ft3.value() - 250.0).abs() < 1e-9);
//! assert!((vol.vol_m3.value() - 250.0 / 35.315).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

use crate::units::{CubicFeet, CubicMeters, Feet};

/// Computed volume for one measurement row.
///
/// Both fields are guaranteed non-negative and finite; any parse failure or
/// non-finite intermediate collapses to exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct VolumeResult {
    /// Volume in cubic feet
    pub vol_ft3: CubicFeet,
    /// Volume in cubic meters
    pub vol_m3: CubicMeters,
}

/// Parse a feet.inches string to decimal feet.
///
/// - `"5.6"` → 5 ft 6 in = 5.5
/// - `"5.10"` → 5 ft 10 in ≈ 5.8333
/// - `"5"` → 5.0 (no decimal point: plain decimal feet)
/// - `""` / `"abc"` → 0.0
///
/// With a decimal point present, the left side parses as feet and the right
/// side as inches; either side falls back to 0 on failure. Anything after a
/// second decimal point is ignored.
pub fn parse_feet_inches(value: &str) -> Feet {
    let s = value.trim();
    if s.is_empty() {
        return Feet(0.0);
    }

    let mut parts = s.split('.');
    let first = parts.next().unwrap_or("");
    match parts.next() {
        // Just feet, no inches
        None => Feet(parse_fragment(first)),
        Some(second) => {
            let feet = parse_fragment(first);
            let inches = parse_fragment(second);
            Feet(feet + inches / 12.0)
        }
    }
}

/// Parse a numeric fragment, falling back to 0 when it is not a number.
///
/// Rust float parsing accepts the literal spelling "NaN"; that counts as a
/// failed parse here so the parser itself never yields NaN.
fn parse_fragment(s: &str) -> f64 {
    match s.trim().parse::<f64>() {
        Ok(v) if !v.is_nan() => v,
        _ => 0.0,
    }
}

/// Parse a string of readings separated by `+`.
///
/// Tokens are trimmed, blank tokens are dropped, and each remaining token is
/// parsed as feet.inches. Order is preserved: the averager inspects the first
/// three readings positionally.
///
/// `"5+5+5"` → `[5.0, 5.0, 5.0]`; `"5+ +6"` → `[5.0, 6.0]`; `""` → `[]`.
pub fn parse_readings(input: &str) -> Vec<Feet> {
    if input.trim().is_empty() {
        return Vec::new();
    }

    input
        .split('+')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(parse_feet_inches)
        .collect()
}

/// Reduce a sequence of readings to a single representative value.
///
/// The field convention for repeated on-site measurements looks at the first
/// three valid readings:
///
/// - **Rule A (Uniform)**: all three equal → that value.
/// - **Rule B (One Variation)**: exactly two equal → average of the two
///   *unequal* values.
/// - **Rule C (Irregular)**: all three distinct → mean of all three.
///
/// Fewer than three valid readings average arithmetically; readings past the
/// third are ignored. Non-finite readings are filtered out before the rules
/// apply. Equality is exact f64 equality, no epsilon — the convention is
/// inherited from hand-kept measurement books where readings are short
/// decimal strings.
pub fn average_readings(readings: &[Feet]) -> Feet {
    if readings.is_empty() {
        return Feet(0.0);
    }
    if readings.len() == 1 {
        return readings[0];
    }

    let valid: Vec<f64> = readings
        .iter()
        .map(|r| r.0)
        .filter(|v| v.is_finite())
        .collect();
    if valid.is_empty() {
        return Feet(0.0);
    }

    if valid.len() < 3 {
        let sum: f64 = valid.iter().sum();
        return Feet(sum / valid.len() as f64);
    }

    let (a, b, c) = (valid[0], valid[1], valid[2]);

    // Rule A: all equal
    if a == b && b == c {
        return Feet(a);
    }

    // Rule B: two equal, one different
    if a == b && a != c {
        return Feet((a + c) / 2.0);
    }
    if a == c && a != b {
        return Feet((a + b) / 2.0);
    }
    if b == c && b != a {
        return Feet((a + b) / 2.0);
    }

    // Rule C: all different
    Feet((a + b + c) / 3.0)
}

/// Compute the volume for one measurement row from its four raw fields.
///
/// The cross-section is a trapezoid: its effective width is the mean of the
/// averaged top reading and the bed width.
///
/// ```text
/// width   = (top_avg + bed_width) / 2
/// vol_ft3 = length * height_avg * width
/// vol_m3  = vol_ft3 / 35.315
/// ```
///
/// This is a total function: malformed input at any stage degrades to zero
/// and nothing here ever panics or errors.
pub fn compute_volume(
    length: &str,
    height_readings: &str,
    top_readings: &str,
    bed_width: &str,
) -> VolumeResult {
    let length_ft = parse_feet_inches(length);
    let bed_width_ft = parse_feet_inches(bed_width);

    let height_avg = average_readings(&parse_readings(height_readings));
    let top_avg = average_readings(&parse_readings(top_readings));

    // Trapezoidal width: mean of the top measurement and the bed width
    let width_ft = (top_avg.0 + bed_width_ft.0) / 2.0;

    let vol_ft3 = CubicFeet(sanitize(length_ft.0 * height_avg.0 * width_ft));
    let vol_m3: CubicMeters = vol_ft3.into();

    VolumeResult { vol_ft3, vol_m3 }
}

/// Collapse non-finite and negative results to exactly zero.
///
/// Outputs of the engine are guaranteed non-negative finite numbers; negative
/// intermediate products only arise from sign typos in the field data.
fn sanitize(v: f64) -> f64 {
    if !v.is_finite() || v < 0.0 {
        0.0
    } else {
        v
    }
}

/// Round a value for display to the given number of decimal places.
///
/// Non-finite input formats as 0.0. Presentation only: totals are computed by
/// summing un-rounded values and rounding the displayed sum.
pub fn format_for_display(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}

#[cfg(test)]
mod tests {
    use super::*;

    // === Feet-Inches Parser ===

    #[test]
    fn test_parse_feet_inches_notation() {
        assert_eq!(parse_feet_inches("5.6").0, 5.5);
        assert!((parse_feet_inches("5.10").0 - (5.0 + 10.0 / 12.0)).abs() < 1e-12);
        assert_eq!(parse_feet_inches("5").0, 5.0);
    }

    #[test]
    fn test_parse_empty_and_garbage() {
        assert_eq!(parse_feet_inches("").0, 0.0);
        assert_eq!(parse_feet_inches("   ").0, 0.0);
        assert_eq!(parse_feet_inches("abc").0, 0.0);
        // Partial garbage: each side falls back independently
        assert_eq!(parse_feet_inches("abc.6").0, 0.5);
        assert_eq!(parse_feet_inches("5.xyz").0, 5.0);
    }

    #[test]
    fn test_parse_without_decimal_is_plain_feet() {
        // No decimal point: decimal feet, NOT inches
        assert_eq!(parse_feet_inches("12").0, 12.0);
        assert_eq!(parse_feet_inches("0").0, 0.0);
    }

    #[test]
    fn test_parse_nan_spelling_is_failure() {
        assert_eq!(parse_feet_inches("nan").0, 0.0);
        assert_eq!(parse_feet_inches("NaN.6").0, 0.5);
    }

    #[test]
    fn test_parse_trailing_dot() {
        // "5." splits into feet "5" and an empty inches fragment
        assert_eq!(parse_feet_inches("5.").0, 5.0);
    }

    #[test]
    fn test_parse_extra_decimal_points_ignored() {
        // Only the first two segments participate
        assert!((parse_feet_inches("5.6.9").0 - 5.5).abs() < 1e-12);
    }

    // === Readings Tokenizer ===

    #[test]
    fn test_parse_readings_basic() {
        let readings = parse_readings("5+5+5");
        assert_eq!(readings, vec![Feet(5.0), Feet(5.0), Feet(5.0)]);
    }

    #[test]
    fn test_parse_readings_empty() {
        assert!(parse_readings("").is_empty());
        assert!(parse_readings("   ").is_empty());
    }

    #[test]
    fn test_parse_readings_drops_blank_tokens() {
        let readings = parse_readings("5+ +6");
        assert_eq!(readings, vec![Feet(5.0), Feet(6.0)]);
    }

    #[test]
    fn test_parse_readings_mixed_notation() {
        let readings = parse_readings("4.6+5");
        assert_eq!(readings, vec![Feet(4.5), Feet(5.0)]);
    }

    // === Reading Averager ===

    #[test]
    fn test_average_rule_a_uniform() {
        assert_eq!(average_readings(&[Feet(5.0), Feet(5.0), Feet(5.0)]).0, 5.0);
    }

    #[test]
    fn test_average_rule_b_one_variation() {
        // a==b!=c → (a+c)/2
        assert_eq!(average_readings(&[Feet(5.0), Feet(5.0), Feet(8.0)]).0, 6.5);
        // a==c!=b → (a+b)/2
        assert_eq!(average_readings(&[Feet(5.0), Feet(8.0), Feet(5.0)]).0, 6.5);
        // b==c!=a → (a+b)/2
        assert_eq!(average_readings(&[Feet(8.0), Feet(5.0), Feet(5.0)]).0, 6.5);
    }

    #[test]
    fn test_average_rule_c_irregular() {
        assert_eq!(average_readings(&[Feet(4.0), Feet(5.0), Feet(6.0)]).0, 5.0);
    }

    #[test]
    fn test_average_degenerate_counts() {
        assert_eq!(average_readings(&[]).0, 0.0);
        assert_eq!(average_readings(&[Feet(7.0)]).0, 7.0);
        assert_eq!(average_readings(&[Feet(4.0), Feet(6.0)]).0, 5.0);
    }

    #[test]
    fn test_average_ignores_readings_past_third() {
        // Only the first three participate
        assert_eq!(
            average_readings(&[Feet(5.0), Feet(5.0), Feet(5.0), Feet(9.0)]).0,
            5.0
        );
    }

    #[test]
    fn test_average_filters_non_finite() {
        // NaN/Infinity never participate in the three-reading rules
        let avg = average_readings(&[Feet(f64::NAN), Feet(4.0), Feet(6.0)]);
        assert_eq!(avg.0, 5.0);
        let avg = average_readings(&[Feet(f64::INFINITY), Feet(f64::NAN)]);
        assert_eq!(avg.0, 0.0);
    }

    // === Volume Calculator ===

    #[test]
    fn test_compute_volume_worked_example() {
        // heightAvg=5, topAvg=4, width=(4+6)/2=5, vol=10*5*5=250 ft³
        let vol = compute_volume("10", "5+5+5", "4+4+4", "6");
        assert!((vol.vol_ft3.0 - 250.0).abs() < 1e-9);
        assert!((vol.vol_m3.0 - 250.0 / 35.315).abs() < 1e-12);
    }

    #[test]
    fn test_compute_volume_all_empty() {
        let vol = compute_volume("", "", "", "");
        assert_eq!(vol.vol_ft3.0, 0.0);
        assert_eq!(vol.vol_m3.0, 0.0);
    }

    #[test]
    fn test_compute_volume_feet_inches_length() {
        // "5.6" = 5.5 ft
        let vol = compute_volume("5.6", "2", "4", "4");
        assert!((vol.vol_ft3.0 - 5.5 * 2.0 * 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_compute_volume_idempotent() {
        let a = compute_volume("10.3", "5+5.6+5", "4+4+5", "6.2");
        let b = compute_volume("10.3", "5+5.6+5", "4+4+5", "6.2");
        assert_eq!(a.vol_ft3.0.to_bits(), b.vol_ft3.0.to_bits());
        assert_eq!(a.vol_m3.0.to_bits(), b.vol_m3.0.to_bits());
    }

    #[test]
    fn test_compute_volume_monotonic_in_length() {
        let short = compute_volume("10", "5+5+5", "4+4+4", "6");
        let long = compute_volume("11", "5+5+5", "4+4+4", "6");
        assert!(long.vol_ft3.0 >= short.vol_ft3.0);
    }

    #[test]
    fn test_compute_volume_never_negative() {
        let vol = compute_volume("-10", "5+5+5", "4+4+4", "6");
        assert_eq!(vol.vol_ft3.0, 0.0);
        assert_eq!(vol.vol_m3.0, 0.0);
    }

    #[test]
    fn test_compute_volume_non_finite_collapses_to_zero() {
        // Rust float parsing accepts "inf"; the result must still be exactly 0
        let vol = compute_volume("inf", "5", "4", "6");
        assert_eq!(vol.vol_ft3.0, 0.0);
        assert_eq!(vol.vol_m3.0, 0.0);
    }

    // === Number Formatter ===

    #[test]
    fn test_format_for_display() {
        assert_eq!(format_for_display(7.08067, 2), 7.08);
        assert_eq!(format_for_display(2.5, 0), 3.0);
        assert_eq!(format_for_display(1.005e2, 1), 100.5);
    }

    #[test]
    fn test_format_non_finite_is_zero() {
        assert_eq!(format_for_display(f64::NAN, 2), 0.0);
        assert_eq!(format_for_display(f64::INFINITY, 2), 0.0);
    }
}
