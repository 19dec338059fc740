//! Number parsing and display formatting
//!
//! Formatting never emits `NaN`, `inf` or locale-dependent separators other
//! than the `,` grouping that `ThousandsGrouped` asks for, and every policy is
//! idempotent: formatting the parsed output again yields the same string.

use crate::core::relation::Computed;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Display policy for a field's numeric value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "arg", rename_all = "camelCase")]
pub enum FormatPolicy {
    /// Exactly `n` decimals
    Fixed(u32),
    /// `n` significant digits, never exponential
    Significant(u32),
    /// Up to `n` decimals, trailing zeros and dangling point removed
    TrimTrailingZeros(u32),
    /// `n` decimals with the leading zero dropped (".620")
    LeadingZeroStrip(u32),
    /// `n` decimals with `,` grouping of the integer part
    ThousandsGrouped(u32),
    /// Nearest integer, grouped
    CompositeRounded,
    /// Exponential notation with `digits` mantissa decimals when `0 < |v| < threshold`
    ExponentialBelow { threshold: f64, digits: u32 },
}

// Sign, digits with optional `,` groups, optional fraction, optional exponent.
// Using expect is safe here since the pattern is a compile-time constant
static NUMBER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(?:\d{1,3}(?:,\d{3})+|\d*)(?:\.\d*)?(?:[eE][+-]?\d+)?$")
        .expect("Failed to compile number pattern")
});

/// Parses user-typed or previously formatted text.
///
/// Returns `None` for text that is not (yet) a number, e.g. `"-"`, `"."`, `"1e"`.
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if !text.chars().any(|c| c.is_ascii_digit()) || !NUMBER_PATTERN.is_match(text) {
        return None;
    }
    // Exponent digits alone ("e5") are not a mantissa
    let mantissa = text.split(['e', 'E']).next().unwrap_or_default();
    if !mantissa.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    text.replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Formats a finite value; non-finite input renders blank
pub fn format(value: f64, policy: &FormatPolicy) -> String {
    if !value.is_finite() {
        return String::new();
    }

    match policy {
        FormatPolicy::Fixed(decimals) => fixed(value, *decimals),
        FormatPolicy::Significant(digits) => significant(value, *digits),
        FormatPolicy::TrimTrailingZeros(decimals) => trimmed(value, *decimals),
        FormatPolicy::LeadingZeroStrip(decimals) => strip_leading_zero(fixed(value, *decimals)),
        FormatPolicy::ThousandsGrouped(decimals) => grouped(fixed(value, *decimals)),
        FormatPolicy::CompositeRounded => grouped(fixed(value, 0)),
        FormatPolicy::ExponentialBelow { threshold, digits } => exponential_below(value, *threshold, *digits),
    }
}

/// Formats a relation outcome: blanks render empty, domain errors render the marker
pub fn format_computed(value: Computed, policy: &FormatPolicy, undefined_marker: &str) -> String {
    match value {
        Computed::Value(v) => format(v, policy),
        Computed::Blank => String::new(),
        Computed::Undefined => undefined_marker.to_string(),
    }
}

/// Re-formats previously displayed text; unparseable text renders blank
pub fn format_text(text: &str, policy: &FormatPolicy) -> String {
    parse_number(text)
        .map(|value| format(value, policy))
        .unwrap_or_default()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Rounds half away from zero on the decimal value
fn fixed(value: f64, decimals: u32) -> String {
    // Decimal keeps at most 28 fractional digits; finer grids would be zero padding
    let decimal = if decimals > Decimal::MAX_SCALE { None } else { Decimal::from_f64(value) };
    let Some(decimal) = decimal else {
        return normalize_zero(format!("{:.*}", decimals as usize, value));
    };

    let mut rounded = decimal.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        rounded = Decimal::ZERO;
    }

    let text = rounded.to_string();
    let (integer, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    if decimals == 0 {
        return integer.to_string();
    }

    let mut fraction = fraction.to_string();
    while fraction.len() < decimals as usize {
        fraction.push('0');
    }
    format!("{}.{}", integer, fraction)
}

fn normalize_zero(text: String) -> String {
    match text.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => rest.to_string(),
        _ => text,
    }
}

fn trim_zeros(text: String) -> String {
    if !text.contains('.') {
        return text;
    }
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn trimmed(value: f64, decimals: u32) -> String {
    trim_zeros(fixed(value, decimals))
}

fn significant(value: f64, digits: u32) -> String {
    let digits = digits.max(1) as i32;
    if value == 0.0 {
        return fixed(0.0, (digits - 1) as u32);
    }

    let magnitude = value.abs().log10().floor() as i32;
    if magnitude >= digits - 1 {
        // Integer digits exceed the budget: round away the low-order digits
        let scale = 10f64.powi(magnitude - digits + 1);
        return fixed((value / scale).round() * scale, 0);
    }

    let decimals = (digits - 1 - magnitude) as u32;
    let text = fixed(value, decimals);
    // 9.9996 -> 10.000 gains an integer digit; drop one decimal to stay at `digits`
    match parse_number(&text) {
        Some(rounded) if rounded.abs() >= 10f64.powi(magnitude + 1) && decimals > 0 => {
            fixed(value, decimals - 1)
        }
        _ => text,
    }
}

fn strip_leading_zero(text: String) -> String {
    if let Some(rest) = text.strip_prefix("0.") {
        format!(".{}", rest)
    } else if let Some(rest) = text.strip_prefix("-0.") {
        format!("-.{}", rest)
    } else {
        text
    }
}

// Helper to add thousands separators to the integer part
fn grouped(text: String) -> String {
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut result = String::new();
    let chars: Vec<char> = integer.chars().rev().collect();
    for (i, ch) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*ch);
    }
    let integer: String = result.chars().rev().collect();

    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, integer, fraction),
        None => format!("{}{}", sign, integer),
    }
}

fn exponential_below(value: f64, threshold: f64, digits: u32) -> String {
    if value == 0.0 {
        return "0".to_string();
    }

    let exponential = format!("{:.*e}", digits as usize, value);
    let rounded = exponential.parse::<f64>().unwrap_or(value);
    if rounded.abs() < threshold {
        return exponential;
    }

    // Decimal grid matches the mantissa grid just below the threshold
    let threshold_magnitude = if threshold > 0.0 { threshold.log10().floor() as i32 } else { 0 };
    let decimals = (digits as i32 + 1 - threshold_magnitude).max(digits as i32) as u32;
    trimmed(value, decimals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn all_policies() -> Vec<FormatPolicy> {
        vec![
            FormatPolicy::Fixed(0),
            FormatPolicy::Fixed(2),
            FormatPolicy::Fixed(4),
            FormatPolicy::Significant(3),
            FormatPolicy::Significant(6),
            FormatPolicy::TrimTrailingZeros(2),
            FormatPolicy::TrimTrailingZeros(6),
            FormatPolicy::LeadingZeroStrip(3),
            FormatPolicy::ThousandsGrouped(2),
            FormatPolicy::CompositeRounded,
            FormatPolicy::ExponentialBelow { threshold: 0.001, digits: 3 },
        ]
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("42"), Some(42.0));
        assert_eq!(parse_number(" -3.5 "), Some(-3.5));
        assert_eq!(parse_number(".620"), Some(0.62));
        assert_eq!(parse_number("-.5"), Some(-0.5));
        assert_eq!(parse_number("1,234.5"), Some(1234.5));
        assert_eq!(parse_number("1.5e-3"), Some(0.0015));
        assert_eq!(parse_number("7."), Some(7.0));
    }

    #[test]
    fn test_parse_rejects_partial_entry() {
        for text in ["", "-", ".", "-.", "1e", "e5", "abc", "1,23", "NaN", "inf", "1..2", "--1"] {
            assert_eq!(parse_number(text), None, "{:?} should not parse", text);
        }
    }

    #[test]
    fn test_fixed_rounds_half_away_from_zero() {
        assert_eq!(format(2.5, &FormatPolicy::Fixed(0)), "3");
        assert_eq!(format(-2.5, &FormatPolicy::Fixed(0)), "-3");
        assert_eq!(format(5.0, &FormatPolicy::Fixed(2)), "5.00");
        assert_eq!(format(0.125, &FormatPolicy::Fixed(2)), "0.13");
    }

    #[test]
    fn test_negative_zero_renders_unsigned() {
        assert_eq!(format(-0.0001, &FormatPolicy::Fixed(2)), "0.00");
        assert_eq!(format(-0.0001, &FormatPolicy::TrimTrailingZeros(2)), "0");
    }

    #[test]
    fn test_significant() {
        assert_eq!(format(0.0041322, &FormatPolicy::Significant(4)), "0.004132");
        assert_eq!(format(113.3980925, &FormatPolicy::Significant(7)), "113.3981");
        assert_eq!(format(9.9996, &FormatPolicy::Significant(4)), "10.00");
        assert_eq!(format(123456.0, &FormatPolicy::Significant(3)), "123000");
        assert_eq!(format(0.0, &FormatPolicy::Significant(3)), "0.00");
    }

    #[test]
    fn test_significant_below_decimal_scale() {
        let policy = FormatPolicy::Significant(6);
        let text = format(1.234567e-25, &policy);
        assert_eq!(text, format!("0.{}123457", "0".repeat(24)));
        assert_eq!(format_text(&text, &policy), text);

        let text = format(1e-30, &policy);
        assert_eq!(text, format!("0.{}100000", "0".repeat(29)));
        assert_eq!(format_text(&text, &policy), text);

        assert_eq!(format(1e-30, &FormatPolicy::Fixed(2)), "0.00");
    }

    #[test]
    fn test_trim_trailing_zeros() {
        assert_eq!(format(12.5, &FormatPolicy::TrimTrailingZeros(2)), "12.5");
        assert_eq!(format(12.567, &FormatPolicy::TrimTrailingZeros(2)), "12.57");
        assert_eq!(format(130000.0, &FormatPolicy::TrimTrailingZeros(3)), "130000");
    }

    #[test]
    fn test_leading_zero_strip() {
        assert_eq!(format(0.62, &FormatPolicy::LeadingZeroStrip(3)), ".620");
        assert_eq!(format(-0.5, &FormatPolicy::LeadingZeroStrip(3)), "-.500");
        assert_eq!(format(1.0, &FormatPolicy::LeadingZeroStrip(3)), "1.000");
    }

    #[test]
    fn test_thousands_grouping() {
        assert_eq!(format(1234567.891, &FormatPolicy::ThousandsGrouped(2)), "1,234,567.89");
        assert_eq!(format(-1234.0, &FormatPolicy::ThousandsGrouped(0)), "-1,234");
        assert_eq!(format(999.0, &FormatPolicy::ThousandsGrouped(0)), "999");
        assert_eq!(format(1234567.5, &FormatPolicy::CompositeRounded), "1,234,568");
    }

    #[test]
    fn test_exponential_below() {
        let policy = FormatPolicy::ExponentialBelow { threshold: 0.001, digits: 2 };
        assert_eq!(format(0.0000123, &policy), "1.23e-5");
        assert_eq!(format(0.5, &policy), "0.5");
        assert_eq!(format(0.0, &policy), "0");
    }

    #[test]
    fn test_non_finite_renders_blank() {
        for policy in all_policies() {
            assert_eq!(format(f64::NAN, &policy), "");
            assert_eq!(format(f64::INFINITY, &policy), "");
            assert_eq!(format(f64::NEG_INFINITY, &policy), "");
        }
    }

    #[test]
    fn test_computed_outcomes() {
        let policy = FormatPolicy::Fixed(2);
        assert_eq!(format_computed(Computed::Value(1.0), &policy, "Undefined"), "1.00");
        assert_eq!(format_computed(Computed::Blank, &policy, "Undefined"), "");
        assert_eq!(format_computed(Computed::Undefined, &policy, "Undefined"), "Undefined");
    }

    #[test]
    fn test_formatting_is_idempotent() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut samples = vec![
            0.0, 0.62, -0.5, 9.9996, 0.0009996, 1234567.5, 0.125, -2.5, 1e-9, 1e-30, 1.234567e-25, -3.5e-40,
        ];
        for _ in 0..600 {
            let exponent: i32 = rng.gen_range(-40..9);
            let mantissa: f64 = rng.gen_range(-10.0..10.0);
            samples.push(mantissa * 10f64.powi(exponent));
        }

        for policy in all_policies() {
            for value in &samples {
                let once = format(*value, &policy);
                let twice = format_text(&once, &policy);
                assert_eq!(once, twice, "{:?} not idempotent for {}", policy, value);
            }
        }
    }
}
