//! Amount parsing and localized rendering.
//!
//! Raw amounts follow `<number>(,<decimal>)?<unit>` with a decimal comma and a
//! unit among `€`, `M€` (millions) and `Md€` (billions). Rendering uses French
//! conventions: decimal comma and U+202F grouping of integer digits.

/// Rendered for any zero (or unknown) amount
pub const ZERO_MARKER: &str = "0€";

/// Separator between groups of three integer digits
pub const GROUP_SEPARATOR: char = '\u{202F}';

const MILLION: f64 = 1_000_000.0;
const BILLION: f64 = 1_000_000_000.0;

/// Currency unit suffix of a raw or rendered amount
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Euro,
    Million,
    Billion,
}

impl Unit {
    pub fn symbol(&self) -> &'static str {
        match self {
            Unit::Euro => "€",
            Unit::Million => "M€",
            Unit::Billion => "Md€",
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            Unit::Euro => 1.0,
            Unit::Million => MILLION,
            Unit::Billion => BILLION,
        }
    }

    /// Split a raw amount into its number part and unit. Longest symbol first.
    fn split(raw: &str) -> Option<(&str, Unit)> {
        [Unit::Billion, Unit::Million, Unit::Euro]
            .into_iter()
            .find_map(|unit| raw.strip_suffix(unit.symbol()).map(|number| (number, unit)))
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse a raw amount into euros.
///
/// Anything outside the grammar yields 0, which renders as "no public
/// funding known".
pub fn parse_amount(raw: &str) -> f64 {
    let Some((number, unit)) = Unit::split(raw.trim()) else {
        return 0.0;
    };

    let (int_part, frac_part) = match number.split_once(',') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (number, ""),
    };
    let is_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if int_part.is_empty()
        || !is_digits(int_part)
        || !is_digits(frac_part)
        || (number.contains(',') && frac_part.is_empty())
    {
        return 0.0;
    }

    // Integer mantissa keeps "10,6M€" exact instead of 10.6 * 1e6
    let digits = format!("{}{}", int_part, frac_part);
    let Ok(mantissa) = digits.parse::<u64>() else {
        return 0.0;
    };
    let scale = 10f64.powi(frac_part.len() as i32);
    mantissa as f64 * unit.multiplier() / scale
}

// =============================================================================
// Rendering
// =============================================================================

/// Render a euro value for display.
///
/// Per-person values always show two decimals with the bare unit; otherwise
/// the unit is chosen by magnitude with at most one decimal.
pub fn format_value(value: f64, per_person: bool) -> String {
    if value == 0.0 || !value.is_finite() {
        return ZERO_MARKER.to_string();
    }

    if per_person {
        return format!("{}{}", format_decimal(value, 2, 2), Unit::Euro.symbol());
    }

    // Units follow the rounded value, so 999 960 000 reads "1Md€" not "1 000M€"
    let magnitude = value.abs();
    if magnitude >= BILLION || (magnitude / MILLION * 10.0).round() >= 10_000.0 {
        format!("{}{}", format_decimal(value / BILLION, 0, 1), Unit::Billion.symbol())
    } else if magnitude >= MILLION || magnitude.round() >= MILLION {
        format!("{}{}", format_decimal(value / MILLION, 0, 1), Unit::Million.symbol())
    } else {
        format!("{}{}", format_decimal(value, 0, 0), Unit::Euro.symbol())
    }
}

/// Decimal-comma rendering with between `min_frac` and `max_frac` digits
pub fn format_decimal(value: f64, min_frac: usize, max_frac: usize) -> String {
    let factor = 10u128.pow(max_frac as u32);
    // f64::round rounds half away from zero; the cast saturates
    let scaled = (value.abs() * factor as f64).round() as u128;
    let int_part = scaled / factor;
    let frac_part = scaled % factor;

    let mut out = String::new();
    if value < 0.0 && scaled != 0 {
        out.push('-');
    }
    out.push_str(&group_digits(int_part));

    if max_frac > 0 {
        let mut frac = format!("{:0width$}", frac_part, width = max_frac);
        while frac.len() > min_frac && frac.ends_with('0') {
            frac.pop();
        }
        if !frac.is_empty() {
            out.push(',');
            out.push_str(&frac);
        }
    }
    out
}

fn group_digits(n: u128) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(GROUP_SEPARATOR);
        }
        out.push(ch);
    }
    out
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6 * b.abs().max(1.0)
    }

    #[test]
    fn test_parse_millions_with_decimal() {
        assert_eq!(parse_amount("10,6M€"), 10_600_000.0);
        assert_eq!(parse_amount("8,3M€"), 8_300_000.0);
        assert_eq!(parse_amount("0,1M€"), 100_000.0);
    }

    #[test]
    fn test_parse_billions() {
        assert_eq!(parse_amount("2,5Md€"), 2_500_000_000.0);
        assert!(approx(parse_amount("2500Md€"), 2.5e12));
    }

    #[test]
    fn test_parse_bare_and_zero() {
        assert_eq!(parse_amount("300€"), 300.0);
        assert_eq!(parse_amount("0€"), 0.0);
        assert_eq!(parse_amount("630M€"), 630_000_000.0);
    }

    #[test]
    fn test_parse_malformed_is_zero() {
        for raw in ["", "M€", "abc", "10.6M€", "10,M€", ",5M€", "12", "1 000€", "-3M€", "10,6 M€"] {
            assert_eq!(parse_amount(raw), 0.0, "raw {:?}", raw);
        }
    }

    #[test]
    fn test_format_zero() {
        assert_eq!(format_value(0.0, false), "0€");
        assert_eq!(format_value(0.0, true), "0€");
        assert_eq!(format_value(f64::NAN, false), "0€");
    }

    #[test]
    fn test_format_millions() {
        assert_eq!(format_value(10_600_000.0, false), "10,6M€");
        assert_eq!(format_value(8_000_000.0, false), "8M€");
        assert_eq!(format_value(630_000_000.0, false), "630M€");
    }

    #[test]
    fn test_format_billions() {
        assert_eq!(format_value(2_500_000_000.0, false), "2,5Md€");
        assert_eq!(format_value(2.5e12, false), "2\u{202F}500Md€");
    }

    #[test]
    fn test_unit_follows_rounded_value() {
        assert_eq!(format_value(999_960_000.0, false), "1Md€");
        assert_eq!(format_value(999_940_000.0, false), "999,9M€");
        assert_eq!(format_value(999_999.7, false), "1M€");
        assert_eq!(format_value(999_999.4, false), "999\u{202F}999€");
        // Per-month division lands just under the billion
        assert_eq!(format_value(11_999_940_000.0 / 12.0, false), "1Md€");
    }

    #[test]
    fn test_format_below_million() {
        assert_eq!(format_value(691_666.67, false), "691\u{202F}667€");
        assert_eq!(format_value(300.0, false), "300€");
    }

    #[test]
    fn test_format_per_person_two_decimals() {
        assert_eq!(format_value(6_300_000.0 / 68_000_000.0, true), "0,09€");
        // Magnitude never switches the unit
        assert_eq!(format_value(2_500_000.0, true), "2\u{202F}500\u{202F}000,00€");
        assert_eq!(format_value(1.5, true), "1,50€");
    }

    #[test]
    fn test_round_trip_representative() {
        assert_eq!(format_value(parse_amount("10,6M€"), false), "10,6M€");
        assert_eq!(format_value(parse_amount("2,5Md€"), false), "2,5Md€");
        assert_eq!(format_value(parse_amount("0,8M€"), false), "800\u{202F}000€");
    }

    #[test]
    fn test_format_decimal_rounding() {
        assert_eq!(format_decimal(10.66, 0, 1), "10,7");
        assert_eq!(format_decimal(10.04, 0, 1), "10");
        assert_eq!(format_decimal(0.125, 2, 2), "0,13");
        assert_eq!(format_decimal(1234567.0, 0, 0), "1\u{202F}234\u{202F}567");
    }
}
