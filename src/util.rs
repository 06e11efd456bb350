// Utility helpers for decoding, parsing and formatting.
//
// This module centralizes all the "dirty" encoding/number/date handling so
// the rest of the code can assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Decode a legacy single-byte extract into a `String`.
///
/// The upstream files are written as ISO-8859-1; `encoding_rs` folds that
/// label into windows-1252, which is a superset on the bytes that occur in
/// practice. Decoding is total for single-byte encodings, so this never
/// fails.
pub fn decode_latin1(bytes: &[u8]) -> String {
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    text.into_owned()
}

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in CSV exports (commas, spaces).
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(",", "");
    s.parse::<f64>().ok()
}

/// Parse a week-commencing date.
///
/// The main extract variant uses day-first `DD/MM/YYYY`; the other writes
/// ISO `YYYY-MM-DD`. Both are accepted; anything else is `None` and the
/// caller decides whether that is fatal.
pub fn parse_week(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

/// Arithmetic mean; `None` for an empty slice so callers render a
/// placeholder instead of propagating NaN.
pub fn mean(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

/// Format a floating-point value with:
/// - a fixed number of decimal places, and
/// - locale-aware thousands separators (e.g., `1,234,567.89`).
pub fn format_number(n: f64, decimals: usize) -> String {
    let neg = n.is_sign_negative();
    let abs_n = n.abs();
    // First, format to a plain fixed-decimal string like `1234567.89`.
    let s = format!("{:.*}", decimals, abs_n);
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Use `num-format` to insert commas into the integer portion.
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    } else if decimals > 0 {
        res.push('.');
        res.push_str(&"0".repeat(decimals));
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

/// Thin wrapper around `num-format` for integer-like values. Used for row
/// counts in startup diagnostics (e.g., `9,855 rows loaded`).
pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_counts_with_separators() {
        assert_eq!(parse_f64_safe(Some("1,234.5")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some(" 80 ")), Some(80.0));
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(Some("n/a")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn parses_both_week_formats() {
        let expected = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        assert_eq!(parse_week("04/01/2021"), Some(expected));
        assert_eq!(parse_week("2021-01-04"), Some(expected));
        assert_eq!(parse_week("Jan 4th"), None);
        assert_eq!(parse_week("2021-13-40"), None);
    }

    #[test]
    fn decodes_latin1_bytes() {
        // 0xE9 is e-acute in ISO-8859-1.
        assert_eq!(decode_latin1(b"Caf\xe9"), "Café");
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[10.0, 20.0]), Some(15.0));
    }

    #[test]
    fn formats_numbers_with_commas() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(80.0, 0), "80");
        assert_eq!(format_number(-1200.0, 0), "-1,200");
    }
}
