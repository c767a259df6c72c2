//! Human-readable number formatting for reports.

use std::time::Duration;

use humansize::{BINARY, FormatSizeOptions, format_size};

/// Significant digits kept when a duration is rendered.
const DURATION_DIGITS: u32 = 3;

/// Thousands separators for an integer: `1234567` -> `1,234,567`.
#[must_use]
pub fn comma(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let grouped = group_thousands(&digits);
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Float with thousands separators, truncated (not rounded) to `decimals`
/// fractional digits: `-0.0488` with 2 digits -> `-0.04`.
#[must_use]
pub fn comma_float(value: f64, decimals: usize) -> String {
    let repr = format!("{}", value.abs());
    let (int_part, frac_part) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    let mut out = String::new();
    if value.is_sign_negative() && value != 0.0 {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));

    let frac: String = frac_part.chars().take(decimals).collect();
    if !frac.is_empty() {
        out.push('.');
        out.push_str(&frac);
    }
    out
}

/// Drop everything past the leading `digits` significant digits.
fn truncate_significant(value: u64, digits: u32) -> u64 {
    if value == 0 {
        return 0;
    }
    let len = value.ilog10() + 1;
    if len <= digits {
        return value;
    }
    let scale = 10u64.pow(len - digits);
    value / scale * scale
}

/// Nanoseconds as a duration: `10_000_000` -> `10ms`,
/// `1_234_567_891` -> `1s 230ms`. Negative input renders as zero.
#[must_use]
pub fn nanos(value: i64) -> String {
    let nanos = truncate_significant(u64::try_from(value).unwrap_or(0), DURATION_DIGITS);
    humantime::format_duration(Duration::from_nanos(nanos)).to_string()
}

/// IEC byte size: `2048 * 1024` -> `2.0 MiB`, `100 MiB` once the scaled
/// value reaches two digits.
#[must_use]
pub fn ibytes(value: u64) -> String {
    if value < 1024 {
        return format!("{value} B");
    }
    let formatted = format_size(
        value,
        FormatSizeOptions::from(BINARY)
            .decimal_places(1)
            .decimal_zeroes(1),
    );
    let two_digits = formatted
        .split_once(' ')
        .and_then(|(number, _)| number.parse::<f64>().ok())
        .is_some_and(|number| number >= 10.0);
    if two_digits && formatted.contains('.') {
        format_size(value, FormatSizeOptions::from(BINARY).decimal_places(0))
    } else {
        formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comma() {
        assert_eq!(comma(0), "0");
        assert_eq!(comma(999), "999");
        assert_eq!(comma(1000), "1,000");
        assert_eq!(comma(1_234_567), "1,234,567");
        assert_eq!(comma(-98_765), "-98,765");
    }

    #[test]
    fn test_comma_float_truncates() {
        assert_eq!(comma_float(100.0, 2), "100");
        assert_eq!(comma_float(-0.048_828_125, 2), "-0.04");
        assert_eq!(comma_float(12_345.678, 2), "12,345.67");
        assert_eq!(comma_float(0.5, 0), "0");
    }

    #[test]
    fn test_nanos() {
        assert_eq!(nanos(10_000_000), "10ms");
        assert_eq!(nanos(20_000_000), "20ms");
        assert_eq!(nanos(1_500_000_000), "1s 500ms");
        assert_eq!(nanos(2_000), "2us");
        assert_eq!(nanos(0), "0s");
        assert_eq!(nanos(-5), "0s");
    }

    #[test]
    fn test_nanos_keeps_three_significant_digits() {
        assert_eq!(nanos(1_234_567_891), "1s 230ms");
        assert_eq!(truncate_significant(999, 3), 999);
        assert_eq!(truncate_significant(123_456, 3), 123_000);
    }

    #[test]
    fn test_ibytes() {
        assert_eq!(ibytes(5), "5 B");
        assert_eq!(ibytes(1024), "1.0 KiB");
        assert_eq!(ibytes(2048 * 1024), "2.0 MiB");
        assert_eq!(ibytes(2047 * 1024), "2.0 MiB");
        assert_eq!(ibytes(1536), "1.5 KiB");
        assert_eq!(ibytes(100 * 1024 * 1024), "100 MiB");
    }
}
