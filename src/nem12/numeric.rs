//! Decimal literal to `f64` conversion for interval values.
//!
//! Interval values are short plain decimals (`0.125`, `50.1`, `001123.5`), so
//! almost every value takes the exact path: the significant digits fit in a
//! `u64` mantissa with at most 52 bits, and the power of ten is small enough
//! to be represented exactly. Scaling an exact integer by an exact power of
//! ten is then a single correctly-rounded IEEE operation. Everything else
//! goes through the standard library's correctly-rounded parser.

use super::error::{lossy, RecordError};
use std::fmt::Write as _;

/// Significant decimal digits that always fit in a `u64`.
const MAX_MANTISSA_DIGITS: usize = 19;

/// Explicit mantissa bits of an `f64`.
const F64_MANTISSA_BITS: u32 = 52;

/// Integers up to 10^15 are exact in an `f64`.
const MAX_EXACT_INT: f64 = 1e15;

/// Powers of ten up to 10^22 are exact in an `f64`.
const POW10: [f64; 23] = [
    1e0, 1e1, 1e2, 1e3, 1e4, 1e5, 1e6, 1e7, 1e8, 1e9, 1e10, 1e11, 1e12, 1e13, 1e14, 1e15, 1e16,
    1e17, 1e18, 1e19, 1e20, 1e21, 1e22,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Decimal {
    mantissa: u64,
    exponent: i32,
    truncated: bool,
}

/// Scan `+?digits[.digits]` into a mantissa and base-10 exponent.
///
/// Returns `None` when no digit is present or any byte is left unconsumed.
fn scan(literal: &[u8]) -> Option<Decimal> {
    let mut i = 0;
    if literal.first() == Some(&b'+') {
        i = 1;
    }

    let mut mantissa = 0u64;
    let mut truncated = false;
    let mut saw_dot = false;
    let mut saw_digits = false;
    // Significant digits seen, and how many of them made it into the mantissa
    let mut nd = 0i32;
    let mut nd_mant = 0usize;
    // Decimal point position relative to the first significant digit
    let mut dp = 0i32;

    while i < literal.len() {
        let c = literal[i];
        i += 1;
        match c {
            b'.' => {
                if saw_dot {
                    return None;
                }
                saw_dot = true;
                dp = nd;
            }
            b'0'..=b'9' => {
                saw_digits = true;
                if c == b'0' && nd == 0 {
                    // Leading zero
                    dp -= 1;
                    continue;
                }
                nd += 1;
                if nd_mant < MAX_MANTISSA_DIGITS {
                    mantissa = mantissa * 10 + u64::from(c - b'0');
                    nd_mant += 1;
                } else if c != b'0' {
                    truncated = true;
                }
            }
            _ => return None,
        }
    }

    if !saw_digits {
        return None;
    }
    if !saw_dot {
        dp = nd;
    }

    let exponent = if mantissa == 0 {
        0
    } else {
        dp - nd_mant as i32
    };

    Some(Decimal {
        mantissa,
        exponent,
        truncated,
    })
}

/// `mantissa * 10^exponent` using only exact operands, or `None`.
fn exact(mantissa: u64, mut exponent: i32) -> Option<f64> {
    if mantissa >> F64_MANTISSA_BITS != 0 {
        return None;
    }
    let mut f = mantissa as f64;

    match exponent {
        0 => Some(f),
        1..=37 => {
            // Shift surplus zeros into the integer part while it stays exact
            if exponent > 22 {
                f *= POW10[(exponent - 22) as usize];
                exponent = 22;
            }
            if f > MAX_EXACT_INT {
                return None;
            }
            Some(f * POW10[exponent as usize])
        }
        -22..=-1 => Some(f / POW10[(-exponent) as usize]),
        _ => None,
    }
}

/// Correctly-rounded conversion of an already scanned literal.
///
/// Rewrites the literal as `<all digits>e-<fraction digits>`, which keeps
/// every significant digit and never needs a leading or trailing digit
/// around the decimal point.
fn nearest(literal: &[u8]) -> Option<f64> {
    let mut text = String::with_capacity(literal.len() + 8);
    let mut fraction_digits = 0usize;
    let mut in_fraction = false;
    for &c in literal {
        match c {
            b'0'..=b'9' => {
                text.push(char::from(c));
                if in_fraction {
                    fraction_digits += 1;
                }
            }
            b'.' => in_fraction = true,
            _ => {}
        }
    }
    write!(text, "e-{}", fraction_digits).ok()?;
    text.parse().ok()
}

/// Convert an interval value literal into the nearest `f64`.
///
/// Accepts an optional leading `+`, digits and at most one decimal point.
/// Exponents, signs other than a leading `+`, and any other byte are rejected.
pub fn parse_interval_value(literal: &[u8]) -> Result<f64, RecordError> {
    let decimal = scan(literal).ok_or_else(|| RecordError::InvalidNumericLiteral {
        literal: lossy(literal),
    })?;

    if !decimal.truncated {
        if let Some(f) = exact(decimal.mantissa, decimal.exponent) {
            return Ok(f);
        }
    }

    nearest(literal).ok_or_else(|| RecordError::InvalidNumericLiteral {
        literal: lossy(literal),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Canonical decimal text: no sign, no redundant leading or trailing zeros.
    fn normalize(literal: &str) -> String {
        let literal = literal.trim_start_matches('+');
        let (int, frac) = literal.split_once('.').unwrap_or((literal, ""));
        let int = int.trim_start_matches('0');
        let frac = frac.trim_end_matches('0');
        let int = if int.is_empty() { "0" } else { int };
        if frac.is_empty() {
            int.to_string()
        } else {
            format!("{}.{}", int, frac)
        }
    }

    #[test]
    fn test_scan_tracks_decimal_point() {
        let d = scan(b"0.05").unwrap();
        assert_eq!((d.mantissa, d.exponent, d.truncated), (5, -2, false));

        let d = scan(b"1.1").unwrap();
        assert_eq!((d.mantissa, d.exponent), (11, -1));

        let d = scan(b"100").unwrap();
        assert_eq!((d.mantissa, d.exponent), (100, 0));

        let d = scan(b"000").unwrap();
        assert_eq!((d.mantissa, d.exponent), (0, 0));
    }

    #[test]
    fn test_scan_truncates_past_nineteen_digits() {
        let d = scan(b"12345678901234567891234").unwrap();
        assert!(d.truncated);
        assert_eq!(d.mantissa, 1234567890123456789);
        assert_eq!(d.exponent, 4);

        // Trailing zeros past the cap are not truncation
        let d = scan(b"12345678901234567890000").unwrap();
        assert!(!d.truncated);
    }

    #[test]
    fn test_round_trip_short_literals() {
        let literals = [
            "0", "0.0", "0.000", "1", "1.1", "2.2", "+3.5", "050.250", "21.5", "001123.5",
            "0.125", "0.001", "99999.999", "123456789012345", "0.123456789012345",
            "1234567.89012345", "100", "100.", ".5",
        ];
        for literal in literals {
            let value = parse_interval_value(literal.as_bytes()).unwrap();
            assert_eq!(value.to_string(), normalize(literal), "literal {literal}");
        }
    }

    #[test]
    fn test_matches_std_parse_on_generated_literals() {
        // Deterministic LCG so the sample is reproducible
        let mut state = 0x2545_f491_4f6c_dd1du64;
        let mut next = || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            state >> 33
        };

        for _ in 0..5000 {
            let int_digits = (next() % 8) as usize;
            let frac_digits = (next() % 7) as usize;
            let mut literal = String::new();
            for _ in 0..int_digits {
                literal.push(char::from(b'0' + (next() % 10) as u8));
            }
            if frac_digits > 0 || int_digits == 0 {
                literal.push('.');
                for _ in 0..frac_digits.max(1) {
                    literal.push(char::from(b'0' + (next() % 10) as u8));
                }
            }

            let expected: f64 = literal.parse().unwrap();
            let actual = parse_interval_value(literal.as_bytes()).unwrap();
            assert_eq!(actual, expected, "literal {literal}");
        }
    }

    #[test]
    fn test_exponents_outside_exact_table_round_to_nearest() {
        assert_eq!(
            parse_interval_value(b"0.00000000000000000000001").unwrap(),
            1e-23
        );

        for zeros in 20..40 {
            for digits in ["1", "3", "7", "123456789012345"] {
                let small = format!("0.{}{}", "0".repeat(zeros), digits);
                let large = format!("{}{}", digits, "0".repeat(zeros));
                for literal in [small, large] {
                    let expected: f64 = literal.parse().unwrap();
                    let actual = parse_interval_value(literal.as_bytes()).unwrap();
                    assert_eq!(actual, expected, "literal {literal}");
                }
            }
        }
    }

    #[test]
    fn test_short_tiny_literals_round_trip() {
        for literal in [
            "0.00000000000000000000001",
            "0.0000000000000000000000123456789012345",
        ] {
            let value = parse_interval_value(literal.as_bytes()).unwrap();
            let expected: f64 = literal.parse().unwrap();
            assert_eq!(value.to_string(), expected.to_string(), "literal {literal}");
        }
    }

    #[test]
    fn test_truncated_mantissa_rounds_to_nearest() {
        for literal in [
            "123456789012345678901.5",
            "+0.12345678901234567890123456789",
            "9007199254740993",
            "99999999999999999999999999",
        ] {
            let expected: f64 = literal.trim_start_matches('+').parse().unwrap();
            let actual = parse_interval_value(literal.as_bytes()).unwrap();
            assert_eq!(actual, expected, "literal {literal}");
        }
    }

    #[test]
    fn test_rejects_invalid_literals() {
        for bad in ["", "+", ".", "-1.5", "1e5", "1.2.3", "NaN", "inf", "1,5", " 1", "12a"] {
            assert!(
                matches!(
                    parse_interval_value(bad.as_bytes()),
                    Err(RecordError::InvalidNumericLiteral { .. })
                ),
                "literal {bad:?}"
            );
        }
    }
}
