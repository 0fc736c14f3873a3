//! Integer-cent money amounts
//!
//! Prices are carried as whole cents so that aggregation never accumulates
//! floating-point drift. Upstream decimal dollar strings are converted with
//! [`Cents::parse_dollars`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// An amount of money in cents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(pub i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    /// Parses a decimal dollar amount such as `"12.3450"` into cents.
    ///
    /// Rounds to the nearest cent, halves away from zero. Returns `None` for
    /// anything that is not a plain decimal number.
    pub fn parse_dollars(s: &str) -> Option<Cents> {
        let s = s.trim().trim_start_matches('$');
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return None;
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let whole: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
        let mut frac_digits = frac.bytes().map(|b| i64::from(b - b'0'));
        let tenths = frac_digits.next().unwrap_or(0);
        let hundredths = frac_digits.next().unwrap_or(0);
        let round_up = frac_digits.next().unwrap_or(0) >= 5;

        let mut cents = whole.checked_mul(100)? + tenths * 10 + hundredths;
        if round_up {
            cents += 1;
        }
        Some(Cents(if negative { -cents } else { cents }))
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dollars_plain() {
        assert_eq!(Cents::parse_dollars("12.34"), Some(Cents(1234)));
        assert_eq!(Cents::parse_dollars("7"), Some(Cents(700)));
        assert_eq!(Cents::parse_dollars(".5"), Some(Cents(50)));
        assert_eq!(Cents::parse_dollars("$3.10"), Some(Cents(310)));
    }

    #[test]
    fn test_parse_dollars_rounds_to_nearest_cent() {
        assert_eq!(Cents::parse_dollars("12.3450"), Some(Cents(1235)));
        assert_eq!(Cents::parse_dollars("12.3449"), Some(Cents(1234)));
        // 0.145 is not exactly representable as f64; string rounding still gets it right
        assert_eq!(Cents::parse_dollars("0.145"), Some(Cents(15)));
        assert_eq!(Cents::parse_dollars("0.9999"), Some(Cents(100)));
    }

    #[test]
    fn test_parse_dollars_negative() {
        assert_eq!(Cents::parse_dollars("-1.005"), Some(Cents(-101)));
    }

    #[test]
    fn test_parse_dollars_rejects_garbage() {
        assert_eq!(Cents::parse_dollars(""), None);
        assert_eq!(Cents::parse_dollars("."), None);
        assert_eq!(Cents::parse_dollars("abc"), None);
        assert_eq!(Cents::parse_dollars("1.2.3"), None);
        assert_eq!(Cents::parse_dollars("1e3"), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Cents(1234).to_string(), "$12.34");
        assert_eq!(Cents(5).to_string(), "$0.05");
        assert_eq!(Cents(-250).to_string(), "-$2.50");
    }

    #[test]
    fn test_serializes_as_plain_integer() {
        assert_eq!(serde_json::to_string(&Cents(999)).unwrap(), "999");
        let back: Cents = serde_json::from_str("42").unwrap();
        assert_eq!(back, Cents(42));
    }
}
