//! # Money Module
//!
//! Rounding rules and the minor-unit `Money` type.
//!
//! ## Why Decimal-String Rounding?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    1.005 * 100 = 100.49999999999999  → rounds to 1.00  ❌               │
//! │                                                                         │
//! │  OUR SOLUTION: round the shortest decimal form of the f64               │
//! │    format!("{}", 1.005) = "1.005"     → rounds to 1.01  ✅              │
//! │                                                                         │
//! │  The digits the user typed are the digits we round.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::money::{Money, RoundingMode};
//!
//! let line = Money::from_amount(19.995, 2, RoundingMode::HalfAwayFromZero).unwrap();
//! assert_eq!(line.minor(), 2000);
//!
//! let total: Money = [line, Money::from_minor(550)].into_iter().sum();
//! assert_eq!(total.minor(), 2550);
//! ```

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Rounding Mode
// =============================================================================

/// How a value exactly halfway between two representable amounts is
/// rounded.
///
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────┐
/// │  value   HalfAwayFromZero   HalfEven                                │
/// │  0.125        0.13            0.12                                  │
/// │  0.135        0.14            0.14                                  │
/// │ -0.125       -0.13           -0.12                                  │
/// │  2.5 (0dp)    3               2                                     │
/// └─────────────────────────────────────────────────────────────────────┘
/// ```
///
/// `HalfAwayFromZero` is the default, matching browser locale formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum RoundingMode {
    #[default]
    HalfAwayFromZero,
    HalfEven,
}

/// A non-negative magnitude split into integer and fraction digits, plus a
/// sign. Produced by rounding, consumed by the formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Rounded {
    pub negative: bool,
    /// No leading zeros, but never empty ("0").
    pub integer: String,
    /// Exactly `places` digits.
    pub fraction: String,
}

/// Rounds `amount` to `places` fraction digits.
///
/// Returns `None` for NaN and infinities. A result that rounds to zero is
/// never negative.
pub(crate) fn round_decimal(amount: f64, places: u8, mode: RoundingMode) -> Option<Rounded> {
    if !amount.is_finite() {
        return None;
    }

    let places = places as usize;
    // Display for f64 is the shortest round-trip form and never uses exponents.
    let repr = amount.abs().to_string();
    let (int_str, frac_str) = repr.split_once('.').unwrap_or((repr.as_str(), ""));

    let to_digits = |s: &str| s.bytes().map(|b| b - b'0').collect::<Vec<u8>>();
    let mut digits = to_digits(int_str);
    let frac = to_digits(frac_str);

    let kept = frac.len().min(places);
    digits.extend_from_slice(&frac[..kept]);
    digits.resize(int_str.len() + places, 0);

    let dropped = &frac[kept..];
    let round_up = match dropped.split_first() {
        None => false,
        Some((&first, rest)) => match mode {
            RoundingMode::HalfAwayFromZero => first >= 5,
            RoundingMode::HalfEven => {
                first > 5
                    || (first == 5
                        && (rest.iter().any(|&d| d != 0)
                            || digits.last().is_some_and(|d| d % 2 == 1)))
            }
        },
    };

    if round_up {
        increment(&mut digits);
    }

    let is_zero = digits.iter().all(|&d| d == 0);
    let split = digits.len() - places;
    let to_string = |ds: &[u8]| ds.iter().map(|d| char::from(b'0' + d)).collect::<String>();

    let integer = to_string(&digits[..split]);
    let integer = match integer.trim_start_matches('0') {
        "" => "0".to_string(),
        trimmed => trimmed.to_string(),
    };

    Some(Rounded {
        negative: amount < 0.0 && !is_zero,
        integer,
        fraction: to_string(&digits[split..]),
    })
}

/// Adds one unit in the last place, carrying leftwards.
fn increment(digits: &mut Vec<u8>) {
    for d in digits.iter_mut().rev() {
        if *d == 9 {
            *d = 0;
        } else {
            *d += 1;
            return;
        }
    }
    digits.insert(0, 1);
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest unit of the currency it is used with
/// (cents for USD, whole yen for JPY).
///
/// `Money` does not carry its currency: the scale comes from the active
/// currency's `decimal_places` at the point of conversion or formatting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Rounds a user-entered amount into minor units.
    ///
    /// Returns `None` for non-finite input or when the result does not fit
    /// in an `i64`.
    pub fn from_amount(amount: f64, decimal_places: u8, mode: RoundingMode) -> Option<Self> {
        let rounded = round_decimal(amount, decimal_places, mode)?;
        let magnitude: i64 = format!("{}{}", rounded.integer, rounded.fraction)
            .parse()
            .ok()?;
        Some(Money(if rounded.negative { -magnitude } else { magnitude }))
    }

    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Converts back to a floating-point amount (for display math only).
    pub fn to_amount(&self, decimal_places: u8) -> f64 {
        self.0 as f64 / 10f64.powi(decimal_places as i32)
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.saturating_abs())
    }

    /// `None` when the sum leaves the `i64` range.
    #[inline]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// `None` when the product leaves the `i64` range.
    #[inline]
    pub const fn checked_mul(self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Splits into integer and fraction digits for the formatter. Works on
    /// the decimal digits, so any `decimal_places` is accepted.
    pub(crate) fn to_rounded(self, decimal_places: u8) -> Rounded {
        let places = decimal_places as usize;
        let digits = format!("{:0>width$}", self.0.unsigned_abs(), width = places + 1);
        let (integer, fraction) = digits.split_at(digits.len() - places);
        Rounded {
            negative: self.0 < 0,
            integer: integer.to_string(),
            fraction: fraction.to_string(),
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

// Operators saturate at the i64 bounds. Use `checked_add` / `checked_mul`
// to detect overflow.

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

/// Multiplication by a quantity (invoice line items).
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn round(amount: f64, places: u8, mode: RoundingMode) -> String {
        let r = round_decimal(amount, places, mode).unwrap();
        let sign = if r.negative { "-" } else { "" };
        if r.fraction.is_empty() {
            format!("{sign}{}", r.integer)
        } else {
            format!("{sign}{}.{}", r.integer, r.fraction)
        }
    }

    #[test]
    fn test_half_away_from_zero() {
        let mode = RoundingMode::HalfAwayFromZero;
        assert_eq!(round(0.125, 2, mode), "0.13");
        assert_eq!(round(-0.125, 2, mode), "-0.13");
        assert_eq!(round(2.5, 0, mode), "3");
        assert_eq!(round(1.005, 2, mode), "1.01");
        assert_eq!(round(1234.5, 2, mode), "1234.50");
    }

    #[test]
    fn test_half_even() {
        let mode = RoundingMode::HalfEven;
        assert_eq!(round(0.125, 2, mode), "0.12");
        assert_eq!(round(0.135, 2, mode), "0.14");
        assert_eq!(round(2.5, 0, mode), "2");
        assert_eq!(round(3.5, 0, mode), "4");
        // Anything past the half breaks the tie upward.
        assert_eq!(round(0.1251, 2, mode), "0.13");
    }

    #[test]
    fn test_carry_propagates() {
        let mode = RoundingMode::HalfAwayFromZero;
        assert_eq!(round(9.999, 2, mode), "10.00");
        assert_eq!(round(999.5, 0, mode), "1000");
        assert_eq!(round(0.0, 2, mode), "0.00");
    }

    #[test]
    fn test_rounded_zero_has_no_sign() {
        assert_eq!(round(-0.001, 2, RoundingMode::HalfAwayFromZero), "0.00");
        assert_eq!(round(-0.0, 0, RoundingMode::HalfEven), "0");
    }

    #[test]
    fn test_non_finite() {
        assert!(round_decimal(f64::NAN, 2, RoundingMode::default()).is_none());
        assert!(round_decimal(f64::INFINITY, 2, RoundingMode::default()).is_none());
    }

    #[test]
    fn test_money_from_amount() {
        let mode = RoundingMode::HalfAwayFromZero;
        assert_eq!(Money::from_amount(10.99, 2, mode), Some(Money::from_minor(1099)));
        assert_eq!(Money::from_amount(-5.5, 2, mode), Some(Money::from_minor(-550)));
        assert_eq!(Money::from_amount(1500.4, 0, mode), Some(Money::from_minor(1500)));
        assert_eq!(Money::from_amount(f64::NAN, 2, mode), None);
        assert_eq!(Money::from_amount(1e30, 2, mode), None);
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_minor(1000);
        let b = Money::from_minor(250);
        assert_eq!((a + b).minor(), 1250);
        assert_eq!((a - b).minor(), 750);
        assert_eq!((b * 3).minor(), 750);
        assert!((b - a).is_negative());
        assert_eq!((b - a).abs().minor(), 750);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.minor(), 1500);
    }

    #[test]
    fn test_money_to_amount() {
        assert_eq!(Money::from_minor(123450).to_amount(2), 1234.5);
        assert_eq!(Money::from_minor(1500).to_amount(0), 1500.0);
    }

    #[test]
    fn test_money_to_rounded() {
        let r = Money::from_minor(-123405).to_rounded(2);
        assert!(r.negative);
        assert_eq!(r.integer, "1234");
        assert_eq!(r.fraction, "05");

        let r = Money::from_minor(42).to_rounded(0);
        assert_eq!(r.integer, "42");
        assert!(r.fraction.is_empty());

        let r = Money::from_minor(7).to_rounded(3);
        assert_eq!((r.integer.as_str(), r.fraction.as_str()), ("0", "007"));
    }

    #[test]
    fn test_money_to_rounded_wide_scale() {
        let r = Money::from_minor(i64::MIN).to_rounded(25);
        assert!(r.negative);
        assert_eq!(r.integer, "0");
        assert_eq!(r.fraction, "0000009223372036854775808");

        let r = Money::from_minor(5).to_rounded(u8::MAX);
        assert_eq!(r.fraction.len(), 255);
        assert!(r.fraction.ends_with('5'));
    }

    #[test]
    fn test_money_overflow_saturates() {
        let max = Money::from_minor(i64::MAX);
        assert_eq!((max + Money::from_minor(1)).minor(), i64::MAX);
        assert_eq!((Money::from_minor(i64::MIN) - Money::from_minor(1)).minor(), i64::MIN);
        assert_eq!((max * 2).minor(), i64::MAX);
        assert_eq!(Money::from_minor(i64::MIN).abs().minor(), i64::MAX);

        assert_eq!(max.checked_add(Money::from_minor(1)), None);
        assert_eq!(max.checked_mul(2), None);
        assert_eq!(
            Money::from_minor(250).checked_mul(4),
            Some(Money::from_minor(1000))
        );

        let mut total = max;
        total += Money::from_minor(10);
        assert_eq!(total, max);
    }
}
