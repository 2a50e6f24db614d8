//! Property-based tests for currency formatting.
//!
//! - Round trip: `parse(format(a, false)) == a` for amounts already rounded
//!   to the currency's precision
//! - Symbols never disturb parsing
//! - Registry separators never collide

use proptest::prelude::*;

use super::format::{format_amount, parse_amount};
use crate::currency::{Currency, CurrencyRegistry};
use crate::money::RoundingMode;

/// Any builtin currency.
fn any_currency() -> impl Strategy<Value = Currency> {
    let currencies: Vec<Currency> = CurrencyRegistry::builtin().unwrap().iter().cloned().collect();
    prop::sample::select(currencies)
}

/// Minor-unit magnitudes up to ten billion major units.
fn minor_units() -> impl Strategy<Value = i64> {
    0i64..1_000_000_000_000i64
}

fn amount_for(currency: &Currency, minor: i64) -> f64 {
    minor as f64 / 10f64.powi(currency.decimal_places as i32)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// *For any* non-negative amount with at most `decimal_places` digits,
    /// parsing the symbol-less format gives the amount back.
    #[test]
    fn prop_round_trip_without_symbol(currency in any_currency(), minor in minor_units()) {
        let amount = amount_for(&currency, minor);
        for mode in [RoundingMode::HalfAwayFromZero, RoundingMode::HalfEven] {
            let text = format_amount(&currency, amount, false, mode);
            let parsed = parse_amount(&currency, &text);
            prop_assert!(
                (parsed - amount).abs() <= 1e-9 * amount.abs().max(1.0),
                "{} formatted as {} parsed as {}", amount, text, parsed
            );
        }
    }

    /// Negative amounts survive the trip too, symbol included.
    #[test]
    fn prop_round_trip_with_symbol_and_sign(currency in any_currency(), minor in 1i64..1_000_000_000i64) {
        let amount = -amount_for(&currency, minor);
        let text = format_amount(&currency, amount, true, RoundingMode::default());
        prop_assert!(text.starts_with('-'));
        let parsed = parse_amount(&currency, &text);
        prop_assert!((parsed - amount).abs() <= 1e-9 * amount.abs().max(1.0));
    }

    /// Formatting is deterministic.
    #[test]
    fn prop_format_is_deterministic(currency in any_currency(), amount in -1e9f64..1e9f64) {
        let a = format_amount(&currency, amount, true, RoundingMode::default());
        let b = format_amount(&currency, amount, true, RoundingMode::default());
        prop_assert_eq!(a, b);
    }

    /// The fraction always has exactly `decimal_places` digits.
    #[test]
    fn prop_fraction_width(currency in any_currency(), amount in 0f64..1e9f64) {
        let text = format_amount(&currency, amount, false, RoundingMode::default());
        let fraction = text.rsplit_once(currency.decimal_separator).map(|(_, f)| f);
        match currency.decimal_places {
            0 => prop_assert!(fraction.is_none()),
            n => prop_assert_eq!(fraction.map(str::len), Some(n as usize)),
        }
    }
}

#[test]
fn registry_separators_never_collide() {
    for currency in CurrencyRegistry::builtin().unwrap().iter() {
        assert_ne!(currency.thousands_separator, currency.decimal_separator);
    }
}
