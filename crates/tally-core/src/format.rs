//! # Currency Formatting
//!
//! Converts between amounts and their localized text under a [`Currency`].
//!
//! ## Format Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1234.5 (EUR)                                                           │
//! │     │                                                                   │
//! │     ▼  round to decimal_places            "1234" + "50"                 │
//! │     ▼  group integer digits by three      "1" "234"                     │
//! │     ▼  join with the currency separators  "1.234,50"                    │
//! │     ▼  attach symbol per position         "€1.234,50"                   │
//! │     ▼  sign in front of everything        "-€1.234,50" (if negative)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Grouping is computed on canonical digits and the currency separators are
//! inserted directly, so a `.` thousands separator can never be confused
//! with the decimal point.
//!
//! ## Parse Pipeline
//! Everything but digits, the two separators and a `-` before the first
//! digit is dropped; thousands separators are removed, the decimal
//! separator becomes `.`, and the longest numeric prefix is read. Text
//! without digits parses to `0`.

use std::sync::Arc;

use crate::currency::{Currency, CurrencyRegistry, SymbolPosition};
use crate::error::{CoreError, CoreResult};
use crate::money::{round_decimal, Money, Rounded, RoundingMode};
use crate::storage::{keys, KeyValueStore};

// =============================================================================
// Pure Functions
// =============================================================================

/// Formats `amount` under `currency`.
///
/// ## Example
/// ```rust
/// use tally_core::currency::CurrencyRegistry;
/// use tally_core::format::format_amount;
/// use tally_core::money::RoundingMode;
///
/// let registry = CurrencyRegistry::builtin().unwrap();
/// let usd = registry.get("USD").unwrap();
/// assert_eq!(format_amount(usd, -1234.5, true, RoundingMode::default()), "-$1,234.50");
/// ```
pub fn format_amount(currency: &Currency, amount: f64, show_symbol: bool, mode: RoundingMode) -> String {
    match round_decimal(amount, currency.decimal_places, mode) {
        Some(rounded) => render(currency, &rounded, show_symbol),
        None if amount.is_nan() => "NaN".to_string(),
        None if amount > 0.0 => "∞".to_string(),
        None => "-∞".to_string(),
    }
}

/// Formats a minor-unit amount under `currency`. No rounding is involved.
pub fn format_money(currency: &Currency, money: Money, show_symbol: bool) -> String {
    render(currency, &money.to_rounded(currency.decimal_places), show_symbol)
}

/// Parses localized text under `currency`, returning `0.0` when no number
/// can be read.
///
/// ## Example
/// ```rust
/// use tally_core::currency::CurrencyRegistry;
/// use tally_core::format::parse_amount;
///
/// let registry = CurrencyRegistry::builtin().unwrap();
/// let eur = registry.get("EUR").unwrap();
/// assert_eq!(parse_amount(eur, "€1.234,50"), 1234.5);
/// assert_eq!(parse_amount(eur, "abc"), 0.0);
/// ```
pub fn parse_amount(currency: &Currency, value: &str) -> f64 {
    let first_digit = value.find(|c: char| c.is_ascii_digit());
    let negative = match (value.find('-'), first_digit) {
        (Some(minus), Some(digit)) => minus < digit,
        _ => false,
    };

    let cleaned: String = value
        .chars()
        .filter_map(|c| {
            if c.is_ascii_digit() {
                Some(c)
            } else if c == currency.decimal_separator {
                Some('.')
            } else {
                // Thousands separators and everything else are dropped.
                None
            }
        })
        .collect();

    let number = leading_number(&cleaned);
    if negative && number != 0.0 {
        -number
    } else {
        number
    }
}

/// Reads `digits [. digits]` from the start of `s`.
fn leading_number(s: &str) -> f64 {
    let mut seen_dot = false;
    let mut has_digit = false;
    let mut end = 0;

    for (i, c) in s.char_indices() {
        if c == '.' {
            if seen_dot {
                break;
            }
            seen_dot = true;
        } else {
            has_digit = true;
        }
        end = i + c.len_utf8();
    }

    if !has_digit {
        return 0.0;
    }
    s[..end].parse().unwrap_or(0.0)
}

fn render(currency: &Currency, rounded: &Rounded, show_symbol: bool) -> String {
    let mut out = String::new();
    if rounded.negative {
        out.push('-');
    }

    let body = {
        let mut body = group_digits(&rounded.integer, currency.thousands_separator);
        if !rounded.fraction.is_empty() {
            body.push(currency.decimal_separator);
            body.push_str(&rounded.fraction);
        }
        body
    };

    match (show_symbol, currency.position) {
        (true, SymbolPosition::Before) => {
            out.push_str(&currency.symbol);
            out.push_str(&body);
        }
        (true, SymbolPosition::After) => {
            out.push_str(&body);
            out.push_str(&currency.symbol);
        }
        (false, _) => out.push_str(&body),
    }
    out
}

fn group_digits(integer: &str, separator: char) -> String {
    let len = integer.len();
    let mut out = String::with_capacity(len + len / 3 * separator.len_utf8());
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

// =============================================================================
// Currency Formatter (stateful)
// =============================================================================

/// Holds the currently selected currency and formats under it.
///
/// ## Lifecycle
/// ```text
/// startup ──► load(registry, store)
///               │  reads "preferredCurrency"
///               │  unknown / missing / unreadable → registry default
///               ▼
///        format / parse / format_money  (active currency)
///               │
///        set_currency ──► store write ──► switch active currency
///                         (failure leaves the old currency active)
/// ```
pub struct CurrencyFormatter {
    registry: CurrencyRegistry,
    store: Arc<dyn KeyValueStore>,
    active: Currency,
    rounding: RoundingMode,
}

impl CurrencyFormatter {
    /// Restores the preferred currency from `store`.
    pub fn load(registry: CurrencyRegistry, store: Arc<dyn KeyValueStore>) -> Self {
        Self::load_with_default(registry, store, None)
    }

    /// Like [`load`](Self::load), but a fresh install starts on
    /// `default_code` instead of the registry's first entry. An unknown
    /// `default_code` is ignored.
    pub fn load_with_default(
        registry: CurrencyRegistry,
        store: Arc<dyn KeyValueStore>,
        default_code: Option<&str>,
    ) -> Self {
        let active = store
            .get(keys::PREFERRED_CURRENCY)
            .ok()
            .flatten()
            .and_then(|code| registry.get(&code).cloned())
            .or_else(|| default_code.and_then(|code| registry.get(code).cloned()))
            .unwrap_or_else(|| registry.default_currency().clone());

        CurrencyFormatter {
            registry,
            store,
            active,
            rounding: RoundingMode::default(),
        }
    }

    pub fn with_rounding_mode(mut self, mode: RoundingMode) -> Self {
        self.rounding = mode;
        self
    }

    pub fn rounding_mode(&self) -> RoundingMode {
        self.rounding
    }

    /// The active currency.
    pub fn currency(&self) -> &Currency {
        &self.active
    }

    pub fn registry(&self) -> &CurrencyRegistry {
        &self.registry
    }

    pub fn format(&self, amount: f64, show_symbol: bool) -> String {
        format_amount(&self.active, amount, show_symbol, self.rounding)
    }

    pub fn format_money(&self, money: Money, show_symbol: bool) -> String {
        format_money(&self.active, money, show_symbol)
    }

    pub fn parse(&self, value: &str) -> f64 {
        parse_amount(&self.active, value)
    }

    /// Parses and rounds into minor units of the active currency.
    pub fn parse_money(&self, value: &str) -> Money {
        Money::from_amount(self.parse(value), self.active.decimal_places, self.rounding)
            .unwrap_or_default()
    }

    /// Registry lookup. A missing code is a normal outcome.
    pub fn get_currency_by_code(&self, code: &str) -> Option<&Currency> {
        self.registry.get(code)
    }

    /// Persists `currency` as the preference, then makes it active.
    ///
    /// Only registry members can be selected; the registry's definition is
    /// the one used.
    pub fn set_currency(&mut self, currency: &Currency) -> CoreResult<()> {
        self.set_currency_by_code(&currency.code)
    }

    pub fn set_currency_by_code(&mut self, code: &str) -> CoreResult<()> {
        let currency = self
            .registry
            .get(code)
            .cloned()
            .ok_or_else(|| CoreError::UnknownCurrency(code.to_string()))?;

        self.store.set(keys::PREFERRED_CURRENCY, &currency.code)?;
        self.active = currency;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{StorageError, StorageResult};
    use crate::storage::MemoryStore;

    fn builtin(code: &str) -> Currency {
        CurrencyRegistry::builtin().unwrap().get(code).unwrap().clone()
    }

    fn fmt(code: &str, amount: f64, show_symbol: bool) -> String {
        format_amount(&builtin(code), amount, show_symbol, RoundingMode::default())
    }

    fn parse(code: &str, value: &str) -> f64 {
        parse_amount(&builtin(code), value)
    }

    #[test]
    fn test_format_usd_and_eur() {
        assert_eq!(fmt("USD", 1234.5, true), "$1,234.50");
        assert_eq!(fmt("EUR", 1234.5, true), "€1.234,50");
        assert_eq!(fmt("USD", 1234.5, false), "1,234.50");
    }

    #[test]
    fn test_format_grouping() {
        assert_eq!(fmt("USD", 0.0, true), "$0.00");
        assert_eq!(fmt("USD", 999.0, false), "999.00");
        assert_eq!(fmt("USD", 1000.0, false), "1,000.00");
        assert_eq!(fmt("USD", 1234567.891, false), "1,234,567.89");
        assert_eq!(fmt("ZAR", 1234567.0, true), "R1 234 567.00");
        assert_eq!(fmt("EUR", 1234567.891, false), "1.234.567,89");
    }

    #[test]
    fn test_format_zero_decimals() {
        assert_eq!(fmt("JPY", 1234.5, true), "¥1,235");
        assert_eq!(fmt("JPY", 12.0, false), "12");
    }

    #[test]
    fn test_format_negative_sign_precedes_symbol() {
        assert_eq!(fmt("USD", -1234.5, true), "-$1,234.50");
        assert_eq!(fmt("KES", -0.5, true), "-KSh0.50");
        assert_eq!(fmt("USD", -0.001, true), "$0.00");
    }

    #[test]
    fn test_format_symbol_after() {
        let mut sek = builtin("EUR");
        sek.code = "SEK".into();
        sek.symbol = " kr".into();
        sek.position = SymbolPosition::After;
        assert_eq!(
            format_amount(&sek, -1234.5, true, RoundingMode::default()),
            "-1.234,50 kr"
        );
    }

    #[test]
    fn test_format_rounding_modes() {
        let usd = builtin("USD");
        assert_eq!(format_amount(&usd, 0.125, false, RoundingMode::HalfAwayFromZero), "0.13");
        assert_eq!(format_amount(&usd, 0.125, false, RoundingMode::HalfEven), "0.12");
        assert_eq!(format_amount(&usd, 1.005, false, RoundingMode::HalfAwayFromZero), "1.01");
    }

    #[test]
    fn test_format_non_finite() {
        assert_eq!(fmt("USD", f64::NAN, true), "NaN");
        assert_eq!(fmt("USD", f64::INFINITY, true), "∞");
        assert_eq!(fmt("USD", f64::NEG_INFINITY, true), "-∞");
    }

    #[test]
    fn test_format_money() {
        let usd = builtin("USD");
        assert_eq!(format_money(&usd, Money::from_minor(123450), true), "$1,234.50");
        assert_eq!(format_money(&usd, Money::from_minor(-5), true), "-$0.05");
        assert_eq!(format_money(&builtin("JPY"), Money::from_minor(1500), true), "¥1,500");
    }

    #[test]
    fn test_format_money_unchecked_scale() {
        let wide = Currency {
            decimal_places: 20,
            ..builtin("USD")
        };
        assert_eq!(
            format_money(&wide, Money::from_minor(-5), true),
            "-$0.00000000000000000005"
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse("EUR", "1.234,50"), 1234.50);
        assert_eq!(parse("USD", "$1,234.50"), 1234.50);
        assert_eq!(parse("ZAR", "R1 234 567.00"), 1234567.0);
        assert_eq!(parse("USD", "-$1,234.50"), -1234.50);
        assert_eq!(parse("USD", "42"), 42.0);
        assert_eq!(parse("USD", ".5"), 0.5);
    }

    #[test]
    fn test_parse_fallback_to_zero() {
        assert_eq!(parse("USD", ""), 0.0);
        assert_eq!(parse("USD", "abc"), 0.0);
        assert_eq!(parse("USD", "$."), 0.0);
        assert_eq!(parse("USD", "-"), 0.0);
    }

    #[test]
    fn test_parse_minus_only_before_digits() {
        assert_eq!(parse("USD", "12-34"), 1234.0);
        assert_eq!(parse("USD", "$-12"), -12.0);
    }

    #[test]
    fn test_parse_repeated_decimal_separator() {
        assert_eq!(parse("USD", "1.2.3"), 1.2);
        assert_eq!(parse("EUR", "1,2,3"), 1.2);
    }

    #[test]
    fn test_formatter_defaults_without_preference() {
        let store = Arc::new(MemoryStore::new());
        let formatter = CurrencyFormatter::load(CurrencyRegistry::builtin().unwrap(), store);
        assert_eq!(formatter.currency().code, "USD");
        assert_eq!(formatter.format(1234.5, true), "$1,234.50");
    }

    #[test]
    fn test_formatter_restores_preference() {
        let store = Arc::new(MemoryStore::with_entries([(keys::PREFERRED_CURRENCY, "EUR")]));
        let formatter = CurrencyFormatter::load(CurrencyRegistry::builtin().unwrap(), store);
        assert_eq!(formatter.currency().code, "EUR");
        assert_eq!(formatter.parse("1.234,50"), 1234.5);
    }

    #[test]
    fn test_formatter_ignores_unknown_preference() {
        let store = Arc::new(MemoryStore::with_entries([(keys::PREFERRED_CURRENCY, "XYZ")]));
        let formatter = CurrencyFormatter::load(CurrencyRegistry::builtin().unwrap(), store);
        assert_eq!(formatter.currency().code, "USD");
    }

    #[test]
    fn test_configured_default_yields_to_preference() {
        let empty = Arc::new(MemoryStore::new());
        let formatter =
            CurrencyFormatter::load_with_default(CurrencyRegistry::builtin().unwrap(), empty.clone(), Some("NGN"));
        assert_eq!(formatter.currency().code, "NGN");
        assert_eq!(empty.get(keys::PREFERRED_CURRENCY).unwrap(), None);

        let unknown =
            CurrencyFormatter::load_with_default(CurrencyRegistry::builtin().unwrap(), empty, Some("XYZ"));
        assert_eq!(unknown.currency().code, "USD");

        let store = Arc::new(MemoryStore::with_entries([(keys::PREFERRED_CURRENCY, "GHS")]));
        let formatter =
            CurrencyFormatter::load_with_default(CurrencyRegistry::builtin().unwrap(), store, Some("NGN"));
        assert_eq!(formatter.currency().code, "GHS");
    }

    #[test]
    fn test_set_currency_persists() {
        let store = Arc::new(MemoryStore::new());
        let mut formatter = CurrencyFormatter::load(CurrencyRegistry::builtin().unwrap(), store.clone());

        let gbp = formatter.get_currency_by_code("GBP").unwrap().clone();
        formatter.set_currency(&gbp).unwrap();

        assert_eq!(formatter.currency().code, "GBP");
        assert_eq!(formatter.format(5.0, true), "£5.00");
        assert_eq!(store.get(keys::PREFERRED_CURRENCY).unwrap().as_deref(), Some("GBP"));

        // A fresh formatter picks the preference back up.
        let reloaded = CurrencyFormatter::load(CurrencyRegistry::builtin().unwrap(), store);
        assert_eq!(reloaded.currency().code, "GBP");
    }

    #[test]
    fn test_set_unknown_currency_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let mut formatter = CurrencyFormatter::load(CurrencyRegistry::builtin().unwrap(), store);
        let err = formatter.set_currency_by_code("XYZ").unwrap_err();
        assert!(matches!(err, CoreError::UnknownCurrency(ref c) if c == "XYZ"));
        assert_eq!(formatter.currency().code, "USD");
    }

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Ok(None)
        }

        fn write_batch(&self, _entries: &[(&str, &str)], _removals: &[&str]) -> StorageResult<()> {
            Err(StorageError::Write("read-only".into()))
        }
    }

    #[test]
    fn test_set_currency_storage_failure_keeps_active() {
        let mut formatter = CurrencyFormatter::load(CurrencyRegistry::builtin().unwrap(), Arc::new(ReadOnlyStore));
        let err = formatter.set_currency_by_code("EUR").unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
        assert_eq!(formatter.currency().code, "USD");
    }

    #[test]
    fn test_parse_money() {
        let store = Arc::new(MemoryStore::with_entries([(keys::PREFERRED_CURRENCY, "JPY")]));
        let formatter = CurrencyFormatter::load(CurrencyRegistry::builtin().unwrap(), store);
        assert_eq!(formatter.parse_money("¥1,234").minor(), 1234);
        assert_eq!(formatter.parse_money("").minor(), 0);
    }
}
