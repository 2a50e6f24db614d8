//! # Currency Registry
//!
//! Static definitions of every currency the application can display.
//!
//! ## Registry Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Vec<Currency> ──► CurrencyRegistry::new() ──► validated, immutable     │
//! │                         │                                               │
//! │                         ├── empty list             → EmptyRegistry      │
//! │                         ├── duplicate code         → DuplicateCurrency  │
//! │                         └── separators/symbol clash → InvalidCurrency   │
//! │                                                                         │
//! │  Bad definitions fail HERE, at load time, never as garbled output.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Largest number of fraction digits a currency may declare.
pub const MAX_DECIMAL_PLACES: u8 = 6;

// =============================================================================
// Currency
// =============================================================================

/// Where the symbol goes relative to the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum SymbolPosition {
    #[default]
    Before,
    After,
}

/// A supported currency and its display conventions.
///
/// ## Example
/// ```rust
/// use tally_core::currency::CurrencyRegistry;
///
/// let registry = CurrencyRegistry::builtin().unwrap();
/// let eur = registry.get("EUR").unwrap();
/// assert_eq!(eur.thousands_separator, '.');
/// assert_eq!(eur.decimal_separator, ',');
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Currency {
    /// ISO 4217 style code, unique within a registry.
    pub code: String,
    pub name: String,
    pub symbol: String,
    pub position: SymbolPosition,
    pub decimal_places: u8,
    pub thousands_separator: char,
    pub decimal_separator: char,
}

impl Currency {
    /// Shorthand used by the builtin table.
    fn define(
        code: &str,
        name: &str,
        symbol: &str,
        decimal_places: u8,
        thousands_separator: char,
        decimal_separator: char,
    ) -> Self {
        Currency {
            code: code.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            position: SymbolPosition::Before,
            decimal_places,
            thousands_separator,
            decimal_separator,
        }
    }

    /// Checks the invariants a currency must satisfy to be formatted and
    /// parsed unambiguously.
    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |reason: String| CoreError::InvalidCurrency {
            code: self.code.clone(),
            reason,
        };

        if self.code.trim().is_empty() {
            return Err(invalid("code is empty".into()));
        }

        if self.thousands_separator == self.decimal_separator {
            return Err(invalid(format!(
                "thousands and decimal separators are both '{}'",
                self.decimal_separator
            )));
        }

        for sep in [self.thousands_separator, self.decimal_separator] {
            if sep.is_ascii_digit() || sep == '-' {
                return Err(invalid(format!("'{sep}' cannot be used as a separator")));
            }
        }

        // A digit or separator inside the symbol would make parse() ambiguous.
        if let Some(c) = self.symbol.chars().find(|c| {
            c.is_ascii_digit() || *c == self.thousands_separator || *c == self.decimal_separator
        }) {
            return Err(invalid(format!("symbol '{}' contains '{c}'", self.symbol)));
        }

        if self.decimal_places > MAX_DECIMAL_PLACES {
            return Err(invalid(format!(
                "decimal places {} exceeds {MAX_DECIMAL_PLACES}",
                self.decimal_places
            )));
        }

        Ok(())
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Validated, ordered set of supported currencies.
///
/// The first entry is the default currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyRegistry {
    currencies: Vec<Currency>,
}

impl CurrencyRegistry {
    /// Builds a registry, rejecting any definition that breaks an invariant.
    pub fn new(currencies: Vec<Currency>) -> CoreResult<Self> {
        if currencies.is_empty() {
            return Err(CoreError::EmptyRegistry);
        }

        let mut seen = HashSet::new();
        for currency in &currencies {
            currency.validate()?;
            if !seen.insert(currency.code.as_str()) {
                return Err(CoreError::DuplicateCurrency(currency.code.clone()));
            }
        }

        Ok(CurrencyRegistry { currencies })
    }

    /// The currencies the application ships with, checked like any other
    /// registry.
    pub fn builtin() -> CoreResult<Self> {
        Self::new(builtin_currencies())
    }

    /// Exact, case-sensitive lookup by code.
    pub fn get(&self, code: &str) -> Option<&Currency> {
        self.currencies.iter().find(|c| c.code == code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    /// The first registry entry.
    pub fn default_currency(&self) -> &Currency {
        &self.currencies[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Currency> {
        self.currencies.iter()
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    /// Always false for a constructed registry.
    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }
}

fn builtin_currencies() -> Vec<Currency> {
    vec![
        Currency::define("USD", "US Dollar", "$", 2, ',', '.'),
        Currency::define("EUR", "Euro", "€", 2, '.', ','),
        Currency::define("GBP", "British Pound", "£", 2, ',', '.'),
        Currency::define("NGN", "Nigerian Naira", "₦", 2, ',', '.'),
        Currency::define("GHS", "Ghanaian Cedi", "₵", 2, ',', '.'),
        Currency::define("KES", "Kenyan Shilling", "KSh", 2, ',', '.'),
        Currency::define("ZAR", "South African Rand", "R", 2, ' ', '.'),
        Currency::define("INR", "Indian Rupee", "₹", 2, ',', '.'),
        Currency::define("CAD", "Canadian Dollar", "C$", 2, ',', '.'),
        Currency::define("AUD", "Australian Dollar", "A$", 2, ',', '.'),
        Currency::define("JPY", "Japanese Yen", "¥", 0, ',', '.'),
        Currency::define("CNY", "Chinese Yuan", "¥", 2, ',', '.'),
    ]
}
