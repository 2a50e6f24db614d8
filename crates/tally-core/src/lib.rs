//! # tally-core: Pure Business Logic for Tally
//!
//! Everything in this crate is deterministic and free of I/O: currency
//! formatting, minor-unit money, user/profile types and form validation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tally Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Front end (web UI / `tally` CLI)                       │   │
//! │  │   Dashboard ─ Invoices ─ Expenses ─ Goals ─ Profile             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               tally-session (auth, storage, HTTP)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────────────┐  │   │
//! │  │   │ currency │ │  format  │ │  money   │ │ user/validation  │  │   │
//! │  │   │ registry │ │ fmt/parse│ │  minor   │ │ profile, forms   │  │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO LOGGING                              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`currency`] - Currency definitions and the validated registry
//! - [`format`] - Formatting/parsing and the stateful [`CurrencyFormatter`]
//! - [`money`] - Rounding modes and the minor-unit [`Money`] type
//! - [`user`] - User profile, partial updates, auth request records
//! - [`validation`] - Sign-up and profile form rules
//! - [`storage`] - Key-value storage trait and in-memory store
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use tally_core::{CurrencyFormatter, CurrencyRegistry, MemoryStore};
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut formatter = CurrencyFormatter::load(CurrencyRegistry::builtin().unwrap(), store);
//! assert_eq!(formatter.format(1234.5, true), "$1,234.50");
//!
//! formatter.set_currency_by_code("EUR").unwrap();
//! assert_eq!(formatter.format(1234.5, true), "€1.234,50");
//! assert_eq!(formatter.parse("1.234,50"), 1234.5);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod currency;
pub mod error;
pub mod format;
pub mod money;
pub mod storage;
pub mod user;
pub mod validation;

#[cfg(test)]
mod format_props;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use currency::{Currency, CurrencyRegistry, SymbolPosition};
pub use error::{
    CoreError, CoreResult, FieldErrors, FieldMessage, StorageError, StorageResult,
    ValidationError,
};
pub use format::CurrencyFormatter;
pub use money::{Money, RoundingMode};
pub use storage::{keys, KeyValueStore, MemoryStore};
pub use user::{AuthProvider, LoginRequest, Plan, RegisterRequest, User, UserPatch};
