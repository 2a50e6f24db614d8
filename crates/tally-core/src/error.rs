//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Registry invariants, unknown currency          │
//! │  ├── ValidationError  - Field-scoped input failures                    │
//! │  ├── FieldErrors      - Every failing field of one form                │
//! │  └── StorageError     - Key-value backend failures                     │
//! │                                                                         │
//! │  tally-session errors (separate crate)                                 │
//! │  └── AuthError        - What the UI renders inline                     │
//! │                                                                         │
//! │  Flow: ValidationError / StorageError → CoreError / AuthError → UI     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (currency code, field name)
//! 3. Errors are enum variants, never String
//! 4. Each error variant maps to a user-facing message

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A currency definition breaks a registry invariant.
    ///
    /// ## When This Occurs
    /// - Thousands and decimal separators are the same character
    /// - A separator is a digit or `-`
    /// - The symbol contains a digit or one of the separators
    ///
    /// Raised while the registry is built, never while formatting.
    #[error("Invalid currency {code}: {reason}")]
    InvalidCurrency { code: String, reason: String },

    /// Two registry entries share the same code.
    #[error("Duplicate currency code: {0}")]
    DuplicateCurrency(String),

    /// The registry was built from an empty list.
    #[error("Currency registry cannot be empty")]
    EmptyRegistry,

    /// A currency was selected that the registry does not know.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),

    /// Persisting state failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements and are
/// rendered next to the offending form field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Invalid format (e.g., malformed email address).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Two fields that must match do not (password confirmation).
    #[error("{field} does not match")]
    Mismatch { field: String },

    /// A checkbox that must be ticked is not (terms of service).
    #[error("{field} must be accepted")]
    MustAccept { field: String },
}

impl ValidationError {
    /// Name of the field this error belongs to.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::Required { field }
            | ValidationError::TooShort { field, .. }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::Mismatch { field }
            | ValidationError::MustAccept { field } => field,
        }
    }
}

/// Every validation failure of a single form submission.
///
/// The form layer shows one message per field, so at most one error is
/// kept for each field (the first one found).
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{} field(s) failed validation", .errors.len())]
pub struct FieldErrors {
    errors: Vec<ValidationError>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an error unless the field already has one.
    pub fn push(&mut self, error: ValidationError) {
        if self.get(error.field()).is_none() {
            self.errors.push(error);
        }
    }

    /// Records the error of a validator result, if any.
    pub fn check(&mut self, result: Result<(), ValidationError>) {
        if let Err(e) = result {
            self.push(e);
        }
    }

    /// Returns the error recorded for `field`.
    pub fn get(&self, field: &str) -> Option<&ValidationError> {
        self.errors.iter().find(|e| e.field() == field)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter()
    }

    /// `Ok(())` when nothing failed, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl IntoIterator for FieldErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Field name + message pair, the shape the UI renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMessage {
    pub field: String,
    pub message: String,
}

impl From<&ValidationError> for FieldMessage {
    fn from(err: &ValidationError) -> Self {
        FieldMessage {
            field: err.field().to_string(),
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Storage Error
// =============================================================================

/// Failures of a [`KeyValueStore`](crate::storage::KeyValueStore) backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The backend could not be read.
    #[error("Failed to read storage: {0}")]
    Read(String),

    /// The backend could not be written.
    #[error("Failed to write storage: {0}")]
    Write(String),

    /// A stored value could not be decoded.
    #[error("Corrupt value for key {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Convenience type alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidCurrency {
            code: "XXX".to_string(),
            reason: "thousands and decimal separators are both '.'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid currency XXX: thousands and decimal separators are both '.'"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "email".to_string(),
        };
        assert_eq!(err.to_string(), "email is required");
        assert_eq!(err.field(), "email");

        let err = ValidationError::TooShort {
            field: "password".to_string(),
            min: 8,
        };
        assert_eq!(err.to_string(), "password must be at least 8 characters");
    }

    #[test]
    fn test_field_errors_keep_first_per_field() {
        let mut errors = FieldErrors::new();
        errors.push(ValidationError::Required {
            field: "email".into(),
        });
        errors.push(ValidationError::InvalidFormat {
            field: "email".into(),
            reason: "missing @".into(),
        });
        errors.check(Err(ValidationError::MustAccept {
            field: "agreeToTerms".into(),
        }));
        errors.check(Ok(()));

        assert_eq!(errors.len(), 2);
        assert!(matches!(
            errors.get("email"),
            Some(ValidationError::Required { .. })
        ));
        assert!(errors.get("phone").is_none());
        assert!(errors.into_result().is_err());
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn test_conversions_into_core_error() {
        let core_err: CoreError = ValidationError::Required {
            field: "code".to_string(),
        }
        .into();
        assert!(matches!(core_err, CoreError::Validation(_)));

        let core_err: CoreError = StorageError::Write("disk full".into()).into();
        assert!(matches!(core_err, CoreError::Storage(_)));
    }
}
