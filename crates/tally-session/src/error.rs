//! # Session Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Session Error Categories                          │
//! │                                                                         │
//! │  ┌─────────────────────┐  ┌─────────────────┐  ┌─────────────────────┐ │
//! │  │  Rejection          │  │  Server / Wire  │  │  Local              │ │
//! │  │                     │  │                 │  │                     │ │
//! │  │  InvalidCredentials │  │  Network        │  │  NoRefreshToken     │ │
//! │  │  (401 / 403)        │  │  Validation     │  │  NotAuthenticated   │ │
//! │  │                     │  │  Unknown        │  │  Storage            │ │
//! │  └─────────────────────┘  └─────────────────┘  └─────────────────────┘ │
//! │                                                                         │
//! │  Only a Rejection means a stored session is dead. Everything in the     │
//! │  middle column can be a passing outage.                                 │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  ConfigError: InvalidConfig, InvalidUrl, LoadFailed, SaveFailed │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `AuthError` is a value the UI renders inline; see
//! [`AuthError::user_message`].

use tally_core::{FieldErrors, FieldMessage, StorageError, ValidationError};
use thiserror::Error;

/// Result type alias for session operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Auth Error
// =============================================================================

/// Failure of a session operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The server rejected the credentials or token.
    #[error("Invalid credentials: {message}")]
    InvalidCredentials { message: String },

    /// The Auth API could not be reached or the response was cut off.
    #[error("Network error: {0}")]
    Network(String),

    /// `refresh()` was called with no stored refresh token.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// Field-level rejection, either local (profile patch) or from the
    /// server (registration).
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        fields: Vec<FieldMessage>,
    },

    /// The operation needs a signed-in user.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Tokens or profile could not be persisted.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Any other server answer: 5xx, an unreadable body, `success: false`.
    #[error("Unexpected error: {0}")]
    Unknown(String),
}

impl AuthError {
    /// Message suitable for showing next to the form that triggered it.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::InvalidCredentials { message } | AuthError::Validation { message, .. } => {
                message.clone()
            }
            AuthError::Network(_) => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            AuthError::NoRefreshToken => "Your session has expired. Please sign in again.".to_string(),
            AuthError::NotAuthenticated => "Please sign in to continue.".to_string(),
            AuthError::Storage(_) => "Could not save your session on this device.".to_string(),
            AuthError::Unknown(message) if !message.trim().is_empty() => message.clone(),
            AuthError::Unknown(_) => "Something went wrong. Please try again.".to_string(),
        }
    }

    /// True when the server was unreachable, as opposed to saying no.
    pub fn is_network(&self) -> bool {
        matches!(self, AuthError::Network(_))
    }

    /// True when the server refused the credentials or token. A stored
    /// session that gets this answer is no longer usable.
    pub fn is_rejection(&self) -> bool {
        matches!(self, AuthError::InvalidCredentials { .. })
    }

    pub(crate) fn invalid_credentials(message: impl Into<String>) -> Self {
        AuthError::InvalidCredentials {
            message: message.into(),
        }
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::Storage(err.to_string())
    }
}

impl From<FieldErrors> for AuthError {
    fn from(errors: FieldErrors) -> Self {
        AuthError::Validation {
            message: "Please correct the highlighted fields.".to_string(),
            fields: errors.iter().map(FieldMessage::from).collect(),
        }
    }
}

impl From<ValidationError> for AuthError {
    fn from(err: ValidationError) -> Self {
        AuthError::Validation {
            message: err.to_string(),
            fields: vec![FieldMessage::from(&err)],
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AuthError::Unknown(format!("Unexpected response from server: {err}"))
        } else {
            // connect, timeout, request building and body reads
            AuthError::Network(err.to_string())
        }
    }
}

// =============================================================================
// Config Error
// =============================================================================

/// Failure to load, validate or save [`SessionConfig`](crate::SessionConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    #[error("Failed to save config: {0}")]
    SaveFailed(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

impl From<url::ParseError> for ConfigError {
    fn from(err: url::ParseError) -> Self {
        ConfigError::InvalidUrl(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            AuthError::invalid_credentials("Invalid email or password").user_message(),
            "Invalid email or password"
        );
        assert!(AuthError::Network("refused".into())
            .user_message()
            .contains("Unable to reach the server"));
        assert_eq!(
            AuthError::Unknown(String::new()).user_message(),
            "Something went wrong. Please try again."
        );
    }

    #[test]
    fn test_categories() {
        assert!(AuthError::Network("timeout".into()).is_network());
        assert!(!AuthError::Network("timeout".into()).is_rejection());
        assert!(AuthError::invalid_credentials("expired").is_rejection());
        assert!(!AuthError::Unknown("Server responded with status 503".into()).is_rejection());
        assert!(!AuthError::Validation {
            message: "bad".into(),
            fields: Vec::new(),
        }
        .is_rejection());
        assert!(!AuthError::NoRefreshToken.is_rejection());
    }

    #[test]
    fn test_field_errors_conversion() {
        let mut errors = FieldErrors::new();
        errors.push(ValidationError::Required {
            field: "businessName".into(),
        });
        match AuthError::from(errors) {
            AuthError::Validation { fields, .. } => {
                assert_eq!(fields.len(), 1);
                assert_eq!(fields[0].field, "businessName");
                assert_eq!(fields[0].message, "businessName is required");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_storage_conversion() {
        let err: AuthError = StorageError::Write("disk full".into()).into();
        assert_eq!(err, AuthError::Storage("Failed to write storage: disk full".into()));
    }
}
