//! # Validation Module
//!
//! Input validation for the sign-up and profile forms.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Form (THIS MODULE)                                           │
//! │  ├── Required fields, email shape, password rules                      │
//! │  └── Field-scoped messages, submission blocked                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Auth API (server)                                            │
//! │  ├── Uniqueness (email already registered)                             │
//! │  └── Returned as AuthError::Validation                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_email, validate_password};
//!
//! assert!(validate_email("ada@example.com").is_ok());
//! assert!(validate_password("weak").is_err());
//! ```

use serde::Serialize;

use crate::error::{FieldErrors, ValidationError};
use crate::user::RegisterRequest;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LENGTH: usize = 8;

// =============================================================================
// Field Validators
// =============================================================================

/// Rejects empty or whitespace-only values.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates an email address.
///
/// ## Rules
/// - Must not be empty
/// - No whitespace
/// - Something before a single `@`, and a domain containing a dot with
///   characters on both sides
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_email;
///
/// assert!(validate_email("ada@example.com").is_ok());
/// assert!(validate_email("ada@example").is_err());
/// assert!(validate_email("").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let invalid = || ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: "Please enter a valid email address".to_string(),
    };

    let email = email.trim();
    validate_required("email", email)?;

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.rsplit_once('@').ok_or_else(invalid)?;
    if local.is_empty() {
        return Err(invalid());
    }

    match domain.rsplit_once('.') {
        Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
        _ => Err(invalid()),
    }
}

/// Validates a new password.
///
/// ## Rules
/// - At least [`MIN_PASSWORD_LENGTH`] characters
/// - At least one lowercase letter, one uppercase letter and one digit
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::Required {
            field: "password".to_string(),
        });
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LENGTH,
        });
    }

    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_lower && has_upper && has_digit) {
        return Err(ValidationError::InvalidFormat {
            field: "password".to_string(),
            reason: "must contain at least one uppercase letter, one lowercase letter, and one number"
                .to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Form Validators
// =============================================================================

/// Checks a whole sign-up form and reports every failing field.
///
/// Field names match the request's JSON names so the UI can map them
/// straight onto inputs.
pub fn validate_registration(
    request: &RegisterRequest,
    confirm_password: &str,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    errors.check(validate_required("firstName", &request.first_name));
    errors.check(validate_required("lastName", &request.last_name));
    errors.check(validate_email(&request.email));
    errors.check(validate_required("phone", &request.phone));
    errors.check(validate_required("businessName", &request.business_name));
    errors.check(validate_required("businessType", &request.business_type));
    errors.check(validate_password(&request.password));

    if confirm_password.is_empty() {
        errors.push(ValidationError::Required {
            field: "confirmPassword".to_string(),
        });
    } else if confirm_password != request.password {
        errors.push(ValidationError::Mismatch {
            field: "confirmPassword".to_string(),
        });
    }

    if !request.agree_to_terms {
        errors.push(ValidationError::MustAccept {
            field: "agreeToTerms".to_string(),
        });
    }

    errors.into_result()
}

// =============================================================================
// Password Strength
// =============================================================================

/// Strength meter shown under the password input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PasswordStrength {
    /// 0 (empty) to 5.
    pub score: u8,
    pub label: &'static str,
}

const STRENGTH_LABELS: [&str; 5] = ["Very Weak", "Weak", "Fair", "Good", "Strong"];

/// One point each for: length >= 8, lowercase, uppercase, digit, symbol.
pub fn password_strength(password: &str) -> PasswordStrength {
    if password.is_empty() {
        return PasswordStrength { score: 0, label: "" };
    }

    let checks = [
        password.chars().count() >= MIN_PASSWORD_LENGTH,
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
    ];
    let score = checks.iter().filter(|&&ok| ok).count() as u8;

    PasswordStrength {
        score,
        label: STRENGTH_LABELS[score.saturating_sub(1) as usize],
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> RegisterRequest {
        RegisterRequest {
            first_name: "Ada".into(),
            last_name: "Obi".into(),
            email: "ada@example.com".into(),
            phone: "+2348000000000".into(),
            business_name: "Obi Studio".into(),
            business_type: "Freelancer".into(),
            password: "Secret123".into(),
            agree_to_terms: true,
            subscribe_to_newsletter: false,
        }
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ada@example.com").is_ok());
        assert!(validate_email("  ada@example.co.uk ").is_ok());
        assert!(validate_email("ada@example").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("ada example@x.com").is_err());
        assert!(matches!(
            validate_email(""),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("Secret123").is_ok());
        assert!(matches!(
            validate_password("Sh0rt"),
            Err(ValidationError::TooShort { min: 8, .. })
        ));
        assert!(matches!(
            validate_password("alllowercase1"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(matches!(
            validate_password(""),
            Err(ValidationError::Required { .. })
        ));
    }

    #[test]
    fn test_valid_registration() {
        let req = valid_request();
        assert!(validate_registration(&req, "Secret123").is_ok());
    }

    #[test]
    fn test_registration_collects_all_errors() {
        let req = RegisterRequest {
            first_name: " ".into(),
            email: "nope".into(),
            agree_to_terms: false,
            ..valid_request()
        };
        let errors = validate_registration(&req, "Different1").unwrap_err();

        assert!(errors.get("firstName").is_some());
        assert!(errors.get("email").is_some());
        assert!(matches!(
            errors.get("confirmPassword"),
            Some(ValidationError::Mismatch { .. })
        ));
        assert!(matches!(
            errors.get("agreeToTerms"),
            Some(ValidationError::MustAccept { .. })
        ));
        assert!(errors.get("lastName").is_none());
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_newsletter_flag_has_no_effect_on_validation() {
        let req = RegisterRequest {
            subscribe_to_newsletter: true,
            ..valid_request()
        };
        assert!(validate_registration(&req, "Secret123").is_ok());
    }

    #[test]
    fn test_password_strength() {
        assert_eq!(password_strength("").score, 0);
        assert_eq!(password_strength("abc").label, "Very Weak");
        assert_eq!(password_strength("abcdefgh").score, 2);
        assert_eq!(password_strength("Secret123").label, "Good");
        assert_eq!(password_strength("Secret123!").score, 5);
        assert_eq!(password_strength("Secret123!").label, "Strong");
    }
}
