//! # User Types
//!
//! The signed-in user's profile snapshot and the request records exchanged
//! with the Auth API.
//!
//! ## Profile Completion
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  auth_provider   is_profile_complete   profile incomplete?              │
//! │  local           (any)                 no                               │
//! │  google          true                  no                               │
//! │  google          false                 YES → UI asks for business info  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{FieldErrors, ValidationError};
use crate::validation::{validate_email, validate_required};

// =============================================================================
// Enums
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

/// How the user signed up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AuthProvider {
    #[default]
    Local,
    Google,
    /// Any provider this client does not know about.
    #[serde(other)]
    Other,
}

// =============================================================================
// User
// =============================================================================

/// Profile snapshot held by the client for the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    /// Some backends send Mongo-style `_id`.
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub business_name: String,
    #[serde(default)]
    pub business_type: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub plan: Plan,
    #[serde(default)]
    pub is_profile_complete: bool,
    #[serde(default)]
    pub auth_provider: AuthProvider,
}

impl User {
    /// Google sign-ups must still supply their business details.
    pub fn is_profile_incomplete(&self) -> bool {
        self.auth_provider == AuthProvider::Google && !self.is_profile_complete
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Copies every field present in `patch` onto this user.
    pub fn apply(&mut self, patch: &UserPatch) {
        let UserPatch {
            first_name,
            last_name,
            email,
            phone,
            business_name,
            business_type,
            avatar,
        } = patch;

        if let Some(v) = first_name {
            self.first_name = v.clone();
        }
        if let Some(v) = last_name {
            self.last_name = v.clone();
        }
        if let Some(v) = email {
            self.email = v.clone();
        }
        if let Some(v) = phone {
            self.phone = Some(v.clone());
        }
        if let Some(v) = business_name {
            self.business_name = v.clone();
        }
        if let Some(v) = business_type {
            self.business_type = v.clone();
        }
        if let Some(v) = avatar {
            self.avatar = Some(v.clone());
        }
    }
}

// =============================================================================
// User Patch
// =============================================================================

/// Partial user record for profile updates. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self == &UserPatch::default()
    }

    /// Field-level checks on the fields that are present: no blank strings,
    /// and a well-formed email.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        let text_fields = [
            ("firstName", &self.first_name),
            ("lastName", &self.last_name),
            ("phone", &self.phone),
            ("businessName", &self.business_name),
            ("businessType", &self.business_type),
        ];
        for (field, value) in text_fields {
            if let Some(v) = value {
                errors.check(validate_required(field, v));
            }
        }

        if let Some(email) = &self.email {
            errors.check(validate_email(email));
        }

        if let Some(avatar) = &self.avatar {
            if avatar.trim().is_empty() {
                errors.push(ValidationError::Required {
                    field: "avatar".into(),
                });
            }
        }

        errors.into_result()
    }
}

// =============================================================================
// Requests
// =============================================================================

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub business_name: String,
    pub business_type: String,
    pub password: String,
    pub agree_to_terms: bool,
    pub subscribe_to_newsletter: bool,
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn google_user() -> User {
        serde_json::from_value(json!({
            "_id": "u-1",
            "firstName": "Ada",
            "lastName": "Obi",
            "email": "ada@example.com",
            "authProvider": "google",
            "isProfileComplete": false
        }))
        .unwrap()
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let user = google_user();
        assert_eq!(user.id, "u-1");
        assert_eq!(user.plan, Plan::Free);
        assert_eq!(user.avatar, None);
        assert!(user.is_profile_incomplete());
        assert_eq!(user.full_name(), "Ada Obi");
    }

    #[test]
    fn test_unknown_provider() {
        let user: User = serde_json::from_value(json!({
            "id": "u-2",
            "email": "x@example.com",
            "authProvider": "github"
        }))
        .unwrap();
        assert_eq!(user.auth_provider, AuthProvider::Other);
        assert!(!user.is_profile_incomplete());
    }

    #[test]
    fn test_local_user_is_never_incomplete() {
        let mut user = google_user();
        user.auth_provider = AuthProvider::Local;
        assert!(!user.is_profile_incomplete());
    }

    #[test]
    fn test_apply_patch() {
        let mut user = google_user();
        let patch = UserPatch {
            business_name: Some("Obi Studio".into()),
            phone: Some("+234 800 000 0000".into()),
            ..Default::default()
        };
        user.apply(&patch);
        assert_eq!(user.business_name, "Obi Studio");
        assert_eq!(user.phone.as_deref(), Some("+234 800 000 0000"));
        assert_eq!(user.first_name, "Ada");
    }

    #[test]
    fn test_patch_validation() {
        assert!(UserPatch::default().validate().is_ok());
        assert!(UserPatch::default().is_empty());

        let patch = UserPatch {
            first_name: Some("  ".into()),
            email: Some("not-an-email".into()),
            ..Default::default()
        };
        let errors = patch.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.get("firstName").is_some());
        assert!(errors.get("email").is_some());
    }

    #[test]
    fn test_patch_serializes_only_present_fields() {
        let patch = UserPatch {
            business_type: Some("Freelancer".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({ "businessType": "Freelancer" })
        );
    }

    #[test]
    fn test_register_request_wire_names() {
        let req = RegisterRequest {
            subscribe_to_newsletter: true,
            agree_to_terms: true,
            ..Default::default()
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["subscribeToNewsletter"], true);
        assert_eq!(value["agreeToTerms"], true);
        assert!(value.get("businessName").is_some());
    }
}
