//! # Session State
//!
//! The token pair plus profile snapshot owned by [`SessionManager`], and
//! the status value published to UI route guards.
//!
//! ## Status Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Restoring ──check_auth_status──┬──► Authenticated { incomplete? }    │
//! │                                  └──► Unauthenticated                   │
//! │                                                                         │
//! │   Unauthenticated ──login/register──► Authenticating                    │
//! │   Authenticated   ──refresh────────► Authenticating                    │
//! │                                                                         │
//! │   Authenticating ──ok──► Authenticated { profile_incomplete }           │
//! │                  └─err─► previous status (nothing applied)              │
//! │                                                                         │
//! │   any ──logout──► Unauthenticated                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`SessionManager`]: crate::SessionManager

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::User;
use ts_rs::TS;

/// Access/refresh token pair as issued by the Auth API.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// The authenticated user's tokens and profile snapshot.
///
/// `Session::default()` is the empty session held before sign-in and after
/// logout.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<User>,
    /// When the tokens were last issued or validated.
    pub authenticated_at: Option<DateTime<Utc>>,
}

impl Session {
    pub(crate) fn established(tokens: TokenPair, user: User) -> Self {
        Session {
            access_token: Some(tokens.access_token),
            refresh_token: Some(tokens.refresh_token),
            user: Some(user),
            authenticated_at: Some(Utc::now()),
        }
    }

    /// An access token and a user are both present.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.user.is_some()
    }

    pub fn is_profile_incomplete(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_profile_incomplete)
    }

    /// Status a route guard should see for this session.
    pub fn status(&self) -> AuthStatus {
        if self.is_authenticated() {
            AuthStatus::Authenticated {
                profile_incomplete: self.is_profile_incomplete(),
            }
        } else {
            AuthStatus::Unauthenticated
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("user", &self.user.as_ref().map(|u| &u.id))
            .field("authenticated_at", &self.authenticated_at)
            .finish()
    }
}

/// Observable authentication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "state", rename_all = "camelCase")]
#[ts(export)]
pub enum AuthStatus {
    /// Stored session not yet validated.
    Restoring,
    Unauthenticated,
    /// A login, registration or refresh is in flight.
    Authenticating,
    Authenticated {
        #[serde(rename = "profileIncomplete")]
        profile_incomplete: bool,
    },
}

impl AuthStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthStatus::Authenticated { .. })
    }

    /// Still waiting on startup validation or an in-flight call.
    pub fn is_pending(&self) -> bool {
        matches!(self, AuthStatus::Restoring | AuthStatus::Authenticating)
    }
}

impl std::fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthStatus::Restoring => write!(f, "restoring"),
            AuthStatus::Unauthenticated => write!(f, "unauthenticated"),
            AuthStatus::Authenticating => write!(f, "authenticating"),
            AuthStatus::Authenticated {
                profile_incomplete: true,
            } => write!(f, "authenticated (profile incomplete)"),
            AuthStatus::Authenticated { .. } => write!(f, "authenticated"),
        }
    }
}
