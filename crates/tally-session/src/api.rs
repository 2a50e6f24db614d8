//! # Auth API Client
//!
//! The external authentication backend, behind the [`AuthApi`] trait so
//! [`SessionManager`](crate::SessionManager) can be driven by any
//! implementation. [`HttpAuthApi`] is the production one.
//!
//! ## Endpoints
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Method  Path                      Auth     Returns                     │
//! │  ──────  ────────────────────────  ───────  ──────────────────────────  │
//! │  POST    /auth/register            -        message, user?, tokens?     │
//! │  POST    /auth/login               -        message, user, tokens       │
//! │  GET     /auth/verify-email?token  -        message                     │
//! │  POST    /auth/forgot-password     -        message                     │
//! │  POST    /auth/reset-password      -        message                     │
//! │  GET     /auth/me                  Bearer   user                        │
//! │  POST    /auth/refresh             -        tokens                      │
//! │  PATCH   /auth/complete-profile    Bearer   user? (may be partial)      │
//! │  PATCH   /auth/update-profile      Bearer   user? (may be partial)      │
//! │  POST    /auth/logout              Bearer   -                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Response Classification
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  no response (connect, timeout, body read)  ──► AuthError::Network      │
//! │  401 / 403                                  ──► InvalidCredentials      │
//! │  400 / 422                                  ──► Validation (+ fields)   │
//! │  any other non-2xx                          ──► Unknown                 │
//! │  2xx with "success": false                  ──► Unknown                 │
//! │                                   (login: InvalidCredentials instead)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tally_core::{FieldMessage, LoginRequest, RegisterRequest, User, UserPatch};
use tracing::{debug, instrument};

use crate::config::ApiSettings;
use crate::error::{AuthError, AuthResult, ConfigError, ConfigResult};
use crate::session::TokenPair;

// =============================================================================
// Trait
// =============================================================================

/// What a successful sign-in or sign-up hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGrant {
    pub message: String,
    /// Absent when the account still needs email verification.
    pub tokens: Option<TokenPair>,
    pub user: Option<User>,
}

/// Which profile endpoint a patch goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileEndpoint {
    /// First-time business details for Google sign-ups.
    Complete,
    Update,
}

impl ProfileEndpoint {
    fn path(self) -> &'static str {
        match self {
            ProfileEndpoint::Complete => "/auth/complete-profile",
            ProfileEndpoint::Update => "/auth/update-profile",
        }
    }
}

/// User fields sent back by a profile endpoint. Servers may echo only the
/// fields that changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileRecord(Map<String, Value>);

impl ProfileRecord {
    /// Overlays these fields onto `user`.
    ///
    /// Fails when a field has the wrong shape; `user` is left alone.
    pub fn merge_onto(&self, user: &User) -> serde_json::Result<User> {
        let mut merged = match serde_json::to_value(user)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in &self.0 {
            let key = if key == "_id" { "id" } else { key.as_str() };
            merged.insert(key.to_string(), value.clone());
        }
        serde_json::from_value(Value::Object(merged))
    }
}

impl From<Map<String, Value>> for ProfileRecord {
    fn from(fields: Map<String, Value>) -> Self {
        ProfileRecord(fields)
    }
}

/// The Auth API collaborator.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> AuthResult<AuthGrant>;

    async fn login(&self, request: &LoginRequest) -> AuthResult<AuthGrant>;

    /// Returns the server's confirmation message.
    async fn verify_email(&self, token: &str) -> AuthResult<String>;

    async fn forgot_password(&self, email: &str) -> AuthResult<String>;

    async fn reset_password(&self, token: &str, password: &str) -> AuthResult<String>;

    async fn current_user(&self, access_token: &str) -> AuthResult<User>;

    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair>;

    /// Sends `patch` and returns whatever user fields the server sent back.
    async fn update_profile(
        &self,
        endpoint: ProfileEndpoint,
        access_token: &str,
        patch: &UserPatch,
    ) -> AuthResult<Option<ProfileRecord>>;

    async fn logout(&self, access_token: &str) -> AuthResult<()>;
}

// =============================================================================
// Wire Types
// =============================================================================

/// `user` stays raw JSON until an endpoint decides how strictly to read it.
#[derive(Debug, Default, Deserialize)]
struct Payload {
    #[serde(default)]
    tokens: Option<TokenPair>,
    #[serde(default)]
    user: Option<Value>,
}

/// Common response envelope. Some endpoints nest the payload under `data`.
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    tokens: Option<TokenPair>,
    #[serde(default)]
    user: Option<Value>,
    #[serde(default)]
    data: Option<Payload>,
    #[serde(default)]
    errors: Vec<FieldMessage>,
}

impl Envelope {
    /// Turns a 2xx `"success": false` into an error built by `reject`.
    fn accepted(self, reject: impl FnOnce(String) -> AuthError) -> AuthResult<Self> {
        if self.success == Some(false) {
            let message = self
                .message
                .unwrap_or_else(|| "The request was not accepted.".to_string());
            return Err(reject(message));
        }
        Ok(self)
    }

    fn message_or(&self, default: &str) -> String {
        self.message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default.to_string())
    }

    fn take_tokens(&mut self) -> Option<TokenPair> {
        self.tokens
            .take()
            .or_else(|| self.data.as_mut().and_then(|d| d.tokens.take()))
    }

    fn take_raw_user(&mut self) -> Option<Value> {
        self.user
            .take()
            .or_else(|| self.data.as_mut().and_then(|d| d.user.take()))
    }

    /// A complete user record, or `None` when absent or malformed.
    fn take_user(&mut self) -> Option<User> {
        let raw = self.take_raw_user()?;
        serde_json::from_value(raw)
            .inspect_err(|e| debug!(error = %e, "Response user is not a complete record"))
            .ok()
    }

    /// Whatever user fields the response carried.
    fn take_record(&mut self) -> Option<ProfileRecord> {
        match self.take_raw_user()? {
            Value::Object(fields) => Some(ProfileRecord(fields)),
            _ => None,
        }
    }

    fn into_grant(mut self, default_message: &str) -> AuthGrant {
        AuthGrant {
            message: self.message_or(default_message),
            tokens: self.take_tokens(),
            user: self.take_user(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshBody<'a> {
    refresh_token: &'a str,
}

/// Maps an HTTP status and body onto the envelope or an [`AuthError`].
fn classify(status: u16, body: &str) -> AuthResult<Envelope> {
    let parsed: Option<Envelope> = if body.trim().is_empty() {
        Some(Envelope::default())
    } else {
        serde_json::from_str(body).ok()
    };

    if (200..300).contains(&status) {
        return parsed.ok_or_else(|| {
            AuthError::Unknown(format!("Unexpected response from server (status {status})"))
        });
    }

    let envelope = parsed.unwrap_or_default();
    Err(match status {
        401 | 403 => AuthError::invalid_credentials(
            envelope.message_or("Your credentials were not accepted."),
        ),
        400 | 422 => AuthError::Validation {
            message: envelope.message_or("Please check the form and try again."),
            fields: envelope.errors,
        },
        _ => AuthError::Unknown(envelope.message_or(&format!("Server responded with status {status}"))),
    })
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// [`AuthApi`] over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: Client,
    base_url: String,
}

impl HttpAuthApi {
    /// Creates a client for `base_url`. Without a timeout requests wait as
    /// long as the server takes.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> ConfigResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::InvalidConfig(format!("HTTP client: {e}")))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Uses an already configured client.
    pub fn with_client(client: Client, base_url: &str) -> Self {
        HttpAuthApi {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_settings(settings: &ApiSettings) -> ConfigResult<Self> {
        Self::new(&settings.base_url, settings.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    async fn send(&self, request: RequestBuilder) -> AuthResult<Envelope> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(status, "Auth API responded");
        classify(status, &body)
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    #[instrument(skip_all)]
    async fn register(&self, request: &RegisterRequest) -> AuthResult<AuthGrant> {
        let envelope = self
            .send(self.request(Method::POST, "/auth/register").json(request))
            .await?
            .accepted(AuthError::Unknown)?;
        Ok(envelope.into_grant("Registration successful."))
    }

    #[instrument(skip_all)]
    async fn login(&self, request: &LoginRequest) -> AuthResult<AuthGrant> {
        let envelope = self
            .send(self.request(Method::POST, "/auth/login").json(request))
            .await?
            .accepted(AuthError::invalid_credentials)?;
        Ok(envelope.into_grant("Signed in."))
    }

    #[instrument(skip_all)]
    async fn verify_email(&self, token: &str) -> AuthResult<String> {
        let envelope = self
            .send(
                self.request(Method::GET, "/auth/verify-email")
                    .query(&[("token", token)]),
            )
            .await?
            .accepted(AuthError::Unknown)?;
        Ok(envelope.message_or("Email verified."))
    }

    #[instrument(skip_all)]
    async fn forgot_password(&self, email: &str) -> AuthResult<String> {
        let envelope = self
            .send(
                self.request(Method::POST, "/auth/forgot-password")
                    .json(&json!({ "email": email })),
            )
            .await?
            .accepted(AuthError::Unknown)?;
        Ok(envelope.message_or("If that address has an account, a reset link is on its way."))
    }

    #[instrument(skip_all)]
    async fn reset_password(&self, token: &str, password: &str) -> AuthResult<String> {
        let envelope = self
            .send(
                self.request(Method::POST, "/auth/reset-password")
                    .json(&json!({ "token": token, "password": password })),
            )
            .await?
            .accepted(AuthError::Unknown)?;
        Ok(envelope.message_or("Password updated."))
    }

    #[instrument(skip_all)]
    async fn current_user(&self, access_token: &str) -> AuthResult<User> {
        let mut envelope = self
            .send(self.request(Method::GET, "/auth/me").bearer_auth(access_token))
            .await?
            .accepted(AuthError::invalid_credentials)?;
        envelope
            .take_user()
            .ok_or_else(|| AuthError::Unknown("Profile response contained no user".into()))
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let mut envelope = self
            .send(
                self.request(Method::POST, "/auth/refresh")
                    .json(&RefreshBody { refresh_token }),
            )
            .await?
            .accepted(AuthError::invalid_credentials)?;
        envelope
            .take_tokens()
            .ok_or_else(|| AuthError::invalid_credentials("Your session has expired. Please sign in again."))
    }

    #[instrument(skip_all, fields(endpoint = ?endpoint))]
    async fn update_profile(
        &self,
        endpoint: ProfileEndpoint,
        access_token: &str,
        patch: &UserPatch,
    ) -> AuthResult<Option<ProfileRecord>> {
        let mut envelope = self
            .send(
                self.request(Method::PATCH, endpoint.path())
                    .bearer_auth(access_token)
                    .json(patch),
            )
            .await?
            .accepted(AuthError::Unknown)?;
        Ok(envelope.take_record())
    }

    #[instrument(skip_all)]
    async fn logout(&self, access_token: &str) -> AuthResult<()> {
        self.send(self.request(Method::POST, "/auth/logout").bearer_auth(access_token))
            .await?;
        Ok(())
    }
}
