//! # Session Manager
//!
//! Owns the token pair and profile snapshot, mirrors them to durable
//! storage and publishes [`AuthStatus`] changes to subscribers.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  key            written by                     removed by               │
//! │  ─────────────  ─────────────────────────────  ───────────────────────  │
//! │  accessToken    login, register, refresh       logout, failed restore   │
//! │  refreshToken   login, register, refresh       logout, failed restore   │
//! │  userData       login, register, profile, me   logout, failed restore   │
//! │  user           (older clients)                logout, failed restore   │
//! │  rememberMe     login(remember_me = true)      login(false), logout     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Refresh Coalescing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  caller A ── read stored r1 ── lock ── POST /auth/refresh ── store r2 ─┐│
//! │  caller B ── read stored r1 ── wait ─────────────────────────── lock ─┐││
//! │                                     stored is r2, not r1: return it ◄─┘││
//! │                                                                        ││
//! │  One network call for both callers.                                    ││
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Other operations are not serialized against each other. Callers should
//! hold off on new actions while the status is `Authenticating`.

use std::sync::Arc;

use chrono::Utc;
use tally_core::validation::{validate_email, validate_password, validate_required};
use tally_core::{keys, KeyValueStore, LoginRequest, RegisterRequest, User, UserPatch};
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::api::{AuthApi, ProfileEndpoint};
use crate::error::{AuthError, AuthResult};
use crate::session::{AuthStatus, Session, TokenPair};

/// Authentication session lifecycle.
pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    store: Arc<dyn KeyValueStore>,
    session: RwLock<Session>,
    status: watch::Sender<AuthStatus>,
    refresh_lock: Mutex<()>,
}

impl SessionManager {
    /// Creates a manager with an empty session in the `Restoring` state.
    /// Call [`check_auth_status`](Self::check_auth_status) next.
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<dyn KeyValueStore>) -> Self {
        let (status, _) = watch::channel(AuthStatus::Restoring);
        SessionManager {
            api,
            store,
            session: RwLock::new(Session::default()),
            status,
            refresh_lock: Mutex::new(()),
        }
    }

    // =========================================================================
    // Observers
    // =========================================================================

    /// Receives every status change from now on.
    pub fn subscribe(&self) -> watch::Receiver<AuthStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> AuthStatus {
        *self.status.borrow()
    }

    /// Copy of the current session.
    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    pub async fn user(&self) -> Option<User> {
        self.session.read().await.user.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_authenticated()
    }

    fn publish(&self, status: AuthStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            debug!(from = %previous, to = %status, "Auth status changed");
        }
    }

    // =========================================================================
    // Sign-in / Sign-up
    // =========================================================================

    /// Signs in and stores both tokens and the user.
    ///
    /// On any failure the stored and in-memory session are exactly as they
    /// were before the call.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str, remember_me: bool) -> AuthResult<Session> {
        let previous = self.status();
        self.publish(AuthStatus::Authenticating);

        let result = self.try_login(email, password, remember_me).await;
        match &result {
            Ok(session) => {
                self.publish(session.status());
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.publish(previous);
            }
        }
        result
    }

    async fn try_login(&self, email: &str, password: &str, remember_me: bool) -> AuthResult<Session> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let grant = self.api.login(&request).await?;

        let (tokens, user) = match (grant.tokens, grant.user) {
            (Some(tokens), Some(user)) => (tokens, user),
            _ => return Err(AuthError::Unknown("Login response was incomplete".into())),
        };

        self.persist_session(&tokens, &user, remember_me)?;

        let session = Session::established(tokens, user);
        if let Some(user) = &session.user {
            info!(user_id = %user.id, remember_me, "Signed in");
        }
        *self.session.write().await = session.clone();
        Ok(session)
    }

    /// Creates an account. Newsletter and terms flags are forwarded as-is.
    ///
    /// When the backend issues tokens the user is signed in. When it does not
    /// (email verification pending) the returned session carries only the
    /// user and nothing is stored.
    #[instrument(skip_all)]
    pub async fn register(&self, request: &RegisterRequest) -> AuthResult<Session> {
        let previous = self.status();
        self.publish(AuthStatus::Authenticating);

        let grant = match self.api.register(request).await {
            Ok(grant) => grant,
            Err(e) => {
                warn!(error = %e, "Registration failed");
                self.publish(previous);
                return Err(e);
            }
        };

        let (tokens, user) = match (grant.tokens, grant.user) {
            (Some(tokens), Some(user)) => (tokens, user),
            (_, user) => {
                info!("Registered, awaiting email verification");
                self.publish(previous);
                return Ok(Session {
                    user,
                    ..Session::default()
                });
            }
        };

        if let Err(e) = self.persist_session(&tokens, &user, false) {
            warn!(error = %e, "Failed to store new session");
            self.publish(previous);
            return Err(e);
        }

        info!(user_id = %user.id, "Registered and signed in");
        let session = Session::established(tokens, user);
        *self.session.write().await = session.clone();
        self.publish(session.status());
        Ok(session)
    }

    /// Tokens, user and the remember-me flag go to storage in one batch.
    fn persist_session(&self, tokens: &TokenPair, user: &User, remember_me: bool) -> AuthResult<()> {
        let user_json = serde_json::to_string(user)
            .map_err(|e| AuthError::Storage(format!("Failed to encode user: {e}")))?;

        let mut entries = vec![
            (keys::ACCESS_TOKEN, tokens.access_token.as_str()),
            (keys::REFRESH_TOKEN, tokens.refresh_token.as_str()),
            (keys::USER_DATA, user_json.as_str()),
        ];
        let mut removals = Vec::new();
        if remember_me {
            entries.push((keys::REMEMBER_ME, "true"));
        } else {
            removals.push(keys::REMEMBER_ME);
        }

        self.store.write_batch(&entries, &removals)?;
        Ok(())
    }

    // =========================================================================
    // Refresh
    // =========================================================================

    /// Exchanges the stored refresh token for a new pair.
    ///
    /// Fails with [`AuthError::NoRefreshToken`] before any network call when
    /// nothing is stored. A failure leaves the session in place; clearing it
    /// is the caller's decision.
    #[instrument(skip_all)]
    pub async fn refresh(&self) -> AuthResult<Session> {
        let observed = self.stored(keys::REFRESH_TOKEN);
        let _guard = self.refresh_lock.lock().await;

        let current = self.stored(keys::REFRESH_TOKEN);
        let refresh_token = match (observed, current) {
            (_, None) => {
                debug!("Refresh requested with no stored refresh token");
                return Err(AuthError::NoRefreshToken);
            }
            (Some(seen), Some(now)) if seen != now => {
                debug!("Refresh already completed by a concurrent caller");
                return Ok(self.session().await);
            }
            (_, Some(now)) => now,
        };

        let previous = self.status();
        self.publish(AuthStatus::Authenticating);

        let result = self.try_refresh(&refresh_token).await;
        match &result {
            Ok(session) => {
                info!("Tokens refreshed");
                self.publish(session.status());
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                self.publish(previous);
            }
        }
        result
    }

    async fn try_refresh(&self, refresh_token: &str) -> AuthResult<Session> {
        let tokens = self.api.refresh(refresh_token).await?;
        self.store.set_many(&[
            (keys::ACCESS_TOKEN, tokens.access_token.as_str()),
            (keys::REFRESH_TOKEN, tokens.refresh_token.as_str()),
        ])?;

        let stored_user = self.stored_user();
        let mut session = self.session.write().await;
        session.access_token = Some(tokens.access_token);
        session.refresh_token = Some(tokens.refresh_token);
        session.authenticated_at = Some(Utc::now());
        if session.user.is_none() {
            session.user = stored_user;
        }
        Ok(session.clone())
    }

    // =========================================================================
    // Logout
    // =========================================================================

    /// Clears the session from memory and storage, then tells the server.
    ///
    /// Idempotent. The in-memory session is always cleared; an error means
    /// durable storage could not be wiped.
    #[instrument(skip_all)]
    pub async fn logout(&self) -> AuthResult<()> {
        let access_token = {
            let mut session = self.session.write().await;
            let token = session
                .access_token
                .take()
                .or_else(|| self.stored(keys::ACCESS_TOKEN));
            *session = Session::default();
            token
        };
        self.publish(AuthStatus::Unauthenticated);

        let cleared = self.store.remove_many(&keys::SESSION_KEYS);
        if let Err(e) = &cleared {
            warn!(error = %e, "Failed to clear stored session");
        }

        if let Some(token) = access_token {
            if let Err(e) = self.api.logout(&token).await {
                warn!(error = %e, "Server-side logout failed");
            }
        }

        info!("Signed out");
        cleared.map_err(AuthError::from)
    }

    // =========================================================================
    // Restore
    // =========================================================================

    /// Restores the stored session and validates it against the server.
    ///
    /// ```text
    /// no stored token ─────────────────────────────► Unauthenticated
    /// stored token ─► Restoring ─► GET /auth/me ─┬─ ok ───────► Authenticated
    ///                                            ├─ 401 / 403 ─► clear, Unauth
    ///                                            └─ anything else (offline,
    ///                                               5xx, unreadable) ─► keep stored
    /// ```
    #[instrument(skip_all)]
    pub async fn check_auth_status(&self) -> AuthStatus {
        self.publish(AuthStatus::Restoring);

        let Some(access_token) = self.stored(keys::ACCESS_TOKEN) else {
            *self.session.write().await = Session::default();
            self.publish(AuthStatus::Unauthenticated);
            return AuthStatus::Unauthenticated;
        };

        {
            let mut session = self.session.write().await;
            *session = Session {
                access_token: Some(access_token.clone()),
                refresh_token: self.stored(keys::REFRESH_TOKEN),
                user: self.stored_user(),
                authenticated_at: None,
            };
        }

        let status = match self.api.current_user(&access_token).await {
            Ok(user) => {
                if let Err(e) = self.store_user(&user) {
                    warn!(error = %e, "Failed to cache validated user");
                }
                info!(user_id = %user.id, "Session restored");
                let mut session = self.session.write().await;
                session.user = Some(user);
                session.authenticated_at = Some(Utc::now());
                session.status()
            }
            Err(e) if e.is_rejection() => {
                info!(error = %e, "Stored session rejected, clearing");
                *self.session.write().await = Session::default();
                if let Err(e) = self.store.remove_many(&keys::SESSION_KEYS) {
                    warn!(error = %e, "Failed to clear rejected session");
                }
                AuthStatus::Unauthenticated
            }
            Err(e) => {
                warn!(error = %e, "Could not validate session, keeping stored session");
                self.session.read().await.status()
            }
        };

        self.publish(status);
        status
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Sends a profile change and merges it into the session user.
    pub async fn update_profile(&self, patch: &UserPatch) -> AuthResult<User> {
        self.apply_profile(ProfileEndpoint::Update, patch).await
    }

    /// First-time business details for Google sign-ups.
    pub async fn complete_profile(&self, patch: &UserPatch) -> AuthResult<User> {
        self.apply_profile(ProfileEndpoint::Complete, patch).await
    }

    #[instrument(skip(self, patch))]
    async fn apply_profile(&self, endpoint: ProfileEndpoint, patch: &UserPatch) -> AuthResult<User> {
        patch.validate()?;

        let (access_token, current) = {
            let session = self.session.read().await;
            match (&session.access_token, &session.user) {
                (Some(token), Some(user)) => (token.clone(), user.clone()),
                _ => return Err(AuthError::NotAuthenticated),
            }
        };

        let returned = self.api.update_profile(endpoint, &access_token, patch).await?;

        let mut user = current;
        user.apply(patch);
        if endpoint == ProfileEndpoint::Complete {
            user.is_profile_complete = true;
        }
        // The server's copy, partial or whole, wins over the local merge.
        if let Some(record) = returned {
            match record.merge_onto(&user) {
                Ok(merged) => user = merged,
                Err(e) => warn!(error = %e, "Ignoring malformed user in profile response"),
            }
        }

        self.store_user(&user)?;

        let status = {
            let mut session = self.session.write().await;
            session.user = Some(user.clone());
            session.status()
        };
        self.publish(status);

        info!(user_id = %user.id, "Profile updated");
        Ok(user)
    }

    // =========================================================================
    // Account Recovery
    // =========================================================================

    /// Confirms an email address with the token from the verification link.
    #[instrument(skip_all)]
    pub async fn verify_email(&self, token: &str) -> AuthResult<String> {
        validate_required("token", token)?;
        self.api.verify_email(token.trim()).await
    }

    #[instrument(skip_all)]
    pub async fn forgot_password(&self, email: &str) -> AuthResult<String> {
        validate_email(email)?;
        self.api.forgot_password(email.trim()).await
    }

    /// Sets a new password. The password rules are checked before anything
    /// is sent.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AuthResult<String> {
        validate_required("token", token)?;
        validate_password(new_password)?;
        self.api.reset_password(token.trim(), new_password).await
    }

    // =========================================================================
    // Storage Helpers
    // =========================================================================

    fn stored(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "Failed to read storage");
                None
            }
        }
    }

    /// Cached user from `userData`, falling back to the older `user` key.
    fn stored_user(&self) -> Option<User> {
        [keys::USER_DATA, keys::USER].into_iter().find_map(|key| {
            let raw = self.stored(key)?;
            serde_json::from_str(&raw)
                .inspect_err(|e| warn!(key, error = %e, "Ignoring malformed cached user"))
                .ok()
        })
    }

    fn store_user(&self, user: &User) -> AuthResult<()> {
        let json = serde_json::to_string(user)
            .map_err(|e| AuthError::Storage(format!("Failed to encode user: {e}")))?;
        self.store.set(keys::USER_DATA, &json)?;
        Ok(())
    }
}
