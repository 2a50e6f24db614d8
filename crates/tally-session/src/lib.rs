//! # tally-session: Authentication Session Layer for Tally
//!
//! Signs users in against the external Auth API, keeps their tokens and
//! profile on disk, and tells the UI what state the session is in.
//!
//! ## Session Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Session Lifecycle                               │
//! │                                                                         │
//! │  startup ──► SessionConfig::load ──► FileStore::open                    │
//! │                                            │                            │
//! │                                            ▼                            │
//! │              SessionManager::new ──► check_auth_status                  │
//! │                                            │                            │
//! │              ┌─────────────────────────────┼──────────────────────┐     │
//! │              ▼                             ▼                      ▼     │
//! │        login / register              refresh (401)          logout     │
//! │              │                             │                      │     │
//! │              └──────────► watch::Receiver<AuthStatus> ◄───────────┘     │
//! │                               (route guards)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`manager`] - The [`SessionManager`] state machine
//! - [`api`] - [`AuthApi`] trait and its reqwest implementation
//! - [`session`] - [`Session`] and [`AuthStatus`]
//! - [`store`] - JSON-file [`KeyValueStore`](tally_core::KeyValueStore)
//! - [`config`] - TOML/env configuration
//! - [`error`] - [`AuthError`] and [`ConfigError`]
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tally_session::{FileStore, HttpAuthApi, SessionConfig, SessionManager};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SessionConfig::load_or_default(None);
//! let store = Arc::new(FileStore::open("/tmp/tally/storage.json")?);
//! let api = Arc::new(HttpAuthApi::from_settings(&config.api)?);
//!
//! let manager = SessionManager::new(api, store);
//! if !manager.check_auth_status().await.is_authenticated() {
//!     manager.login("ada@example.com", "Secret123", true).await?;
//! }
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod api;
pub mod config;
pub mod error;
pub mod manager;
pub mod session;
pub mod store;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use api::{AuthApi, AuthGrant, HttpAuthApi, ProfileEndpoint, ProfileRecord};
pub use config::SessionConfig;
pub use error::{AuthError, AuthResult, ConfigError, ConfigResult};
pub use manager::SessionManager;
pub use session::{AuthStatus, Session, TokenPair};
pub use store::FileStore;
