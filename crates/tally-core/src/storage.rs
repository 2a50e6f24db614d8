//! # Key-Value Storage
//!
//! The durable string-to-string store that holds tokens, the cached user
//! record and the preferred currency.
//!
//! Only the trait and an in-memory implementation live here; the
//! file-backed store lives in `tally-session` because it performs I/O.
//!
//! Access is synchronous. Each call is atomic: a failed `write_batch` leaves
//! none of its keys written or removed.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{StorageError, StorageResult};

/// Well-known storage keys.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "accessToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const USER_DATA: &str = "userData";
    /// Written by the profile-completion flow of older clients.
    pub const USER: &str = "user";
    pub const REMEMBER_ME: &str = "rememberMe";
    pub const PREFERRED_CURRENCY: &str = "preferredCurrency";

    /// Everything `logout` must remove.
    pub const SESSION_KEYS: [&str; 5] = [ACCESS_TOKEN, REFRESH_TOKEN, USER_DATA, USER, REMEMBER_ME];
}

/// A durable key-value store with string values.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.set_many(&[(key, value)])
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.remove_many(&[key])
    }

    /// Writes every pair or none of them.
    fn set_many(&self, entries: &[(&str, &str)]) -> StorageResult<()> {
        self.write_batch(entries, &[])
    }

    /// Removes every key or none of them. Missing keys are not an error.
    fn remove_many(&self, keys: &[&str]) -> StorageResult<()> {
        self.write_batch(&[], keys)
    }

    /// Writes `entries` and removes `removals` as one change. Either all of
    /// it lands or none of it does.
    fn write_batch(&self, entries: &[(&str, &str)], removals: &[&str]) -> StorageResult<()>;
}

/// Process-local store, used in tests and when no data directory exists.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MemoryStore {
            entries: RwLock::new(map),
        }
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> HashMap<String, String> {
        self.entries
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let guard = self
            .entries
            .read()
            .map_err(|_| StorageError::Read("memory store lock poisoned".into()))?;
        Ok(guard.get(key).cloned())
    }

    fn write_batch(&self, entries: &[(&str, &str)], removals: &[&str]) -> StorageResult<()> {
        let mut guard = self
            .entries
            .write()
            .map_err(|_| StorageError::Write("memory store lock poisoned".into()))?;
        for (key, value) in entries {
            guard.insert(key.to_string(), value.to_string());
        }
        for key in removals {
            guard.remove(*key);
        }
        Ok(())
    }
}
