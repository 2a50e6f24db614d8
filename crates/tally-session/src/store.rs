//! # File-Backed Key-Value Store
//!
//! Persists the session keys and the currency preference as a single JSON
//! object on disk.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  set_many / remove_many                                                 │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  lock ─► clone map ─► apply change ─► write storage.json.tmp            │
//! │                                              │                          │
//! │                                              ▼                          │
//! │                          rename over storage.json ─► swap in-memory map │
//! │                                                                         │
//! │  A failure anywhere before the rename leaves both the file and the      │
//! │  in-memory map untouched.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tally_core::{KeyValueStore, StorageError, StorageResult};
use tracing::{debug, warn};

type Entries = BTreeMap<String, String>;

/// JSON file store. The file is read once at open and rewritten on every
/// mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl FileStore {
    /// Opens the store at `path`, creating parent directories. A missing
    /// file is an empty store; an unreadable or malformed one is an error.
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::Write(format!("{}: {}", parent.display(), e)))?;
        }

        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => Entries::new(),
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|e| StorageError::Corrupt {
                    key: path.display().to_string(),
                    reason: e.to_string(),
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?path, "Storage file not found, starting empty");
                Entries::new()
            }
            Err(e) => return Err(StorageError::Read(format!("{}: {}", path.display(), e))),
        };

        debug!(?path, keys = entries.len(), "Opened file store");
        Ok(FileStore {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "storage.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persist(&self, entries: &Entries) -> StorageResult<()> {
        let contents = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Write(e.to_string()))?;
        let temp = self.temp_path();

        std::fs::write(&temp, contents)
            .map_err(|e| StorageError::Write(format!("{}: {}", temp.display(), e)))?;

        if let Err(e) = std::fs::rename(&temp, &self.path) {
            let _ = std::fs::remove_file(&temp);
            return Err(StorageError::Write(format!(
                "{}: {}",
                self.path.display(),
                e
            )));
        }
        Ok(())
    }

    /// Applies `change` to a copy of the map, persists it, then swaps it in.
    fn mutate(&self, change: impl FnOnce(&mut Entries)) -> StorageResult<()> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|_| StorageError::Write("file store lock poisoned".into()))?;

        let mut next = guard.clone();
        change(&mut next);
        if next == *guard {
            return Ok(());
        }

        self.persist(&next).inspect_err(|e| {
            warn!(path = ?self.path, error = %e, "Failed to persist storage");
        })?;
        *guard = next;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let guard = self
            .entries
            .lock()
            .map_err(|_| StorageError::Read("file store lock poisoned".into()))?;
        Ok(guard.get(key).cloned())
    }

    fn write_batch(&self, entries: &[(&str, &str)], removals: &[&str]) -> StorageResult<()> {
        self.mutate(|map| {
            for (key, value) in entries {
                map.insert(key.to_string(), value.to_string());
            }
            for key in removals {
                map.remove(*key);
            }
        })
    }
}
