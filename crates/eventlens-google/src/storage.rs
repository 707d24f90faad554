//! Persistent key-value storage.
//!
//! String keys to string values, scoped to a single profile. Tokens and
//! the calendar map live here as flat keys.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::{debug, info};

use crate::error::{GoogleError, GoogleResult};

/// A string key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> GoogleResult<Option<String>>;

    /// Stores several values at once.
    fn set_many(&self, entries: &[(&str, String)]) -> GoogleResult<()>;

    /// Returns every key currently stored, sorted.
    fn keys(&self) -> GoogleResult<Vec<String>>;

    /// Stores `value` under `key`.
    fn set(&self, key: &str, value: &str) -> GoogleResult<()> {
        self.set_many(&[(key, value.to_string())])
    }
}

/// In-memory store, lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> GoogleResult<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, String)]) -> GoogleResult<()> {
        let mut map = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn keys(&self) -> GoogleResult<Vec<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.keys().cloned().collect())
    }
}

/// Store persisted as a JSON object in a single file.
///
/// The whole object is rewritten on every update (temp file + rename), with
/// owner-only permissions on Unix since it holds OAuth tokens.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    /// Opens the store at `path`, loading existing entries if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> GoogleResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                GoogleError::storage(format!("failed to read store {:?}: {}", path, e))
            })?;
            let entries: BTreeMap<String, String> = serde_json::from_str(&content).map_err(|e| {
                GoogleError::storage(format!("failed to parse store {:?}: {}", path, e))
            })?;
            info!("loaded {} entries from {:?}", entries.len(), path);
            entries
        } else {
            debug!("no store file at {:?}", path);
            BTreeMap::new()
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    /// Returns the store path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> GoogleResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                GoogleError::storage(format!("failed to create store directory: {}", e))
            })?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| GoogleError::storage(format!("failed to serialize store: {}", e)))?;

        fs::write(&temp_path, &content)
            .map_err(|e| GoogleError::storage(format!("failed to write store: {}", e)))?;

        fs::rename(&temp_path, &self.path)
            .map_err(|e| GoogleError::storage(format!("failed to rename store: {}", e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            let _ = fs::set_permissions(&self.path, perms);
        }

        debug!("saved store to {:?}", self.path);
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> GoogleResult<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set_many(&self, entries: &[(&str, String)]) -> GoogleResult<()> {
        let mut map = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mut updated = map.clone();
        for (key, value) in entries {
            updated.insert((*key).to_string(), value.clone());
        }
        // Memory only changes once the file write succeeded.
        self.save(&updated)?;
        *map = updated;
        Ok(())
    }

    fn keys(&self) -> GoogleResult<Vec<String>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.keys().cloned().collect())
    }
}
