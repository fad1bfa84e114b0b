//! Persistent session storage: the restart mirror behind the snapshot store.
//!
//! Entries are keyed `pystacker.view.<pid>` and hold a [`PersistedView`].
//! This is a cache for reviving views after a restart, never the live source
//! of truth.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use pystacker_common::{PersistedView, Pid};

use crate::domain::StoreError;

const KEY_PREFIX: &str = "pystacker.view.";

/// Session key for a target.
#[must_use]
pub fn session_key(pid: Pid) -> String {
    format!("{KEY_PREFIX}{}", pid.0)
}

/// Inverse of [`session_key`]; `None` for keys this crate did not write.
#[must_use]
pub fn parse_session_key(key: &str) -> Option<Pid> {
    key.strip_prefix(KEY_PREFIX)?.parse().ok().map(Pid)
}

/// Host key/value storage that survives a restart.
pub trait SessionStorage {
    fn load(&self, key: &str) -> Result<Option<PersistedView>, StoreError>;
    fn save(&mut self, key: &str, value: &PersistedView) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Keeps nothing past the process. Used by tests and headless runs.
#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    entries: BTreeMap<String, PersistedView>,
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self, key: &str) -> Result<Option<PersistedView>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &PersistedView) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// All entries in one JSON object file, rewritten via temp file + rename.
#[derive(Debug)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub const FILE_NAME: &'static str = "session.json";

    /// Storage at `<dir>/session.json`. The directory is created on first write.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self { path: dir.as_ref().join(Self::FILE_NAME) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, error: std::io::Error) -> StoreError {
        StoreError::Io { path: self.path.display().to_string(), error }
    }

    /// Everything readable in the file.
    ///
    /// An unparsable file or entry is dropped with a warning, so the next
    /// write replaces it.
    fn read_all(&self) -> Result<BTreeMap<String, PersistedView>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        let raw: BTreeMap<String, serde_json::Value> = match serde_json::from_str(&content) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Discarding unreadable session file {}: {e}", self.path.display());
                return Ok(BTreeMap::new());
            }
        };

        Ok(raw
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_value(value) {
                Ok(view) => Some((key, view)),
                Err(e) => {
                    warn!("Dropping unreadable session entry {key}: {e}");
                    None
                }
            })
            .collect())
    }

    fn write_all(&self, entries: &BTreeMap<String, PersistedView>) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(entries)?;
        fs::write(&tmp, content).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self, key: &str) -> Result<Option<PersistedView>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn save(&mut self, key: &str, value: &PersistedView) -> Result<(), StoreError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.clone());
        self.write_all(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read_all()?.into_keys().collect())
    }
}
