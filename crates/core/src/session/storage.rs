//! Durable key/value storage for session credentials

use crate::error::{CoreError, CoreResult};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Key/value store holding the persisted session
///
/// Modelled on browser local storage: string keys, string values, and no
/// transactions. Callers serialize access through [`crate::Session`].
pub trait CredentialStorage: Send + Sync {
    fn get_item(&self, key: &str) -> CoreResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> CoreResult<()>;
    fn remove_item(&self, key: &str) -> CoreResult<()>;
}

/// Process-local storage, lost on exit
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> CoreResult<Option<String>> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> CoreResult<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> CoreResult<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.remove(key);
        Ok(())
    }
}

/// JSON file storage, rewritten on every change
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Default file name inside the data directory
    pub const FILE_NAME: &'static str = "session.json";

    /// Open `path`, starting empty if it does not exist yet
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed
    pub fn open(path: impl Into<PathBuf>) -> CoreResult<Self> {
        let path = path.into();
        let items = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => BTreeMap::new(),
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                CoreError::storage_error(format!("{} is not valid JSON: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), entries = items.len(), "Opened credential file");

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    /// Open `session.json` inside `data_dir`
    ///
    /// # Errors
    ///
    /// See [`FileStorage::open`]
    pub fn in_dir(data_dir: &Path) -> CoreResult<Self> {
        Self::open(data_dir.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, items: &BTreeMap<String, String>) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(items)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CredentialStorage for FileStorage {
    fn get_item(&self, key: &str) -> CoreResult<Option<String>> {
        let items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> CoreResult<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        items.insert(key.to_string(), value.to_string());
        self.persist(&items)
    }

    fn remove_item(&self, key: &str) -> CoreResult<()> {
        let mut items = self.items.lock().unwrap_or_else(PoisonError::into_inner);
        if items.remove(key).is_some() {
            self.persist(&items)?;
        }
        Ok(())
    }
}
