use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::entry::Side;
use crate::error::MenuError;

/// What a menu remembers about how it ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreRecord {
    pub side: Side,
    /// Position of the selected entry within its side's sorted list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

pub fn restore_key(id: &str) -> String {
    format!("menu-restore:{id}")
}

/// Key/value store for [`RestoreRecord`]s shared between menu runs.
pub trait RestoreCache {
    fn get(&self, key: &str) -> Option<RestoreRecord>;
    fn set(&mut self, key: &str, record: RestoreRecord) -> Result<(), MenuError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    records: HashMap<String, RestoreRecord>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RestoreCache for MemoryCache {
    fn get(&self, key: &str) -> Option<RestoreRecord> {
        self.records.get(key).cloned()
    }

    fn set(&mut self, key: &str, record: RestoreRecord) -> Result<(), MenuError> {
        self.records.insert(key.to_string(), record);
        Ok(())
    }
}

/// JSON file of records, rewritten whole on every `set`. Last writer wins.
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
    records: HashMap<String, RestoreRecord>,
}

impl FileCache {
    /// `<cache dir>/menukit/restore.json`.
    pub fn default_path() -> Option<PathBuf> {
        let cache_root = dirs::cache_dir()?;
        Some(cache_root.join("menukit").join("restore.json"))
    }

    /// Opens the cache, starting empty when the file is missing or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match Self::read(&path) {
            Ok(cache) => cache,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable restore cache");
                Self {
                    path,
                    records: HashMap::new(),
                }
            }
        }
    }

    pub fn read(path: &Path) -> Result<Self, MenuError> {
        if !path.exists() {
            return Ok(Self {
                path: path.to_path_buf(),
                records: HashMap::new(),
            });
        }
        let content = fs::read_to_string(path).map_err(|source| MenuError::CacheRead {
            path: path.to_path_buf(),
            source,
        })?;
        let records = serde_json::from_str(&content).map_err(|source| MenuError::CacheFormat {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), MenuError> {
        let write_error = |source| MenuError::CacheWrite {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        let serialized = serde_json::to_string_pretty(&self.records)?;
        fs::write(&self.path, serialized).map_err(write_error)
    }
}

impl RestoreCache for FileCache {
    fn get(&self, key: &str) -> Option<RestoreRecord> {
        self.records.get(key).cloned()
    }

    fn set(&mut self, key: &str, record: RestoreRecord) -> Result<(), MenuError> {
        self.records.insert(key.to_string(), record);
        self.persist()
    }
}
