//! Durable key/value storage with two scopes.
//!
//! A single `get`/`set`/`remove` is atomic. Anything built from two calls
//! (read-modify-write) is not: two contexts incrementing the same counter can lose
//! an update. Callers that do this accept last-write-wins.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};

use comfort_utils::{PersistMode, atomic_write, recover_bak_file};

/// Which storage area a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageScope {
    /// Per-install data: the configuration blob, selected text, counters.
    Local,
    /// Small cross-device settings owned by the settings screens.
    Sync,
}

impl StorageScope {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Sync => "sync",
        }
    }

    fn file_name(self) -> &'static str {
        match self {
            Self::Local => "local.json",
            Self::Sync => "sync.json",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage io error at {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("storage file {} is not a JSON object: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode value for {key}: {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },
    #[error("storage lock poisoned")]
    Poisoned,
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(_: PoisonError<T>) -> Self {
        Self::Poisoned
    }
}

pub trait StorageBackend: Send + Sync {
    fn get(&self, scope: StorageScope, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, scope: StorageScope, key: &str, value: Value) -> Result<(), StoreError>;
    fn remove(&self, scope: StorageScope, key: &str) -> Result<(), StoreError>;
}

/// One JSON object file per scope under `dir`.
///
/// Every operation re-reads the file so writes from other processes are seen;
/// the mutex serializes operations within this process.
pub struct FileStorage {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        for scope in [StorageScope::Local, StorageScope::Sync] {
            recover_bak_file(&dir.join(scope.file_name()));
        }
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, scope: StorageScope) -> PathBuf {
        self.dir.join(scope.file_name())
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        Ok(self.lock.lock()?)
    }

    fn read_scope(&self, scope: StorageScope) -> Result<Map<String, Value>, StoreError> {
        let path = self.path(scope);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt { path, source })
    }

    fn write_scope(&self, scope: StorageScope, map: &Map<String, Value>) -> Result<(), StoreError> {
        let path = self.path(scope);
        let bytes = serde_json::to_vec_pretty(map).map_err(|source| StoreError::Encode {
            key: scope.as_str().to_string(),
            source,
        })?;
        atomic_write(&path, &bytes, PersistMode::SensitiveOwnerOnly)
            .map_err(|source| StoreError::Io { path, source })
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, scope: StorageScope, key: &str) -> Result<Option<Value>, StoreError> {
        let _guard = self.guard()?;
        Ok(self.read_scope(scope)?.remove(key))
    }

    fn set(&self, scope: StorageScope, key: &str, value: Value) -> Result<(), StoreError> {
        let _guard = self.guard()?;
        let mut map = self.read_scope(scope)?;
        map.insert(key.to_string(), value);
        self.write_scope(scope, &map)
    }

    fn remove(&self, scope: StorageScope, key: &str) -> Result<(), StoreError> {
        let _guard = self.guard()?;
        let mut map = self.read_scope(scope)?;
        if map.remove(key).is_some() {
            self.write_scope(scope, &map)?;
        }
        Ok(())
    }
}

/// In-process storage for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<(StorageScope, String), Value>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, scope: StorageScope, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.lock()?.get(&(scope, key.to_string())).cloned())
    }

    fn set(&self, scope: StorageScope, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.lock()?.insert((scope, key.to_string()), value);
        Ok(())
    }

    fn remove(&self, scope: StorageScope, key: &str) -> Result<(), StoreError> {
        self.entries.lock()?.remove(&(scope, key.to_string()));
        Ok(())
    }
}
