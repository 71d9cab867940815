//! Local key value storage used to persist the client settings

use parking_lot::RwLock;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::runtime::{Handle, RuntimeFlavor};

/// Persistent string key value store. Reads and writes of a single key
/// are atomic from the callers perspective
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored for `key`
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key` replacing any previous value. The
    /// stored value is unchanged when the write fails
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Store that only lives in memory, mainly for tests and hosts without
/// local persistence
#[derive(Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.values
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Errors that can occur while loading or writing a store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read store: {0}")]
    Read(#[source] std::io::Error),
    #[error("Failed to parse store: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Failed to write store: {0}")]
    Write(#[source] std::io::Error),
}

/// Store persisted as a flat JSON object on disk, the whole file is
/// rewritten on every set.
///
/// Writes use blocking file IO. Inside a multi-threaded tokio runtime the
/// write is moved off the worker with [tokio::task::block_in_place], on a
/// current thread runtime it blocks the runtime for the duration of the
/// write
pub struct FileStore {
    path: PathBuf,
    values: RwLock<HashMap<String, String>>,
}

impl FileStore {
    /// Opens the store at the provided path, a missing file is treated
    /// as an empty store
    ///
    /// ## Arguments
    /// * `path` - The path of the JSON file
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();

        let values = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => HashMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => return Err(StoreError::Read(err)),
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    /// The path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &HashMap<String, String>) -> std::io::Result<()> {
        let bytes = serde_json::to_vec_pretty(values)?;
        run_blocking(|| {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&self.path, bytes)
        })
    }
}

/// Runs blocking work, letting a multi-threaded runtime move other tasks
/// off the current worker while it runs
fn run_blocking<R>(work: impl FnOnce() -> R) -> R {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        // Lock is held while writing so concurrent sets can't interleave
        let values = &mut *self.values.write();

        let mut updated = values.clone();
        updated.insert(key.to_string(), value.to_string());
        self.persist(&updated).map_err(StoreError::Write)?;

        *values = updated;
        Ok(())
    }
}
