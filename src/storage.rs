//! Key-value storage backends for the session cache.
//!
//! Session state lives in a flat key -> value namespace. The durable backend
//! maps each key to a file inside a per-user scope directory, so every
//! `doados` process run by the same user shares the same session.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Error raised by a storage backend.
#[derive(Debug)]
pub enum StorageError {
    /// The backing medium cannot be used at all (e.g. the scope directory
    /// could not be created).
    Unavailable(String),
    /// A single read or write failed.
    Io(io::Error),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Unavailable(msg) => write!(f, "storage unavailable: {}", msg),
            StorageError::Io(e) => write!(f, "storage I/O error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        StorageError::Io(e)
    }
}

/// Synchronous key-value storage.
///
/// All operations are blocking and complete before returning; there is no
/// locking layer on top. Concurrent writers to the same scope are
/// last-write-wins.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// One file per key inside a scope directory.
///
/// The directory is created lazily on the first write, so a read-only command
/// against a fresh machine never touches the filesystem.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    /// Cheap change fingerprint of the given keys: mtime + length per file,
    /// `None` for a missing file. Two equal fingerprints mean no observable
    /// change; a differing entry names the key that moved.
    pub fn fingerprint(&self, keys: &[&str]) -> Vec<Option<(SystemTime, u64)>> {
        keys.iter()
            .map(|key| {
                std::fs::metadata(self.path_for(key)).ok().and_then(|meta| {
                    let modified = meta.modified().ok()?;
                    Some((modified, meta.len()))
                })
            })
            .collect()
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir).map_err(|e| {
                StorageError::Unavailable(format!("cannot create {}: {}", self.dir.display(), e))
            })?;
        }
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory storage for isolated instances (tests, ephemeral sessions).
#[allow(dead_code)] // production always runs over FileStorage
#[derive(Default)]
pub struct MemoryStorage {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStorage {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
