//! `RocksDB` storage backend (feature `rocksdb-backend`).
//!
//! `RocksDB` is a synchronous C++ library, so every call is dispatched to
//! [`tokio::task::spawn_blocking`]. Single-key writes are atomic.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rocksdb::{DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options};

use crate::{StorageBackend, StorageError};

type Db = DBWithThreadMode<MultiThreaded>;

/// A storage backend backed by a `RocksDB` directory.
#[derive(Clone)]
pub struct RocksDbBackend {
    db: Arc<Db>,
    path: PathBuf,
}

impl std::fmt::Debug for RocksDbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksDbBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl RocksDbBackend {
    /// Open a `RocksDB` database at the given directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if `RocksDB` cannot open the directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(true);

        let db = Db::open(&opts, path).map_err(|e| StorageError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        })
    }

    /// Return the filesystem path of this database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn panicked(e: &tokio::task::JoinError) -> String {
    format!("blocking task panicked: {e}")
}

#[async_trait::async_trait]
impl StorageBackend for RocksDbBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let db = Arc::clone(&self.db);
        let key = key.to_owned();
        let owned = key.clone();
        tokio::task::spawn_blocking(move || {
            db.get(owned.as_bytes()).map_err(|e| StorageError::Read {
                key: owned.clone(),
                reason: e.to_string(),
            })
        })
        .await
        .map_err(|e| StorageError::Read {
            key,
            reason: panicked(&e),
        })?
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let db = Arc::clone(&self.db);
        let key = key.to_owned();
        let owned = key.clone();
        let value = value.to_vec();
        tokio::task::spawn_blocking(move || {
            db.put(owned.as_bytes(), &value)
                .map_err(|e| StorageError::Write {
                    key: owned.clone(),
                    reason: e.to_string(),
                })
        })
        .await
        .map_err(|e| StorageError::Write {
            key,
            reason: panicked(&e),
        })?
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let db = Arc::clone(&self.db);
        let key = key.to_owned();
        let owned = key.clone();
        tokio::task::spawn_blocking(move || {
            db.delete(owned.as_bytes()).map_err(|e| StorageError::Delete {
                key: owned.clone(),
                reason: e.to_string(),
            })
        })
        .await
        .map_err(|e| StorageError::Delete {
            key,
            reason: panicked(&e),
        })?
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let db = Arc::clone(&self.db);
        let prefix = prefix.to_owned();
        let owned = prefix.clone();
        tokio::task::spawn_blocking(move || {
            let mut keys = Vec::new();
            for entry in db.iterator(IteratorMode::From(owned.as_bytes(), Direction::Forward)) {
                let (k, _) = entry.map_err(|e| StorageError::List {
                    prefix: owned.clone(),
                    reason: e.to_string(),
                })?;
                let key = String::from_utf8(k.to_vec()).map_err(|e| StorageError::InvalidKey {
                    reason: e.to_string(),
                })?;
                if !key.starts_with(&owned) {
                    break;
                }
                keys.push(key);
            }
            Ok(keys)
        })
        .await
        .map_err(|e| StorageError::List {
            prefix,
            reason: panicked(&e),
        })?
    }
}
