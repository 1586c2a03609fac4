//! Pure-Rust redb storage backend, the default persistent store.
//!
//! redb is a B-tree with ACID transactions and no C++ toolchain
//! requirement. Every write is its own committed transaction, which gives
//! the single-document write serialization the repositories rely on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{Database, TableDefinition};

use crate::{StorageBackend, StorageError};

/// The single table holding all documents. Namespacing lives in the keys.
const DATA_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

/// A storage backend backed by a single redb database file.
///
/// Blocking redb calls are offloaded to the Tokio blocking thread pool.
///
/// # Examples
///
/// ```no_run
/// # use vaultkeep_storage::RedbBackend;
/// let backend = RedbBackend::open("/var/lib/vaultkeep/vault.redb").unwrap();
/// ```
#[derive(Clone)]
pub struct RedbBackend {
    db: Arc<Database>,
    path: PathBuf,
}

impl std::fmt::Debug for RedbBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbBackend")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn txn_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::Transaction {
        reason: e.to_string(),
    }
}

fn table_err(e: impl std::fmt::Display) -> StorageError {
    StorageError::MissingTable {
        name: format!("documents: {e}"),
    }
}

impl RedbBackend {
    /// Open or create a redb database at the given path.
    ///
    /// Parent directories are created when missing.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Open`] if redb fails to open or create the
    /// database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let open_err = |reason: String| StorageError::Open {
            path: path.display().to_string(),
            reason,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| open_err(e.to_string()))?;
        }

        let db = Database::create(path).map_err(|e| open_err(e.to_string()))?;

        // Opening the table inside a write transaction creates it.
        let txn = db.begin_write().map_err(txn_err)?;
        {
            let _table = txn.open_table(DATA_TABLE).map_err(table_err)?;
        }
        txn.commit().map_err(txn_err)?;

        tracing::debug!(path = %path.display(), "redb storage opened");

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

    /// Run a blocking closure against the database on the blocking pool.
    async fn blocking<T, F, Op>(&self, on_panic: F, op: Op) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(String) -> StorageError + Send,
        Op: FnOnce(&Database) -> Result<T, StorageError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| on_panic(format!("blocking task panicked: {e}")))?
    }
}

#[async_trait::async_trait]
impl StorageBackend for RedbBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let key = key.to_owned();
        let panic_key = key.clone();
        self.blocking(
            |reason| StorageError::Read {
                key: panic_key,
                reason,
            },
            move |db| {
                let txn = db.begin_read().map_err(txn_err)?;
                let table = txn.open_table(DATA_TABLE).map_err(table_err)?;
                let value = table
                    .get(key.as_str())
                    .map_err(|e| StorageError::Read {
                        key: key.clone(),
                        reason: e.to_string(),
                    })?
                    .map(|v| v.value().to_vec());
                Ok(value)
            },
        )
        .await
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let key = key.to_owned();
        let value = value.to_vec();
        let panic_key = key.clone();
        self.blocking(
            |reason| StorageError::Write {
                key: panic_key,
                reason,
            },
            move |db| {
                let txn = db.begin_write().map_err(txn_err)?;
                {
                    let mut table = txn.open_table(DATA_TABLE).map_err(table_err)?;
                    table
                        .insert(key.as_str(), value.as_slice())
                        .map_err(|e| StorageError::Write {
                            key: key.clone(),
                            reason: e.to_string(),
                        })?;
                }
                txn.commit().map_err(txn_err)
            },
        )
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let key = key.to_owned();
        let panic_key = key.clone();
        self.blocking(
            |reason| StorageError::Delete {
                key: panic_key,
                reason,
            },
            move |db| {
                let txn = db.begin_write().map_err(txn_err)?;
                {
                    let mut table = txn.open_table(DATA_TABLE).map_err(table_err)?;
                    table
                        .remove(key.as_str())
                        .map_err(|e| StorageError::Delete {
                            key: key.clone(),
                            reason: e.to_string(),
                        })?;
                }
                txn.commit().map_err(txn_err)
            },
        )
        .await
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let prefix = prefix.to_owned();
        let panic_prefix = prefix.clone();
        self.blocking(
            |reason| StorageError::List {
                prefix: panic_prefix,
                reason,
            },
            move |db| {
                let list_err = |e: &dyn std::fmt::Display| StorageError::List {
                    prefix: prefix.clone(),
                    reason: e.to_string(),
                };
                let txn = db.begin_read().map_err(txn_err)?;
                let table = txn.open_table(DATA_TABLE).map_err(table_err)?;

                let mut keys = Vec::new();
                for entry in table.range(prefix.as_str()..).map_err(|e| list_err(&e))? {
                    let (k, _) = entry.map_err(|e| list_err(&e))?;
                    let key = k.value();
                    if !key.starts_with(prefix.as_str()) {
                        break;
                    }
                    keys.push(key.to_owned());
                }
                Ok(keys)
            },
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vault.redb");

        {
            let backend = RedbBackend::open(&path).unwrap();
            backend.put("items/o/1", b"doc").await.unwrap();
        }

        let backend = RedbBackend::open(&path).unwrap();
        assert_eq!(backend.get("items/o/1").await.unwrap(), Some(b"doc".to_vec()));
        assert_eq!(backend.path(), path.as_path());
    }

    #[tokio::test]
    async fn list_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let backend = RedbBackend::open(dir.path().join("vault.redb")).unwrap();

        backend.put("items/a/1", b"1").await.unwrap();
        backend.put("items/a/2", b"2").await.unwrap();
        backend.put("items/b/1", b"3").await.unwrap();

        assert_eq!(
            backend.list("items/a/").await.unwrap(),
            vec!["items/a/1", "items/a/2"]
        );

        backend.delete("items/a/1").await.unwrap();
        backend.delete("items/a/1").await.unwrap();
        assert_eq!(backend.list("items/a/").await.unwrap(), vec!["items/a/2"]);
        assert!(!backend.exists("items/a/1").await.unwrap());
    }
}
