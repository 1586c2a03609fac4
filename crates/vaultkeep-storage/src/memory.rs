//! In-memory storage backend.
//!
//! Data lives in a `BTreeMap` behind a `RwLock` and is lost when the process
//! exits. Used by the `memory` storage mode and by tests that need a real
//! backend without touching disk.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{StorageBackend, StorageError};

/// An in-memory storage backend backed by a `BTreeMap`.
///
/// Keys are kept sorted, so prefix listing is a single `range` scan. Clones
/// share the same underlying map.
///
/// # Examples
///
/// ```
/// # use vaultkeep_storage::{MemoryBackend, StorageBackend};
/// # #[tokio::main]
/// # async fn main() {
/// let backend = MemoryBackend::new();
/// backend.put("users/id/42", b"{}").await.unwrap();
/// let val = backend.get("users/id/42").await.unwrap();
/// assert_eq!(val, Some(b"{}".to_vec()));
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    data: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryBackend {
    /// Create a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Whether the backend holds no keys.
    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl StorageBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let data = self.data.read().await;
        Ok(data.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut data = self.data.write().await;
        data.insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut data = self.data.write().await;
        data.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let data = self.data.read().await;
        let keys = data
            .range(prefix.to_owned()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect();
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let data = self.data.read().await;
        Ok(data.contains_key(key))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("items/a/b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn put_overwrites_existing_value() {
        let backend = MemoryBackend::new();
        backend.put("users/id/1", b"v1").await.unwrap();
        backend.put("users/id/1", b"v2").await.unwrap();
        assert_eq!(
            backend.get("users/id/1").await.unwrap(),
            Some(b"v2".to_vec())
        );
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let backend = MemoryBackend::new();
        backend.put("items/o/1", b"x").await.unwrap();
        backend.delete("items/o/1").await.unwrap();
        backend.delete("items/o/1").await.unwrap();
        assert!(!backend.exists("items/o/1").await.unwrap());
    }

    #[tokio::test]
    async fn list_stops_at_prefix_boundary() {
        let backend = MemoryBackend::new();
        backend.put("items/alice/1", b"1").await.unwrap();
        backend.put("items/alice/2", b"2").await.unwrap();
        backend.put("items/alice-2/1", b"3").await.unwrap();
        backend.put("users/id/alice", b"4").await.unwrap();

        let keys = backend.list("items/alice/").await.unwrap();
        assert_eq!(keys, vec!["items/alice/1", "items/alice/2"]);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let backend = MemoryBackend::new();
        let clone = backend.clone();
        backend.put("k", b"v").await.unwrap();
        assert_eq!(clone.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(clone.len().await, 1);
        assert!(!clone.is_empty().await);
    }
}
