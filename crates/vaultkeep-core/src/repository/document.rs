//! Repository that stores JSON documents in a [`StorageBackend`].
//!
//! Key layout:
//!
//! - `users/id/<user_id>` → user document
//! - `users/email/<email>` → user id (uniqueness index)
//! - `items/<owner_id>/<item_id>` → item document
//!
//! Writes go through a single mutex so the email check-and-insert is atomic
//! and concurrent writers to the same item serialize (last write wins).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;
use vaultkeep_storage::StorageBackend;

use super::{UserRepository, VaultRepository, newest_first, stored_item};
use crate::error::RepositoryError;
use crate::models::{ItemWrite, NewUser, StoredItem, UserRecord};

fn user_key(id: Uuid) -> String {
    format!("users/id/{id}")
}

fn email_key(email: &str) -> String {
    format!("users/email/{email}")
}

fn owner_prefix(owner: Uuid) -> String {
    format!("items/{owner}/")
}

fn item_key(owner: Uuid, id: Uuid) -> String {
    format!("items/{owner}/{id}")
}

/// Users and items persisted as JSON documents.
pub struct DocumentRepository {
    storage: Arc<dyn StorageBackend>,
    write_lock: Mutex<()>,
}

impl std::fmt::Debug for DocumentRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentRepository").finish_non_exhaustive()
    }
}

impl DocumentRepository {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RepositoryError> {
        let Some(bytes) = self.storage.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| RepositoryError::Corrupt {
                key: key.to_owned(),
                reason: e.to_string(),
            })
    }

    async fn write<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), RepositoryError> {
        let bytes = serde_json::to_vec(value).map_err(|e| RepositoryError::Serialization {
            reason: e.to_string(),
        })?;
        self.storage.put(key, &bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for DocumentRepository {
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, RepositoryError> {
        let _guard = self.write_lock.lock().await;

        let index = email_key(&user.email);
        if self.storage.exists(&index).await? {
            return Err(RepositoryError::DuplicateEmail);
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        // The record first, then the index that makes it reachable by email.
        self.write(&user_key(record.id), &record).await?;
        self.write(&index, &record.id).await?;

        debug!(user_id = %record.id, "user document written");
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let Some(id) = self.read::<Uuid>(&email_key(email)).await? else {
            return Ok(None);
        };
        let user = self.read::<UserRecord>(&user_key(id)).await?;
        if user.is_none() {
            warn!(user_id = %id, "email index points at a missing user document");
        }
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepositoryError> {
        self.read(&user_key(id)).await
    }
}

#[async_trait]
impl VaultRepository for DocumentRepository {
    async fn create(&self, owner: Uuid, item: ItemWrite) -> Result<Uuid, RepositoryError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        let stored = stored_item(id, owner, item, now, now);

        let _guard = self.write_lock.lock().await;
        self.write(&item_key(owner, id), &stored).await?;
        Ok(id)
    }

    async fn list(&self, owner: Uuid) -> Result<Vec<StoredItem>, RepositoryError> {
        let keys = self.storage.list(&owner_prefix(owner)).await?;
        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            // A concurrent delete may remove a listed key before it is read.
            if let Some(item) = self.read::<StoredItem>(&key).await? {
                items.push(item);
            }
        }
        newest_first(&mut items);
        Ok(items)
    }

    async fn get(&self, owner: Uuid, id: Uuid) -> Result<Option<StoredItem>, RepositoryError> {
        self.read(&item_key(owner, id)).await
    }

    async fn update(&self, owner: Uuid, id: Uuid, item: ItemWrite) -> Result<bool, RepositoryError> {
        let key = item_key(owner, id);
        let _guard = self.write_lock.lock().await;

        let Some(existing) = self.read::<StoredItem>(&key).await? else {
            return Ok(false);
        };
        let replaced = stored_item(id, owner, item, existing.created_at, Utc::now());
        self.write(&key, &replaced).await?;
        Ok(true)
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> Result<bool, RepositoryError> {
        let key = item_key(owner, id);
        let _guard = self.write_lock.lock().await;

        if !self.storage.exists(&key).await? {
            return Ok(false);
        }
        self.storage.delete(&key).await?;
        Ok(true)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vaultkeep_storage::MemoryBackend;

    use super::*;
    use crate::repository::contract;

    fn repo() -> (DocumentRepository, MemoryBackend) {
        let backend = MemoryBackend::new();
        (DocumentRepository::new(Arc::new(backend.clone())), backend)
    }

    #[tokio::test]
    async fn users_are_unique_by_email() {
        contract::users_are_unique_by_email(&repo().0).await;
    }

    #[tokio::test]
    async fn items_roundtrip() {
        contract::items_roundtrip(&repo().0).await;
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        contract::list_is_newest_first(&repo().0).await;
    }

    #[tokio::test]
    async fn update_replaces_fields() {
        contract::update_replaces_fields(&repo().0).await;
    }

    #[tokio::test]
    async fn owners_are_isolated() {
        contract::owners_are_isolated(&repo().0).await;
    }

    #[tokio::test]
    async fn delete_reports_missing() {
        contract::delete_reports_missing(&repo().0).await;
    }

    #[tokio::test]
    async fn item_keys_embed_the_owner() {
        let (repo, backend) = repo();
        let owner = Uuid::new_v4();
        let id = repo.create(owner, contract::write("x")).await.unwrap();

        let keys = backend.list("items/").await.unwrap();
        assert_eq!(keys, vec![format!("items/{owner}/{id}")]);
    }

    #[tokio::test]
    async fn corrupt_document_is_reported() {
        let (repo, backend) = repo();
        let owner = Uuid::new_v4();
        let id = Uuid::new_v4();
        backend.put(&item_key(owner, id), b"{not json").await.unwrap();

        let err = repo.get(owner, id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Corrupt { .. }));
        assert!(repo.list(owner).await.is_err());
    }

    #[tokio::test]
    async fn concurrent_registrations_admit_one() {
        let repo = Arc::new(repo().0);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.create_user(NewUser {
                    email: "race@example.com".to_owned(),
                    password_hash: "h".to_owned(),
                })
                .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
    }
}
