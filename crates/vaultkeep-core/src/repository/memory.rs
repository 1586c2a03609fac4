//! In-process repository. Nothing survives a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{UserRepository, VaultRepository, newest_first, stored_item};
use crate::error::RepositoryError;
use crate::models::{ItemWrite, NewUser, StoredItem, UserRecord};

#[derive(Debug, Default)]
struct Users {
    by_id: HashMap<Uuid, UserRecord>,
    id_by_email: HashMap<String, Uuid>,
}

/// Users and items held in typed maps; items are indexed by owner, then id.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    users: RwLock<Users>,
    items: RwLock<HashMap<Uuid, HashMap<Uuid, StoredItem>>>,
}

impl MemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, RepositoryError> {
        let mut users = self.users.write().await;
        if users.id_by_email.contains_key(&user.email) {
            return Err(RepositoryError::DuplicateEmail);
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            created_at: Utc::now(),
        };
        users.id_by_email.insert(record.email.clone(), record.id);
        users.by_id.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users
            .id_by_email
            .get(email)
            .and_then(|id| users.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepositoryError> {
        Ok(self.users.read().await.by_id.get(&id).cloned())
    }
}

#[async_trait]
impl VaultRepository for MemoryRepository {
    async fn create(&self, owner: Uuid, item: ItemWrite) -> Result<Uuid, RepositoryError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.items
            .write()
            .await
            .entry(owner)
            .or_default()
            .insert(id, stored_item(id, owner, item, now, now));
        Ok(id)
    }

    async fn list(&self, owner: Uuid) -> Result<Vec<StoredItem>, RepositoryError> {
        let mut items: Vec<StoredItem> = self
            .items
            .read()
            .await
            .get(&owner)
            .map(|owned| owned.values().cloned().collect())
            .unwrap_or_default();
        newest_first(&mut items);
        Ok(items)
    }

    async fn get(&self, owner: Uuid, id: Uuid) -> Result<Option<StoredItem>, RepositoryError> {
        Ok(self
            .items
            .read()
            .await
            .get(&owner)
            .and_then(|owned| owned.get(&id))
            .cloned())
    }

    async fn update(&self, owner: Uuid, id: Uuid, item: ItemWrite) -> Result<bool, RepositoryError> {
        let mut items = self.items.write().await;
        let Some(existing) = items.get_mut(&owner).and_then(|owned| owned.get_mut(&id)) else {
            return Ok(false);
        };
        *existing = stored_item(id, owner, item, existing.created_at, Utc::now());
        Ok(true)
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> Result<bool, RepositoryError> {
        let mut items = self.items.write().await;
        Ok(items
            .get_mut(&owner)
            .and_then(|owned| owned.remove(&id))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::contract;

    #[tokio::test]
    async fn users_are_unique_by_email() {
        contract::users_are_unique_by_email(&MemoryRepository::new()).await;
    }

    #[tokio::test]
    async fn items_roundtrip() {
        contract::items_roundtrip(&MemoryRepository::new()).await;
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        contract::list_is_newest_first(&MemoryRepository::new()).await;
    }

    #[tokio::test]
    async fn update_replaces_fields() {
        contract::update_replaces_fields(&MemoryRepository::new()).await;
    }

    #[tokio::test]
    async fn owners_are_isolated() {
        contract::owners_are_isolated(&MemoryRepository::new()).await;
    }

    #[tokio::test]
    async fn delete_reports_missing() {
        contract::delete_reports_missing(&MemoryRepository::new()).await;
    }
}
