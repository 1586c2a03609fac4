//! Persistence for users and vault items.
//!
//! Every vault operation takes the owner id as part of its lookup key; there
//! is no way to address an item by id alone. A miss on the wrong owner and
//! a miss on a nonexistent id look identical to callers.

mod document;
mod memory;

pub use document::DocumentRepository;
pub use memory::MemoryRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::{ItemWrite, NewUser, StoredItem, UserRecord};

/// User accounts, keyed by canonical email.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::DuplicateEmail`] if the email is taken.
    /// The check and the insert happen atomically.
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, RepositoryError>;

    /// Look up a user by canonical email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError>;

    /// Look up a user by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepositoryError>;
}

/// Vault items, scoped by owner.
#[async_trait]
pub trait VaultRepository: Send + Sync {
    /// Store a new item for `owner` and return its id.
    async fn create(&self, owner: Uuid, item: ItemWrite) -> Result<Uuid, RepositoryError>;

    /// All of `owner`'s items, most recently updated first.
    async fn list(&self, owner: Uuid) -> Result<Vec<StoredItem>, RepositoryError>;

    /// One of `owner`'s items.
    async fn get(&self, owner: Uuid, id: Uuid) -> Result<Option<StoredItem>, RepositoryError>;

    /// Replace the writable fields of one of `owner`'s items.
    ///
    /// Returns `false` when no item of `owner`'s has this id.
    async fn update(&self, owner: Uuid, id: Uuid, item: ItemWrite) -> Result<bool, RepositoryError>;

    /// Delete one of `owner`'s items.
    ///
    /// Returns `false` when no item of `owner`'s has this id.
    async fn delete(&self, owner: Uuid, id: Uuid) -> Result<bool, RepositoryError>;
}

fn newest_first(items: &mut [StoredItem]) {
    items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

fn stored_item(
    id: Uuid,
    owner: Uuid,
    item: ItemWrite,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> StoredItem {
    let ItemWrite {
        title,
        username,
        password,
        url,
        notes,
        tags,
    } = item;
    StoredItem {
        id,
        owner_id: owner,
        title,
        username,
        password,
        url,
        notes,
        tags,
        created_at,
        updated_at,
    }
}

/// Behaviour every repository implementation must share.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod contract {
    use super::*;

    pub(crate) fn write(title: &str) -> ItemWrite {
        ItemWrite {
            title: title.to_owned(),
            username: format!("enc-user-{title}"),
            password: format!("enc-pass-{title}"),
            url: None,
            notes: Some(format!("enc-notes-{title}")),
            tags: vec!["t".to_owned()],
        }
    }

    fn user(email: &str) -> NewUser {
        NewUser {
            email: email.to_owned(),
            password_hash: "$argon2id$stub".to_owned(),
        }
    }

    pub(crate) async fn users_are_unique_by_email(repo: &dyn UserRepository) {
        let created = repo.create_user(user("a@example.com")).await.unwrap();
        let err = repo.create_user(user("a@example.com")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateEmail));

        let by_email = repo.find_by_email("a@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        let by_id = repo.find_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "a@example.com");

        assert!(repo.find_by_email("b@example.com").await.unwrap().is_none());
        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    pub(crate) async fn items_roundtrip(repo: &dyn VaultRepository) {
        let owner = Uuid::new_v4();
        let id = repo.create(owner, write("mail")).await.unwrap();

        let item = repo.get(owner, id).await.unwrap().unwrap();
        assert_eq!(item.id, id);
        assert_eq!(item.owner_id, owner);
        assert_eq!(item.title, "mail");
        assert_eq!(item.username, "enc-user-mail");
        assert_eq!(item.created_at, item.updated_at);
    }

    pub(crate) async fn list_is_newest_first(repo: &dyn VaultRepository) {
        let owner = Uuid::new_v4();
        let first = repo.create(owner, write("first")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = repo.create(owner, write("second")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let ids: Vec<Uuid> = repo.list(owner).await.unwrap().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![second, first]);

        // Touching the older item moves it to the front.
        assert!(repo.update(owner, first, write("first-v2")).await.unwrap());
        let ids: Vec<Uuid> = repo.list(owner).await.unwrap().iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![first, second]);

        assert!(repo.list(Uuid::new_v4()).await.unwrap().is_empty());
    }

    pub(crate) async fn update_replaces_fields(repo: &dyn VaultRepository) {
        let owner = Uuid::new_v4();
        let id = repo.create(owner, write("old")).await.unwrap();
        let before = repo.get(owner, id).await.unwrap().unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let mut replacement = write("new");
        replacement.notes = None;
        replacement.tags = vec![];
        assert!(repo.update(owner, id, replacement).await.unwrap());

        let after = repo.get(owner, id).await.unwrap().unwrap();
        assert_eq!(after.title, "new");
        assert_eq!(after.notes, None);
        assert!(after.tags.is_empty());
        assert_eq!(after.owner_id, owner);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);
    }

    pub(crate) async fn owners_are_isolated(repo: &dyn VaultRepository) {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let id = repo.create(alice, write("alice-only")).await.unwrap();

        assert!(repo.get(bob, id).await.unwrap().is_none());
        assert!(repo.list(bob).await.unwrap().is_empty());
        assert!(!repo.update(bob, id, write("hijack")).await.unwrap());
        assert!(!repo.delete(bob, id).await.unwrap());

        let still = repo.get(alice, id).await.unwrap().unwrap();
        assert_eq!(still.title, "alice-only");
    }

    pub(crate) async fn delete_reports_missing(repo: &dyn VaultRepository) {
        let owner = Uuid::new_v4();
        let id = repo.create(owner, write("gone")).await.unwrap();

        assert!(repo.delete(owner, id).await.unwrap());
        assert!(!repo.delete(owner, id).await.unwrap());
        assert!(repo.get(owner, id).await.unwrap().is_none());
        assert!(!repo.update(owner, id, write("zombie")).await.unwrap());
        assert!(!repo.update(owner, Uuid::new_v4(), write("never")).await.unwrap());
    }
}
