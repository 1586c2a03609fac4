//! Vault item operations for an authenticated owner.
//!
//! The service validates input, encrypts the secret fields before they
//! reach the repository and decrypts them on the way out. It holds no item
//! state between calls.

use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use crate::crypto::FieldCodec;
use crate::error::{CryptoError, VaultError};
use crate::models::{ItemFields, ItemWrite, StoredItem, TagsInput, VaultEntry};
use crate::repository::VaultRepository;

const REQUIRED_FIELDS: &str = "Title, username, and password are required";

/// Encrypting front end over a [`VaultRepository`].
#[derive(Clone)]
pub struct VaultService {
    repository: Arc<dyn VaultRepository>,
    codec: Arc<FieldCodec>,
}

impl std::fmt::Debug for VaultService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultService").finish_non_exhaustive()
    }
}

impl VaultService {
    #[must_use]
    pub fn new(repository: Arc<dyn VaultRepository>, codec: Arc<FieldCodec>) -> Self {
        Self { repository, codec }
    }

    /// Validate, encrypt, and store a new item. Returns its id.
    ///
    /// # Errors
    ///
    /// [`VaultError::Validation`] if a required field is empty; crypto or
    /// repository failures otherwise.
    pub async fn create_item(&self, owner: Uuid, fields: &ItemFields) -> Result<Uuid, VaultError> {
        let write = self.seal(fields)?;
        let id = self.repository.create(owner, write).await?;
        info!(owner_id = %owner, item_id = %id, "vault item created");
        Ok(id)
    }

    /// All of the owner's items, decrypted, most recently updated first.
    ///
    /// # Errors
    ///
    /// Any item failing to decrypt fails the whole call.
    pub async fn list_items(&self, owner: Uuid) -> Result<Vec<VaultEntry>, VaultError> {
        let stored = self.repository.list(owner).await?;
        stored.into_iter().map(|item| self.open(item)).collect()
    }

    /// One decrypted item.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotFound`] if the owner has no item with this id.
    pub async fn get_item(&self, owner: Uuid, id: Uuid) -> Result<VaultEntry, VaultError> {
        let item = self
            .repository
            .get(owner, id)
            .await?
            .ok_or(VaultError::NotFound)?;
        self.open(item)
    }

    /// Replace every writable field of an item, re-encrypting the secrets.
    ///
    /// # Errors
    ///
    /// [`VaultError::Validation`] as for create, [`VaultError::NotFound`] if
    /// the owner has no item with this id.
    pub async fn update_item(
        &self,
        owner: Uuid,
        id: Uuid,
        fields: &ItemFields,
    ) -> Result<(), VaultError> {
        let write = self.seal(fields)?;
        if !self.repository.update(owner, id, write).await? {
            return Err(VaultError::NotFound);
        }
        info!(owner_id = %owner, item_id = %id, "vault item updated");
        Ok(())
    }

    /// Delete an item.
    ///
    /// # Errors
    ///
    /// [`VaultError::NotFound`] if the owner has no item with this id.
    pub async fn delete_item(&self, owner: Uuid, id: Uuid) -> Result<(), VaultError> {
        if !self.repository.delete(owner, id).await? {
            return Err(VaultError::NotFound);
        }
        info!(owner_id = %owner, item_id = %id, "vault item deleted");
        Ok(())
    }

    fn seal(&self, fields: &ItemFields) -> Result<ItemWrite, VaultError> {
        // Whitespace-only counts as missing.
        if [&fields.title, &fields.username, &fields.password]
            .iter()
            .any(|f| f.trim().is_empty())
        {
            return Err(VaultError::Validation(REQUIRED_FIELDS.to_owned()));
        }

        Ok(ItemWrite {
            title: fields.title.clone(),
            username: self.codec.encrypt_field(&fields.username)?,
            password: self.codec.encrypt_field(&fields.password)?,
            url: self.codec.encrypt_optional(fields.url.as_deref())?,
            notes: self.codec.encrypt_optional(fields.notes.as_deref())?,
            tags: fields
                .tags
                .as_ref()
                .map(TagsInput::normalize)
                .unwrap_or_default(),
        })
    }

    fn open(&self, item: StoredItem) -> Result<VaultEntry, VaultError> {
        self.decrypt_entry(&item).map_err(|e| {
            error!(item_id = %item.id, error = %e, "stored vault item failed to decrypt");
            VaultError::Crypto(e)
        })
    }

    fn decrypt_entry(&self, item: &StoredItem) -> Result<VaultEntry, CryptoError> {
        Ok(VaultEntry {
            id: item.id,
            title: item.title.clone(),
            username: self.codec.decrypt_field(&item.username)?,
            password: self.codec.decrypt_field(&item.password)?,
            url: self.codec.decrypt_optional(item.url.as_deref())?,
            notes: self.codec.decrypt_optional(item.notes.as_deref())?,
            tags: item.tags.clone(),
            created_at: item.created_at,
            updated_at: item.updated_at,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use vaultkeep_storage::{MemoryBackend, StorageBackend};

    use super::*;
    use crate::repository::{DocumentRepository, MemoryRepository};

    fn codec() -> Arc<FieldCodec> {
        Arc::new(FieldCodec::from_secret(b"vault-service-test").unwrap())
    }

    fn fields(title: &str, username: &str, password: &str) -> ItemFields {
        ItemFields {
            title: title.to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
            url: None,
            notes: None,
            tags: None,
        }
    }

    fn service() -> VaultService {
        VaultService::new(Arc::new(MemoryRepository::new()), codec())
    }

    #[tokio::test]
    async fn create_then_list_decrypts() {
        let vault = service();
        let owner = Uuid::new_v4();
        let mut input = fields("Gmail", "a", "p");
        input.url = Some("https://mail.google.com".into());
        input.tags = Some(TagsInput::Csv("email, personal,".into()));

        let id = vault.create_item(owner, &input).await.unwrap();
        let items = vault.list_items(owner).await.unwrap();

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.id, id);
        assert_eq!(item.title, "Gmail");
        assert_eq!(item.username, "a");
        assert_eq!(item.password, "p");
        assert_eq!(item.url, "https://mail.google.com");
        assert_eq!(item.notes, "");
        assert_eq!(item.tags, vec!["email", "personal"]);
    }

    #[tokio::test]
    async fn required_fields_are_validated_on_create_and_update() {
        let vault = service();
        let owner = Uuid::new_v4();

        let invalid = [
            fields("", "u", "p"),
            fields("t", "", "p"),
            fields("t", "u", ""),
            fields("  ", "u", "p"),
        ];
        for bad in invalid {
            let err = vault.create_item(owner, &bad).await.unwrap_err();
            assert_eq!(err.to_string(), REQUIRED_FIELDS);
        }

        let id = vault.create_item(owner, &fields("t", "u", "p")).await.unwrap();
        for bad in [fields("t", "u", ""), fields("t", " \t ", "p")] {
            let err = vault.update_item(owner, id, &bad).await.unwrap_err();
            assert!(matches!(err, VaultError::Validation(_)));
        }
        assert_eq!(vault.get_item(owner, id).await.unwrap().username, "u");
    }

    #[tokio::test]
    async fn update_is_a_full_replace() {
        let vault = service();
        let owner = Uuid::new_v4();
        let mut original = fields("Bank", "old-user", "old-pass");
        original.notes = Some("security question".into());
        let id = vault.create_item(owner, &original).await.unwrap();

        vault
            .update_item(owner, id, &fields("Bank", "new-user", "new-pass"))
            .await
            .unwrap();

        let item = vault.get_item(owner, id).await.unwrap();
        assert_eq!(item.username, "new-user");
        assert_eq!(item.password, "new-pass");
        assert_eq!(item.notes, "");
    }

    #[tokio::test]
    async fn foreign_items_are_not_found() {
        let vault = service();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let id = vault.create_item(alice, &fields("t", "u", "p")).await.unwrap();

        assert!(matches!(vault.get_item(bob, id).await, Err(VaultError::NotFound)));
        assert!(matches!(
            vault.update_item(bob, id, &fields("x", "y", "z")).await,
            Err(VaultError::NotFound)
        ));
        assert!(matches!(vault.delete_item(bob, id).await, Err(VaultError::NotFound)));
        assert!(vault.list_items(bob).await.unwrap().is_empty());

        vault.delete_item(alice, id).await.unwrap();
        assert!(matches!(vault.delete_item(alice, id).await, Err(VaultError::NotFound)));
    }

    #[tokio::test]
    async fn stored_documents_hold_no_plaintext_secrets() {
        let backend = MemoryBackend::new();
        let repo = Arc::new(DocumentRepository::new(Arc::new(backend.clone())));
        let vault = VaultService::new(repo, codec());
        let owner = Uuid::new_v4();

        let mut input = fields("Visible title", "secret-login-name", "correct-horse-battery");
        input.url = Some("https://secret.example".into());
        input.notes = Some("recovery code 998877".into());
        let id = vault.create_item(owner, &input).await.unwrap();

        let raw = backend.get(&format!("items/{owner}/{id}")).await.unwrap().unwrap();
        let raw = String::from_utf8(raw).unwrap();
        assert!(raw.contains("Visible title"));
        for secret in ["secret-login-name", "correct-horse-battery", "secret.example", "998877"] {
            assert!(!raw.contains(secret), "{secret} stored in plaintext");
        }
    }

    #[tokio::test]
    async fn empty_optional_fields_are_not_encrypted() {
        let backend = MemoryBackend::new();
        let repo = Arc::new(DocumentRepository::new(Arc::new(backend.clone())));
        let vault = VaultService::new(repo, codec());
        let owner = Uuid::new_v4();

        let mut input = fields("t", "u", "p");
        input.url = Some(String::new());
        let id = vault.create_item(owner, &input).await.unwrap();

        let raw = backend.get(&format!("items/{owner}/{id}")).await.unwrap().unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert!(doc.get("url").is_none());
        assert!(doc.get("notes").is_none());
    }

    #[tokio::test]
    async fn wrong_key_fails_the_whole_listing() {
        let repo: Arc<dyn VaultRepository> = Arc::new(MemoryRepository::new());
        let writer = VaultService::new(Arc::clone(&repo), codec());
        let reader = VaultService::new(
            repo,
            Arc::new(FieldCodec::from_secret(b"some-other-secret").unwrap()),
        );
        let owner = Uuid::new_v4();
        writer.create_item(owner, &fields("t", "u", "p")).await.unwrap();

        assert!(matches!(reader.list_items(owner).await, Err(VaultError::Crypto(_))));
    }
}
