//! Records, inputs, and views shared by the repositories and services.
//!
//! Stored records ([`UserRecord`], [`StoredItem`]) hold only ciphertext for
//! secret fields. Plaintext exists only in request inputs ([`ItemFields`])
//! and response views ([`VaultEntry`]); both zeroize on drop and redact
//! their `Debug` output.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A registered user as stored.
#[derive(Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    /// Canonical (trimmed, lowercased) email.
    pub email: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Input to [`UserRepository::create_user`](crate::repository::UserRepository::create_user).
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
}

/// A vault item as stored. Secret fields are codec output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredItem {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The writable part of an item, already encrypted. Used for create and
/// full-replace update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemWrite {
    pub title: String,
    pub username: String,
    pub password: String,
    pub url: Option<String>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
}

/// Tags as accepted from clients: a comma-separated string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    Csv(String),
    List(Vec<String>),
}

impl TagsInput {
    /// Split, trim, and drop empty entries.
    #[must_use]
    pub fn normalize(&self) -> Vec<String> {
        match self {
            Self::Csv(csv) => normalize_tags(csv.split(',')),
            Self::List(list) => normalize_tags(list.iter().map(String::as_str)),
        }
    }
}

/// Trim every tag and drop the empty ones, keeping order.
pub fn normalize_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    tags.into_iter()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Plaintext item fields submitted by a client.
#[derive(Default, Clone, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ItemFields {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    #[zeroize(skip)]
    pub tags: Option<TagsInput>,
}

impl fmt::Debug for ItemFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemFields")
            .field("title", &self.title)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// A decrypted vault item returned to its owner.
#[derive(Clone, Serialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct VaultEntry {
    #[zeroize(skip)]
    pub id: Uuid,
    pub title: String,
    pub username: String,
    pub password: String,
    /// Empty when the item has no URL.
    pub url: String,
    /// Empty when the item has no notes.
    pub notes: String,
    pub tags: Vec<String>,
    #[zeroize(skip)]
    pub created_at: DateTime<Utc>,
    #[zeroize(skip)]
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for VaultEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultEntry")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("tags", &self.tags)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish_non_exhaustive()
    }
}
