//! Error types for `vaultkeep-core`.
//!
//! One enum per concern. Crypto and credential errors never include key
//! material, plaintext, hashes, or token values; only operation context.
//! User-facing wording lives on the validation variants, which the HTTP
//! layer passes through unchanged.

use vaultkeep_storage::StorageError;

/// Errors from field encryption and key derivation.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// AES-256-GCM encryption failed.
    #[error("encryption failed: {reason}")]
    Encryption { reason: String },

    /// AES-256-GCM decryption failed (wrong key, corrupted ciphertext, or tampered tag).
    #[error("decryption failed: {reason}")]
    Decryption { reason: String },

    /// HKDF key derivation failed.
    #[error("key derivation failed for context '{context}': {reason}")]
    KeyDerivation { context: String, reason: String },

    /// Ciphertext is too short to contain a valid nonce + tag.
    #[error("ciphertext too short: expected at least {expected} bytes, got {actual}")]
    CiphertextTooShort { expected: usize, actual: usize },

    /// The stored field is not valid base64, so it was never produced by the codec.
    #[error("ciphertext is not valid base64: {reason}")]
    InvalidEncoding { reason: String },

    /// Decryption succeeded but the plaintext is not UTF-8.
    #[error("decrypted field is not valid UTF-8")]
    InvalidUtf8,
}

/// Errors from password hashing and token signing.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Argon2 parameters were rejected.
    #[error("invalid password hash parameters: {reason}")]
    InvalidParams { reason: String },

    /// Hashing a password failed.
    #[error("password hashing failed: {reason}")]
    Hashing { reason: String },

    /// A stored password hash could not be parsed.
    #[error("stored password hash is malformed: {reason}")]
    MalformedHash { reason: String },

    /// Signing a token failed.
    #[error("token signing failed: {reason}")]
    Signing { reason: String },

    /// The blocking hashing task did not complete.
    #[error("credential task failed: {reason}")]
    Task { reason: String },
}

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A user with this email already exists.
    #[error("a user with this email already exists")]
    DuplicateEmail,

    /// The storage backend failed.
    #[error("repository storage error: {0}")]
    Storage(#[from] StorageError),

    /// A stored document could not be decoded.
    #[error("corrupt document at '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// A record could not be encoded for storage.
    #[error("failed to serialize record: {reason}")]
    Serialization { reason: String },
}

/// Errors from vault item operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The request was missing required fields.
    #[error("{0}")]
    Validation(String),

    /// The item does not exist or belongs to another owner.
    #[error("Vault item not found")]
    NotFound,

    /// Encrypting or decrypting a field failed.
    #[error("vault crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// The repository failed.
    #[error("vault repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Errors from registration, login, and identity lookup.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// The request was missing or had malformed fields.
    #[error("{0}")]
    Validation(String),

    /// Registration for an email that is already taken.
    #[error("User already exists")]
    AlreadyExists,

    /// Unknown email or wrong password. Deliberately the same message.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// The authenticated user no longer exists.
    #[error("User not found")]
    NotFound,

    /// Hashing or signing failed.
    #[error("account credential error: {0}")]
    Credential(#[from] CredentialError),

    /// The repository failed.
    #[error("account repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Errors from the password generator.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GeneratorError {
    /// Requested length is outside the supported range.
    #[error("password length must be between {min} and {max}, got {actual}")]
    InvalidLength { min: usize, max: usize, actual: usize },

    /// Every character class was disabled.
    #[error("at least one character class must be enabled")]
    EmptyCharset,
}
