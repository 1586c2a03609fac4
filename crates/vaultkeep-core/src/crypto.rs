//! Field-level encryption for vault items.
//!
//! Provides AES-256-GCM authenticated encryption, HKDF-SHA256 key derivation
//! from the server secret, and the [`FieldCodec`] that turns a single text
//! field into a storable string and back.
//!
//! # Security model
//!
//! - Every encryption generates a fresh 96-bit nonce via `OsRng`, so equal
//!   plaintexts produce different ciphertexts.
//! - Binary format: `nonce (12 bytes) || ciphertext || tag (16 bytes)`,
//!   stored as standard base64.
//! - The field key is derived once at startup with HKDF-SHA256 and a fixed
//!   `info` label; it never leaves process memory.
//! - Key types derive `Zeroize` + `ZeroizeOnDrop` and redact `Debug`.

use std::fmt;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Nonce length for AES-256-GCM (96 bits).
const NONCE_LEN: usize = 12;

/// Minimum ciphertext length: 12-byte nonce + 16-byte AES-GCM tag.
const MIN_CIPHERTEXT_LEN: usize = NONCE_LEN + 16;

/// HKDF salt for the field key. Fixed so the same secret always yields the
/// same key across restarts.
const FIELD_KEY_SALT: &[u8] = b"vaultkeep/field-key/salt";

/// HKDF `info` label for the field key.
const FIELD_KEY_INFO: &[u8] = b"vaultkeep-field-encryption-v1";

/// A 256-bit encryption key that is zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Create a key from raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a new random key using the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let key = Aes256Gcm::generate_key(OsRng);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&key);
        Self(bytes)
    }

    /// Borrow the raw key bytes.
    ///
    /// The caller must not log or persist these bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// Encrypt plaintext using AES-256-GCM with a fresh random nonce.
///
/// Returns `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] if the AEAD operation fails.
pub fn encrypt(key: &EncryptionKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| CryptoError::Encryption {
            reason: e.to_string(),
        })?;

    let mut combined = Vec::with_capacity(NONCE_LEN.saturating_add(ciphertext.len()));
    combined.extend_from_slice(&nonce);
    combined.extend_from_slice(&ciphertext);
    Ok(combined)
}

/// Decrypt ciphertext produced by [`encrypt`].
///
/// # Errors
///
/// Returns [`CryptoError::CiphertextTooShort`] if the input cannot hold a
/// nonce and tag, and [`CryptoError::Decryption`] if authentication fails.
pub fn decrypt(key: &EncryptionKey, combined: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if combined.len() < MIN_CIPHERTEXT_LEN {
        return Err(CryptoError::CiphertextTooShort {
            expected: MIN_CIPHERTEXT_LEN,
            actual: combined.len(),
        });
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| CryptoError::Decryption {
            reason: e.to_string(),
        })
}

/// Derive a 256-bit key from arbitrary secret material using HKDF-SHA256.
///
/// # Errors
///
/// Returns [`CryptoError::KeyDerivation`] if HKDF expansion fails.
pub fn derive_key(
    secret: &[u8],
    salt: Option<&[u8]>,
    info: &[u8],
) -> Result<EncryptionKey, CryptoError> {
    let hk = Hkdf::<Sha256>::new(salt, secret);
    let mut derived = [0u8; 32];
    hk.expand(info, &mut derived)
        .map_err(|e| CryptoError::KeyDerivation {
            context: String::from_utf8_lossy(info).into_owned(),
            reason: e.to_string(),
        })?;
    let key = EncryptionKey::from_bytes(derived);
    derived.zeroize();
    Ok(key)
}

/// Encrypts and decrypts individual vault item fields.
///
/// The codec never decides whether a field should be encrypted; callers skip
/// empty optional fields themselves.
#[derive(Clone)]
pub struct FieldCodec {
    key: EncryptionKey,
}

impl FieldCodec {
    /// Build a codec around an existing key.
    #[must_use]
    pub fn new(key: EncryptionKey) -> Self {
        Self { key }
    }

    /// Build a codec whose key is derived from the configured server secret.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyDerivation`] if derivation fails.
    pub fn from_secret(secret: &[u8]) -> Result<Self, CryptoError> {
        let key = derive_key(secret, Some(FIELD_KEY_SALT), FIELD_KEY_INFO)?;
        Ok(Self::new(key))
    }

    /// Encrypt one text field into its base64 storage form.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encryption`] if the AEAD operation fails.
    pub fn encrypt_field(&self, plaintext: &str) -> Result<String, CryptoError> {
        let combined = encrypt(&self.key, plaintext.as_bytes())?;
        Ok(BASE64.encode(combined))
    }

    /// Decrypt a field previously produced by [`encrypt_field`](Self::encrypt_field).
    ///
    /// # Errors
    ///
    /// Fails with [`CryptoError::InvalidEncoding`] for values the codec never
    /// produced, [`CryptoError::Decryption`] for values encrypted under a
    /// different key or tampered with, and [`CryptoError::InvalidUtf8`] if
    /// the plaintext is not text.
    pub fn decrypt_field(&self, encoded: &str) -> Result<String, CryptoError> {
        let combined = BASE64
            .decode(encoded)
            .map_err(|e| CryptoError::InvalidEncoding {
                reason: e.to_string(),
            })?;
        let plaintext = decrypt(&self.key, &combined)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidUtf8)
    }

    /// Encrypt an optional field, leaving absent or empty values unencrypted
    /// and unset.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encryption`] if the AEAD operation fails.
    pub fn encrypt_optional(
        &self,
        plaintext: Option<&str>,
    ) -> Result<Option<String>, CryptoError> {
        match plaintext {
            Some(value) if !value.is_empty() => self.encrypt_field(value).map(Some),
            _ => Ok(None),
        }
    }

    /// Decrypt an optional field; absent fields decrypt to an empty string.
    ///
    /// # Errors
    ///
    /// Same as [`decrypt_field`](Self::decrypt_field).
    pub fn decrypt_optional(&self, encoded: Option<&str>) -> Result<String, CryptoError> {
        encoded.map_or_else(|| Ok(String::new()), |value| self.decrypt_field(value))
    }
}

impl fmt::Debug for FieldCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldCodec").finish_non_exhaustive()
    }
}
