//! Password hashing and identity tokens.
//!
//! Passwords are hashed with Argon2id into PHC strings; the cost is a
//! configuration value ([`HashCost`]). Hashing runs on the blocking pool so
//! it never stalls the async executor.
//!
//! Identity tokens are compact HS256 JWS strings carrying a single `userId`
//! claim plus `iat`/`exp`, valid for [`TOKEN_TTL_DAYS`] days. Verification
//! is soft: any failure yields `None`, never an error.

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64URL;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::CredentialError;

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of an issued identity token.
pub const TOKEN_TTL_DAYS: i64 = 7;

/// Fixed JOSE header for every issued token: `{"alg":"HS256","typ":"JWT"}`.
const JWT_HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

/// Argon2id cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl Default for HashCost {
    /// OWASP baseline for Argon2id: 19 MiB, 2 passes, 1 lane.
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl HashCost {
    fn params(self) -> Result<Params, CredentialError> {
        Params::new(self.memory_kib, self.iterations, self.parallelism, None).map_err(|e| {
            CredentialError::InvalidParams {
                reason: e.to_string(),
            }
        })
    }
}

/// Claims carried by an identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// The owner id the token authenticates.
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
}

#[derive(Deserialize)]
struct JoseHeader {
    alg: String,
}

/// Hashes passwords and issues/verifies identity tokens.
pub struct CredentialService {
    params: Params,
    signing_key: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialService")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl CredentialService {
    /// Create a credential service from a hash cost and the token signing secret.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::InvalidParams`] if Argon2 rejects the cost.
    pub fn new(cost: HashCost, signing_secret: &[u8]) -> Result<Self, CredentialError> {
        Ok(Self {
            params: cost.params()?,
            signing_key: Zeroizing::new(signing_secret.to_vec()),
        })
    }

    fn hasher(params: Params) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    }

    /// Hash a password into a PHC string with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Hashing`] if Argon2 fails and
    /// [`CredentialError::Task`] if the blocking task is lost.
    pub async fn hash_password(&self, password: &str) -> Result<String, CredentialError> {
        let password = Zeroizing::new(password.to_owned());
        let params = self.params.clone();

        tokio::task::spawn_blocking(move || {
            let mut salt_bytes = [0u8; 16];
            OsRng.fill_bytes(&mut salt_bytes);
            let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| CredentialError::Hashing {
                reason: e.to_string(),
            })?;

            Self::hasher(params)
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| CredentialError::Hashing {
                    reason: e.to_string(),
                })
        })
        .await
        .map_err(|e| CredentialError::Task {
            reason: e.to_string(),
        })?
    }

    /// Check a password against a stored PHC hash.
    ///
    /// Uses the parameters embedded in the hash, so hashes made under an
    /// older cost still verify. Comparison is constant-time inside Argon2.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::MalformedHash`] if the stored hash cannot be
    /// parsed. A wrong password is `Ok(false)`, not an error.
    pub async fn verify_password(&self, password: &str, hash: &str) -> Result<bool, CredentialError> {
        let password = Zeroizing::new(password.to_owned());
        let hash = hash.to_owned();
        let params = self.params.clone();

        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash).map_err(|e| CredentialError::MalformedHash {
                reason: e.to_string(),
            })?;
            match Self::hasher(params).verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(password_hash::Error::Password) => Ok(false),
                Err(e) => Err(CredentialError::Hashing {
                    reason: e.to_string(),
                }),
            }
        })
        .await
        .map_err(|e| CredentialError::Task {
            reason: e.to_string(),
        })?
    }

    /// Issue a token for `user_id`, valid for [`TOKEN_TTL_DAYS`] from now.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Signing`] if the claims cannot be encoded.
    pub fn issue_token(&self, user_id: Uuid) -> Result<String, CredentialError> {
        self.issue_token_at(user_id, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Signing`] if the claims cannot be encoded.
    pub fn issue_token_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String, CredentialError> {
        let claims = TokenClaims {
            user_id,
            iat: now.timestamp(),
            exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
        };
        let payload = serde_json::to_vec(&claims).map_err(|e| CredentialError::Signing {
            reason: e.to_string(),
        })?;

        let signing_input = format!("{}.{}", B64URL.encode(JWT_HEADER), B64URL.encode(payload));
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!("{signing_input}.{}", B64URL.encode(signature)))
    }

    /// Verify a token's signature and expiry.
    ///
    /// Returns `None` for anything that is not a valid, unexpired token
    /// signed with this service's secret.
    pub fn verify_token(&self, token: &str) -> Option<TokenClaims> {
        self.verify_token_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`.
    pub fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> Option<TokenClaims> {
        match self.check_token(token, now) {
            Ok(claims) => Some(claims),
            Err(reason) => {
                debug!(reason, "identity token rejected");
                None
            }
        }
    }

    fn check_token(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, &'static str> {
        let mut parts = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err("malformed token");
        };

        let header_bytes = B64URL.decode(header).map_err(|_| "bad header encoding")?;
        let jose: JoseHeader = serde_json::from_slice(&header_bytes).map_err(|_| "bad header")?;
        if jose.alg != "HS256" {
            return Err("unsupported algorithm");
        }

        let signature = B64URL.decode(signature).map_err(|_| "bad signature encoding")?;
        let mut mac = self.mac().map_err(|_| "signing key unusable")?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).map_err(|_| "bad signature")?;

        let payload = B64URL.decode(payload).map_err(|_| "bad payload encoding")?;
        let claims: TokenClaims = serde_json::from_slice(&payload).map_err(|_| "bad claims")?;
        if claims.exp <= now.timestamp() {
            return Err("token expired");
        }
        Ok(claims)
    }

    fn mac(&self) -> Result<HmacSha256, CredentialError> {
        HmacSha256::new_from_slice(&self.signing_key).map_err(|e| CredentialError::Signing {
            reason: e.to_string(),
        })
    }
}

/// Cheapest cost Argon2 accepts; keeps tests fast.
#[cfg(test)]
pub(crate) const TEST_COST: HashCost = HashCost {
    memory_kib: 8,
    iterations: 1,
    parallelism: 1,
};

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn service(secret: &[u8]) -> CredentialService {
        CredentialService::new(TEST_COST, secret).unwrap()
    }

    #[tokio::test]
    async fn hash_is_salted_and_verifies() {
        let creds = service(b"secret");
        let h1 = creds.hash_password("password123").await.unwrap();
        let h2 = creds.hash_password("password123").await.unwrap();

        assert_ne!(h1, h2);
        assert!(h1.starts_with("$argon2id$"));
        assert!(!h1.contains("password123"));
        assert!(creds.verify_password("password123", &h1).await.unwrap());
        assert!(!creds.verify_password("password124", &h1).await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_is_an_error() {
        let creds = service(b"secret");
        let err = creds.verify_password("pw", "not-a-phc-string").await.unwrap_err();
        assert!(matches!(err, CredentialError::MalformedHash { .. }));
    }

    #[test]
    fn rejects_invalid_cost() {
        let cost = HashCost {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        };
        assert!(matches!(
            CredentialService::new(cost, b"s"),
            Err(CredentialError::InvalidParams { .. })
        ));
    }

    #[test]
    fn token_roundtrip_binds_user_id() {
        let creds = service(b"jwt-secret");
        let user = Uuid::new_v4();
        let now = Utc::now();
        let token = creds.issue_token_at(user, now).unwrap();

        let claims = creds.verify_token(&token).unwrap();
        assert_eq!(claims.user_id, user);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_DAYS * 24 * 60 * 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let creds = service(b"jwt-secret");
        let issued = Utc::now() - Duration::days(8);
        let token = creds.issue_token_at(Uuid::new_v4(), issued).unwrap();

        assert!(creds.verify_token(&token).is_none());
        assert!(creds.verify_token_at(&token, issued + Duration::days(6)).is_some());
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let ours = service(b"our-secret");
        let theirs = service(b"their-secret");
        let token = theirs.issue_token(Uuid::new_v4()).unwrap();
        assert!(ours.verify_token(&token).is_none());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let creds = service(b"jwt-secret");
        let token = creds.issue_token(Uuid::new_v4()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged_claims = TokenClaims {
            user_id: Uuid::new_v4(),
            iat: 0,
            exp: i64::MAX,
        };
        let forged_payload = B64URL.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);

        assert!(creds.verify_token(&forged).is_none());
    }

    #[test]
    fn garbage_tokens_are_soft_failures() {
        let creds = service(b"jwt-secret");
        for token in ["", "abc", "a.b", "a.b.c", "a.b.c.d", "....", "Bearer x.y.z"] {
            assert!(creds.verify_token(token).is_none(), "{token}");
        }
    }

    #[test]
    fn alg_none_is_rejected() {
        let creds = service(b"jwt-secret");
        let header = B64URL.encode(r#"{"alg":"none","typ":"JWT"}"#);
        let claims = TokenClaims {
            user_id: Uuid::new_v4(),
            iat: 0,
            exp: i64::MAX,
        };
        let payload = B64URL.encode(serde_json::to_vec(&claims).unwrap());
        assert!(creds.verify_token(&format!("{header}.{payload}.")).is_none());
    }
}
