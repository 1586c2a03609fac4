//! Server configuration for `vaultkeep`.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `VAULTKEEP_*` environment variables.

use std::fmt;
use std::net::SocketAddr;

use vaultkeep_core::credentials::HashCost;
use vaultkeep_core::crypto::EncryptionKey;
use zeroize::Zeroizing;

/// Set to `true` or `1` to leave core dumps enabled.
pub const DISABLE_CORE_DUMP_GUARD: &str = "VAULTKEEP_DISABLE_CORE_DUMP_GUARD";

/// Shortest accepted signing or encryption secret, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Errors found while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `VAULTKEEP_BIND_ADDR` is not a socket address.
    #[error("invalid bind address '{value}'")]
    InvalidBindAddr { value: String },

    /// `VAULTKEEP_STORAGE` names an unknown backend.
    #[error("unknown storage backend '{value}' (expected memory, redb or rocksdb)")]
    UnknownStorage { value: String },

    /// A numeric variable did not parse.
    #[error("{var} must be a number, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    /// A secret is set but too short.
    #[error("{var} must be at least {min} bytes long")]
    SecretTooShort { var: &'static str, min: usize },

    /// A secret is required for persistent storage but not set.
    #[error("{var} must be set when using persistent storage")]
    MissingSecret { var: &'static str },
}

/// Supported storage backend types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackendType {
    /// In-memory (development only, data lost on restart).
    Memory,
    /// Redb persistent storage.
    Redb { path: String },
    /// `RocksDB` persistent storage.
    RocksDb { path: String },
}

impl StorageBackendType {
    /// Whether data survives a restart.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        !matches!(self, Self::Memory)
    }
}

/// Secret bytes that are zeroized on drop and never printed.
#[derive(Clone)]
pub struct Secret(Zeroizing<Vec<u8>>);

impl Secret {
    #[must_use]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    fn random() -> Self {
        Self::new(EncryptionKey::generate().as_bytes().to_vec())
    }

    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Storage backend type.
    pub storage_backend: StorageBackendType,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Token signing secret.
    pub jwt_secret: Secret,
    /// Secret the field encryption key is derived from.
    pub encryption_secret: Secret,
    /// True when the secrets above were generated for this process only.
    pub ephemeral_secrets: bool,
    /// Argon2id cost for new password hashes.
    pub hash_cost: HashCost,
    /// Whether to mark the session cookie `Secure`.
    pub cookie_secure: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT` — port to bind on, binds to `0.0.0.0`
    /// - `VAULTKEEP_BIND_ADDR` — full bind address (overrides `PORT`, default: `127.0.0.1:3000`)
    /// - `VAULTKEEP_STORAGE` — `memory`, `redb`, or `rocksdb` (default: `memory`)
    /// - `VAULTKEEP_STORAGE_PATH` — path for persistent backends (default: `./data`)
    /// - `VAULTKEEP_LOG_LEVEL` — log filter (default: `info`)
    /// - `VAULTKEEP_JWT_SECRET` / `JWT_SECRET` — token signing secret
    /// - `VAULTKEEP_ENCRYPTION_KEY` / `ENCRYPTION_KEY` — field encryption secret
    /// - `VAULTKEEP_HASH_MEMORY_KIB`, `VAULTKEEP_HASH_ITERATIONS`,
    ///   `VAULTKEEP_HASH_PARALLELISM` — Argon2id cost (default: `19456` / `2` / `1`)
    /// - `VAULTKEEP_COOKIE_SECURE` — set `Secure` on the session cookie (default: `false`)
    ///
    /// `VAULTKEEP_DISABLE_CORE_DUMP_GUARD` is read separately through
    /// [`env_flag`], before any secret is loaded.
    ///
    /// Both secrets are required with persistent storage. With in-memory
    /// storage, missing secrets are generated per process.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for any value that is present but invalid,
    /// or for missing secrets with persistent storage.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`from_env`](Self::from_env).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Priority: VAULTKEEP_BIND_ADDR > PORT > default 127.0.0.1:3000
        let bind_addr = if let Some(addr) = lookup("VAULTKEEP_BIND_ADDR") {
            addr.parse()
                .map_err(|_| ConfigError::InvalidBindAddr { value: addr })?
        } else if let Some(port) = lookup("PORT") {
            SocketAddr::from(([0, 0, 0, 0], parse_number("PORT", &port)?))
        } else {
            SocketAddr::from(([127, 0, 0, 1], 3000))
        };

        let storage_path = lookup("VAULTKEEP_STORAGE_PATH").unwrap_or_else(|| "./data".to_owned());
        let storage_backend = match lookup("VAULTKEEP_STORAGE")
            .unwrap_or_else(|| "memory".to_owned())
            .to_lowercase()
            .as_str()
        {
            "memory" => StorageBackendType::Memory,
            "redb" => StorageBackendType::Redb { path: storage_path },
            "rocksdb" => StorageBackendType::RocksDb { path: storage_path },
            other => {
                return Err(ConfigError::UnknownStorage {
                    value: other.to_owned(),
                });
            }
        };

        let log_level = lookup("VAULTKEEP_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let jwt_secret = read_secret(&lookup, "VAULTKEEP_JWT_SECRET", "JWT_SECRET")?;
        let encryption_secret = read_secret(&lookup, "VAULTKEEP_ENCRYPTION_KEY", "ENCRYPTION_KEY")?;
        let ephemeral_secrets = jwt_secret.is_none() || encryption_secret.is_none();
        let (jwt_secret, encryption_secret) = if storage_backend.is_persistent() {
            (
                jwt_secret.ok_or(ConfigError::MissingSecret {
                    var: "VAULTKEEP_JWT_SECRET",
                })?,
                encryption_secret.ok_or(ConfigError::MissingSecret {
                    var: "VAULTKEEP_ENCRYPTION_KEY",
                })?,
            )
        } else {
            (
                jwt_secret.unwrap_or_else(Secret::random),
                encryption_secret.unwrap_or_else(Secret::random),
            )
        };

        let defaults = HashCost::default();
        let hash_cost = HashCost {
            memory_kib: optional_number(&lookup, "VAULTKEEP_HASH_MEMORY_KIB")?
                .unwrap_or(defaults.memory_kib),
            iterations: optional_number(&lookup, "VAULTKEEP_HASH_ITERATIONS")?
                .unwrap_or(defaults.iterations),
            parallelism: optional_number(&lookup, "VAULTKEEP_HASH_PARALLELISM")?
                .unwrap_or(defaults.parallelism),
        };

        Ok(Self {
            bind_addr,
            storage_backend,
            log_level,
            jwt_secret,
            encryption_secret,
            ephemeral_secrets,
            hash_cost,
            cookie_secure: lookup("VAULTKEEP_COOKIE_SECURE").is_some_and(|v| is_truthy(&v)),
        })
    }
}

fn is_truthy(value: &str) -> bool {
    value == "true" || value == "1"
}

/// Read a boolean flag straight from the environment.
#[must_use]
pub fn env_flag(var: &str) -> bool {
    std::env::var(var).is_ok_and(|v| is_truthy(&v))
}

fn read_secret(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    alias: &str,
) -> Result<Option<Secret>, ConfigError> {
    let Some(value) = lookup(var).or_else(|| lookup(alias)) else {
        return Ok(None);
    };
    let value = Zeroizing::new(value);
    if value.len() < MIN_SECRET_LEN {
        return Err(ConfigError::SecretTooShort {
            var,
            min: MIN_SECRET_LEN,
        });
    }
    Ok(Some(Secret::new(value.as_bytes().to_vec())))
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        var,
        value: value.to_owned(),
    })
}

fn optional_number<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(var).map(|v| parse_number(var, &v)).transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_are_memory_on_localhost() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 3000)));
        assert_eq!(config.storage_backend, StorageBackendType::Memory);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.hash_cost, HashCost::default());
        assert!(config.ephemeral_secrets);
        assert_eq!(config.jwt_secret.expose().len(), 32);
        assert!(!config.cookie_secure);
    }

    #[test]
    fn port_binds_all_interfaces_and_bind_addr_wins() {
        let config = load(&[("PORT", "8080")]).unwrap();
        assert_eq!(config.bind_addr, SocketAddr::from(([0, 0, 0, 0], 8080)));

        let config = load(&[("PORT", "8080"), ("VAULTKEEP_BIND_ADDR", "127.0.0.1:9000")]).unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn persistent_storage_requires_secrets() {
        let err = load(&[("VAULTKEEP_STORAGE", "redb")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSecret { .. }));

        let config = load(&[
            ("VAULTKEEP_STORAGE", "redb"),
            ("VAULTKEEP_STORAGE_PATH", "/tmp/vk"),
            ("JWT_SECRET", SECRET),
            ("ENCRYPTION_KEY", SECRET),
        ])
        .unwrap();
        assert_eq!(
            config.storage_backend,
            StorageBackendType::Redb {
                path: "/tmp/vk".to_owned()
            }
        );
        assert!(!config.ephemeral_secrets);
        assert_eq!(config.jwt_secret.expose(), SECRET.as_bytes());
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            load(&[("VAULTKEEP_BIND_ADDR", "nowhere")]),
            Err(ConfigError::InvalidBindAddr { .. })
        ));
        assert!(matches!(
            load(&[("VAULTKEEP_STORAGE", "postgres")]),
            Err(ConfigError::UnknownStorage { .. })
        ));
        assert!(matches!(
            load(&[("VAULTKEEP_HASH_ITERATIONS", "lots")]),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            load(&[("VAULTKEEP_JWT_SECRET", "short")]),
            Err(ConfigError::SecretTooShort { .. })
        ));
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let config = load(&[("VAULTKEEP_JWT_SECRET", SECRET)]).unwrap();
        assert!(!format!("{config:?}").contains(SECRET));
    }
}
