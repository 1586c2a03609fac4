//! Registration, login, and identity lookup.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::credentials::CredentialService;
use crate::error::{AccountError, RepositoryError};
use crate::models::NewUser;
use crate::repository::UserRepository;

/// Shortest password accepted at registration, counted in Unicode scalar
/// values (`char`s), not bytes or UTF-16 units.
pub const MIN_PASSWORD_LEN: usize = 8;

/// A freshly authenticated session.
#[derive(Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub token: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// The caller's identity as reported by `whoami`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
}

/// Trimmed, lowercased form under which emails are stored and looked up.
#[must_use]
pub fn canonical_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User account operations.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    credentials: Arc<CredentialService>,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService").finish_non_exhaustive()
    }
}

impl AccountService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, credentials: Arc<CredentialService>) -> Self {
        Self { users, credentials }
    }

    /// Create an account and sign it in.
    ///
    /// # Errors
    ///
    /// [`AccountError::Validation`] for a missing email or password or a
    /// password shorter than [`MIN_PASSWORD_LEN`];
    /// [`AccountError::AlreadyExists`] if the email is taken.
    pub async fn register(&self, email: &str, password: &str) -> Result<Session, AccountError> {
        let email = canonical_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AccountError::Validation(
                "Email and password are required".to_owned(),
            ));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AccountError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long"
            )));
        }

        // Cheap check before paying for a hash; the repository still
        // enforces uniqueness atomically.
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AccountError::AlreadyExists);
        }

        let password_hash = self.credentials.hash_password(password).await?;
        let user = self
            .users
            .create_user(NewUser {
                email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::DuplicateEmail => AccountError::AlreadyExists,
                other => AccountError::Repository(other),
            })?;

        info!(user_id = %user.id, "user registered");
        self.session(user.id)
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// [`AccountError::Validation`] for missing fields;
    /// [`AccountError::InvalidCredentials`] for an unknown email or a wrong
    /// password alike.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AccountError> {
        let email = canonical_email(email);
        if email.is_empty() || password.is_empty() {
            return Err(AccountError::Validation(
                "Email and password are required".to_owned(),
            ));
        }

        let Some(user) = self.users.find_by_email(&email).await? else {
            info!("login rejected: unknown email");
            return Err(AccountError::InvalidCredentials);
        };
        if !self
            .credentials
            .verify_password(password, &user.password_hash)
            .await?
        {
            info!(user_id = %user.id, "login rejected: wrong password");
            return Err(AccountError::InvalidCredentials);
        }

        info!(user_id = %user.id, "user logged in");
        self.session(user.id)
    }

    /// Look up the authenticated user.
    ///
    /// # Errors
    ///
    /// [`AccountError::NotFound`] if the user no longer exists.
    pub async fn whoami(&self, user_id: Uuid) -> Result<Identity, AccountError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AccountError::NotFound)?;
        Ok(Identity {
            user_id: user.id,
            email: user.email,
        })
    }

    fn session(&self, user_id: Uuid) -> Result<Session, AccountError> {
        let token = self.credentials.issue_token(user_id)?;
        Ok(Session { user_id, token })
    }
}
