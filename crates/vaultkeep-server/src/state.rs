//! Shared application state for the `vaultkeep` server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`.

use std::sync::Arc;

use vaultkeep_core::account::AccountService;
use vaultkeep_core::credentials::CredentialService;
use vaultkeep_core::crypto::FieldCodec;
use vaultkeep_core::gate::AccessGate;
use vaultkeep_core::repository::{UserRepository, VaultRepository};
use vaultkeep_core::vault::VaultService;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Registration, login, and identity lookup.
    pub accounts: AccountService,
    /// Encrypted vault item operations.
    pub vault: VaultService,
    /// Resolves request credentials to an owner id.
    pub gate: AccessGate,
    /// Whether the session cookie carries `Secure`.
    pub cookie_secure: bool,
}

impl AppState {
    /// Wire the services over the given repositories and credentials.
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        items: Arc<dyn VaultRepository>,
        credentials: Arc<CredentialService>,
        codec: Arc<FieldCodec>,
        cookie_secure: bool,
    ) -> Self {
        Self {
            accounts: AccountService::new(users, Arc::clone(&credentials)),
            vault: VaultService::new(items, codec),
            gate: AccessGate::new(credentials),
            cookie_secure,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
