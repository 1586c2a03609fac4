//! `vaultkeep` server entry point.
//!
//! Loads configuration, hardens the process, opens the configured storage,
//! then starts the Axum HTTP server with graceful shutdown.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use vaultkeep_core::credentials::CredentialService;
use vaultkeep_core::crypto::FieldCodec;
use vaultkeep_core::repository::{
    DocumentRepository, MemoryRepository, UserRepository, VaultRepository,
};
use vaultkeep_storage::StorageBackend;

use vaultkeep_server::config::{
    DISABLE_CORE_DUMP_GUARD, ServerConfig, StorageBackendType, env_flag,
};
use vaultkeep_server::hardening;
use vaultkeep_server::routes;
use vaultkeep_server::state::AppState;

type Repositories = (Arc<dyn UserRepository>, Arc<dyn VaultRepository>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Before configuration is read, so no secret is in memory yet.
    apply_hardening(env_flag(DISABLE_CORE_DUMP_GUARD));

    let config = ServerConfig::from_env().context("invalid configuration")?;

    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .json()
        .init();

    info!(storage = ?config.storage_backend, "vaultkeep starting");
    if config.ephemeral_secrets {
        warn!("secrets not configured, using random per-process secrets; sessions end on restart");
    }

    let state = build_app_state(&config)?;
    let app = routes::app(Arc::new(state));

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "vaultkeep listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("vaultkeep stopped");
    Ok(())
}

/// Build the shared application state from configuration.
fn build_app_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let credentials = CredentialService::new(config.hash_cost, config.jwt_secret.expose())
        .context("invalid password hash parameters")?;
    let codec = FieldCodec::from_secret(config.encryption_secret.expose())
        .context("failed to derive field encryption key")?;

    let (users, items) = open_repositories(&config.storage_backend)?;

    Ok(AppState::new(
        users,
        items,
        Arc::new(credentials),
        Arc::new(codec),
        config.cookie_secure,
    ))
}

fn open_repositories(backend: &StorageBackendType) -> anyhow::Result<Repositories> {
    let storage: Arc<dyn StorageBackend> = match backend {
        StorageBackendType::Memory => {
            info!("using in-memory storage (data will not persist)");
            let repo = Arc::new(MemoryRepository::new());
            let users: Arc<dyn UserRepository> = repo.clone();
            let items: Arc<dyn VaultRepository> = repo;
            return Ok((users, items));
        }
        #[cfg(feature = "redb-backend")]
        StorageBackendType::Redb { path } => {
            info!(path = %path, "using redb storage");
            Arc::new(
                vaultkeep_storage::RedbBackend::open(path).context("failed to open redb storage")?,
            )
        }
        #[cfg(not(feature = "redb-backend"))]
        StorageBackendType::Redb { .. } => {
            anyhow::bail!("redb backend requested but feature 'redb-backend' is not enabled");
        }
        #[cfg(feature = "rocksdb-backend")]
        StorageBackendType::RocksDb { path } => {
            info!(path = %path, "using RocksDB storage");
            Arc::new(
                vaultkeep_storage::RocksDbBackend::open(path)
                    .context("failed to open RocksDB storage")?,
            )
        }
        #[cfg(not(feature = "rocksdb-backend"))]
        StorageBackendType::RocksDb { .. } => {
            anyhow::bail!("RocksDB backend requested but feature 'rocksdb-backend' is not enabled");
        }
    };

    let repo = Arc::new(DocumentRepository::new(storage));
    let users: Arc<dyn UserRepository> = repo.clone();
    let items: Arc<dyn VaultRepository> = repo;
    Ok((users, items))
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
}

/// Runs before logging is initialized, so warnings go to stderr.
#[allow(clippy::print_stderr)]
fn apply_hardening(guard_disabled: bool) {
    if guard_disabled {
        eprintln!("WARNING: core dumps left enabled via VAULTKEEP_DISABLE_CORE_DUMP_GUARD");
    } else if let Err(e) = hardening::disable_core_dumps() {
        eprintln!("WARNING: failed to disable core dumps: {e}");
    }
}
