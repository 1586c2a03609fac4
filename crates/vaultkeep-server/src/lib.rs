//! `vaultkeep` HTTP server.
//!
//! Wires together the core library, storage backend, and HTTP routes into a
//! running Axum server serving the JSON API under `/api/*`.

pub mod config;
pub mod error;
pub mod hardening;
pub mod middleware;
pub mod routes;
pub mod state;
