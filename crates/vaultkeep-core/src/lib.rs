//! Core library for `vaultkeep`.
//!
//! Field encryption, password hashing and identity tokens, the access gate,
//! user and vault repositories, and the services that tie them together.
//! Depends on `vaultkeep-storage` for the key-value backend trait and knows
//! nothing about HTTP.

pub mod account;
pub mod credentials;
pub mod crypto;
pub mod error;
pub mod gate;
pub mod generator;
pub mod models;
pub mod repository;
pub mod vault;
