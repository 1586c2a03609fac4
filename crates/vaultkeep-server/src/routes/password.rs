//! Password generator route: `GET /api/password/generate`

use std::sync::Arc;

use axum::extract::Query;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use zeroize::{Zeroize, ZeroizeOnDrop};

use vaultkeep_core::generator::{PasswordOptions, generate_password};

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/api/password/generate", get(generate))
}

#[derive(Serialize, Zeroize, ZeroizeOnDrop)]
pub struct GeneratedPassword {
    pub password: String,
}

/// Options arrive as query parameters; anything omitted takes its default.
async fn generate(
    Query(options): Query<PasswordOptions>,
) -> Result<Json<GeneratedPassword>, AppError> {
    let password = generate_password(&options)?;
    Ok(Json(GeneratedPassword { password }))
}
