//! Vault item routes: `/api/vault` and `/api/vault/{id}`
//!
//! Every handler acts on behalf of the owner injected by the auth
//! middleware. An id that is not a UUID is reported exactly like a missing
//! item.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};
use axum_extra::extract::WithRejection;
use serde::Serialize;
use uuid::Uuid;

use vaultkeep_core::error::VaultError;
use vaultkeep_core::models::{ItemFields, VaultEntry};

use crate::error::AppError;
use crate::middleware::AuthContext;
use crate::routes::auth::MessageResponse;
use crate::state::AppState;

/// Build the vault router.
///
/// Paths:
/// - `GET    /api/vault` — list
/// - `POST   /api/vault` — create
/// - `GET    /api/vault/{id}` — read one
/// - `PUT    /api/vault/{id}` — replace
/// - `DELETE /api/vault/{id}` — delete
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/vault", get(list_items).post(create_item))
        .route(
            "/api/vault/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
}

#[derive(Serialize)]
pub struct CreatedResponse {
    pub message: &'static str,
    pub id: Uuid,
}

fn item_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::from(VaultError::NotFound))
}

/// `GET /api/vault` — the caller's items, decrypted, newest first.
async fn list_items(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<VaultEntry>>, AppError> {
    let items = state.vault.list_items(auth.owner_id).await?;
    Ok(Json(items))
}

/// `POST /api/vault` — create an item.
async fn create_item(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    WithRejection(Json(fields), _): WithRejection<Json<ItemFields>, AppError>,
) -> Result<(StatusCode, Json<CreatedResponse>), AppError> {
    let id = state.vault.create_item(auth.owner_id, &fields).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Vault item created",
            id,
        }),
    ))
}

/// `GET /api/vault/{id}` — one decrypted item.
async fn get_item(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<VaultEntry>, AppError> {
    let item = state.vault.get_item(auth.owner_id, item_id(&id)?).await?;
    Ok(Json(item))
}

/// `PUT /api/vault/{id}` — replace every field of an item.
async fn update_item(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    WithRejection(Json(fields), _): WithRejection<Json<ItemFields>, AppError>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .vault
        .update_item(auth.owner_id, item_id(&id)?, &fields)
        .await?;
    Ok(Json(MessageResponse {
        message: "Vault item updated",
    }))
}

/// `DELETE /api/vault/{id}` — delete an item.
async fn delete_item(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.vault.delete_item(auth.owner_id, item_id(&id)?).await?;
    Ok(Json(MessageResponse {
        message: "Vault item deleted",
    }))
}
