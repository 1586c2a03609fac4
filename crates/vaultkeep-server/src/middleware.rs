//! Authentication middleware for `vaultkeep`.
//!
//! Reads the `Authorization` header and the `token` cookie, resolves them
//! through the access gate, and injects the caller's owner id into the
//! request extensions for downstream handlers.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use uuid::Uuid;

use vaultkeep_core::gate::TOKEN_COOKIE;

use crate::error::AppError;
use crate::state::AppState;

/// Authentication context injected into request extensions.
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    /// The authenticated owner.
    pub owner_id: Uuid,
}

/// Middleware that rejects requests without a valid identity token.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let authorization = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let cookie = jar.get(TOKEN_COOKIE).map(|c| c.value());

    let Some(owner_id) = state.gate.authenticate(authorization, cookie) else {
        return AppError::Unauthorized("Unauthorized".to_owned()).into_response();
    };

    req.extensions_mut().insert(AuthContext { owner_id });
    next.run(req).await
}
