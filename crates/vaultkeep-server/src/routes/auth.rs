//! Account routes: `/api/auth/*`
//!
//! Register and login return the identity token in the body and also set
//! it as an `HttpOnly` cookie, so both token-bearing clients and same-origin
//! browser sessions work.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use axum_extra::extract::{CookieJar, WithRejection};
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vaultkeep_core::account::{Identity, Session};
use vaultkeep_core::credentials::TOKEN_TTL_DAYS;
use vaultkeep_core::gate::TOKEN_COOKIE;

use crate::error::AppError;
use crate::middleware::AuthContext;
use crate::state::AppState;

/// Unauthenticated account routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
}

/// Account routes that need an authenticated caller.
pub fn protected_router() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/me", get(me))
}

/// Request body for register and login.
#[derive(Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Response body for register and login.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub message: &'static str,
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::days(TOKEN_TTL_DAYS))
        .secure(secure)
        .build()
}

fn session_response(
    state: &AppState,
    jar: CookieJar,
    session: Session,
    message: &'static str,
) -> (CookieJar, Json<SessionResponse>) {
    let jar = jar.add(session_cookie(session.token.clone(), state.cookie_secure));
    let body = SessionResponse {
        message,
        user_id: session.user_id,
        token: session.token,
    };
    (jar, Json(body))
}

/// `POST /api/auth/register` — create an account and sign in.
async fn register(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<CredentialsRequest>, AppError>,
) -> Result<(StatusCode, CookieJar, Json<SessionResponse>), AppError> {
    let session = state
        .accounts
        .register(
            body.email.as_deref().unwrap_or_default(),
            body.password.as_deref().unwrap_or_default(),
        )
        .await?;

    let (jar, response) = session_response(&state, jar, session, "Registration successful");
    Ok((StatusCode::CREATED, jar, response))
}

/// `POST /api/auth/login` — sign in with email and password.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<CredentialsRequest>, AppError>,
) -> Result<(CookieJar, Json<SessionResponse>), AppError> {
    let session = state
        .accounts
        .login(
            body.email.as_deref().unwrap_or_default(),
            body.password.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(session_response(&state, jar, session, "Login successful"))
}

/// `POST /api/auth/logout` — clear the session cookie.
///
/// The expired cookie is sent whether or not the request carried one.
/// Tokens are stateless, so a bearer token stays valid until it expires.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    let expired = Cookie::build((TOKEN_COOKIE, ""))
        .http_only(true)
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::ZERO)
        .secure(state.cookie_secure)
        .build();
    (
        jar.add(expired),
        Json(MessageResponse {
            message: "Logout successful",
        }),
    )
}

/// `GET /api/auth/me` — the authenticated caller's identity.
async fn me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Identity>, AppError> {
    let identity = state.accounts.whoami(auth.owner_id).await?;
    Ok(Json(identity))
}
