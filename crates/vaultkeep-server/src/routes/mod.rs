//! HTTP route handlers and router assembly.

pub mod auth;
pub mod health;
pub mod password;
pub mod vault;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, header};
use axum::middleware as axum_mw;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::auth_middleware;
use crate::state::AppState;

/// Build the Axum router with all routes and middleware.
pub fn app(state: Arc<AppState>) -> Router {
    // Authenticated routes go through the auth middleware layer.
    let authenticated = Router::new()
        .merge(auth::protected_router())
        .merge(vault::router())
        .route_layer(axum_mw::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    Router::new()
        .merge(auth::router())
        .merge(health::router())
        .merge(password::router())
        .merge(authenticated)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .with_state(state)
}
