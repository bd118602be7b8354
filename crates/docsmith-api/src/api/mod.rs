//! API module for the Docsmith API

pub mod middleware;
pub mod routes;
pub mod session;
pub mod types;

use crate::server::AppState;
use axum::{routing::get, Router};

/// Create all API routes
pub fn routes(state: AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/", get(routes::health::index))
        .route("/health", get(routes::health::health_check))
        // Authorization flow
        .route("/auth/status", get(routes::auth::auth_status))
        .route("/auth/login", get(routes::auth::login))
        .route("/oauth2callback", get(routes::auth::oauth_callback))
        .route(
            "/reset-auth",
            get(routes::auth::reset_auth).post(routes::auth::reset_auth),
        );

    middleware::apply_middleware(router, state)
}
