//! API middleware stack

mod https;

pub use https::{https_redirect, https_redirect_location};

use crate::server::AppState;
use axum::Router;

/// Apply middleware to a router
pub fn apply_middleware(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(axum::middleware::from_fn_with_state(state, https_redirect))
}
