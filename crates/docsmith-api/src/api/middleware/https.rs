//! Redirect to HTTPS behind a TLS-terminating proxy

use crate::server::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

const FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Answer `301` with the `https://` URL when the proxy reports plain HTTP
pub async fn https_redirect(State(state): State<AppState>, req: Request, next: Next) -> Response {
    if state.config.server.force_https {
        if let Some(location) = https_redirect_location(req.headers(), req.uri()) {
            debug!(%location, "Redirecting plain HTTP request");
            return (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response();
        }
    }

    next.run(req).await
}

/// HTTPS URL for a request forwarded over plain HTTP, `None` otherwise
pub fn https_redirect_location(headers: &HeaderMap, uri: &axum::http::Uri) -> Option<String> {
    // Proxies may append to the header; the first entry is the client-facing hop
    let proto = headers
        .get(FORWARDED_PROTO)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim();
    if !proto.eq_ignore_ascii_case("http") {
        return None;
    }

    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))?;
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");

    Some(format!("https://{host}{path}"))
}
