//! Browser session identification
//!
//! Sessions carry nothing but an opaque id in a cookie; authorization attempts
//! are bound to that id server side. The cookie is re-issued on every request
//! so its lifetime slides with activity.

use crate::config::SessionConfig;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

/// Return the caller's session id and the jar to send back, minting a new id when needed
pub fn establish(jar: CookieJar, config: &SessionConfig) -> (CookieJar, String) {
    let session_id = jar
        .get(&config.cookie_name)
        .map(|cookie| cookie.value())
        .filter(|value| Uuid::parse_str(value).is_ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let jar = jar.add(session_cookie(config, session_id.clone()));
    (jar, session_id)
}

fn session_cookie(config: &SessionConfig, session_id: String) -> Cookie<'static> {
    let max_age = i64::try_from(config.max_age_secs).unwrap_or(i64::MAX);
    Cookie::build((config.cookie_name.clone(), session_id))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age))
        .build()
}
