//! Authorization flow routes
//!
//! Every handler identifies the caller through the session cookie and hands
//! the decision to the shared [`docsmith_auth::CredentialResolver`].

use crate::api::session;
use crate::api::types::{
    AuthStatusResponse, AuthorizedResponse, CallbackQuery, CallbackResponse, ResetResponse,
};
use crate::error::Result;
use crate::server::AppState;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use docsmith_auth::{AuthError, Resolution};
use tracing::{info, warn};

/// Report where the caller's session stands without starting an attempt
pub async fn auth_status(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<AuthStatusResponse>)> {
    let (jar, session_id) = session::establish(jar, &state.config.session);
    let flow_state = state.resolver.status(&session_id).await?;
    Ok((jar, Json(AuthStatusResponse::from(flow_state))))
}

/// Send the browser to the provider's consent screen, or report the existing credential
pub async fn login(State(state): State<AppState>, jar: CookieJar) -> Result<Response> {
    let (jar, session_id) = session::establish(jar, &state.config.session);

    let response = match state.resolver.resolve(&session_id).await? {
        Resolution::AuthorizationRequired(url) => (
            StatusCode::FOUND,
            jar,
            [(header::LOCATION, url.to_string())],
        )
            .into_response(),
        Resolution::Authorized(resolved) => {
            (jar, Json(AuthorizedResponse::from(&resolved))).into_response()
        }
    };

    Ok(response)
}

/// Redirect target registered with the identity provider
pub async fn oauth_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<(CookieJar, Json<CallbackResponse>)> {
    let (jar, session_id) = session::establish(jar, &state.config.session);

    if let Some(error) = query.error {
        warn!(%session_id, %error, "Identity provider reported an authorization error");
        let detail = match query.error_description {
            Some(description) => format!("{error}: {description}"),
            None => error,
        };
        return Err(AuthError::AuthorizationDenied(detail).into());
    }

    let presented_state = query.state.unwrap_or_default();
    let code = query.code.unwrap_or_default();

    let resolved = state
        .resolver
        .handle_callback(&session_id, &presented_state, &code)
        .await?;

    let message = if resolved.is_persisted() {
        "Authorization completed successfully"
    } else {
        "Authorization completed, but the credential could not be stored"
    };

    Ok((
        jar,
        Json(CallbackResponse {
            success: true,
            message: message.to_string(),
            expiry: resolved.credential.expiry,
            persisted: resolved.is_persisted(),
        }),
    ))
}

/// Delete the stored credential so the next request re-authorizes
pub async fn reset_auth(State(state): State<AppState>) -> Result<Json<ResetResponse>> {
    let removed = state.resolver.reset().await?;

    let message = if removed {
        info!("Stored credential deleted on request");
        "Token file deleted. Please re-authenticate."
    } else {
        "No token file found to delete."
    };

    Ok(Json(ResetResponse {
        success: removed,
        message: message.to_string(),
    }))
}
