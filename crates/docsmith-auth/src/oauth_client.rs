//! Identity provider adapter for the OAuth 2.0 authorization-code grant
//!
//! Builds the browser authorization URL, exchanges authorization codes for
//! credentials and refreshes expired access tokens. Every network call is a
//! single round trip bounded by the client timeout; nothing here retries.

use crate::types::{AuthError, AuthResult, AuthorizationOptions, ClientConfig, Credential};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Default bound on every identity provider call
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifetime assumed when the token endpoint omits `expires_in`
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Provider error code signalling a revoked or expired refresh token
const INVALID_GRANT: &str = "invalid_grant";

/// Operations the resolver needs from the identity provider
#[async_trait]
pub trait OAuthClient: Send + Sync {
    /// Browser URL that starts the interactive consent flow
    fn build_authorization_url(
        &self,
        state_token: &str,
        options: &AuthorizationOptions,
    ) -> AuthResult<Url>;

    /// Exchange an authorization code for a credential
    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> AuthResult<Credential>;

    /// Obtain a fresh credential using the refresh token of `credential`
    async fn refresh(&self, credential: &Credential) -> AuthResult<Credential>;

    /// Redirect URI registered for this client
    fn redirect_uri(&self) -> &str;
}

/// Token response from the identity provider
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

/// Error body returned by the token endpoint on non-2xx responses
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Failure of a single token endpoint round trip, before it is mapped to [`AuthError`]
#[derive(Debug)]
enum TokenEndpointError {
    Transport(String),
    Rejected {
        status: StatusCode,
        error: Option<String>,
        description: Option<String>,
    },
    Malformed(String),
}

impl TokenEndpointError {
    fn into_auth_error(self, operation: &str) -> AuthError {
        match self {
            Self::Transport(message) => {
                AuthError::NetworkError(format!("{operation} request failed: {message}"))
            }
            Self::Rejected {
                status,
                error,
                description,
            } => AuthError::InvalidResponse(format!(
                "{operation} failed with status {status}: {}{}",
                error.as_deref().unwrap_or("unknown_error"),
                description.map(|d| format!(" ({d})")).unwrap_or_default()
            )),
            Self::Malformed(message) => {
                AuthError::InvalidResponse(format!("Failed to parse {operation} response: {message}"))
            }
        }
    }
}

fn invalid_lifetime(expires_in: i64) -> TokenEndpointError {
    TokenEndpointError::Malformed(format!("expires_in out of range: {expires_in}"))
}

/// [`OAuthClient`] backed by `reqwest`
pub struct HttpOAuthClient {
    config: Arc<ClientConfig>,
    http: Client,
}

impl HttpOAuthClient {
    /// Create a client after validating `config`; every request is bounded by `timeout`
    pub fn new(config: Arc<ClientConfig>, timeout: Duration) -> AuthResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| AuthError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn parse_scopes(scope: Option<String>, fallback: impl IntoIterator<Item = String>) -> Vec<String> {
        match scope {
            Some(s) if !s.trim().is_empty() => s.split_whitespace().map(String::from).collect(),
            _ => fallback.into_iter().collect(),
        }
    }

    async fn request_token(
        &self,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, TokenEndpointError> {
        let response = self
            .http
            .post(&self.config.token_endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TokenEndpointError::Transport(format!("timed out: {e}"))
                } else {
                    TokenEndpointError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TokenEndpointError::Transport(e.to_string()))?;

        if !status.is_success() {
            let parsed = serde_json::from_slice::<TokenErrorResponse>(&body).ok();
            return Err(TokenEndpointError::Rejected {
                status,
                error: parsed.as_ref().map(|p| p.error.clone()),
                description: parsed.and_then(|p| p.error_description),
            });
        }

        let token_response: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| TokenEndpointError::Malformed(e.to_string()))?;

        if token_response.access_token.is_empty() {
            return Err(TokenEndpointError::Malformed(
                "empty access_token in response".to_string(),
            ));
        }

        Ok(token_response)
    }
}

#[async_trait]
impl OAuthClient for HttpOAuthClient {
    fn build_authorization_url(
        &self,
        state_token: &str,
        options: &AuthorizationOptions,
    ) -> AuthResult<Url> {
        let mut url = Url::parse(&self.config.authorization_endpoint)
            .map_err(|e| AuthError::ConfigError(format!("Invalid authorization endpoint: {e}")))?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state_token)
            .append_pair("access_type", options.access_type.as_str())
            .append_pair("prompt", options.prompt.as_str())
            .append_pair(
                "include_granted_scopes",
                if options.include_granted_scopes {
                    "true"
                } else {
                    "false"
                },
            );

        Ok(url)
    }

    async fn exchange_code(&self, code: &str, redirect_uri: &str) -> AuthResult<Credential> {
        debug!("Exchanging authorization code for tokens");

        let token_response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
            ])
            .await
            .map_err(|e| e.into_auth_error("Token exchange"))?;

        let expires_in = token_response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let credential = Credential::try_new(
            token_response.access_token,
            token_response.refresh_token,
            expires_in,
            Self::parse_scopes(token_response.scope, self.config.scopes.iter().cloned()),
        )
        .ok_or_else(|| invalid_lifetime(expires_in).into_auth_error("Token exchange"))?;

        if !credential.is_refreshable() {
            info!("Token exchange succeeded without a refresh token; offline access was not granted");
        } else {
            info!("Token exchange completed successfully");
        }

        Ok(credential)
    }

    async fn refresh(&self, credential: &Credential) -> AuthResult<Credential> {
        let refresh_token = credential
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingRefreshToken)?;

        debug!("Refreshing access token");

        let token_response = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", &self.config.client_id),
                ("client_secret", &self.config.client_secret),
            ])
            .await
            .map_err(|e| match e {
                TokenEndpointError::Rejected {
                    error: Some(ref code),
                    ref description,
                    ..
                } if code == INVALID_GRANT => AuthError::RefreshRevoked(
                    description
                        .clone()
                        .unwrap_or_else(|| INVALID_GRANT.to_string()),
                ),
                other => other.into_auth_error("Token refresh"),
            })?;

        // Keep the old refresh token when the provider does not rotate it
        let expires_in = token_response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let refreshed = Credential::try_new(
            token_response.access_token,
            token_response
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            expires_in,
            Self::parse_scopes(token_response.scope, credential.scopes.iter().cloned()),
        )
        .ok_or_else(|| invalid_lifetime(expires_in).into_auth_error("Token refresh"))?;

        info!("Token refresh completed successfully");
        Ok(refreshed)
    }

    fn redirect_uri(&self) -> &str {
        &self.config.redirect_uri
    }
}
