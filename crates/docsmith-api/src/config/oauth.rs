//! Identity provider and session configuration

use docsmith_auth::types::{
    DEFAULT_SCOPES, GOOGLE_AUTHORIZATION_ENDPOINT, GOOGLE_TOKEN_ENDPOINT,
};
use docsmith_auth::{AccessType, AuthorizationOptions, ClientConfig, Prompt};
use serde::{Deserialize, Serialize};
use std::fmt;

/// OAuth client registration and authorization request options
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// OAuth client ID
    pub client_id: String,

    /// OAuth client secret (prefer `DOCSMITH_OAUTH__CLIENT_SECRET`)
    pub client_secret: String,

    /// Authorization endpoint
    pub authorization_endpoint: String,

    /// Token endpoint
    pub token_endpoint: String,

    /// Redirect URI registered with the provider; must route to `/oauth2callback`
    pub redirect_uri: String,

    /// Scopes to request
    pub scopes: Vec<String>,

    /// Timeout for each token endpoint call in seconds
    pub provider_timeout_secs: u64,

    /// `access_type` parameter
    pub access_type: AccessType,

    /// `prompt` parameter
    pub prompt: Prompt,

    /// `include_granted_scopes` parameter
    pub include_granted_scopes: bool,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        let options = AuthorizationOptions::default();
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            authorization_endpoint: GOOGLE_AUTHORIZATION_ENDPOINT.to_string(),
            token_endpoint: GOOGLE_TOKEN_ENDPOINT.to_string(),
            redirect_uri: "http://localhost:5000/oauth2callback".to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            provider_timeout_secs: 10,
            access_type: options.access_type,
            prompt: options.prompt,
            include_granted_scopes: options.include_granted_scopes,
        }
    }
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authorization_endpoint", &self.authorization_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("provider_timeout_secs", &self.provider_timeout_secs)
            .field("access_type", &self.access_type)
            .field("prompt", &self.prompt)
            .field("include_granted_scopes", &self.include_granted_scopes)
            .finish()
    }
}

impl OAuthConfig {
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            authorization_endpoint: self.authorization_endpoint.clone(),
            token_endpoint: self.token_endpoint.clone(),
            redirect_uri: self.redirect_uri.clone(),
            scopes: self.scopes.clone(),
        }
    }

    pub fn authorization_options(&self) -> AuthorizationOptions {
        AuthorizationOptions {
            access_type: self.access_type,
            prompt: self.prompt,
            include_granted_scopes: self.include_granted_scopes,
        }
    }
}

/// Browser session cookie and authorization attempt lifetimes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the session cookie
    pub cookie_name: String,

    /// Set the `Secure` attribute on the session cookie
    pub cookie_secure: bool,

    /// Session cookie lifetime in seconds
    pub max_age_secs: u64,

    /// How long an authorization attempt stays valid in seconds
    pub attempt_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "docsmith_session".to_string(),
            cookie_secure: true,
            max_age_secs: 60 * 60,
            attempt_ttl_secs: 15 * 60,
        }
    }
}
