//! Authentication-related types and data structures
//!
//! This module defines the credential record, authorization attempts,
//! provider configuration, flow states and the error taxonomy shared by
//! the rest of the crate.

use chrono::{DateTime, Duration, Utc};
use docsmith_common::logging::mask_secret;
use docsmith_common::DocsmithError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Google OAuth 2.0 authorization endpoint
pub const GOOGLE_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";

/// Google OAuth 2.0 token endpoint
pub const GOOGLE_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Scopes needed to clone, edit and share documents
pub const DEFAULT_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/documents",
];

/// Bearer credential issued by the identity provider
///
/// A credential is replaced wholesale on every successful exchange or refresh;
/// it is never partially mutated.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Access token presented to downstream APIs
    pub access_token: String,

    /// Refresh token, present when offline access was granted
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Absolute expiry of the access token
    pub expiry: DateTime<Utc>,

    /// Scopes granted with this token
    #[serde(default)]
    pub scopes: BTreeSet<String>,
}

fn expiry_after(seconds: i64) -> Option<DateTime<Utc>> {
    Utc::now().checked_add_signed(Duration::try_seconds(seconds)?)
}

impl Credential {
    /// Create a credential that expires `expires_in_seconds` from now
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in_seconds: i64,
        scopes: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            access_token,
            refresh_token,
            expiry: expiry_after(expires_in_seconds).unwrap_or(DateTime::<Utc>::MAX_UTC),
            scopes: scopes.into_iter().collect(),
        }
    }

    /// Like [`Credential::new`], but `None` when the lifetime is negative or
    /// does not fit in a timestamp
    pub fn try_new(
        access_token: String,
        refresh_token: Option<String>,
        expires_in_seconds: i64,
        scopes: impl IntoIterator<Item = String>,
    ) -> Option<Self> {
        if expires_in_seconds < 0 {
            return None;
        }
        Some(Self {
            access_token,
            refresh_token,
            expiry: expiry_after(expires_in_seconds)?,
            scopes: scopes.into_iter().collect(),
        })
    }

    /// A credential is valid iff it carries an access token and has not expired
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Validity relative to an explicit instant
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.access_token.is_empty() && now < self.expiry
    }

    /// Check if the access token is expired
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expiry
    }

    /// A credential is refreshable iff it carries a refresh token
    pub fn is_refreshable(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }

    /// Get the time until expiration (negative once expired)
    pub fn time_until_expiry(&self) -> Duration {
        self.expiry.signed_duration_since(Utc::now())
    }

    /// Check if the credential was granted a specific scope
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// `Authorization` header value for downstream API calls
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &mask_secret(&self.access_token))
            .field(
                "refresh_token",
                &self.refresh_token.as_deref().map(mask_secret),
            )
            .field("expiry", &self.expiry)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Outstanding interactive login attempt for one caller session
#[derive(Debug, Clone)]
pub struct AuthorizationAttempt {
    /// Opaque anti-forgery token round-tripped through the provider redirect
    pub state_token: String,

    /// When the attempt was started
    pub created_at: DateTime<Utc>,

    /// Session that started the attempt
    pub session_id: String,
}

impl AuthorizationAttempt {
    /// Whether the attempt is older than `ttl` at `now`
    pub fn is_expired_at(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at) >= ttl
    }
}

/// Identity provider client configuration
///
/// Built once at startup and shared read-only for the lifetime of the process.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// OAuth client ID
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// Authorization endpoint (browser redirect target)
    pub authorization_endpoint: String,

    /// Token endpoint (server-to-server)
    pub token_endpoint: String,

    /// Redirect URI registered with the provider
    pub redirect_uri: String,

    /// Scopes to request
    pub scopes: Vec<String>,
}

impl ClientConfig {
    /// Google endpoints with the document scopes
    pub fn google(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            authorization_endpoint: GOOGLE_AUTHORIZATION_ENDPOINT.to_string(),
            token_endpoint: GOOGLE_TOKEN_ENDPOINT.to_string(),
            redirect_uri,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Validate the client configuration
    pub fn validate(&self) -> AuthResult<()> {
        if self.client_id.trim().is_empty() {
            return Err(AuthError::ConfigError("Client ID is required".to_string()));
        }

        if self.client_secret.trim().is_empty() {
            return Err(AuthError::ConfigError(
                "Client secret is required".to_string(),
            ));
        }

        if self.scopes.is_empty() {
            return Err(AuthError::ConfigError(
                "At least one scope is required".to_string(),
            ));
        }

        for (name, value) in [
            ("Authorization endpoint", &self.authorization_endpoint),
            ("Token endpoint", &self.token_endpoint),
            ("Redirect URI", &self.redirect_uri),
        ] {
            let parsed = url::Url::parse(value).map_err(|e| {
                AuthError::ConfigError(format!("{name} must be an absolute URL: {e}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AuthError::ConfigError(format!(
                    "{name} must use http or https"
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authorization_endpoint", &self.authorization_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// `access_type` authorization parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// Request a refresh token
    #[default]
    Offline,
    Online,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Online => "online",
        }
    }
}

/// `prompt` authorization parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Prompt {
    /// Force the consent screen so a refresh token is reissued
    #[default]
    Consent,
    None,
}

impl Prompt {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consent => "consent",
            Self::None => "none",
        }
    }
}

/// Options appended to the authorization URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationOptions {
    pub access_type: AccessType,
    pub prompt: Prompt,
    pub include_granted_scopes: bool,
}

impl Default for AuthorizationOptions {
    fn default() -> Self {
        Self {
            access_type: AccessType::Offline,
            prompt: Prompt::Consent,
            include_granted_scopes: true,
        }
    }
}

/// Position of a credential in the authorization lifecycle
///
/// `NoCredential -> AwaitingUserConsent -> ExchangingCode -> {Valid | Failed}`,
/// `Valid -> Expired -> RefreshInFlight -> {Valid | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    NoCredential,
    AwaitingUserConsent,
    ExchangingCode,
    Valid,
    Expired,
    RefreshInFlight,
    Failed,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoCredential => "no_credential",
            Self::AwaitingUserConsent => "awaiting_user_consent",
            Self::ExchangingCode => "exchanging_code",
            Self::Valid => "valid",
            Self::Expired => "expired",
            Self::RefreshInFlight => "refresh_in_flight",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Errors raised while reading or writing the persisted credential
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("failed to read credential from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write credential to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credential record at {path:?} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode credential: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Transport failure or timeout talking to the identity provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Non-2xx status or malformed body from the identity provider
    #[error("Invalid OAuth response: {0}")]
    InvalidResponse(String),

    /// Provider answered `invalid_grant` to a refresh; the interactive flow must restart
    #[error("Refresh token revoked: {0}")]
    RefreshRevoked(String),

    /// Refresh requested for a credential without a refresh token
    #[error("Credential has no refresh token")]
    MissingRefreshToken,

    /// Callback state does not match an outstanding attempt (CSRF protection)
    #[error("State mismatch: callback does not match an outstanding authorization attempt")]
    StateMismatch,

    /// User or provider refused the authorization request
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    /// Credential could not be loaded or saved
    #[error("Token storage error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DocsmithError for AuthError {}

impl AuthError {
    /// Stable machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NetworkError(_) => "network_error",
            Self::InvalidResponse(_) => "invalid_response",
            Self::RefreshRevoked(_) => "refresh_revoked",
            Self::MissingRefreshToken => "missing_refresh_token",
            Self::StateMismatch => "state_mismatch",
            Self::AuthorizationDenied(_) => "authorization_denied",
            Self::Persistence(_) => "persistence_error",
            Self::ConfigError(_) => "config_error",
        }
    }

    /// Failures reported by the identity provider round trip
    pub fn is_provider_failure(&self) -> bool {
        matches!(
            self,
            Self::NetworkError(_) | Self::InvalidResponse(_) | Self::RefreshRevoked(_)
        )
    }
}
