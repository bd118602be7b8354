//! Request and response bodies for the authorization routes

use chrono::{DateTime, Utc};
use docsmith_auth::{FlowState, ResolvedCredential};
use serde::{Deserialize, Serialize};

/// Query parameters the identity provider appends to the redirect URI
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Authorization status for the caller's session
///
/// Reporting status never starts or supersedes an authorization attempt.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthStatusResponse {
    pub state: FlowState,
    pub authorized: bool,
}

impl From<FlowState> for AuthStatusResponse {
    fn from(state: FlowState) -> Self {
        Self {
            state,
            authorized: state == FlowState::Valid,
        }
    }
}

/// Credential summary returned by `/auth/login` when no consent is needed
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthorizedResponse {
    pub authorized: bool,
    pub expiry: DateTime<Utc>,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub persisted: bool,
}

impl From<&ResolvedCredential> for AuthorizedResponse {
    fn from(resolved: &ResolvedCredential) -> Self {
        Self {
            authorized: true,
            expiry: resolved.credential.expiry,
            scopes: resolved.credential.scopes.iter().cloned().collect(),
            persisted: resolved.is_persisted(),
        }
    }
}

/// Result of a completed authorization callback
#[derive(Debug, Serialize, Deserialize)]
pub struct CallbackResponse {
    pub success: bool,
    pub message: String,
    pub expiry: DateTime<Utc>,
    pub persisted: bool,
}

/// Result of a credential reset
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub success: bool,
    pub message: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}
