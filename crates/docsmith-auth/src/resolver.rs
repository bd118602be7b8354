//! Credential resolution for privileged operations
//!
//! The resolver is consulted before every call that needs a bearer token. It
//! returns the stored credential when valid, refreshes it when possible, and
//! otherwise starts a new interactive flow for the caller's session. Needing
//! user consent is a normal [`Resolution`], not an error.

use crate::oauth_client::OAuthClient;
use crate::state_tracker::StateTracker;
use crate::token_store::TokenStore;
use crate::types::{
    AuthError, AuthResult, AuthorizationOptions, Credential, FlowState, PersistenceError,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use url::Url;

/// A usable credential, plus whether it reached durable storage
#[derive(Debug)]
pub struct ResolvedCredential {
    pub credential: Credential,
    /// Set when a freshly issued credential could not be saved; the credential
    /// is still valid for the current request.
    pub persistence_error: Option<PersistenceError>,
}

impl ResolvedCredential {
    fn stored(credential: Credential) -> Self {
        Self {
            credential,
            persistence_error: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.persistence_error.is_none()
    }
}

/// Outcome of [`CredentialResolver::resolve`]
#[derive(Debug)]
pub enum Resolution {
    /// A valid credential is available
    Authorized(ResolvedCredential),
    /// The end user must be sent to this URL to grant access
    AuthorizationRequired(Url),
}

impl Resolution {
    pub fn credential(&self) -> Option<&Credential> {
        match self {
            Self::Authorized(resolved) => Some(&resolved.credential),
            Self::AuthorizationRequired(_) => None,
        }
    }

    pub fn authorization_url(&self) -> Option<&Url> {
        match self {
            Self::Authorized(_) => None,
            Self::AuthorizationRequired(url) => Some(url),
        }
    }
}

/// Orchestrates the token store, state tracker and identity provider client
pub struct CredentialResolver {
    store: Arc<dyn TokenStore>,
    client: Arc<dyn OAuthClient>,
    tracker: Arc<StateTracker>,
    options: AuthorizationOptions,
    refresh_lock: Mutex<()>,
}

impl CredentialResolver {
    pub fn new(
        store: Arc<dyn TokenStore>,
        client: Arc<dyn OAuthClient>,
        tracker: Arc<StateTracker>,
    ) -> Self {
        Self {
            store,
            client,
            tracker,
            options: AuthorizationOptions::default(),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Override the authorization URL options
    pub fn with_options(mut self, options: AuthorizationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    pub fn store(&self) -> &dyn TokenStore {
        self.store.as_ref()
    }

    /// Return a usable credential or the URL that starts a new interactive flow
    pub async fn resolve(&self, session_id: &str) -> AuthResult<Resolution> {
        match self.store.load().await? {
            Some(credential) if credential.is_valid() => {
                debug!(session_id, "Using stored credential");
                return Ok(Resolution::Authorized(ResolvedCredential::stored(credential)));
            }
            Some(credential) if credential.is_refreshable() => {
                if let Some(resolved) = self.refresh_stored(session_id).await? {
                    return Ok(Resolution::Authorized(resolved));
                }
            }
            Some(_) => debug!(session_id, "Stored credential expired and cannot be refreshed"),
            None => debug!(session_id, "No stored credential"),
        }

        self.begin_authorization(session_id)
    }

    /// Complete an interactive flow from the provider redirect.
    ///
    /// State is verified before anything else; a mismatch never reaches the
    /// token endpoint.
    pub async fn handle_callback(
        &self,
        session_id: &str,
        presented_state: &str,
        code: &str,
    ) -> AuthResult<ResolvedCredential> {
        if !self.tracker.verify(session_id, presented_state) {
            warn!(session_id, "Rejecting authorization callback: state mismatch");
            return Err(AuthError::StateMismatch);
        }

        if code.is_empty() {
            return Err(AuthError::AuthorizationDenied(
                "No authorization code received".to_string(),
            ));
        }

        debug!(session_id, state = %FlowState::ExchangingCode, "State verified");
        let credential = self
            .client
            .exchange_code(code, self.client.redirect_uri())
            .await
            .map_err(|e| {
                warn!(session_id, reason = e.reason(), state = %FlowState::Failed, "Code exchange failed: {}", e);
                e
            })?;

        info!(session_id, "Authorization completed; credential issued");
        Ok(self.commit(credential).await)
    }

    /// Delete the stored credential, returning whether one existed
    pub async fn reset(&self) -> AuthResult<bool> {
        let removed = self.store.clear().await?;
        info!(store = %self.store.describe(), removed, "Credential reset");
        Ok(removed)
    }

    /// Lifecycle position for `session_id` without side effects
    pub async fn status(&self, session_id: &str) -> AuthResult<FlowState> {
        let state = match self.store.load().await? {
            Some(credential) if credential.is_valid() => FlowState::Valid,
            Some(_) => FlowState::Expired,
            None if self.tracker.is_pending(session_id) => FlowState::AwaitingUserConsent,
            None => FlowState::NoCredential,
        };
        Ok(state)
    }

    /// Refresh the stored credential under the refresh lock.
    ///
    /// The credential is reloaded after acquiring the lock so callers that
    /// queued behind an in-flight refresh reuse its result. `None` means the
    /// interactive flow has to restart.
    async fn refresh_stored(&self, session_id: &str) -> AuthResult<Option<ResolvedCredential>> {
        let _guard = self.refresh_lock.lock().await;

        let current = match self.store.load().await? {
            Some(credential) => credential,
            None => return Ok(None),
        };

        if current.is_valid() {
            debug!(session_id, "Credential refreshed by a concurrent request");
            return Ok(Some(ResolvedCredential::stored(current)));
        }

        if !current.is_refreshable() {
            return Ok(None);
        }

        debug!(session_id, state = %FlowState::RefreshInFlight, "Refreshing expired credential");
        match self.client.refresh(&current).await {
            Ok(refreshed) => Ok(Some(self.commit(refreshed).await)),
            Err(e) => {
                warn!(
                    session_id,
                    reason = e.reason(),
                    "Credential refresh failed, restarting authorization: {}",
                    e
                );
                Ok(None)
            }
        }
    }

    fn begin_authorization(&self, session_id: &str) -> AuthResult<Resolution> {
        let state_token = self.tracker.begin(session_id);
        let url = self
            .client
            .build_authorization_url(&state_token, &self.options)?;

        info!(session_id, state = %FlowState::AwaitingUserConsent, "Authorization required");
        Ok(Resolution::AuthorizationRequired(url))
    }

    async fn commit(&self, credential: Credential) -> ResolvedCredential {
        match self.store.save(&credential).await {
            Ok(()) => ResolvedCredential::stored(credential),
            Err(e) => {
                error!(store = %self.store.describe(), "Failed to persist credential: {}", e);
                ResolvedCredential {
                    credential,
                    persistence_error: Some(e),
                }
            }
        }
    }
}
