//! # Docsmith authentication
//!
//! Session-scoped OAuth 2.0 authorization-code flow with durable token persistence.
//!
//! - [`token_store`]: loads and atomically persists the single [`Credential`] record
//! - [`state_tracker`]: one-time anti-forgery `state` tokens bound to caller sessions
//! - [`oauth_client`]: authorization URL, code exchange and refresh against the identity provider
//! - [`resolver`]: decides between a stored, refreshed or freshly authorized credential

pub mod oauth_client;
pub mod resolver;
pub mod state_tracker;
pub mod token_store;
pub mod types;

pub use oauth_client::{HttpOAuthClient, OAuthClient};
pub use resolver::{CredentialResolver, Resolution, ResolvedCredential};
pub use state_tracker::StateTracker;
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use types::{
    AccessType, AuthError, AuthResult, AuthorizationAttempt, AuthorizationOptions, ClientConfig,
    Credential, FlowState, PersistenceError, Prompt,
};
