//! Configuration module for the Docsmith API

mod oauth;
mod server;

pub use oauth::{OAuthConfig, SessionConfig};
pub use server::ServerConfig;

use docsmith_common::config::{extract, layered_figment, to_toml, ConfigLoader};
use docsmith_common::ConfigurationError as ConfigError;
use figment::{
    providers::{Env, Serialized},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix, e.g. `DOCSMITH_OAUTH__CLIENT_ID`
pub const ENV_PREFIX: &str = "DOCSMITH_";

/// Configuration file used when none is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "docsmith.toml";

/// Credential storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the persisted credential record
    pub token_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            token_path: PathBuf::from("token.json"),
        }
    }
}

/// Main configuration structure for the Docsmith API
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,

    /// Identity provider configuration
    pub oauth: OAuthConfig,

    /// Session cookie configuration
    pub session: SessionConfig,

    /// Credential storage configuration
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) => <Config as ConfigLoader<Config>>::load_from_file(path),
            None => <Config as ConfigLoader<Config>>::load(None),
        }
    }

    /// Generate example configuration file
    pub fn generate_example() -> Result<String, ConfigError> {
        to_toml(&Self::default())
    }

    /// Check the configuration before the server starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.oauth
            .to_client_config()
            .validate()
            .map_err(|e| ConfigError::invalid("oauth", e.to_string()))?;

        if self.oauth.provider_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "oauth.provider_timeout_secs",
                "must be greater than zero",
            ));
        }

        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "server.request_timeout_secs",
                "must be greater than zero",
            ));
        }

        if self.session.cookie_name.trim().is_empty() {
            return Err(ConfigError::missing("session.cookie_name"));
        }

        if self.storage.token_path.as_os_str().is_empty() {
            return Err(ConfigError::missing("storage.token_path"));
        }

        Ok(())
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get identity provider timeout as Duration
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.oauth.provider_timeout_secs)
    }

    /// Get authorization attempt lifetime as Duration
    pub fn attempt_ttl(&self) -> Duration {
        Duration::from_secs(self.session.attempt_ttl_secs)
    }
}

impl ConfigLoader<Config> for Config {
    fn load(path: Option<PathBuf>) -> Result<Config, ConfigError> {
        let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        extract(layered_figment::<Config>(&path, ENV_PREFIX))
    }

    fn load_from_file(path: &Path) -> Result<Config, ConfigError> {
        extract(layered_figment::<Config>(path, ENV_PREFIX))
    }

    fn apply_env_overrides(config: &mut Config, prefix: &str) -> Result<(), ConfigError> {
        let figment = Figment::from(Serialized::defaults(config.clone()))
            .merge(Env::prefixed(prefix).split("__"));

        *config = extract(figment)?;
        Ok(())
    }
}
