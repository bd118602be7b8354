//! Layered configuration loading
//!
//! Every Docsmith binary resolves its configuration in the same order:
//! serialized defaults, then a TOML file, then prefixed environment variables
//! (`PREFIX_SECTION__KEY`).

use crate::error::ConfigurationError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};

/// Configuration loader implemented by each binary's top-level config struct
pub trait ConfigLoader<T> {
    /// Load from an optional file path, falling back to the default file name
    fn load(path: Option<PathBuf>) -> Result<T, ConfigurationError>;

    /// Load from a specific file
    fn load_from_file(path: &Path) -> Result<T, ConfigurationError>;

    /// Re-apply environment overrides with the given prefix on top of `config`
    fn apply_env_overrides(config: &mut T, prefix: &str) -> Result<(), ConfigurationError>;
}

/// Build the standard figment stack: defaults, TOML file, prefixed environment
pub fn layered_figment<T: Serialize + Default>(file: &Path, env_prefix: &str) -> Figment {
    Figment::from(Serialized::defaults(T::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed(env_prefix).split("__"))
}

/// Extract a typed configuration, mapping figment failures to [`ConfigurationError`]
pub fn extract<T: DeserializeOwned>(figment: Figment) -> Result<T, ConfigurationError> {
    figment.extract().map_err(|e| ConfigurationError::ParseError {
        details: e.to_string(),
    })
}

/// Render a configuration as pretty TOML (used by `--gen-config`)
pub fn to_toml<T: Serialize>(config: &T) -> Result<String, ConfigurationError> {
    toml::to_string_pretty(config).map_err(|e| ConfigurationError::ParseError {
        details: format!("Failed to serialize config: {e}"),
    })
}
