//! Error types shared across Docsmith crates

use thiserror::Error;

/// Marker trait implemented by the top-level error type of every Docsmith crate
pub trait DocsmithError: std::error::Error + Send + Sync + 'static {}

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Configuration could not be parsed or extracted
    #[error("Failed to parse configuration: {details}")]
    ParseError { details: String },

    /// A required value is missing
    #[error("Missing required configuration value: {key}")]
    MissingValue { key: String },

    /// A value is present but not acceptable
    #[error("Invalid configuration value for {key}: {details}")]
    InvalidValue { key: String, details: String },
}

impl DocsmithError for ConfigurationError {}

impl ConfigurationError {
    /// Shorthand for [`ConfigurationError::InvalidValue`]
    pub fn invalid(key: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            details: details.into(),
        }
    }

    /// Shorthand for [`ConfigurationError::MissingValue`]
    pub fn missing(key: impl Into<String>) -> Self {
        Self::MissingValue { key: key.into() }
    }
}
