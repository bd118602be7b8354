//! Shared building blocks for the Docsmith crates
//!
//! - [`logging`]: unified `tracing` subscriber initialisation
//! - [`config`]: figment-backed configuration loading
//! - [`error`]: configuration errors and the common error marker trait

pub mod config;
pub mod error;
pub mod logging;

pub use config::ConfigLoader;
pub use error::{ConfigurationError, DocsmithError};
