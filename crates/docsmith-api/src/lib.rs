//! # Docsmith API
//!
//! HTTP backend that drives the session-scoped OAuth authorization flow for
//! the document tools.
//!
//! ## Features
//!
//! - **Authorization**: login redirect, provider callback and status per browser session
//! - **Token persistence**: a single credential shared by all sessions, stored on disk
//! - **Reset**: delete the stored credential to force re-authorization

pub mod api;
pub mod config;
pub mod error;
pub mod server;

// Re-export commonly used types
pub use config::Config;
pub use error::{ApiError, Error, Result};
pub use server::{AppState, Server};

/// Version of the docsmith-api crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
