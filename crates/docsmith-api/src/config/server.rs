//! HTTP server configuration

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    pub bind_address: SocketAddr,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Redirect requests forwarded over plain HTTP to HTTPS
    pub force_https: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 5000)),
            request_timeout_secs: 30,
            force_https: false,
        }
    }
}
