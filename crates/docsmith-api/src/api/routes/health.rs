//! Liveness routes

use crate::api::types::HealthResponse;
use axum::Json;

/// Plain-text banner at the root path
pub async fn index() -> &'static str {
    "Docsmith backend is running"
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: crate::VERSION.to_string(),
        timestamp: chrono::Utc::now(),
    })
}
