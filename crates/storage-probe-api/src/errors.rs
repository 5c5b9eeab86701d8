//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::{error, warn};

/// Handler errors with HTTP status code mapping
///
/// The diagnostics endpoints never return these; each store operation
/// reports its own failure in the response body. They cover the operational
/// routes only:
///
/// - `503 Service Unavailable`: the service cannot serve diagnostics yet
/// - `500 Internal Server Error`: unexpected server failures
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Options are bound but not usable
    #[error("Service not ready: {reason}")]
    NotReady { reason: String },

    /// Unexpected internal failure
    ///
    /// Details are logged; clients get a generic message.
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotReady { ref reason } => {
                warn!(reason = %reason, "Readiness check failed");
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            Self::Internal { ref message } => {
                error!(error = %message, "Internal server error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error occurred. Please try again later.".to_string(),
                )
            }
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Options binding failed: {0}")]
    Binding(#[from] storage_probe_core::ConfigError),

    #[error("Metrics registry error: {message}")]
    Metrics { message: String },
}

impl ServiceError {
    /// Process exit code reported for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BindFailed { .. } => 1,
            Self::ServerFailed { .. } => 2,
            Self::Configuration(_) | Self::Binding(_) => 3,
            Self::Metrics { .. } => 4,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Configuration loading failed: {message}")]
    Load { message: String },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
