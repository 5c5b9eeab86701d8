//! # Storage-Probe HTTP Service
//!
//! HTTP surface of the storage-probe diagnostics service.
//!
//! This service provides:
//! - Storage diagnostics under `/test` that exercise both configured stores
//! - Health and readiness endpoints
//! - Prometheus metrics
//! - A redacted view of the running configuration
//!
//! The storage options are held by an [`OptionsMonitor`], so every request
//! sees the most recently resolved connection strings.

pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod metrics;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

pub use config::{
    LoggingConfig, ReloadConfig, ServerConfig, ServiceConfig, StorageTestOptions,
};
pub use diagnostics::{render_reports, ProbeOperation, ProbeReport, StorageDiagnostics};
pub use errors::{ApiError, ConfigError, ServiceError};
pub use metrics::ServiceMetrics;

use axum::{
    extract::{DefaultBodyLimit, MatchedPath, Query, State},
    http::header,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use config::RedactedStorageTestOptions;
use serde::{Deserialize, Serialize};
use std::{future::Future, future::IntoFuture, sync::Arc};
use storage_probe_core::blob_storage::BlobStoreConnector;
use storage_probe_core::key_vault::KeyVaultMode;
use storage_probe_core::{OptionsBuilder, OptionsMonitor, SecretResolver};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use tracing::{error, info, instrument, warn};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration the service was started with
    pub config: Arc<ServiceConfig>,

    /// Current resolved storage options
    pub options: OptionsMonitor<StorageTestOptions>,

    /// Probes run by the `/test` handlers
    pub diagnostics: StorageDiagnostics,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ServiceConfig,
        options: OptionsMonitor<StorageTestOptions>,
        connector: Arc<dyn BlobStoreConnector>,
    ) -> Result<Self, ServiceError> {
        let metrics = ServiceMetrics::new().map_err(|e| ServiceError::Metrics {
            message: format!("Failed to initialize metrics: {}", e),
        })?;

        Ok(Self {
            config: Arc::new(config),
            options,
            diagnostics: StorageDiagnostics::new(connector),
            metrics,
        })
    }
}

/// Bind the raw storage options, resolving vault references in both
/// connection strings
///
/// # Errors
/// Any failure of the initial bind; the service must not start without it.
pub async fn bind_storage_options(
    raw: StorageTestOptions,
    resolver: Arc<SecretResolver>,
) -> Result<OptionsMonitor<StorageTestOptions>, storage_probe_core::ConfigError> {
    OptionsBuilder::new()
        .resolve_secrets(resolver, StorageTestOptions::secret_accessors())?
        .build(raw)
        .await
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let server = &state.config.server;

    let diagnostics_routes = Router::new().route(
        "/test",
        get(handle_download)
            .post(handle_upload)
            .delete(handle_delete),
    );

    let health_routes = Router::new()
        .route("/health", get(handle_health_check))
        .route("/ready", get(handle_readiness_check));

    let observability_routes = Router::new().route("/metrics", get(metrics_endpoint));

    let admin_routes = Router::new().route("/admin/config", get(get_config));

    let mut router = Router::new()
        .merge(diagnostics_routes)
        .merge(health_routes)
        .merge(observability_routes)
        .merge(admin_routes)
        .layer(DefaultBodyLimit::max(server.max_body_size))
        .layer(TimeoutLayer::new(server.request_timeout()));

    if server.enable_compression {
        router = router.layer(CompressionLayer::new());
    }

    if server.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server and run until SIGINT or SIGTERM
pub async fn start_server(state: AppState) -> Result<(), ServiceError> {
    let address = state.config.server.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", address);
    serve(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` completes
///
/// In-flight requests get `server.shutdown_timeout_seconds` to finish once
/// `shutdown` resolves; after that the server is dropped.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), ServiceError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let shutdown_timeout = state.config.server.shutdown_timeout();
    let app = create_router(state);

    let draining = Arc::new(tokio::sync::Notify::new());
    let signal = {
        let draining = Arc::clone(&draining);
        async move {
            shutdown.await;
            info!(
                "Initiating graceful shutdown with {}s timeout",
                shutdown_timeout.as_secs()
            );
            draining.notify_one();
        }
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();
    tokio::pin!(server);

    tokio::select! {
        result = &mut server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = async {
            draining.notified().await;
            tokio::time::sleep(shutdown_timeout).await;
        } => {
            warn!(
                timeout_seconds = shutdown_timeout.as_secs(),
                "Graceful shutdown timed out; dropping remaining connections"
            );
        }
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

// ============================================================================
// Diagnostics Handlers
// ============================================================================

/// Query parameters of the `/test` routes
#[derive(Debug, Default, Deserialize)]
pub struct ProbeParams {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub value: String,
}

/// Download the named blob from both stores
#[instrument(skip(state, params), fields(name = %params.name))]
async fn handle_download(State(state): State<AppState>, Query(params): Query<ProbeParams>) -> String {
    let options = state.options.current();
    let reports = state.diagnostics.download(&options, &params.name).await;
    finish_probe(&state, ProbeOperation::Download, &reports)
}

/// Upload the value to the named blob in both stores
#[instrument(skip(state, params), fields(name = %params.name))]
async fn handle_upload(State(state): State<AppState>, Query(params): Query<ProbeParams>) -> String {
    let options = state.options.current();
    let reports = state
        .diagnostics
        .upload(&options, &params.name, &params.value)
        .await;
    finish_probe(&state, ProbeOperation::Upload, &reports)
}

/// Delete the container from both stores
#[instrument(skip(state))]
async fn handle_delete(State(state): State<AppState>) -> String {
    let options = state.options.current();
    let reports = state.diagnostics.delete(&options).await;
    finish_probe(&state, ProbeOperation::Delete, &reports)
}

fn finish_probe(state: &AppState, operation: ProbeOperation, reports: &[ProbeReport]) -> String {
    for report in reports {
        state
            .metrics
            .record_blob_operation(report.metric_label, operation.as_str(), report.outcome);
    }
    render_reports(reports)
}

// ============================================================================
// Health Check Handlers
// ============================================================================

/// Basic liveness check
#[instrument(skip_all)]
async fn handle_health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Ready once both connection strings are bound
#[instrument(skip(state))]
async fn handle_readiness_check(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, ApiError> {
    if !state.options.current().is_complete() {
        return Err(ApiError::NotReady {
            reason: "storage connection strings are not configured".to_string(),
        });
    }

    Ok(Json(ReadinessResponse {
        ready: true,
        reloads: state.options.reload_count(),
        timestamp: Utc::now(),
    }))
}

// ============================================================================
// Observability Handlers
// ============================================================================

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<Response, ApiError> {
    state
        .metrics
        .set_options_reloads(state.options.reload_count());

    let body = state.metrics.encode().map_err(|e| ApiError::Internal {
        message: format!("Failed to encode metrics: {}", e),
    })?;

    Ok(([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response())
}

// ============================================================================
// Admin Handlers
// ============================================================================

/// Running configuration with every secret masked
#[instrument(skip_all)]
async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let config = &state.config;
    Json(ConfigResponse {
        server: config.server.clone(),
        logging: config.logging.clone(),
        key_vault: KeyVaultView {
            mode: config.key_vault.mode,
            request_timeout_seconds: config.key_vault.request_timeout_seconds,
            configured_secrets: config.key_vault.secrets.len(),
        },
        storage_test: state.options.current().redacted(),
        reload: config.reload.clone(),
        reloads: state.options.reload_count(),
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Request logging middleware with correlation ID tracking
///
/// Reuses the caller's `x-correlation-id` when present, otherwise generates
/// one, and echoes it on the response.
#[instrument(skip(request, next), fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let correlation_id = request
        .headers()
        .get("x-correlation-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::Span::current().record("correlation_id", correlation_id.as_str());
    request.extensions_mut().insert(correlation_id.clone());

    let mut response = next.run(request).await;
    let duration = start.elapsed();

    if let Ok(header_value) = correlation_id.parse() {
        response
            .headers_mut()
            .insert("x-correlation-id", header_value);
    }

    let status = response.status();
    if status.is_server_error() {
        error!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with server error"
        );
    } else if status.is_client_error() {
        warn!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed with client error"
        );
    } else {
        info!(
            method = %method,
            uri = %uri,
            status = %status,
            duration_ms = %duration.as_millis(),
            "Request completed successfully"
        );
    }

    response
}

/// Records request count and latency by route template
async fn metrics_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let start = std::time::Instant::now();
    let method = request.method().to_string();

    // Route templates keep label cardinality bounded
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;

    state.metrics.record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed(),
    );

    response
}

// ============================================================================
// Response Types
// ============================================================================

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

/// Readiness check response
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub reloads: u64,
    pub timestamp: DateTime<Utc>,
}

/// Vault settings as shown by `/admin/config`
#[derive(Debug, Serialize)]
pub struct KeyVaultView {
    pub mode: KeyVaultMode,
    pub request_timeout_seconds: u64,
    pub configured_secrets: usize,
}

/// Redacted configuration view
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub key_vault: KeyVaultView,
    pub storage_test: RedactedStorageTestOptions,
    pub reload: ReloadConfig,
    pub reloads: u64,
}
