//! Metrics collection for the API service.
//!
//! Each [`ServiceMetrics`] owns its own [`Registry`], so several instances
//! (one per test router, for example) never collide on metric names.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Outcome label of a blob store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    Success,
    Missing,
    Failure,
}

impl OperationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Missing => "missing",
            Self::Failure => "failure",
        }
    }
}

/// Service metrics for observability
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    // HTTP request metrics
    pub http_requests_total: IntCounterVec,
    pub http_request_duration: HistogramVec,

    // Diagnostics metrics
    pub blob_operations_total: IntCounterVec,

    // Options metrics
    pub options_reloads: IntGauge,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request processing time",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0]),
            &["method", "path"],
        )?;
        let blob_operations_total = IntCounterVec::new(
            Opts::new(
                "blob_operations_total",
                "Diagnostic blob store operations by store and outcome",
            ),
            &["store", "operation", "outcome"],
        )?;
        let options_reloads = IntGauge::new(
            "options_reloads",
            "Successful reloads of the storage test options",
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(blob_operations_total.clone()))?;
        registry.register(Box::new(options_reloads.clone()))?;

        Ok(Arc::new(Self {
            registry,
            http_requests_total,
            http_request_duration,
            blob_operations_total,
            options_reloads,
        }))
    }

    pub fn record_http_request(&self, method: &str, path: &str, status: u16, duration: Duration) {
        let status = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, path, status.as_str()])
            .inc();
        self.http_request_duration
            .with_label_values(&[method, path])
            .observe(duration.as_secs_f64());
    }

    pub fn record_blob_operation(&self, store: &str, operation: &str, outcome: OperationOutcome) {
        self.blob_operations_total
            .with_label_values(&[store, operation, outcome.as_str()])
            .inc();
    }

    pub fn set_options_reloads(&self, reloads: u64) {
        self.options_reloads
            .set(i64::try_from(reloads).unwrap_or(i64::MAX));
    }

    /// Render all metrics in the Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
