//! # Storage-Probe CLI
//!
//! Operator command line for the storage-probe service.
//!
//! This module provides CLI commands for:
//! - Inspecting a configuration value offline to see which secret it refers to
//! - Calling the diagnostics endpoints of a running service

use clap::{Parser, Subcommand};
use std::io::Write;
use std::time::Duration;
use storage_probe_core::SecretReference;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use url::Url;

/// Service address used when neither `--url` nor `STORAGE_PROBE_URL` is set
pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8080";

/// Printed by `inspect` for values that are not secret references
pub const LITERAL_MARKER: &str = "literal";

// ============================================================================
// CLI Structure
// ============================================================================

/// Storage-Probe CLI - blob storage diagnostics
#[derive(Debug, Parser)]
#[command(name = "storage-probe")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Diagnostics for the storage-probe service")]
#[command(
    long_about = "Inspects vault secret references and exercises the blob stores configured on a running storage-probe service"
)]
pub struct Cli {
    /// Base URL of the running service
    #[arg(short, long, env = "STORAGE_PROBE_URL", default_value = DEFAULT_SERVICE_URL, global = true)]
    pub url: String,

    /// Request timeout in seconds
    #[arg(short, long, default_value = "30", global = true)]
    pub timeout: u64,

    /// Logging level
    #[arg(short, long, default_value = "warn", global = true)]
    pub log_level: String,

    /// Enable JSON logging
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the secret locator a configuration value refers to
    ///
    /// Prints `literal` when the value is used as-is. Does not contact the
    /// service or the vault.
    Inspect {
        /// Raw configuration value
        candidate: String,
    },

    /// Download a blob from both configured stores
    Download {
        /// Blob name
        #[arg(short, long)]
        name: String,
    },

    /// Upload a blob to both configured stores
    Upload {
        /// Blob name
        #[arg(short, long)]
        name: String,

        /// Blob content
        #[arg(short, long, default_value = "")]
        value: String,
    },

    /// Delete the diagnostics container from both configured stores
    Delete,
}

// ============================================================================
// Service Client
// ============================================================================

/// HTTP client for the diagnostics endpoints of a running service
#[derive(Debug, Clone)]
pub struct ServiceClient {
    endpoint: Url,
    http: reqwest::Client,
}

impl ServiceClient {
    /// Create client for the service at `base_url`
    ///
    /// # Errors
    /// - `CliError::InvalidArgument` - the URL does not parse or is not http(s)
    /// - `CliError::Request` - the HTTP client could not be built
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CliError> {
        let base = Url::parse(base_url).map_err(|e| CliError::InvalidArgument {
            arg: "url".to_string(),
            message: e.to_string(),
        })?;

        if !matches!(base.scheme(), "http" | "https") {
            return Err(CliError::InvalidArgument {
                arg: "url".to_string(),
                message: format!("unsupported scheme '{}'", base.scheme()),
            });
        }

        let endpoint = base.join("test").map_err(|e| CliError::InvalidArgument {
            arg: "url".to_string(),
            message: e.to_string(),
        })?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CliError::Request {
                message: e.to_string(),
            })?;

        Ok(Self { endpoint, http })
    }

    /// Endpoint the diagnostics calls are sent to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// `GET /test?name=<name>`
    pub async fn download(&self, name: &str) -> Result<String, CliError> {
        self.send(self.http.get(self.endpoint.clone()).query(&[("name", name)]))
            .await
    }

    /// `POST /test?name=<name>&value=<value>`
    pub async fn upload(&self, name: &str, value: &str) -> Result<String, CliError> {
        self.send(
            self.http
                .post(self.endpoint.clone())
                .query(&[("name", name), ("value", value)]),
        )
        .await
    }

    /// `DELETE /test`
    pub async fn delete(&self) -> Result<String, CliError> {
        self.send(self.http.delete(self.endpoint.clone())).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, CliError> {
        let response = request.send().await.map_err(|e| CliError::Request {
            message: e.to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| CliError::Request {
            message: e.to_string(),
        })?;

        debug!(status = status.as_u16(), "Service responded");

        if !status.is_success() {
            return Err(CliError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

// ============================================================================
// Command Execution
// ============================================================================

/// Describe a raw configuration value
///
/// Returns the locator of a secret reference, or [`LITERAL_MARKER`].
pub fn inspect(candidate: &str) -> String {
    match SecretReference::parse(candidate) {
        Some(reference) => reference.into_locator().as_str().to_string(),
        None => LITERAL_MARKER.to_string(),
    }
}

/// Run a parsed command, writing its output to `out`
///
/// # Errors
/// Any [`CliError`]; nothing is written for a failed service call.
pub async fn execute(cli: Cli, out: &mut impl Write) -> Result<(), CliError> {
    let output = match cli.command {
        Commands::Inspect { candidate } => inspect(&candidate),
        Commands::Download { name } => {
            service_client(&cli.url, cli.timeout)?
                .download(&name)
                .await?
        }
        Commands::Upload { name, value } => {
            service_client(&cli.url, cli.timeout)?
                .upload(&name, &value)
                .await?
        }
        Commands::Delete => service_client(&cli.url, cli.timeout)?.delete().await?,
    };

    writeln!(out, "{}", output)?;
    Ok(())
}

fn service_client(url: &str, timeout_seconds: u64) -> Result<ServiceClient, CliError> {
    let client = ServiceClient::new(url, Duration::from_secs(timeout_seconds))?;
    info!(endpoint = %client.endpoint(), "Calling storage-probe service");
    Ok(client)
}

/// Parse arguments, initialize logging and run the command
pub async fn run_cli() -> Result<(), CliError> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    let mut stdout = std::io::stdout();
    execute(cli, &mut stdout).await
}

/// Install a stderr subscriber so stdout carries only command output
fn initialize_logging(cli: &Cli) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cli.log_level.to_ascii_lowercase()))
        .map_err(|e| CliError::InvalidArgument {
            arg: "log-level".to_string(),
            message: e.to_string(),
        })?;

    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    let registry = tracing_subscriber::registry().with(filter);

    let result = if cli.json_logs {
        registry.with(layer.json()).try_init()
    } else {
        registry.with(layer).try_init()
    };

    result.map_err(|e| CliError::Logging {
        message: e.to_string(),
    })
}

// ============================================================================
// Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Invalid argument '{arg}': {message}")]
    InvalidArgument { arg: String, message: String },

    #[error("Request to service failed: {message}")]
    Request { message: String },

    #[error("Service returned status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Logging initialization failed: {message}")]
    Logging { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Logging { .. } => 1,
            CliError::Request { .. } => 2,
            CliError::UnexpectedStatus { .. } => 3,
            CliError::InvalidArgument { .. } => 4,
            CliError::Io(_) => 5,
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
