//! Configuration types for the HTTP service
//!
//! Every section defaults, so an empty configuration source produces a
//! usable (if storage-less) service. [`ServiceConfig::validate`] runs after
//! deserialization and before anything is bound.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use storage_probe_core::blob_storage::ContainerName;
use storage_probe_core::key_vault::KeyVaultConfiguration;
use storage_probe_core::{field_accessor, secret_fields, FieldAccessor};

/// Placeholder shown instead of a sensitive value
pub const REDACTED: &str = "[REDACTED]";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Vault client selection
    pub key_vault: KeyVaultConfiguration,

    /// Options exercised by the diagnostics endpoints
    pub storage_test: StorageTestOptions,

    /// Configuration reload triggers
    pub reload: ReloadConfig,
}

impl ServiceConfig {
    /// Check values that deserialization alone cannot
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "server.host must not be empty".to_string(),
            });
        }

        if self.server.timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "server.timeout_seconds must be greater than zero".to_string(),
            });
        }

        if self.server.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be greater than zero".to_string(),
            });
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "logging.level '{}' is not one of {}",
                    self.logging.level,
                    LOG_LEVELS.join(", ")
                ),
            });
        }

        if self.key_vault.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "key_vault.request_timeout_seconds must be greater than zero".to_string(),
            });
        }

        ContainerName::new(self.storage_test.container_name.as_str()).map_err(|e| {
            ConfigError::Invalid {
                message: format!("storage_test.container_name: {}", e),
            }
        })?;

        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,

    /// Enable CORS
    pub enable_cors: bool,

    /// Enable compression
    pub enable_compression: bool,
}

impl ServerConfig {
    /// Address string the listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Shutdown grace period as a duration
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            timeout_seconds: 30,
            shutdown_timeout_seconds: 30,
            max_body_size: 1024 * 1024, // 1MB
            enable_cors: true,
            enable_compression: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Reload trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Seconds between polls of the configuration sources, 0 disables polling
    pub poll_interval_seconds: u64,
}

impl ReloadConfig {
    /// Polling interval, `None` when polling is disabled
    pub fn poll_interval(&self) -> Option<Duration> {
        match self.poll_interval_seconds {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        }
    }
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 30,
        }
    }
}

// ============================================================================
// Storage test options
// ============================================================================

/// Options read by the diagnostics endpoints
///
/// Both connection strings may hold vault references; they are replaced by
/// the secret values when the options are bound.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageTestOptions {
    /// Connection string of the first store
    pub storage1_connection_string: String,

    /// Connection string of the second store
    pub storage2_connection_string: String,

    /// Container the diagnostics operate on
    pub container_name: String,
}

secret_fields!(StorageTestOptions {
    storage1_connection_string,
    storage2_connection_string,
});

impl StorageTestOptions {
    /// Fields that may carry vault references
    pub fn secret_accessors() -> Vec<FieldAccessor<Self>> {
        vec![
            field_accessor!(StorageTestOptions, storage1_connection_string),
            field_accessor!(StorageTestOptions, storage2_connection_string),
        ]
    }

    /// Both connection strings are set
    pub fn is_complete(&self) -> bool {
        !self.storage1_connection_string.trim().is_empty()
            && !self.storage2_connection_string.trim().is_empty()
    }

    /// Copy safe to show to operators
    pub fn redacted(&self) -> RedactedStorageTestOptions {
        RedactedStorageTestOptions {
            storage1_connection_string: redact(&self.storage1_connection_string),
            storage2_connection_string: redact(&self.storage2_connection_string),
            container_name: self.container_name.clone(),
        }
    }
}

impl Default for StorageTestOptions {
    fn default() -> Self {
        Self {
            storage1_connection_string: String::new(),
            storage2_connection_string: String::new(),
            container_name: "storage-probe".to_string(),
        }
    }
}

impl fmt::Debug for StorageTestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageTestOptions")
            .field(
                "storage1_connection_string",
                &redact(&self.storage1_connection_string),
            )
            .field(
                "storage2_connection_string",
                &redact(&self.storage2_connection_string),
            )
            .field("container_name", &self.container_name)
            .finish()
    }
}

/// [`StorageTestOptions`] with connection strings masked
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedactedStorageTestOptions {
    pub storage1_connection_string: String,
    pub storage2_connection_string: String,
    pub container_name: String,
}

/// Mask a sensitive value, keeping only whether it was set
pub fn redact(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        REDACTED.to_string()
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
