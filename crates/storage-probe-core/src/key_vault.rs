//! # Key Vault Module
//!
//! Vault access capability consumed by secret resolution.
//!
//! The capability is a single operation: fetch the current value of the
//! secret a [`SecretLocator`] points at. Implementations live in
//! [`crate::adapters`] and are chosen when the process is composed.

use crate::secret_reference::SecretLocator;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};
use zeroize::Zeroizing;

// ============================================================================
// Core Types
// ============================================================================

/// Secure container for secret values
///
/// The buffer is zeroed when the value is dropped. Secret values are never
/// included in Debug output or logs.
#[derive(Clone)]
pub struct SecretValue {
    inner: Zeroizing<String>,
}

impl SecretValue {
    /// Create secret value from string
    pub fn from_string(value: String) -> Self {
        Self {
            inner: Zeroizing::new(value),
        }
    }

    /// Get secret as string (only for immediate use)
    ///
    /// # Security Warning
    /// The returned string contains the actual secret value.
    pub fn expose_secret(&self) -> &str {
        &self.inner
    }

    /// Check if secret is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Get secret length without exposing content
    pub fn len(&self) -> usize {
        self.inner.len()
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretValue")
            .field("length", &self.len())
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// Which vault client the process binds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyVaultMode {
    /// No vault access; references fail to resolve
    #[default]
    Disabled,

    /// Secrets served from the `secrets` table of the configuration
    InMemory,

    /// Azure Key Vault with the default credential chain
    Azure,
}

/// Configuration for Key Vault behavior
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyVaultConfiguration {
    /// Vault client to bind
    pub mode: KeyVaultMode,

    /// Request timeout for Key Vault operations
    pub request_timeout_seconds: u64,

    /// Secrets served by `KeyVaultMode::InMemory`
    pub secrets: Vec<InMemorySecret>,
}

impl KeyVaultConfiguration {
    /// Request timeout as a duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for KeyVaultConfiguration {
    fn default() -> Self {
        Self {
            mode: KeyVaultMode::Disabled,
            request_timeout_seconds: 30,
            secrets: Vec::new(),
        }
    }
}

impl fmt::Debug for KeyVaultConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyVaultConfiguration")
            .field("mode", &self.mode)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("secrets", &self.secrets)
            .finish()
    }
}

/// One locator and its value, as listed in configuration
///
/// Listed rather than keyed by locator: configuration sources treat dots in
/// keys as path separators.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemorySecret {
    pub locator: String,
    pub value: String,
}

impl fmt::Debug for InMemorySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemorySecret")
            .field("locator", &self.locator)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Interface Traits
// ============================================================================

/// Interface for fetching secret values from a vault
///
/// Implementations handle provider-specific authentication and API calls.
/// There is no retry inside the capability; callers decide what a failure
/// means.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyVaultClient: Send + Sync {
    /// Fetch the current value of the secret at `locator`
    ///
    /// # Errors
    /// - `KeyVaultError::SecretNotFound` - Secret doesn't exist
    /// - `KeyVaultError::AccessDenied` - Insufficient permissions
    /// - `KeyVaultError::ServiceUnavailable` - Key Vault unreachable
    /// - `KeyVaultError::Disabled` - Vault access is not configured
    async fn fetch_secret(&self, locator: &SecretLocator) -> Result<SecretValue, KeyVaultError>;
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during Key Vault operations
#[derive(Debug, thiserror::Error)]
pub enum KeyVaultError {
    #[error("Secret not found: {locator}")]
    SecretNotFound { locator: SecretLocator },

    #[error("Access denied to secret: {locator} - {reason}")]
    AccessDenied {
        locator: SecretLocator,
        reason: String,
    },

    #[error("Key Vault service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Invalid secret locator: {locator} - {reason}")]
    InvalidLocator { locator: String, reason: String },

    #[error("Request timeout after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    #[error("Rate limit exceeded: {retry_after_seconds} seconds")]
    RateLimitExceeded { retry_after_seconds: u64 },

    #[error("Vault access is disabled; cannot resolve {locator}")]
    Disabled { locator: SecretLocator },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl KeyVaultError {
    /// Check if error is transient (a later attempt may succeed)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            KeyVaultError::ServiceUnavailable { .. }
                | KeyVaultError::Timeout { .. }
                | KeyVaultError::RateLimitExceeded { .. }
                | KeyVaultError::Internal { .. }
        )
    }
}

#[cfg(test)]
#[path = "key_vault_tests.rs"]
mod tests;
