//! # Storage-Probe Core
//!
//! Core logic for the storage-probe diagnostic service.
//!
//! This crate contains:
//! - Recognition of vault secret references embedded in configuration values
//! - Resolution of those references through an injected vault client
//! - Rewriting of declared string fields on typed configuration objects
//! - An options monitor that re-runs resolution whenever configuration reloads
//! - The blob store abstraction exercised by the diagnostics endpoints
//!
//! ## Architecture
//!
//! Business logic depends only on trait abstractions ([`key_vault::KeyVaultClient`],
//! [`blob_storage::BlobStore`]); infrastructure implementations live in
//! [`adapters`] and are selected when the process is composed.
//!
//! ## Usage
//!
//! ```rust
//! use storage_probe_core::secret_reference::match_secret_reference;
//!
//! let locator = match_secret_reference(
//!     "@Microsoft.KeyVault(VaultName=kv;SecretName=db;SecretVersion=1)",
//! )
//! .unwrap();
//! assert_eq!(locator.as_str(), "https://kv.vault.azure.net/secrets/db/1");
//!
//! // Plain values are not references
//! assert!(match_secret_reference("UseDevelopmentStorage=true").is_none());
//! ```

pub mod adapters;
pub mod blob_storage;
pub mod fields;
pub mod key_vault;
pub mod options;
pub mod resolver;
pub mod rewrite;
pub mod secret_reference;

pub use fields::{FieldAccessor, SecretFields};
pub use key_vault::{KeyVaultClient, KeyVaultError, SecretValue};
pub use options::{ConfigureOptions, OptionsBuilder, OptionsMonitor};
pub use resolver::SecretResolver;
pub use rewrite::{RewriteSummary, SecretRewriter};
pub use secret_reference::{match_secret_reference, SecretLocator, SecretReference};

/// Standard result type for configuration binding
pub type ConfigResult<T> = Result<T, ConfigError>;

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised while declaring or running configuration binding steps
///
/// Declaration errors (`InvalidAccessor`, `FieldNotSettable`) are raised when
/// the binding is set up, before any value is resolved, and are fatal to
/// start-up.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid field accessor on {type_name}: '{field}' - {reason}")]
    InvalidAccessor {
        type_name: &'static str,
        field: String,
        reason: String,
    },

    #[error("Field '{field}' on {type_name} is not settable")]
    FieldNotSettable {
        type_name: &'static str,
        field: String,
    },

    #[error("Failed to resolve secret for {type_name}.{field}: {source}")]
    SecretResolution {
        type_name: &'static str,
        field: &'static str,
        #[source]
        source: KeyVaultError,
    },
}

impl ConfigError {
    /// Check if error was raised while declaring the binding
    pub fn is_declaration_error(&self) -> bool {
        matches!(
            self,
            ConfigError::InvalidAccessor { .. } | ConfigError::FieldNotSettable { .. }
        )
    }

    /// Name of the field the error refers to
    pub fn field(&self) -> &str {
        match self {
            ConfigError::InvalidAccessor { field, .. } => field,
            ConfigError::FieldNotSettable { field, .. } => field,
            ConfigError::SecretResolution { field, .. } => field,
        }
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
