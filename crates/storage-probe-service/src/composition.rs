//! # Process Composition
//!
//! Selects the vault client named by `key_vault.mode`. The resolver only
//! ever sees the [`KeyVaultClient`] trait. Also classifies a failed initial
//! bind for the operator.

use std::sync::Arc;
use storage_probe_core::adapters::{DisabledKeyVaultClient, InMemoryKeyVaultClient};
use storage_probe_core::key_vault::{KeyVaultConfiguration, KeyVaultMode};
use storage_probe_core::{ConfigError, KeyVaultClient};
use tracing::{info, warn};

/// Errors raised while wiring the process together
#[derive(Debug, thiserror::Error)]
pub enum CompositionError {
    #[error("Vault client unavailable for mode {mode:?}: {message}")]
    VaultUnavailable { mode: KeyVaultMode, message: String },
}

/// Build the vault client for the configured mode
///
/// # Errors
/// `CompositionError::VaultUnavailable` if the Azure client cannot be
/// created, or the binary was built without the `azure` feature.
pub fn build_vault_client(
    config: &KeyVaultConfiguration,
) -> Result<Arc<dyn KeyVaultClient>, CompositionError> {
    match config.mode {
        KeyVaultMode::Disabled => {
            warn!("Vault access is disabled; only literal connection strings will bind");
            Ok(Arc::new(DisabledKeyVaultClient::new()))
        }
        KeyVaultMode::InMemory => {
            let client = InMemoryKeyVaultClient::with_secrets(
                config
                    .secrets
                    .iter()
                    .map(|secret| (secret.locator.clone(), secret.value.clone())),
            );
            info!(secrets = client.len(), "Using in-memory vault");
            Ok(Arc::new(client))
        }
        KeyVaultMode::Azure => azure_vault_client(config),
    }
}

#[cfg(feature = "azure")]
fn azure_vault_client(
    config: &KeyVaultConfiguration,
) -> Result<Arc<dyn KeyVaultClient>, CompositionError> {
    let client = storage_probe_core::adapters::AzureKeyVaultClient::new(config).map_err(|e| {
        CompositionError::VaultUnavailable {
            mode: KeyVaultMode::Azure,
            message: e.to_string(),
        }
    })?;
    info!("Using Azure Key Vault");
    Ok(Arc::new(client))
}

#[cfg(not(feature = "azure"))]
fn azure_vault_client(
    _config: &KeyVaultConfiguration,
) -> Result<Arc<dyn KeyVaultClient>, CompositionError> {
    Err(CompositionError::VaultUnavailable {
        mode: KeyVaultMode::Azure,
        message: "built without the 'azure' feature".to_string(),
    })
}

/// Operator-facing summary of a failed initial bind
pub fn bind_failure_hint(error: &ConfigError) -> &'static str {
    match error {
        e if e.is_declaration_error() => {
            "Storage options binding is declared incorrectly; this is a build defect"
        }
        ConfigError::SecretResolution { source, .. } if source.is_transient() => {
            "Vault was unreachable while binding storage options; restart once it recovers"
        }
        _ => "Secret reference in storage options could not be resolved; fix the reference or vault access",
    }
}

#[cfg(test)]
#[path = "composition_tests.rs"]
mod tests;
