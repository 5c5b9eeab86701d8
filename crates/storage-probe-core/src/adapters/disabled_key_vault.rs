//! # Disabled Key Vault
//!
//! Development stub used when no vault is configured. Literal configuration
//! values bind normally; any secret reference fails to resolve.

use crate::key_vault::{KeyVaultClient, KeyVaultError, SecretValue};
use crate::secret_reference::SecretLocator;
use async_trait::async_trait;
use tracing::error;

/// Vault client that refuses every fetch
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledKeyVaultClient;

impl DisabledKeyVaultClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl KeyVaultClient for DisabledKeyVaultClient {
    async fn fetch_secret(&self, locator: &SecretLocator) -> Result<SecretValue, KeyVaultError> {
        error!(
            locator = %locator,
            "Configuration references a vault secret but vault access is disabled"
        );
        Err(KeyVaultError::Disabled {
            locator: locator.clone(),
        })
    }
}

#[cfg(test)]
#[path = "disabled_key_vault_tests.rs"]
mod tests;
