//! # Azure Key Vault Implementation
//!
//! Production vault client backed by the Azure SDK.
//!
//! Locators name the vault as well as the secret, so one client can serve
//! references into several vaults. A `SecretClient` is created the first time
//! each vault URL is seen and reused afterwards. Authentication uses the Azure
//! default credential chain:
//! - Managed Identity (production in Azure)
//! - Azure CLI (local development)
//! - Environment variables

use crate::key_vault::{KeyVaultClient, KeyVaultConfiguration, KeyVaultError, SecretValue};
use crate::secret_reference::SecretLocator;
use async_trait::async_trait;
use azure_core::auth::TokenCredential;
use azure_security_keyvault::SecretClient;
use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};
use tracing::{debug, error, info, instrument};

/// Azure Key Vault client keyed by vault URL
pub struct AzureKeyVaultClient {
    credential: Arc<dyn TokenCredential>,
    clients: RwLock<HashMap<String, SecretClient>>,
    timeout: Duration,
}

impl AzureKeyVaultClient {
    /// Create client using the default Azure credential chain
    ///
    /// # Errors
    /// `KeyVaultError::AuthenticationFailed` if no credential source can be
    /// constructed.
    #[instrument(skip(config), fields(timeout_seconds = config.request_timeout_seconds))]
    pub fn new(config: &KeyVaultConfiguration) -> Result<Self, KeyVaultError> {
        let credential =
            azure_identity::create_credential().map_err(|e| KeyVaultError::AuthenticationFailed {
                message: format!("Failed to create Azure credential: {}", e),
            })?;

        info!("Initialized Azure Key Vault client");
        Ok(Self::with_credential(config, credential))
    }

    /// Create client with a custom credential
    pub fn with_credential(
        config: &KeyVaultConfiguration,
        credential: Arc<dyn TokenCredential>,
    ) -> Self {
        Self {
            credential,
            clients: RwLock::new(HashMap::new()),
            timeout: config.request_timeout(),
        }
    }

    /// Number of vaults a client has been created for
    pub fn vault_count(&self) -> usize {
        self.clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn client_for(&self, vault_url: &str) -> Result<SecretClient, KeyVaultError> {
        if let Some(client) = self
            .clients
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(vault_url)
        {
            return Ok(client.clone());
        }

        let client = SecretClient::new(vault_url, Arc::clone(&self.credential)).map_err(|e| {
            KeyVaultError::Configuration {
                message: format!("Failed to create Key Vault client for {}: {}", vault_url, e),
            }
        })?;

        debug!(vault_url, "Created Key Vault client");
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(vault_url.to_string())
            .or_insert_with(|| client.clone());
        Ok(client)
    }

    /// Map Azure SDK error to KeyVaultError
    fn map_azure_error(&self, locator: &SecretLocator, error: azure_core::Error) -> KeyVaultError {
        let error_string = error.to_string();

        if error_string.contains("404") || error_string.contains("NotFound") {
            KeyVaultError::SecretNotFound {
                locator: locator.clone(),
            }
        } else if error_string.contains("403") || error_string.contains("Forbidden") {
            KeyVaultError::AccessDenied {
                locator: locator.clone(),
                reason: error_string,
            }
        } else if error_string.contains("401") || error_string.contains("Unauthorized") {
            KeyVaultError::AuthenticationFailed {
                message: error_string,
            }
        } else if error_string.contains("429")
            || error_string.contains("TooManyRequests")
            || error_string.contains("throttl")
        {
            KeyVaultError::RateLimitExceeded {
                retry_after_seconds: 60,
            }
        } else if error_string.contains("503")
            || error_string.contains("ServiceUnavailable")
            || error_string.contains("unavailable")
        {
            KeyVaultError::ServiceUnavailable {
                message: error_string,
            }
        } else {
            KeyVaultError::Internal {
                message: error_string,
            }
        }
    }
}

#[async_trait]
impl KeyVaultClient for AzureKeyVaultClient {
    #[instrument(skip(self), fields(locator = %locator))]
    async fn fetch_secret(&self, locator: &SecretLocator) -> Result<SecretValue, KeyVaultError> {
        let components = locator.components()?;
        let client = self.client_for(&components.vault_url)?;

        let mut request = client.get(components.secret_name.as_str());
        if let Some(version) = components.version {
            request = request.version(version);
        }

        let response = tokio::time::timeout(self.timeout, request.into_future())
            .await
            .map_err(|_| KeyVaultError::Timeout {
                timeout_seconds: self.timeout.as_secs(),
            })?;

        match response {
            Ok(secret) => {
                debug!("Retrieved secret from Azure Key Vault");
                Ok(SecretValue::from_string(secret.value))
            }
            Err(e) => {
                error!(error = %e, "Failed to retrieve secret from Key Vault");
                Err(self.map_azure_error(locator, e))
            }
        }
    }
}

impl std::fmt::Debug for AzureKeyVaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureKeyVaultClient")
            .field("vaults", &self.vault_count())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "azure_key_vault_tests.rs"]
mod tests;
