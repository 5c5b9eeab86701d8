//! # Secret Resolver
//!
//! Turns a configuration candidate into the value consumers should see.
//!
//! Literal candidates come back unchanged. Candidates holding a secret
//! reference are fetched through the injected [`KeyVaultClient`]; a failed
//! fetch is returned to the caller as-is, there is no retry and no fallback.

use crate::key_vault::{KeyVaultClient, KeyVaultError};
use crate::secret_reference::SecretReference;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves configuration candidates through a vault client
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use storage_probe_core::adapters::InMemoryKeyVaultClient;
/// use storage_probe_core::SecretResolver;
///
/// # tokio_test::block_on(async {
/// let vault = InMemoryKeyVaultClient::with_secrets([(
///     "https://kv.vault.azure.net/secrets/db/1",
///     "Server=db;Password=hunter2",
/// )]);
/// let resolver = SecretResolver::new(Arc::new(vault));
///
/// let resolved = resolver
///     .resolve("@Microsoft.KeyVault(VaultName=kv;SecretName=db;SecretVersion=1)")
///     .await
///     .unwrap();
/// assert_eq!(resolved, "Server=db;Password=hunter2");
///
/// // Literals come back unchanged
/// assert_eq!(resolver.resolve("memory://local").await.unwrap(), "memory://local");
/// # });
/// ```
#[derive(Clone)]
pub struct SecretResolver {
    client: Arc<dyn KeyVaultClient>,
}

impl SecretResolver {
    /// Create resolver over the given vault client
    pub fn new(client: Arc<dyn KeyVaultClient>) -> Self {
        Self { client }
    }

    /// Resolve a candidate value
    ///
    /// Resolving an already-resolved literal returns it unchanged, so
    /// running resolution repeatedly over the same value is safe.
    ///
    /// # Errors
    /// Any [`KeyVaultError`] raised while fetching a referenced secret.
    pub async fn resolve(&self, candidate: &str) -> Result<String, KeyVaultError> {
        let Some(reference) = SecretReference::parse(candidate) else {
            debug!("No vault reference found; using configured value as-is");
            return Ok(candidate.to_string());
        };

        match &reference {
            SecretReference::Uri { locator } => {
                warn!(
                    locator = %locator,
                    "Secret not resolved by the host; fetching it explicitly by URI"
                );
            }
            SecretReference::Parts {
                vault_name,
                secret_name,
                secret_version,
                ..
            } => {
                warn!(
                    vault = %vault_name,
                    secret = %secret_name,
                    version = %secret_version,
                    "Secret not resolved by the host; fetching it explicitly from vault"
                );
            }
        }

        let secret = self.client.fetch_secret(reference.locator()).await?;
        Ok(secret.expose_secret().to_string())
    }
}

impl std::fmt::Debug for SecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretResolver").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
