//! # In-Memory Key Vault Implementation
//!
//! Thread-safe locator-keyed secret table for testing and local runs.
//! Secrets can be replaced at any time to simulate rotation.

use crate::key_vault::{KeyVaultClient, KeyVaultError, SecretValue};
use crate::secret_reference::SecretLocator;
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, PoisonError, RwLock,
    },
};
use tracing::debug;

/// In-memory vault keyed by full secret locator
///
/// Clones share the same table and fetch counter.
#[derive(Clone, Default)]
pub struct InMemoryKeyVaultClient {
    secrets: Arc<RwLock<HashMap<SecretLocator, SecretValue>>>,
    fetches: Arc<AtomicU64>,
}

impl InMemoryKeyVaultClient {
    /// Create empty vault
    pub fn new() -> Self {
        Self::default()
    }

    /// Create vault pre-populated with `(locator, value)` pairs
    pub fn with_secrets<I, L, V>(secrets: I) -> Self
    where
        I: IntoIterator<Item = (L, V)>,
        L: Into<String>,
        V: Into<String>,
    {
        let client = Self::new();
        for (locator, value) in secrets {
            client.insert(
                SecretLocator::new(locator),
                SecretValue::from_string(value.into()),
            );
        }
        client
    }

    /// Add or replace a secret
    pub fn insert(&self, locator: SecretLocator, value: SecretValue) {
        self.secrets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(locator, value);
    }

    /// Remove a secret, returning whether it existed
    pub fn remove(&self, locator: &SecretLocator) -> bool {
        self.secrets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(locator)
            .is_some()
    }

    /// Number of secrets held
    pub fn len(&self) -> usize {
        self.secrets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of fetches served, successful or not
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyVaultClient for InMemoryKeyVaultClient {
    async fn fetch_secret(&self, locator: &SecretLocator) -> Result<SecretValue, KeyVaultError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let secrets = self.secrets.read().unwrap_or_else(PoisonError::into_inner);
        match secrets.get(locator) {
            Some(value) => {
                debug!(locator = %locator, "Served secret from in-memory vault");
                Ok(value.clone())
            }
            None => Err(KeyVaultError::SecretNotFound {
                locator: locator.clone(),
            }),
        }
    }
}

impl std::fmt::Debug for InMemoryKeyVaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKeyVaultClient")
            .field("secrets", &self.len())
            .field("fetches", &self.fetch_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "memory_key_vault_tests.rs"]
mod tests;
