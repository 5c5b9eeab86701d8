//! Common test utilities for storage-probe integration tests
//!
//! This module provides:
//! - A vault client that can be switched into a failing state
//! - Builders for raw storage options and application state
//! - A request helper driving the router in-process

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use storage_probe_api::{
    bind_storage_options, create_router, AppState, ServiceConfig, StorageTestOptions,
};
use storage_probe_core::adapters::InMemoryKeyVaultClient;
use storage_probe_core::blob_storage::DefaultBlobStoreConnector;
use storage_probe_core::{KeyVaultClient, KeyVaultError, SecretLocator, SecretResolver, SecretValue};
use tower::ServiceExt;

#[allow(dead_code)]
pub const STORAGE1_REFERENCE: &str =
    "@Microsoft.KeyVault(VaultName=probe-kv;SecretName=storage1;SecretVersion=v1)";
#[allow(dead_code)]
pub const STORAGE1_LOCATOR: &str = "https://probe-kv.vault.azure.net/secrets/storage1/v1";

#[allow(dead_code)]
pub const STORAGE2_REFERENCE: &str =
    "@Microsoft.KeyVault(SecretUri=https://probe-kv.vault.azure.net/secrets/storage2/v3)";
#[allow(dead_code)]
pub const STORAGE2_LOCATOR: &str = "https://probe-kv.vault.azure.net/secrets/storage2/v3";

// ============================================================================
// Switchable Vault
// ============================================================================

/// Vault backed by an in-memory table that can be taken offline
#[derive(Debug, Clone, Default)]
#[allow(dead_code)]
pub struct SwitchableVault {
    pub secrets: InMemoryKeyVaultClient,
    offline: Arc<AtomicBool>,
}

impl SwitchableVault {
    #[allow(dead_code)]
    pub fn with_storage_secrets(storage1: &str, storage2: &str) -> Self {
        Self {
            secrets: InMemoryKeyVaultClient::with_secrets([
                (STORAGE1_LOCATOR, storage1),
                (STORAGE2_LOCATOR, storage2),
            ]),
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    #[allow(dead_code)]
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl KeyVaultClient for SwitchableVault {
    async fn fetch_secret(&self, locator: &SecretLocator) -> Result<SecretValue, KeyVaultError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(KeyVaultError::ServiceUnavailable {
                message: "vault offline".to_string(),
            });
        }
        self.secrets.fetch_secret(locator).await
    }
}

// ============================================================================
// Builders
// ============================================================================

#[allow(dead_code)]
pub fn raw_options(storage1: &str, storage2: &str) -> StorageTestOptions {
    StorageTestOptions {
        storage1_connection_string: storage1.to_string(),
        storage2_connection_string: storage2.to_string(),
        container_name: "integration".to_string(),
    }
}

#[allow(dead_code)]
pub async fn create_test_app_state(
    raw: StorageTestOptions,
    vault: Arc<dyn KeyVaultClient>,
) -> AppState {
    let options = bind_storage_options(raw, Arc::new(SecretResolver::new(vault)))
        .await
        .unwrap();

    AppState::new(
        ServiceConfig::default(),
        options,
        Arc::new(DefaultBlobStoreConnector::new()),
    )
    .unwrap()
}

/// Send one request through a fresh router and return status and body text
#[allow(dead_code)]
pub async fn send(state: &AppState, method: Method, uri: &str) -> (StatusCode, String) {
    let response = create_router(state.clone())
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

/// Overwrite `path` with `contents`
#[allow(dead_code)]
pub fn write_config(path: &Path, contents: &str) {
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
}
