//! Tests for change-driven options reload

use super::*;
use std::io::Write;
use storage_probe_api::bind_storage_options;
use storage_probe_core::adapters::InMemoryKeyVaultClient;
use storage_probe_core::SecretResolver;
use tempfile::NamedTempFile;

const REFERENCE: &str = "@Microsoft.KeyVault(VaultName=kv;SecretName=storage1;SecretVersion=2)";
const LOCATOR: &str = "https://kv.vault.azure.net/secrets/storage1/2";

fn write_storage(file: &mut NamedTempFile, storage1: &str, storage2: &str) {
    let yaml = format!(
        "storage_test:\n  storage1_connection_string: \"{}\"\n  storage2_connection_string: \"{}\"\n  container_name: probe\n",
        storage1, storage2
    );
    let handle = file.as_file_mut();
    handle.set_len(0).unwrap();
    std::io::Seek::rewind(handle).unwrap();
    handle.write_all(yaml.as_bytes()).unwrap();
    handle.flush().unwrap();
}

fn raw(storage1: &str, storage2: &str) -> StorageTestOptions {
    StorageTestOptions {
        storage1_connection_string: storage1.to_string(),
        storage2_connection_string: storage2.to_string(),
        container_name: "probe".to_string(),
    }
}

async fn coordinator(file: &NamedTempFile, initial: StorageTestOptions) -> ReloadCoordinator {
    let vault = Arc::new(InMemoryKeyVaultClient::with_secrets([(
        LOCATOR,
        "memory://from-vault",
    )]));
    let options = bind_storage_options(initial.clone(), Arc::new(SecretResolver::new(vault)))
        .await
        .unwrap();

    ReloadCoordinator::new(
        ConfigSources::from_file(file.path()).without_environment(),
        options,
        initial,
    )
}

fn temp_yaml() -> NamedTempFile {
    tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap()
}

#[tokio::test]
async fn test_unchanged_sources_do_not_reload() {
    let mut file = temp_yaml();
    write_storage(&mut file, "memory://one", "memory://two");
    let coordinator = coordinator(&file, raw("memory://one", "memory://two")).await;

    let outcome = coordinator.reload_if_changed().await.unwrap();

    assert_eq!(outcome, ReloadOutcome::Unchanged);
    assert_eq!(coordinator.options.reload_count(), 0);
}

#[tokio::test]
async fn test_changed_sources_publish_resolved_options() {
    let mut file = temp_yaml();
    write_storage(&mut file, "memory://one", "memory://two");
    let coordinator = coordinator(&file, raw("memory://one", "memory://two")).await;

    write_storage(&mut file, REFERENCE, "memory://two");
    let outcome = coordinator.reload_if_changed().await.unwrap();

    assert_eq!(outcome, ReloadOutcome::Reloaded);
    assert_eq!(coordinator.options.reload_count(), 1);
    assert_eq!(
        coordinator.options.current().storage1_connection_string,
        "memory://from-vault"
    );

    // The raw reference is the snapshot, so a second check is a no-op
    assert_eq!(
        coordinator.reload_if_changed().await.unwrap(),
        ReloadOutcome::Unchanged
    );
}

#[tokio::test]
async fn test_failed_bind_keeps_published_options_and_retries() {
    let mut file = temp_yaml();
    write_storage(&mut file, "memory://one", "memory://two");
    let coordinator = coordinator(&file, raw("memory://one", "memory://two")).await;

    let unknown = "@Microsoft.KeyVault(VaultName=kv;SecretName=unknown;SecretVersion=1)";
    write_storage(&mut file, unknown, "memory://two");

    let first = coordinator.reload_if_changed().await;
    assert!(matches!(first, Err(ReloadError::Bind(_))));
    assert_eq!(
        coordinator.options.current().storage1_connection_string,
        "memory://one"
    );

    // Snapshot was not advanced, so the same change is attempted again
    let second = coordinator.reload_if_changed().await;
    assert!(matches!(second, Err(ReloadError::Bind(_))));
}

#[tokio::test]
async fn test_unreadable_sources_are_load_errors() {
    let mut file = temp_yaml();
    write_storage(&mut file, "memory://one", "memory://two");
    let coordinator = coordinator(&file, raw("memory://one", "memory://two")).await;

    let handle = file.as_file_mut();
    handle.set_len(0).unwrap();
    std::io::Seek::rewind(handle).unwrap();
    handle.write_all(b"server:\n  port: [1, 2]\n").unwrap();
    handle.flush().unwrap();

    let result = coordinator.reload_if_changed().await;

    assert!(matches!(result, Err(ReloadError::Load(_))));
    assert_eq!(coordinator.options.reload_count(), 0);
}

#[tokio::test]
async fn test_polling_picks_up_changes() {
    let mut file = temp_yaml();
    write_storage(&mut file, "memory://one", "memory://two");
    let coordinator = Arc::new(coordinator(&file, raw("memory://one", "memory://two")).await);
    let mut changes = coordinator.options.subscribe();

    let task = Arc::clone(&coordinator).spawn_polling(Duration::from_millis(20));
    write_storage(&mut file, "memory://three", "memory://two");

    tokio::time::timeout(Duration::from_secs(5), changes.changed())
        .await
        .unwrap()
        .unwrap();
    task.abort();

    assert_eq!(
        coordinator.options.current().storage1_connection_string,
        "memory://three"
    );
}
