//! Tests for filesystem blob store adapter

use super::*;
use tempfile::TempDir;

fn store_in(temp_dir: &TempDir) -> FilesystemBlobStore {
    FilesystemBlobStore::new(temp_dir.path().join("blobs"))
}

fn container() -> ContainerName {
    ContainerName::new("probe").unwrap()
}

fn blob(name: &str) -> BlobName {
    BlobName::new(name).unwrap()
}

// ============================================================================
// Container Tests
// ============================================================================

#[tokio::test]
async fn test_container_lifecycle() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);

    assert!(!store.container_exists(&container()).await.unwrap());

    store.create_container(&container()).await.unwrap();
    assert!(store.container_exists(&container()).await.unwrap());
    assert!(temp_dir.path().join("blobs").join("probe").is_dir());

    // Creating again is not an error
    store.create_container(&container()).await.unwrap();

    store.delete_container(&container()).await.unwrap();
    assert!(!store.container_exists(&container()).await.unwrap());
}

#[tokio::test]
async fn test_delete_missing_container_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);

    let err = store.delete_container(&container()).await.unwrap_err();

    assert!(matches!(err, BlobStoreError::ContainerNotFound { .. }));
}

#[tokio::test]
async fn test_delete_container_removes_blobs() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);
    store.create_container(&container()).await.unwrap();
    store
        .put_blob(&container(), &blob("a.txt"), Bytes::from("a"))
        .await
        .unwrap();

    store.delete_container(&container()).await.unwrap();
    store.create_container(&container()).await.unwrap();

    assert!(!store.blob_exists(&container(), &blob("a.txt")).await.unwrap());
}

// ============================================================================
// Blob Tests
// ============================================================================

#[tokio::test]
async fn test_put_then_get_returns_content() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);
    store.create_container(&container()).await.unwrap();

    store
        .put_blob(&container(), &blob("hello.txt"), Bytes::from("hello world"))
        .await
        .unwrap();

    assert!(store.blob_exists(&container(), &blob("hello.txt")).await.unwrap());
    let content = store.get_blob(&container(), &blob("hello.txt")).await.unwrap();
    assert_eq!(content, Bytes::from("hello world"));
}

#[tokio::test]
async fn test_put_overwrites_existing_blob() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);
    store.create_container(&container()).await.unwrap();

    store
        .put_blob(&container(), &blob("b"), Bytes::from("first"))
        .await
        .unwrap();
    store
        .put_blob(&container(), &blob("b"), Bytes::from("second"))
        .await
        .unwrap();

    let content = store.get_blob(&container(), &blob("b")).await.unwrap();
    assert_eq!(content, Bytes::from("second"));
}

#[tokio::test]
async fn test_put_leaves_no_temp_file() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);
    store.create_container(&container()).await.unwrap();

    store
        .put_blob(&container(), &blob("report"), Bytes::from("data"))
        .await
        .unwrap();

    let container_dir = temp_dir.path().join("blobs").join("probe");
    let entries: Vec<_> = std::fs::read_dir(&container_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(entries, vec!["report".to_string()]);
}

#[tokio::test]
async fn test_put_keeps_blob_named_like_temp_file() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);
    store.create_container(&container()).await.unwrap();

    store
        .put_blob(&container(), &blob("report.tmp"), Bytes::from("keep-me"))
        .await
        .unwrap();
    store
        .put_blob(&container(), &blob("report"), Bytes::from("other"))
        .await
        .unwrap();

    let kept = store.get_blob(&container(), &blob("report.tmp")).await.unwrap();
    assert_eq!(kept, Bytes::from("keep-me"));
    let written = store.get_blob(&container(), &blob("report")).await.unwrap();
    assert_eq!(written, Bytes::from("other"));
}

#[cfg(unix)]
#[tokio::test]
async fn test_failed_put_removes_temp_file() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);
    store.create_container(&container()).await.unwrap();

    // A directory in the blob's place makes the final rename fail
    let container_dir = temp_dir.path().join("blobs").join("probe");
    std::fs::create_dir(container_dir.join("report")).unwrap();

    let result = store
        .put_blob(&container(), &blob("report"), Bytes::from("data"))
        .await;

    assert!(matches!(result, Err(BlobStoreError::Io { .. })));
    let entries: Vec<_> = std::fs::read_dir(&container_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(entries, vec!["report".to_string()]);
}

#[tokio::test]
async fn test_put_into_missing_container_fails() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);

    let err = store
        .put_blob(&container(), &blob("x"), Bytes::from("x"))
        .await
        .unwrap_err();

    assert!(matches!(err, BlobStoreError::ContainerNotFound { .. }));
}

#[tokio::test]
async fn test_get_missing_blob_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);

    assert!(!store.blob_exists(&container(), &blob("x")).await.unwrap());

    let err = store.get_blob(&container(), &blob("x")).await.unwrap_err();
    match err {
        BlobStoreError::BlobNotFound { container, name } => {
            assert_eq!(container, "probe");
            assert_eq!(name, "x");
        }
        other => panic!("Expected BlobNotFound, got {:?}", other),
    }
}

#[tokio::test]
async fn test_describe_names_root_path() {
    let temp_dir = TempDir::new().unwrap();
    let store = store_in(&temp_dir);

    assert_eq!(
        store.describe(),
        format!("file://{}", temp_dir.path().join("blobs").display())
    );
    assert_eq!(store.root(), temp_dir.path().join("blobs"));
}
