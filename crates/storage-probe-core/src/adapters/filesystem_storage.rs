//! # Filesystem Blob Store Adapter
//!
//! Local filesystem implementation of [`BlobStore`] for development and
//! testing. Containers are directories under the root path and blobs are
//! files inside them.

use crate::blob_storage::{BlobName, BlobStore, BlobStoreError, ContainerName};
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

const TEMP_EXTENSION: &str = "tmp";

/// Filesystem-based blob store
///
/// The root directory is created on first use.
///
/// # Examples
///
/// ```no_run
/// use storage_probe_core::adapters::FilesystemBlobStore;
/// use storage_probe_core::blob_storage::{BlobName, BlobStore, ContainerName};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = FilesystemBlobStore::new("./data/blobs".into());
/// let container = ContainerName::new("probe")?;
/// store.create_container(&container).await?;
/// store
///     .put_blob(&container, &BlobName::new("hello.txt")?, "hi".into())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    root: PathBuf,
}

impl FilesystemBlobStore {
    /// Create store rooted at `root`
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn container_path(&self, container: &ContainerName) -> PathBuf {
        self.root.join(container.as_str())
    }

    fn blob_path(&self, container: &ContainerName, name: &BlobName) -> PathBuf {
        self.container_path(container).join(name.as_str())
    }
}

async fn is_dir(path: &Path, operation: &'static str) -> Result<bool, BlobStoreError> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.is_dir()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(BlobStoreError::Io { operation, source }),
    }
}

async fn is_file(path: &Path, operation: &'static str) -> Result<bool, BlobStoreError> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.is_file()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(source) => Err(BlobStoreError::Io { operation, source }),
    }
}

async fn write_file(path: &Path, content: &[u8]) -> Result<(), BlobStoreError> {
    let mut file = fs::File::create(path)
        .await
        .map_err(|source| BlobStoreError::Io {
            operation: "create temp file",
            source,
        })?;

    file.write_all(content)
        .await
        .map_err(|source| BlobStoreError::Io {
            operation: "write blob",
            source,
        })?;

    file.flush().await.map_err(|source| BlobStoreError::Io {
        operation: "flush blob",
        source,
    })
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn container_exists(&self, container: &ContainerName) -> Result<bool, BlobStoreError> {
        is_dir(&self.container_path(container), "check container").await
    }

    async fn create_container(&self, container: &ContainerName) -> Result<(), BlobStoreError> {
        let path = self.container_path(container);
        fs::create_dir_all(&path)
            .await
            .map_err(|source| BlobStoreError::Io {
                operation: "create container",
                source,
            })?;

        debug!(path = %path.display(), "Created container directory");
        Ok(())
    }

    async fn delete_container(&self, container: &ContainerName) -> Result<(), BlobStoreError> {
        let path = self.container_path(container);
        match fs::remove_dir_all(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted container directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobStoreError::ContainerNotFound {
                container: container.to_string(),
            }),
            Err(source) => Err(BlobStoreError::Io {
                operation: "delete container",
                source,
            }),
        }
    }

    async fn blob_exists(
        &self,
        container: &ContainerName,
        name: &BlobName,
    ) -> Result<bool, BlobStoreError> {
        is_file(&self.blob_path(container, name), "check blob").await
    }

    async fn put_blob(
        &self,
        container: &ContainerName,
        name: &BlobName,
        content: Bytes,
    ) -> Result<(), BlobStoreError> {
        if !self.container_exists(container).await? {
            return Err(BlobStoreError::ContainerNotFound {
                container: container.to_string(),
            });
        }

        let blob_path = self.blob_path(container, name);

        // Hidden, uniquely named staging file so no other blob is touched
        let temp_path = blob_path.with_file_name(format!(
            ".{}.{}.{}",
            name,
            Uuid::new_v4().simple(),
            TEMP_EXTENSION
        ));

        let staged = match write_file(&temp_path, &content).await {
            Ok(()) => fs::rename(&temp_path, &blob_path)
                .await
                .map_err(|source| BlobStoreError::Io {
                    operation: "rename temp file",
                    source,
                }),
            Err(e) => Err(e),
        };

        if let Err(e) = staged {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!(
                        path = %temp_path.display(),
                        error = %cleanup,
                        "Failed to remove temp file"
                    );
                }
            }
            return Err(e);
        }

        debug!(
            path = %blob_path.display(),
            size_bytes = content.len(),
            "Wrote blob"
        );
        Ok(())
    }

    async fn get_blob(
        &self,
        container: &ContainerName,
        name: &BlobName,
    ) -> Result<Bytes, BlobStoreError> {
        match fs::read(self.blob_path(container, name)).await {
            Ok(content) => Ok(Bytes::from(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BlobStoreError::BlobNotFound {
                container: container.to_string(),
                name: name.to_string(),
            }),
            Err(source) => Err(BlobStoreError::Io {
                operation: "read blob",
                source,
            }),
        }
    }

    fn describe(&self) -> String {
        format!("file://{}", self.root.display())
    }
}

#[cfg(test)]
#[path = "filesystem_storage_tests.rs"]
mod tests;
