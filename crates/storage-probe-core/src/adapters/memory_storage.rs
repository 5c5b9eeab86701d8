//! # In-Memory Blob Store
//!
//! Process-local [`BlobStore`] for tests and local runs. Contents are lost
//! when the last handle is dropped.

use crate::blob_storage::{BlobName, BlobStore, BlobStoreError, ContainerName};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use tokio::sync::RwLock;

type Container = HashMap<BlobName, Bytes>;

/// In-memory blob store identified by name
#[derive(Debug)]
pub struct InMemoryBlobStore {
    name: String,
    containers: RwLock<HashMap<ContainerName, Container>>,
}

impl InMemoryBlobStore {
    /// Create empty store
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            containers: RwLock::new(HashMap::new()),
        }
    }

    /// Name the store was created with
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of blobs in a container, `None` if the container is missing
    pub async fn blob_count(&self, container: &ContainerName) -> Option<usize> {
        self.containers.read().await.get(container).map(HashMap::len)
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn container_exists(&self, container: &ContainerName) -> Result<bool, BlobStoreError> {
        Ok(self.containers.read().await.contains_key(container))
    }

    async fn create_container(&self, container: &ContainerName) -> Result<(), BlobStoreError> {
        self.containers
            .write()
            .await
            .entry(container.clone())
            .or_default();
        Ok(())
    }

    async fn delete_container(&self, container: &ContainerName) -> Result<(), BlobStoreError> {
        match self.containers.write().await.remove(container) {
            Some(_) => Ok(()),
            None => Err(BlobStoreError::ContainerNotFound {
                container: container.to_string(),
            }),
        }
    }

    async fn blob_exists(
        &self,
        container: &ContainerName,
        name: &BlobName,
    ) -> Result<bool, BlobStoreError> {
        let containers = self.containers.read().await;
        Ok(containers
            .get(container)
            .is_some_and(|blobs| blobs.contains_key(name)))
    }

    async fn put_blob(
        &self,
        container: &ContainerName,
        name: &BlobName,
        content: Bytes,
    ) -> Result<(), BlobStoreError> {
        let mut containers = self.containers.write().await;
        let blobs = containers
            .get_mut(container)
            .ok_or_else(|| BlobStoreError::ContainerNotFound {
                container: container.to_string(),
            })?;
        blobs.insert(name.clone(), content);
        Ok(())
    }

    async fn get_blob(
        &self,
        container: &ContainerName,
        name: &BlobName,
    ) -> Result<Bytes, BlobStoreError> {
        let containers = self.containers.read().await;
        containers
            .get(container)
            .and_then(|blobs| blobs.get(name))
            .cloned()
            .ok_or_else(|| BlobStoreError::BlobNotFound {
                container: container.to_string(),
                name: name.to_string(),
            })
    }

    fn describe(&self) -> String {
        format!("memory://{}", self.name)
    }
}

#[cfg(test)]
#[path = "memory_storage_tests.rs"]
mod tests;
