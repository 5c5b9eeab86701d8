//! # Blob Store Interface
//!
//! Container/blob key-value storage exercised by the diagnostics endpoints.
//!
//! Stores are addressed by connection string. The scheme of the connection
//! string selects the implementation:
//!
//! | Connection string | Store |
//! |---|---|
//! | `file://<path>` | [`FilesystemBlobStore`](crate::adapters::FilesystemBlobStore) rooted at `<path>` |
//! | `memory://<name>` | [`InMemoryBlobStore`](crate::adapters::InMemoryBlobStore) shared per `<name>` |
//! | anything else | Azure Blob Storage (feature `azure`) |

use crate::adapters::{FilesystemBlobStore, InMemoryBlobStore};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tracing::debug;

const FILE_SCHEME: &str = "file://";
const MEMORY_SCHEME: &str = "memory://";

// ============================================================================
// Names
// ============================================================================

/// Validated container name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerName(String);

impl ContainerName {
    /// Create container name
    ///
    /// # Errors
    /// `BlobStoreError::InvalidName` if the name is blank, contains a path
    /// separator or is a relative path component.
    pub fn new(name: impl Into<String>) -> Result<Self, BlobStoreError> {
        let name = name.into();
        validate_name("container", &name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Validated blob name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobName(String);

impl BlobName {
    /// Create blob name
    ///
    /// # Errors
    /// `BlobStoreError::InvalidName`, same rules as [`ContainerName::new`].
    pub fn new(name: impl Into<String>) -> Result<Self, BlobStoreError> {
        let name = name.into();
        validate_name("blob", &name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_name(kind: &'static str, name: &str) -> Result<(), BlobStoreError> {
    let reason = if name.trim().is_empty() {
        Some("must not be empty")
    } else if name.contains('/') || name.contains('\\') {
        Some("must not contain path separators")
    } else if name == "." || name == ".." || name.contains("..") {
        Some("must not contain '..'")
    } else if name.chars().any(char::is_control) {
        Some("must not contain control characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(BlobStoreError::InvalidName {
            kind,
            name: name.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

// ============================================================================
// Core Traits
// ============================================================================

/// Interface for container/blob storage
///
/// Writes overwrite existing blobs. Reads of a missing blob fail with
/// `BlobStoreError::BlobNotFound`; callers that need to distinguish a missing
/// blob check [`BlobStore::blob_exists`] first.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Check whether the container exists
    async fn container_exists(&self, container: &ContainerName) -> Result<bool, BlobStoreError>;

    /// Create the container
    ///
    /// Creating a container that already exists is not an error.
    async fn create_container(&self, container: &ContainerName) -> Result<(), BlobStoreError>;

    /// Delete the container and every blob in it
    ///
    /// # Errors
    /// `BlobStoreError::ContainerNotFound` if the container does not exist.
    async fn delete_container(&self, container: &ContainerName) -> Result<(), BlobStoreError>;

    /// Check whether a blob exists
    ///
    /// A missing container means the blob does not exist.
    async fn blob_exists(
        &self,
        container: &ContainerName,
        name: &BlobName,
    ) -> Result<bool, BlobStoreError>;

    /// Write a blob, replacing any existing content
    ///
    /// # Errors
    /// `BlobStoreError::ContainerNotFound` if the container does not exist.
    async fn put_blob(
        &self,
        container: &ContainerName,
        name: &BlobName,
        content: Bytes,
    ) -> Result<(), BlobStoreError>;

    /// Read a blob's content
    ///
    /// # Errors
    /// `BlobStoreError::BlobNotFound` if the blob or its container is missing.
    async fn get_blob(
        &self,
        container: &ContainerName,
        name: &BlobName,
    ) -> Result<Bytes, BlobStoreError>;

    /// Human-readable endpoint of the store, free of credentials
    fn describe(&self) -> String;
}

/// Opens blob stores from connection strings
pub trait BlobStoreConnector: Send + Sync {
    /// Open the store addressed by `connection_string`
    ///
    /// # Errors
    /// - `BlobStoreError::InvalidConnectionString` - blank or malformed
    /// - `BlobStoreError::UnsupportedConnectionString` - store kind not compiled in
    fn connect(&self, connection_string: &str) -> Result<Arc<dyn BlobStore>, BlobStoreError>;
}

// ============================================================================
// Default Connector
// ============================================================================

/// Connector that selects the store implementation by connection string scheme
///
/// In-memory stores are kept for the lifetime of the connector, so two
/// connections to `memory://name` observe the same containers.
#[derive(Default)]
pub struct DefaultBlobStoreConnector {
    memory_stores: Mutex<HashMap<String, Arc<InMemoryBlobStore>>>,
}

impl DefaultBlobStoreConnector {
    /// Create connector with no in-memory stores
    pub fn new() -> Self {
        Self::default()
    }

    fn memory_store(&self, name: &str) -> Arc<InMemoryBlobStore> {
        let mut stores = self
            .memory_stores
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            stores
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(InMemoryBlobStore::new(name))),
        )
    }
}

impl BlobStoreConnector for DefaultBlobStoreConnector {
    fn connect(&self, connection_string: &str) -> Result<Arc<dyn BlobStore>, BlobStoreError> {
        let connection_string = connection_string.trim();
        if connection_string.is_empty() {
            return Err(BlobStoreError::InvalidConnectionString {
                reason: "connection string is empty".to_string(),
            });
        }

        if let Some(path) = connection_string.strip_prefix(FILE_SCHEME) {
            if path.is_empty() {
                return Err(BlobStoreError::InvalidConnectionString {
                    reason: "file store requires a root path".to_string(),
                });
            }
            debug!(root = path, "Opening filesystem blob store");
            return Ok(Arc::new(FilesystemBlobStore::new(PathBuf::from(path))));
        }

        if let Some(name) = connection_string.strip_prefix(MEMORY_SCHEME) {
            if name.is_empty() {
                return Err(BlobStoreError::InvalidConnectionString {
                    reason: "memory store requires a name".to_string(),
                });
            }
            debug!(name, "Opening in-memory blob store");
            return Ok(self.memory_store(name));
        }

        connect_azure(connection_string)
    }
}

impl fmt::Debug for DefaultBlobStoreConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stores = self
            .memory_stores
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("DefaultBlobStoreConnector")
            .field("memory_stores", &stores.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(feature = "azure")]
fn connect_azure(connection_string: &str) -> Result<Arc<dyn BlobStore>, BlobStoreError> {
    let store = crate::adapters::AzureBlobStore::from_connection_string(connection_string)?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "azure"))]
fn connect_azure(_connection_string: &str) -> Result<Arc<dyn BlobStore>, BlobStoreError> {
    Err(BlobStoreError::UnsupportedConnectionString {
        reason: "Azure Blob Storage support is not compiled in (enable the 'azure' feature)"
            .to_string(),
    })
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during blob store operations
#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("Container not found: {container}")]
    ContainerNotFound { container: String },

    #[error("Blob not found: {container}/{name}")]
    BlobNotFound { container: String, name: String },

    #[error("Invalid {kind} name '{name}': {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: String,
    },

    #[error("Invalid connection string: {reason}")]
    InvalidConnectionString { reason: String },

    #[error("Unsupported connection string: {reason}")]
    UnsupportedConnectionString { reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Storage service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("I/O error during {operation}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal storage error: {message}")]
    Internal { message: String },
}

impl BlobStoreError {
    /// Check if error is transient and worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ServiceUnavailable { .. } | Self::Io { .. } | Self::Internal { .. }
        )
    }
}

#[cfg(test)]
#[path = "blob_storage_tests.rs"]
mod tests;
