//! # Azure Blob Storage Adapter
//!
//! [`BlobStore`] over an Azure Storage account addressed by a standard
//! connection string (`DefaultEndpointsProtocol=...;AccountName=...;AccountKey=...`).
//! `UseDevelopmentStorage=true` targets the local storage emulator.

use crate::blob_storage::{BlobName, BlobStore, BlobStoreError, ContainerName};
use async_trait::async_trait;
use azure_storage::{CloudLocation, ConnectionString};
use azure_storage_blobs::prelude::{BlobServiceClient, ClientBuilder};
use bytes::Bytes;
use tracing::{debug, error, instrument};

const DEVELOPMENT_STORAGE: &str = "UseDevelopmentStorage=true";
const EMULATOR_ACCOUNT: &str = "devstoreaccount1";
const EMULATOR_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

/// Azure Blob Storage account
#[derive(Clone)]
pub struct AzureBlobStore {
    account: String,
    endpoint: String,
    client: BlobServiceClient,
}

impl AzureBlobStore {
    /// Create store from a storage account connection string
    ///
    /// # Errors
    /// `BlobStoreError::InvalidConnectionString` if the string cannot be parsed
    /// or carries no usable credentials.
    pub fn from_connection_string(connection_string: &str) -> Result<Self, BlobStoreError> {
        if connection_string.eq_ignore_ascii_case(DEVELOPMENT_STORAGE) {
            return Ok(Self {
                account: EMULATOR_ACCOUNT.to_string(),
                endpoint: EMULATOR_ENDPOINT.to_string(),
                client: ClientBuilder::emulator().blob_service_client(),
            });
        }

        let parsed = ConnectionString::new(connection_string).map_err(|e| {
            BlobStoreError::InvalidConnectionString {
                reason: e.to_string(),
            }
        })?;

        let account = parsed
            .account_name
            .ok_or_else(|| BlobStoreError::InvalidConnectionString {
                reason: "AccountName is missing".to_string(),
            })?
            .to_string();

        let credentials =
            parsed
                .storage_credentials()
                .map_err(|e| BlobStoreError::InvalidConnectionString {
                    reason: e.to_string(),
                })?;

        let location = cloud_location(&account, parsed.blob_endpoint, parsed.endpoint_suffix);
        let endpoint = match &location {
            CloudLocation::Custom { uri, .. } => uri.clone(),
            _ => format!("https://{}.blob.core.windows.net", account),
        };

        debug!(account = %account, endpoint = %endpoint, "Opening Azure blob store");
        Ok(Self {
            client: ClientBuilder::with_location(location, credentials).blob_service_client(),
            account,
            endpoint,
        })
    }

    /// Storage account name
    pub fn account(&self) -> &str {
        &self.account
    }
}

/// Where requests for `account` are sent
///
/// An explicit `BlobEndpoint` wins over `EndpointSuffix`; with neither the
/// public cloud is used.
fn cloud_location(
    account: &str,
    blob_endpoint: Option<&str>,
    endpoint_suffix: Option<&str>,
) -> CloudLocation {
    match (blob_endpoint, endpoint_suffix) {
        (Some(endpoint), _) => CloudLocation::Custom {
            account: account.to_string(),
            uri: endpoint.trim_end_matches('/').to_string(),
        },
        (None, Some(suffix)) => CloudLocation::Custom {
            account: account.to_string(),
            uri: format!("https://{}.blob.{}", account, suffix),
        },
        (None, None) => CloudLocation::Public {
            account: account.to_string(),
        },
    }
}

/// Map Azure SDK error to BlobStoreError
fn map_azure_error(
    error: azure_core::Error,
    container: &ContainerName,
    name: Option<&BlobName>,
) -> BlobStoreError {
    let error_string = error.to_string();

    if error_string.contains("ContainerNotFound") {
        BlobStoreError::ContainerNotFound {
            container: container.to_string(),
        }
    } else if error_string.contains("404") || error_string.contains("NotFound") {
        match name {
            Some(name) => BlobStoreError::BlobNotFound {
                container: container.to_string(),
                name: name.to_string(),
            },
            None => BlobStoreError::ContainerNotFound {
                container: container.to_string(),
            },
        }
    } else if error_string.contains("401")
        || error_string.contains("403")
        || error_string.contains("AuthenticationFailed")
        || error_string.contains("AuthorizationFailure")
    {
        BlobStoreError::AuthenticationFailed {
            message: error_string,
        }
    } else if error_string.contains("503")
        || error_string.contains("ServerBusy")
        || error_string.contains("timed out")
        || error_string.contains("connect")
    {
        BlobStoreError::ServiceUnavailable {
            message: error_string,
        }
    } else {
        BlobStoreError::Internal {
            message: error_string,
        }
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    #[instrument(skip(self), fields(account = %self.account))]
    async fn container_exists(&self, container: &ContainerName) -> Result<bool, BlobStoreError> {
        self.client
            .container_client(container.as_str())
            .exists()
            .await
            .map_err(|e| map_azure_error(e, container, None))
    }

    #[instrument(skip(self), fields(account = %self.account))]
    async fn create_container(&self, container: &ContainerName) -> Result<(), BlobStoreError> {
        match self.client.container_client(container.as_str()).create().await {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("ContainerAlreadyExists") => Ok(()),
            Err(e) => {
                error!(error = %e, "Failed to create container");
                Err(map_azure_error(e, container, None))
            }
        }
    }

    #[instrument(skip(self), fields(account = %self.account))]
    async fn delete_container(&self, container: &ContainerName) -> Result<(), BlobStoreError> {
        self.client
            .container_client(container.as_str())
            .delete()
            .await
            .map(|_| ())
            .map_err(|e| map_azure_error(e, container, None))
    }

    #[instrument(skip(self), fields(account = %self.account))]
    async fn blob_exists(
        &self,
        container: &ContainerName,
        name: &BlobName,
    ) -> Result<bool, BlobStoreError> {
        match self
            .client
            .container_client(container.as_str())
            .blob_client(name.as_str())
            .exists()
            .await
        {
            Ok(exists) => Ok(exists),
            Err(e) => match map_azure_error(e, container, Some(name)) {
                BlobStoreError::ContainerNotFound { .. } => Ok(false),
                other => Err(other),
            },
        }
    }

    #[instrument(skip(self, content), fields(account = %self.account, size_bytes = content.len()))]
    async fn put_blob(
        &self,
        container: &ContainerName,
        name: &BlobName,
        content: Bytes,
    ) -> Result<(), BlobStoreError> {
        self.client
            .container_client(container.as_str())
            .blob_client(name.as_str())
            .put_block_blob(content)
            .await
            .map(|_| ())
            .map_err(|e| {
                error!(error = %e, "Failed to upload blob");
                map_azure_error(e, container, Some(name))
            })
    }

    #[instrument(skip(self), fields(account = %self.account))]
    async fn get_blob(
        &self,
        container: &ContainerName,
        name: &BlobName,
    ) -> Result<Bytes, BlobStoreError> {
        self.client
            .container_client(container.as_str())
            .blob_client(name.as_str())
            .get_content()
            .await
            .map(Bytes::from)
            .map_err(|e| match map_azure_error(e, container, Some(name)) {
                BlobStoreError::ContainerNotFound { .. } => BlobStoreError::BlobNotFound {
                    container: container.to_string(),
                    name: name.to_string(),
                },
                other => other,
            })
    }

    fn describe(&self) -> String {
        self.endpoint.clone()
    }
}

impl std::fmt::Debug for AzureBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureBlobStore")
            .field("account", &self.account)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "azure_blob_storage_tests.rs"]
mod tests;
