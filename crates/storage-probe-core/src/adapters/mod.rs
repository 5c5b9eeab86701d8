//! # Infrastructure Adapters
//!
//! Infrastructure implementations of the key vault and blob store interfaces.

pub mod disabled_key_vault;
pub mod filesystem_storage;
pub mod memory_key_vault;
pub mod memory_storage;

#[cfg(feature = "azure")]
pub mod azure_blob_storage;
#[cfg(feature = "azure")]
pub mod azure_key_vault;

pub use disabled_key_vault::DisabledKeyVaultClient;
pub use filesystem_storage::FilesystemBlobStore;
pub use memory_key_vault::InMemoryKeyVaultClient;
pub use memory_storage::InMemoryBlobStore;

#[cfg(feature = "azure")]
pub use azure_blob_storage::AzureBlobStore;
#[cfg(feature = "azure")]
pub use azure_key_vault::AzureKeyVaultClient;
