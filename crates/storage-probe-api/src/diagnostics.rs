//! # Storage Diagnostics
//!
//! Download, upload and delete probes run against both configured stores.
//!
//! Each probe reports its own outcome; a failure against one store never
//! stops the probe against the other, and never turns into an HTTP error.
//! Reports render as one block per store:
//!
//! ```text
//! Storage1: Failed
//!           Container not found: probe
//! Storage2: Succeeded
//! ```
//!
//! The error and each of its causes are indented by the width of the label
//! plus two, so they line up under the message.

use crate::config::StorageTestOptions;
use crate::metrics::OperationOutcome;
use bytes::Bytes;
use std::error::Error as StdError;
use std::sync::Arc;
use storage_probe_core::blob_storage::{
    BlobName, BlobStore, BlobStoreConnector, BlobStoreError, ContainerName,
};
use tracing::{debug, instrument, warn};

/// Message for a download whose blob does not exist
pub const MISSING_MESSAGE: &str = "**MISSING**";

/// Message for a successful upload or delete
pub const SUCCEEDED_MESSAGE: &str = "Succeeded";

/// Message for a failed upload or delete
pub const FAILED_MESSAGE: &str = "Failed";

/// Stand-in for the store endpoint when no store could be opened
pub const UNCONNECTED_STORE: &str = "<not connected>";

/// Failure of a single probe
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("blob name must not be empty (parameter '{parameter}')")]
    EmptyArgument { parameter: &'static str },

    #[error(transparent)]
    Store(#[from] BlobStoreError),
}

/// Probe operation, used for logging and metric labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOperation {
    Download,
    Upload,
    Delete,
}

impl ProbeOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Upload => "upload",
            Self::Delete => "delete",
        }
    }
}

/// One of the two configured stores
#[derive(Debug, Clone, Copy)]
pub struct StorageTarget<'a> {
    /// Label used in the response body
    pub label: &'static str,

    /// Label used in metrics
    pub metric_label: &'static str,

    pub connection_string: &'a str,
}

/// Stores in probe order
pub fn storage_targets(options: &StorageTestOptions) -> [StorageTarget<'_>; 2] {
    [
        StorageTarget {
            label: "Storage1",
            metric_label: "storage1",
            connection_string: &options.storage1_connection_string,
        },
        StorageTarget {
            label: "Storage2",
            metric_label: "storage2",
            connection_string: &options.storage2_connection_string,
        },
    ]
}

// ============================================================================
// Reports
// ============================================================================

/// Outcome of one probe against one store
#[derive(Debug)]
pub struct ProbeReport {
    pub label: &'static str,
    pub metric_label: &'static str,
    pub outcome: OperationOutcome,
    pub message: String,
    pub error: Option<ProbeError>,
}

impl ProbeReport {
    fn new(target: &StorageTarget<'_>, outcome: OperationOutcome, message: String) -> Self {
        Self {
            label: target.label,
            metric_label: target.metric_label,
            outcome,
            message,
            error: None,
        }
    }

    fn failed(target: &StorageTarget<'_>, message: String, error: ProbeError) -> Self {
        let transient = matches!(&error, ProbeError::Store(e) if e.is_transient());
        warn!(store = target.label, transient, error = %error, "Storage probe failed");
        Self {
            error: Some(error),
            ..Self::new(target, OperationOutcome::Failure, message)
        }
    }

    /// Render the report with its error chain
    pub fn render(&self) -> String {
        let mut text = format!("{}: {}", self.label, self.message);

        if let Some(error) = &self.error {
            let indent = " ".repeat(self.label.len() + 2);
            let mut cause: Option<&(dyn StdError + 'static)> = Some(error);
            while let Some(current) = cause {
                text.push('\n');
                text.push_str(&indent);
                text.push_str(&current.to_string());
                cause = current.source();
            }
        }

        text
    }
}

/// Join rendered reports, one block per store
pub fn render_reports(reports: &[ProbeReport]) -> String {
    reports
        .iter()
        .map(ProbeReport::render)
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Probes
// ============================================================================

/// Runs probes against the stores named by the current options
#[derive(Clone)]
pub struct StorageDiagnostics {
    connector: Arc<dyn BlobStoreConnector>,
}

impl StorageDiagnostics {
    pub fn new(connector: Arc<dyn BlobStoreConnector>) -> Self {
        Self { connector }
    }

    /// Read `name` from the container in both stores
    #[instrument(skip(self, options))]
    pub async fn download(&self, options: &StorageTestOptions, name: &str) -> Vec<ProbeReport> {
        let mut reports = Vec::with_capacity(2);
        for target in storage_targets(options) {
            reports.push(
                self.download_from(&target, &options.container_name, name)
                    .await,
            );
        }
        reports
    }

    /// Write `value` to `name` in both stores, creating the container if needed
    #[instrument(skip(self, options, value), fields(size_bytes = value.len()))]
    pub async fn upload(
        &self,
        options: &StorageTestOptions,
        name: &str,
        value: &str,
    ) -> Vec<ProbeReport> {
        let mut reports = Vec::with_capacity(2);
        for target in storage_targets(options) {
            let result = self
                .upload_to(&target, &options.container_name, name, value)
                .await;
            reports.push(completion_report(&target, result));
        }
        reports
    }

    /// Delete the container from both stores if it exists
    #[instrument(skip(self, options))]
    pub async fn delete(&self, options: &StorageTestOptions) -> Vec<ProbeReport> {
        let mut reports = Vec::with_capacity(2);
        for target in storage_targets(options) {
            let result = self.delete_from(&target, &options.container_name).await;
            reports.push(completion_report(&target, result));
        }
        reports
    }

    async fn download_from(
        &self,
        target: &StorageTarget<'_>,
        container: &str,
        name: &str,
    ) -> ProbeReport {
        let connection = self.connector.connect(target.connection_string);
        let location = match &connection {
            Ok(store) => store.describe(),
            Err(_) => UNCONNECTED_STORE.to_string(),
        };
        let failure_message = connection_failure_message(&location, container, name);

        // A blank name is reported ahead of any connection problem
        let blob = match required_blob_name(name) {
            Ok(blob) => blob,
            Err(e) => return ProbeReport::failed(target, failure_message, e),
        };

        let store = match connection {
            Ok(store) => store,
            Err(e) => return ProbeReport::failed(target, failure_message, e.into()),
        };

        match read_blob(store.as_ref(), container, &blob).await {
            Ok(Some(content)) => ProbeReport::new(
                target,
                OperationOutcome::Success,
                String::from_utf8_lossy(&content).into_owned(),
            ),
            Ok(None) => {
                debug!(store = target.label, "Blob not present");
                ProbeReport::new(
                    target,
                    OperationOutcome::Missing,
                    MISSING_MESSAGE.to_string(),
                )
            }
            Err(e) => ProbeReport::failed(target, failure_message, e),
        }
    }

    async fn upload_to(
        &self,
        target: &StorageTarget<'_>,
        container: &str,
        name: &str,
        value: &str,
    ) -> Result<(), ProbeError> {
        let name = required_blob_name(name)?;
        let store = self.connector.connect(target.connection_string)?;
        let container = ContainerName::new(container)?;

        if !store.container_exists(&container).await? {
            debug!(store = target.label, container = %container, "Creating container");
            store.create_container(&container).await?;
        }

        store
            .put_blob(&container, &name, Bytes::copy_from_slice(value.as_bytes()))
            .await?;
        Ok(())
    }

    async fn delete_from(
        &self,
        target: &StorageTarget<'_>,
        container: &str,
    ) -> Result<(), ProbeError> {
        let store = self.connector.connect(target.connection_string)?;
        let container = ContainerName::new(container)?;

        if store.container_exists(&container).await? {
            store.delete_container(&container).await?;
        } else {
            debug!(store = target.label, container = %container, "Container already absent");
        }
        Ok(())
    }
}

impl std::fmt::Debug for StorageDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageDiagnostics").finish_non_exhaustive()
    }
}

fn completion_report(target: &StorageTarget<'_>, result: Result<(), ProbeError>) -> ProbeReport {
    match result {
        Ok(()) => ProbeReport::new(
            target,
            OperationOutcome::Success,
            SUCCEEDED_MESSAGE.to_string(),
        ),
        Err(e) => ProbeReport::failed(target, FAILED_MESSAGE.to_string(), e),
    }
}

fn connection_failure_message(store: &str, container: &str, name: &str) -> String {
    format!("Error connecting to \"{}/{}/{}\"", store, container, name)
}

fn required_blob_name(name: &str) -> Result<BlobName, ProbeError> {
    if name.trim().is_empty() {
        return Err(ProbeError::EmptyArgument { parameter: "name" });
    }
    Ok(BlobName::new(name)?)
}

/// Read a blob, `None` when it does not exist
async fn read_blob(
    store: &dyn BlobStore,
    container: &str,
    name: &BlobName,
) -> Result<Option<Bytes>, ProbeError> {
    let container = ContainerName::new(container)?;

    if !store.blob_exists(&container, name).await? {
        return Ok(None);
    }

    match store.get_blob(&container, name).await {
        Ok(content) => Ok(Some(content)),
        Err(BlobStoreError::BlobNotFound { .. }) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
#[path = "diagnostics_tests.rs"]
mod tests;
