//! Tests for blob store names, errors and connection string dispatch

use super::*;
use tempfile::TempDir;

mod name_tests {
    use super::*;

    #[test]
    fn test_plain_names_are_accepted() {
        assert_eq!(ContainerName::new("probe").unwrap().as_str(), "probe");
        assert_eq!(BlobName::new("report.txt").unwrap().to_string(), "report.txt");
        assert!(BlobName::new("with space").is_ok());
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        for name in ["", "   ", "a/b", "a\\b", "..", "a..b", "tab\there"] {
            let err = BlobName::new(name).unwrap_err();
            assert!(
                matches!(err, BlobStoreError::InvalidName { kind: "blob", .. }),
                "'{}' should be rejected, got {:?}",
                name,
                err
            );
        }
    }

    #[test]
    fn test_invalid_container_error_names_kind() {
        let err = ContainerName::new("").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid container name '': must not be empty"
        );
    }
}

mod error_tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(BlobStoreError::ServiceUnavailable {
            message: "503".to_string()
        }
        .is_transient());
        assert!(BlobStoreError::Io {
            operation: "write blob",
            source: std::io::Error::other("disk"),
        }
        .is_transient());
        assert!(!BlobStoreError::AuthenticationFailed {
            message: "bad key".to_string()
        }
        .is_transient());
        assert!(!BlobStoreError::ContainerNotFound {
            container: "probe".to_string()
        }
        .is_transient());
    }

    #[test]
    fn test_io_error_exposes_source() {
        use std::error::Error as _;

        let err = BlobStoreError::Io {
            operation: "read blob",
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };

        assert_eq!(err.to_string(), "I/O error during read blob");
        assert_eq!(err.source().unwrap().to_string(), "denied");
    }
}

mod connector_tests {
    use super::*;

    #[test]
    fn test_blank_connection_string_is_invalid() {
        let connector = DefaultBlobStoreConnector::new();

        for value in ["", "   "] {
            assert!(matches!(
                connector.connect(value),
                Err(BlobStoreError::InvalidConnectionString { .. })
            ));
        }
    }

    #[test]
    fn test_scheme_without_target_is_invalid() {
        let connector = DefaultBlobStoreConnector::new();

        assert!(matches!(
            connector.connect("file://"),
            Err(BlobStoreError::InvalidConnectionString { .. })
        ));
        assert!(matches!(
            connector.connect("memory://"),
            Err(BlobStoreError::InvalidConnectionString { .. })
        ));
    }

    #[test]
    fn test_file_scheme_opens_filesystem_store() {
        let temp_dir = TempDir::new().unwrap();
        let connector = DefaultBlobStoreConnector::new();

        let store = connector
            .connect(&format!("file://{}", temp_dir.path().display()))
            .unwrap();

        assert!(store.describe().starts_with("file://"));
        assert!(store.describe().contains(&temp_dir.path().display().to_string()));
    }

    #[tokio::test]
    async fn test_memory_scheme_shares_store_per_name() {
        let connector = DefaultBlobStoreConnector::new();
        let container = ContainerName::new("probe").unwrap();

        let first = connector.connect("memory://shared").unwrap();
        first.create_container(&container).await.unwrap();

        let second = connector.connect("memory://shared").unwrap();
        let other = connector.connect("memory://other").unwrap();

        assert!(second.container_exists(&container).await.unwrap());
        assert!(!other.container_exists(&container).await.unwrap());
        assert_eq!(second.describe(), "memory://shared");
    }

    #[cfg(not(feature = "azure"))]
    #[test]
    fn test_azure_connection_string_requires_feature() {
        let connector = DefaultBlobStoreConnector::new();

        let result = connector
            .connect("DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=a2V5;EndpointSuffix=core.windows.net");

        match result {
            Err(BlobStoreError::UnsupportedConnectionString { reason }) => {
                assert!(reason.contains("azure"));
            }
            Err(other) => panic!("Expected UnsupportedConnectionString, got {:?}", other),
            Ok(_) => panic!("Expected connect to fail"),
        }
    }
}
