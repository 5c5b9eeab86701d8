//! Tests for [`ServiceConfig`] and [`StorageTestOptions`].

use super::*;
use storage_probe_core::fields::SecretFields;

mod service_config_tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ServiceConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_document_deserializes_to_defaults() {
        let config: ServiceConfig = serde_json::from_str("{}").unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.reload.poll_interval_seconds, 30);
        assert_eq!(config.storage_test.container_name, "storage-probe");
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config: ServiceConfig =
            serde_json::from_str(r#"{"server": {"port": 9090}, "reload": {"poll_interval_seconds": 0}}"#)
                .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert!(config.reload.poll_interval().is_none());
    }

    #[test]
    fn test_zero_request_timeout_is_rejected() {
        let mut config = ServiceConfig::default();
        config.server.timeout_seconds = 0;

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("server.timeout_seconds"));
    }

    #[test]
    fn test_unknown_log_level_is_rejected() {
        let mut config = ServiceConfig::default();
        config.logging.level = "chatty".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_log_level_is_case_insensitive() {
        let mut config = ServiceConfig::default();
        config.logging.level = "DEBUG".to_string();

        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_container_name_is_rejected() {
        let mut config = ServiceConfig::default();
        config.storage_test.container_name = "a/b".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("storage_test.container_name"));
    }

    #[test]
    fn test_zero_vault_timeout_is_rejected() {
        let mut config = ServiceConfig::default();
        config.key_vault.request_timeout_seconds = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bind_address_joins_host_and_port() {
        let server = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            ..ServerConfig::default()
        };

        assert_eq!(server.bind_address(), "127.0.0.1:3000");
    }
}

mod storage_test_options_tests {
    use super::*;

    fn options() -> StorageTestOptions {
        StorageTestOptions {
            storage1_connection_string: "AccountName=a;AccountKey=super-secret".to_string(),
            storage2_connection_string: String::new(),
            container_name: "probe".to_string(),
        }
    }

    #[test]
    fn test_both_connection_strings_are_settable() {
        assert_eq!(
            StorageTestOptions::settable_fields(),
            &["storage1_connection_string", "storage2_connection_string"]
        );
        assert!(!StorageTestOptions::is_settable("container_name"));
    }

    #[test]
    fn test_secret_accessors_validate() {
        let accessors = StorageTestOptions::secret_accessors();

        assert_eq!(accessors.len(), 2);
        assert!(accessors.iter().all(|a| a.validate().is_ok()));
    }

    #[test]
    fn test_debug_redacts_connection_strings() {
        let debug_str = format!("{:?}", options());

        assert!(
            !debug_str.contains("super-secret"),
            "debug output must not leak secret: {debug_str}"
        );
        assert!(debug_str.contains(REDACTED));
        assert!(debug_str.contains("probe"));
    }

    #[test]
    fn test_redacted_view_keeps_only_presence() {
        let view = options().redacted();

        assert_eq!(view.storage1_connection_string, REDACTED);
        assert_eq!(view.storage2_connection_string, "");
        assert_eq!(view.container_name, "probe");
    }

    #[test]
    fn test_is_complete_requires_both_stores() {
        let mut opts = options();
        assert!(!opts.is_complete());

        opts.storage2_connection_string = "memory://two".to_string();
        assert!(opts.is_complete());
    }
}
