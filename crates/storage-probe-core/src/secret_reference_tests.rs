//! Tests for secret reference recognition.

use super::*;

mod uri_form_tests {
    use super::*;

    #[test]
    fn test_uri_form_captures_url_verbatim() {
        let locator = match_secret_reference(
            "@Microsoft.KeyVault(SecretUri=https://kv.vault.azure.net/secrets/x/1)",
        )
        .expect("URI form should match");

        assert_eq!(locator.as_str(), "https://kv.vault.azure.net/secrets/x/1");
    }

    #[test]
    fn test_uri_form_does_not_validate_url() {
        let locator = match_secret_reference("@Microsoft.KeyVault(SecretUri=not a url)")
            .expect("any captured text is accepted");

        assert_eq!(locator.as_str(), "not a url");
    }

    #[test]
    fn test_uri_form_tolerates_surrounding_text() {
        let locator = match_secret_reference(
            "\"@Microsoft.KeyVault(SecretUri=https://kv.vault.azure.net/secrets/x)\"  ",
        )
        .expect("unanchored pattern should match");

        assert_eq!(locator.as_str(), "https://kv.vault.azure.net/secrets/x");
    }

    #[test]
    fn test_uri_form_capture_extends_to_last_parenthesis() {
        let locator = match_secret_reference("@Microsoft.KeyVault(SecretUri=abc) trailing)")
            .expect("greedy pattern should match");

        assert_eq!(locator.as_str(), "abc) trailing");
    }

    #[test]
    fn test_uri_form_is_checked_before_parts_form() {
        let reference = SecretReference::parse(
            "@Microsoft.KeyVault(VaultName=kv;SecretName=a;SecretVersion=1) \
             @Microsoft.KeyVault(SecretUri=https://other.vault.azure.net/secrets/b/2)",
        )
        .expect("should match");

        assert!(matches!(reference, SecretReference::Uri { .. }));
        assert_eq!(
            reference.locator().as_str(),
            "https://other.vault.azure.net/secrets/b/2"
        );
    }
}

mod parts_form_tests {
    use super::*;

    #[test]
    fn test_parts_form_synthesizes_locator() {
        let locator = match_secret_reference(
            "@Microsoft.KeyVault(VaultName=kv;SecretName=x;SecretVersion=1)",
        )
        .expect("parts form should match");

        assert_eq!(locator.as_str(), "https://kv.vault.azure.net/secrets/x/1");
    }

    #[test]
    fn test_parts_form_keeps_individual_parts() {
        let reference = SecretReference::parse(
            "@Microsoft.KeyVault(VaultName=prod-kv;SecretName=storage-conn;SecretVersion=abc123)",
        )
        .expect("parts form should match");

        match reference {
            SecretReference::Parts {
                vault_name,
                secret_name,
                secret_version,
                locator,
            } => {
                assert_eq!(vault_name, "prod-kv");
                assert_eq!(secret_name, "storage-conn");
                assert_eq!(secret_version, "abc123");
                assert_eq!(
                    locator.as_str(),
                    "https://prod-kv.vault.azure.net/secrets/storage-conn/abc123"
                );
            }
            other => panic!("Expected parts form, got {:?}", other),
        }
    }

    #[test]
    fn test_parts_form_captures_are_greedy() {
        let reference = SecretReference::parse(
            "@Microsoft.KeyVault(VaultName=kv;SecretName=x;SecretName=y;SecretVersion=1)",
        )
        .expect("parts form should match");

        match reference {
            SecretReference::Parts {
                vault_name,
                secret_name,
                ..
            } => {
                assert_eq!(vault_name, "kv;SecretName=x");
                assert_eq!(secret_name, "y");
            }
            other => panic!("Expected parts form, got {:?}", other),
        }
    }

    #[test]
    fn test_parts_form_without_version_is_literal() {
        assert!(
            match_secret_reference("@Microsoft.KeyVault(VaultName=kv;SecretName=x)").is_none()
        );
    }

    #[test]
    fn test_parts_form_with_empty_part_is_literal() {
        assert!(match_secret_reference(
            "@Microsoft.KeyVault(VaultName=;SecretName=x;SecretVersion=1)"
        )
        .is_none());
    }
}

mod literal_tests {
    use super::*;

    #[test]
    fn test_literals_do_not_match() {
        let literals = [
            "",
            "plaintext-secret",
            "DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=a2V5;EndpointSuffix=core.windows.net",
            "file:///tmp/probe",
            "@Microsoft.KeyVault()",
            "@Microsoft.KeyVault(SecretUri=)",
            "@microsoft.keyvault(SecretUri=https://kv.vault.azure.net/secrets/x)",
            "Microsoft.KeyVault(SecretUri=https://kv.vault.azure.net/secrets/x)",
            "@Microsoft.KeyVault(SecretUri=https://kv.vault.azure.net/secrets/x",
        ];

        for literal in literals {
            assert!(
                match_secret_reference(literal).is_none(),
                "'{}' should be treated as a literal",
                literal
            );
        }
    }
}

mod locator_components_tests {
    use super::*;

    #[test]
    fn test_components_with_version() {
        let locator = SecretLocator::from_parts("kv", "db", "1");
        let components = locator.components().unwrap();

        assert_eq!(components.vault_url, "https://kv.vault.azure.net");
        assert_eq!(components.secret_name, "db");
        assert_eq!(components.version.as_deref(), Some("1"));
    }

    #[test]
    fn test_components_without_version() {
        let locator = SecretLocator::new("https://kv.vault.azure.net/secrets/db");
        let components = locator.components().unwrap();

        assert_eq!(components.secret_name, "db");
        assert_eq!(components.version, None);
    }

    #[test]
    fn test_components_keep_explicit_port() {
        let locator = SecretLocator::new("http://localhost:8443/secrets/db/2/");
        let components = locator.components().unwrap();

        assert_eq!(components.vault_url, "http://localhost:8443");
        assert_eq!(components.version.as_deref(), Some("2"));
    }

    #[test]
    fn test_components_reject_non_secret_paths() {
        for uri in [
            "https://kv.vault.azure.net/keys/db/1",
            "https://kv.vault.azure.net/secrets",
            "https://kv.vault.azure.net/secrets/a/b/c",
            "ftp://kv.vault.azure.net/secrets/db",
            "not a url",
        ] {
            let result = SecretLocator::new(uri).components();
            assert!(
                matches!(result, Err(KeyVaultError::InvalidLocator { .. })),
                "'{}' should be rejected, got {:?}",
                uri,
                result
            );
        }
    }
}
