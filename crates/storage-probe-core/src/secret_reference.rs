//! # Secret References
//!
//! Recognition of vault secret references embedded in configuration values.
//!
//! Two surface syntaxes are recognized, checked in this order:
//!
//! 1. `@Microsoft.KeyVault(SecretUri=<url>)` - the captured URL is the locator
//! 2. `@Microsoft.KeyVault(VaultName=<v>;SecretName=<s>;SecretVersion=<ver>)` -
//!    the locator is `https://<v>.vault.azure.net/secrets/<s>/<ver>`
//!
//! Both patterns are greedy and unanchored: leading text, and trailing text
//! after the closing parenthesis, do not prevent a match. Anything that
//! matches neither pattern is a literal value.

use crate::key_vault::KeyVaultError;
use regex::Regex;
use std::{fmt, sync::LazyLock};
use url::Url;

const SECRET_URI_PATTERN: &str = r"@Microsoft\.KeyVault\(SecretUri=(?P<url>.+)\)";

const SECRET_PARTS_PATTERN: &str = r"@Microsoft\.KeyVault\(VaultName=(?P<vault>.+);SecretName=(?P<secret>.+);SecretVersion=(?P<version>.+)\)";

static SECRET_URI: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SECRET_URI_PATTERN).expect("secret URI pattern is valid"));

static SECRET_PARTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SECRET_PARTS_PATTERN).expect("secret parts pattern is valid"));

/// Host suffix used when a locator is synthesized from its parts
pub const VAULT_HOST_SUFFIX: &str = "vault.azure.net";

// ============================================================================
// Secret Locator
// ============================================================================

/// Fully-qualified URI identifying one secret within a vault
///
/// A locator captured from the URI form is kept verbatim; no validation is
/// applied until a vault client needs to split it into components.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretLocator(String);

impl SecretLocator {
    /// Create locator from a captured URI
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// Synthesize locator from vault name, secret name and version
    pub fn from_parts(vault_name: &str, secret_name: &str, secret_version: &str) -> Self {
        Self(format!(
            "https://{}.{}/secrets/{}/{}",
            vault_name, VAULT_HOST_SUFFIX, secret_name, secret_version
        ))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split the locator into vault URL, secret name and optional version
    ///
    /// Expected shape: `<scheme>://<host>[:port]/secrets/<name>[/<version>]`
    ///
    /// # Errors
    /// Returns `KeyVaultError::InvalidLocator` if the URI cannot be parsed or
    /// does not address a secret.
    pub fn components(&self) -> Result<LocatorComponents, KeyVaultError> {
        let invalid = |reason: &str| KeyVaultError::InvalidLocator {
            locator: self.0.clone(),
            reason: reason.to_string(),
        };

        let url = Url::parse(self.0.trim()).map_err(|e| invalid(&e.to_string()))?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(invalid("scheme must be https or http"));
        }

        let host = url.host_str().ok_or_else(|| invalid("missing vault host"))?;
        let vault_url = match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
            None => format!("{}://{}", url.scheme(), host),
        };

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|segment| !segment.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            ["secrets", name] => Ok(LocatorComponents {
                vault_url,
                secret_name: name.to_string(),
                version: None,
            }),
            ["secrets", name, version] => Ok(LocatorComponents {
                vault_url,
                secret_name: name.to_string(),
                version: Some(version.to_string()),
            }),
            _ => Err(invalid("path must be /secrets/<name>[/<version>]")),
        }
    }
}

impl fmt::Display for SecretLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Locator split into the pieces a vault client needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorComponents {
    /// Vault base URL (`https://<vault>.vault.azure.net`)
    pub vault_url: String,

    /// Secret name within the vault
    pub secret_name: String,

    /// Secret version; `None` addresses the current version
    pub version: Option<String>,
}

// ============================================================================
// Secret Reference
// ============================================================================

/// A recognized secret reference and the form it was written in
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretReference {
    /// `@Microsoft.KeyVault(SecretUri=<url>)`
    Uri { locator: SecretLocator },

    /// `@Microsoft.KeyVault(VaultName=<v>;SecretName=<s>;SecretVersion=<ver>)`
    Parts {
        vault_name: String,
        secret_name: String,
        secret_version: String,
        locator: SecretLocator,
    },
}

impl SecretReference {
    /// Recognize a secret reference in a candidate value
    ///
    /// Returns `None` for literal values, including malformed references
    /// (for example a parts form without `SecretVersion`).
    pub fn parse(candidate: &str) -> Option<Self> {
        if let Some(captures) = SECRET_URI.captures(candidate) {
            return Some(SecretReference::Uri {
                locator: SecretLocator::new(&captures["url"]),
            });
        }

        if let Some(captures) = SECRET_PARTS.captures(candidate) {
            let vault_name = captures["vault"].to_string();
            let secret_name = captures["secret"].to_string();
            let secret_version = captures["version"].to_string();
            let locator = SecretLocator::from_parts(&vault_name, &secret_name, &secret_version);

            return Some(SecretReference::Parts {
                vault_name,
                secret_name,
                secret_version,
                locator,
            });
        }

        None
    }

    /// Locator of the referenced secret
    pub fn locator(&self) -> &SecretLocator {
        match self {
            SecretReference::Uri { locator } => locator,
            SecretReference::Parts { locator, .. } => locator,
        }
    }

    /// Consume the reference and return its locator
    pub fn into_locator(self) -> SecretLocator {
        match self {
            SecretReference::Uri { locator } => locator,
            SecretReference::Parts { locator, .. } => locator,
        }
    }
}

/// Decide whether a candidate is a secret reference and extract its locator
pub fn match_secret_reference(candidate: &str) -> Option<SecretLocator> {
    SecretReference::parse(candidate).map(SecretReference::into_locator)
}

#[cfg(test)]
#[path = "secret_reference_tests.rs"]
mod tests;
