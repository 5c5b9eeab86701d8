//! # Configuration Loading
//!
//! Sources, applied in order (later sources override earlier ones):
//!  1. `/etc/storage-probe/service.yaml`  system-wide defaults
//!  2. `./config/service.yaml`            deployment-local override
//!  3. path named by `SP_CONFIG_FILE`      operator-specified file, required
//!  4. environment variables prefixed `SP__` with `__` between keys,
//!     e.g. `SP__STORAGE_TEST__CONTAINER_NAME=probe`
//!
//! Every section carries serde defaults, so absent files produce a valid
//! configuration. A malformed file or a value that cannot be coerced to its
//! field type is a hard error.

use config::{Config, Environment, File, FileFormat};
use std::path::PathBuf;
use storage_probe_api::{ConfigError, ServiceConfig};
use tracing::{debug, info};

/// Environment variable naming an explicit configuration file
pub const CONFIG_FILE_ENV: &str = "SP_CONFIG_FILE";

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "SP";

const SYSTEM_CONFIG_FILE: &str = "/etc/storage-probe/service.yaml";
const LOCAL_CONFIG_FILE: &str = "config/service.yaml";

/// Where configuration is read from
///
/// The same sources are read at start-up and on every reload.
#[derive(Debug, Clone)]
pub struct ConfigSources {
    optional_files: Vec<PathBuf>,
    explicit_file: Option<PathBuf>,
    read_environment: bool,
}

impl ConfigSources {
    /// Standard sources, with the explicit file taken from `SP_CONFIG_FILE`
    pub fn from_env() -> Self {
        let explicit_file = std::env::var(CONFIG_FILE_ENV)
            .ok()
            .filter(|path| !path.is_empty())
            .map(PathBuf::from);

        Self {
            optional_files: vec![
                PathBuf::from(SYSTEM_CONFIG_FILE),
                PathBuf::from(LOCAL_CONFIG_FILE),
            ],
            explicit_file,
            read_environment: true,
        }
    }

    /// Only the given file, which must exist, plus the environment
    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            optional_files: Vec::new(),
            explicit_file: Some(path.into()),
            read_environment: true,
        }
    }

    /// Stop reading `SP__` environment variables
    pub fn without_environment(mut self) -> Self {
        self.read_environment = false;
        self
    }

    /// Explicit file, if one is configured
    pub fn explicit_file(&self) -> Option<&PathBuf> {
        self.explicit_file.as_ref()
    }

    /// Read and validate the configuration
    ///
    /// # Errors
    /// - `ConfigError::Load` - a source could not be read or deserialized
    /// - `ConfigError::Invalid` - the merged configuration failed validation
    pub fn load(&self) -> Result<ServiceConfig, ConfigError> {
        let mut builder = Config::builder();

        for path in &self.optional_files {
            builder = builder.add_source(
                File::from(path.clone())
                    .required(false)
                    .format(FileFormat::Yaml),
            );
        }

        if let Some(path) = &self.explicit_file {
            debug!(path = %path.display(), "Loading configuration from explicit path");
            builder = builder.add_source(
                File::from(path.clone())
                    .required(true)
                    .format(FileFormat::Yaml),
            );
        }

        if self.read_environment {
            builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));
        }

        let merged = builder.build().map_err(|e| ConfigError::Load {
            message: e.to_string(),
        })?;

        let service_config: ServiceConfig =
            merged.try_deserialize().map_err(|e| ConfigError::Load {
                message: format!("could not deserialize service configuration: {}", e),
            })?;

        service_config.validate()?;

        info!(
            vault_mode = ?service_config.key_vault.mode,
            container = %service_config.storage_test.container_name,
            "Configuration loaded"
        );
        Ok(service_config)
    }
}

#[cfg(test)]
#[path = "config_loader_tests.rs"]
mod tests;
