//! # Storage-Probe Service
//!
//! Process composition for the storage-probe HTTP service: configuration
//! sources, vault client selection, options binding and reload triggers.
//! The binary in `main.rs` wires these together and starts the server from
//! `storage-probe-api`.

pub mod composition;
pub mod config_loader;
pub mod reload;

pub use composition::{bind_failure_hint, build_vault_client, CompositionError};
pub use config_loader::{ConfigSources, CONFIG_FILE_ENV, ENV_PREFIX};
pub use reload::{ReloadCoordinator, ReloadError, ReloadOutcome};

use storage_probe_api::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set
pub fn default_log_filter(level: &str) -> String {
    format!(
        "storage_probe_service={level},storage_probe_api={level},storage_probe_core={level},tower_http=debug"
    )
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `logging.level`.
pub fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_log_filter(&logging.level.to_ascii_lowercase()).into());

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
