//! # Storage-Probe Service
//!
//! Binary entry point for the storage-probe HTTP service.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes logging
//! - Selects the vault client and binds the storage options, resolving
//!   vault references in the connection strings
//! - Starts the reload triggers
//! - Starts the HTTP server from storage-probe-api

use anyhow::Context;
use std::sync::Arc;
use storage_probe_api::{bind_storage_options, start_server, AppState, LoggingConfig};
use storage_probe_core::blob_storage::DefaultBlobStoreConnector;
use storage_probe_core::SecretResolver;
use storage_probe_service::{
    bind_failure_hint, build_vault_client, init_logging, ConfigSources, ReloadCoordinator,
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let sources = ConfigSources::from_env();

    let service_config = match sources.load() {
        Ok(config) => config,
        Err(e) => {
            init_logging(&LoggingConfig::default());
            error!(
                error = %e,
                "Could not load service configuration; aborting. \
                 Fix the configuration and restart."
            );
            std::process::exit(3);
        }
    };

    init_logging(&service_config.logging);
    info!("Starting storage-probe service");

    // -------------------------------------------------------------------------
    // Bind the storage options
    //
    // The initial bind must succeed: a reference that cannot be resolved at
    // start-up stops the process instead of serving with a literal
    // `@Microsoft.KeyVault(...)` string as a connection string.
    // -------------------------------------------------------------------------
    let vault = match build_vault_client(&service_config.key_vault) {
        Ok(vault) => vault,
        Err(e) => {
            error!(error = %e, "Failed to create vault client; aborting");
            std::process::exit(3);
        }
    };

    let resolver = Arc::new(SecretResolver::new(vault));
    let initial_raw = service_config.storage_test.clone();
    let options = match bind_storage_options(initial_raw.clone(), resolver).await {
        Ok(options) => options,
        Err(e) => {
            error!(
                field = e.field(),
                error = %e,
                "Failed to bind storage options; aborting. {}",
                bind_failure_hint(&e)
            );
            std::process::exit(3);
        }
    };

    options.on_change(|current| {
        info!(
            container = %current.container_name,
            complete = current.is_complete(),
            "Storage options published"
        );
    });

    // -------------------------------------------------------------------------
    // Reload triggers
    // -------------------------------------------------------------------------
    let coordinator = Arc::new(ReloadCoordinator::new(
        sources,
        options.clone(),
        initial_raw,
    ));

    let mut reload_tasks = Vec::new();
    if let Some(interval) = service_config.reload.poll_interval() {
        reload_tasks.push(Arc::clone(&coordinator).spawn_polling(interval));
    }

    #[cfg(unix)]
    match Arc::clone(&coordinator).spawn_sighup() {
        Ok(task) => reload_tasks.push(task),
        Err(e) => warn!(error = %e, "SIGHUP reload unavailable"),
    }

    // -------------------------------------------------------------------------
    // Serve
    // -------------------------------------------------------------------------
    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        "Starting HTTP server"
    );

    let state = AppState::new(
        service_config,
        options,
        Arc::new(DefaultBlobStoreConnector::new()),
    )
    .context("failed to build application state")?;

    let result = start_server(state).await;

    for task in reload_tasks {
        task.abort();
    }

    if let Err(e) = result {
        error!("Server stopped with error: {}", e);
        std::process::exit(e.exit_code());
    }

    info!("storage-probe service stopped");
    Ok(())
}
