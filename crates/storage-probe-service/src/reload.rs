//! # Options Reload
//!
//! Re-reads the configuration sources and republishes the storage options
//! when their raw values changed. Triggered by `SIGHUP` on unix and, when
//! `reload.poll_interval_seconds` is non-zero, by a polling task.
//!
//! A failed reload keeps the published options and the last raw snapshot,
//! so the next trigger tries again.

use crate::config_loader::ConfigSources;
use std::sync::Arc;
use std::time::Duration;
use storage_probe_api::StorageTestOptions;
use storage_probe_core::OptionsMonitor;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Errors raised by a reload attempt
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] storage_probe_api::ConfigError),

    #[error("Failed to bind reloaded options: {0}")]
    Bind(#[from] storage_probe_core::ConfigError),
}

/// Result of a reload attempt that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Raw options matched the last snapshot; nothing was rerun
    Unchanged,

    /// New options were bound and published
    Reloaded,
}

/// Reloads storage options from the configuration sources
pub struct ReloadCoordinator {
    sources: ConfigSources,
    options: OptionsMonitor<StorageTestOptions>,
    last_raw: Mutex<StorageTestOptions>,
}

impl ReloadCoordinator {
    /// Create coordinator; `initial_raw` is the snapshot the monitor was
    /// built from
    pub fn new(
        sources: ConfigSources,
        options: OptionsMonitor<StorageTestOptions>,
        initial_raw: StorageTestOptions,
    ) -> Self {
        Self {
            sources,
            options,
            last_raw: Mutex::new(initial_raw),
        }
    }

    /// Reload when the raw storage options differ from the last snapshot
    ///
    /// # Errors
    /// Loading or binding failed; the published options are unchanged.
    pub async fn reload_if_changed(&self) -> Result<ReloadOutcome, ReloadError> {
        let raw = self.sources.load()?.storage_test;

        let mut last_raw = self.last_raw.lock().await;
        if *last_raw == raw {
            debug!("Storage options unchanged; skipping reload");
            return Ok(ReloadOutcome::Unchanged);
        }

        self.options.reload(raw.clone()).await?;
        *last_raw = raw;

        info!(
            reloads = self.options.reload_count(),
            "Storage options reloaded"
        );
        Ok(ReloadOutcome::Reloaded)
    }

    async fn reload_logged(&self, trigger: &'static str) {
        match self.reload_if_changed().await {
            Ok(outcome) => debug!(trigger, ?outcome, "Reload check complete"),
            Err(e) => warn!(trigger, error = %e, "Reload failed; keeping current options"),
        }
    }

    /// Poll the sources every `interval`
    pub fn spawn_polling(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        info!(
            interval_seconds = interval.as_secs(),
            "Polling configuration for changes"
        );
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                self.reload_logged("poll").await;
            }
        })
    }

    /// Reload whenever the process receives `SIGHUP`
    ///
    /// # Errors
    /// The signal handler could not be installed.
    #[cfg(unix)]
    pub fn spawn_sighup(self: Arc<Self>) -> std::io::Result<JoinHandle<()>> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut hangups = signal(SignalKind::hangup())?;
        info!("Reloading configuration on SIGHUP");

        Ok(tokio::spawn(async move {
            while hangups.recv().await.is_some() {
                info!("Received SIGHUP");
                self.reload_logged("sighup").await;
            }
        }))
    }
}

impl std::fmt::Debug for ReloadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadCoordinator")
            .field("sources", &self.sources)
            .field("reloads", &self.options.reload_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "reload_tests.rs"]
mod tests;
