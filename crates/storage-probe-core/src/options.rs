//! # Options Binding
//!
//! Holds the current, fully configured value of a typed options object and
//! re-runs the registered configure steps whenever the raw configuration is
//! reloaded.
//!
//! Every bind or reload runs the steps in registration order on a working
//! copy of the raw options. The result is published only if every step
//! succeeds, so a failed reload keeps the previously published value. Passes
//! are serialized per monitor: a reload that arrives while another pass is
//! running waits for it to finish.

use crate::fields::{FieldAccessor, SecretFields};
use crate::resolver::SecretResolver;
use crate::rewrite::SecretRewriter;
use crate::ConfigError;
use async_trait::async_trait;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError,
};
use tokio::sync::watch;
use tracing::{info, warn};

type ChangeListener<T> = Arc<dyn Fn(&T) + Send + Sync>;

// ============================================================================
// Configure Steps
// ============================================================================

/// A step run against the raw options on every bind and reload
#[async_trait]
pub trait ConfigureOptions<T>: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &str;

    /// Apply the step to `options` in place
    async fn configure(&self, options: &mut T) -> Result<(), ConfigError>;
}

#[async_trait]
impl<T: SecretFields> ConfigureOptions<T> for SecretRewriter<T> {
    fn name(&self) -> &str {
        "resolve_secrets"
    }

    async fn configure(&self, options: &mut T) -> Result<(), ConfigError> {
        let summary = self.rewrite(options).await?;
        if !summary.is_unchanged() {
            info!(
                type_name = T::type_name(),
                fields = ?summary.rewritten,
                "Replaced secret references with vault values"
            );
        }
        Ok(())
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Registers configure steps for an options type
pub struct OptionsBuilder<T> {
    steps: Vec<Arc<dyn ConfigureOptions<T>>>,
}

impl<T> OptionsBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create builder with no steps
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Register an arbitrary configure step
    pub fn configure(mut self, step: impl ConfigureOptions<T> + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Register secret resolution for the given fields
    ///
    /// # Errors
    /// Fails immediately if any accessor does not read a single settable
    /// field of `T`.
    pub fn resolve_secrets(
        self,
        resolver: Arc<SecretResolver>,
        accessors: Vec<FieldAccessor<T>>,
    ) -> Result<Self, ConfigError>
    where
        T: SecretFields,
    {
        let rewriter = SecretRewriter::new(resolver, accessors)?;
        Ok(self.configure(rewriter))
    }

    /// Bind the raw options and return the monitor holding the result
    ///
    /// # Errors
    /// The first error raised by a configure step.
    pub async fn build(self, raw: T) -> Result<OptionsMonitor<T>, ConfigError> {
        let configured = run_steps(&self.steps, raw).await?;
        let (sender, _) = watch::channel(configured);

        Ok(OptionsMonitor {
            inner: Arc::new(MonitorInner {
                steps: self.steps,
                sender,
                pass_guard: tokio::sync::Mutex::new(()),
                listeners: Mutex::new(Vec::new()),
                reloads: AtomicU64::new(0),
            }),
        })
    }
}

impl<T> Default for OptionsBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

async fn run_steps<T>(steps: &[Arc<dyn ConfigureOptions<T>>], mut options: T) -> Result<T, ConfigError>
where
    T: Send + Sync,
{
    for step in steps {
        if let Err(e) = step.configure(&mut options).await {
            warn!(step = step.name(), error = %e, "Configure step failed");
            return Err(e);
        }
    }
    Ok(options)
}

// ============================================================================
// Monitor
// ============================================================================

/// Current configured value of `T`, kept up to date across reloads
///
/// Cloning the monitor is cheap; clones share the same value.
pub struct OptionsMonitor<T> {
    inner: Arc<MonitorInner<T>>,
}

struct MonitorInner<T> {
    steps: Vec<Arc<dyn ConfigureOptions<T>>>,
    sender: watch::Sender<T>,
    pass_guard: tokio::sync::Mutex<()>,
    listeners: Mutex<Vec<ChangeListener<T>>>,
    reloads: AtomicU64,
}

impl<T> OptionsMonitor<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Clone of the currently published options
    pub fn current(&self) -> T {
        self.inner.sender.borrow().clone()
    }

    /// Receiver observing every published value
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.inner.sender.subscribe()
    }

    /// Invoke `listener` with the current value now and with every value
    /// published by a later reload
    ///
    /// Listeners run outside the registry lock, so a listener may itself call
    /// `on_change`. When registration races a reload the listener can see the
    /// newly published value twice, or before its initial call.
    pub fn on_change<F>(&self, listener: F)
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let listener: ChangeListener<T> = Arc::new(listener);

        // Registered before the read, so a reload publishing after it still
        // finds this listener in its snapshot
        let current = {
            let mut listeners = self
                .inner
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            listeners.push(Arc::clone(&listener));
            self.current()
        };
        listener(&current);
    }

    /// Re-run every configure step on freshly loaded raw options
    ///
    /// Published only when every step succeeds.
    ///
    /// # Errors
    /// The first error raised by a configure step; the previous value stays
    /// published.
    pub async fn reload(&self, raw: T) -> Result<(), ConfigError> {
        let _pass = self.inner.pass_guard.lock().await;

        let configured = run_steps(&self.inner.steps, raw).await.map_err(|e| {
            warn!(error = %e, "Options reload failed; keeping previous value");
            e
        })?;

        self.inner.sender.send_replace(configured.clone());
        let count = self.inner.reloads.fetch_add(1, Ordering::SeqCst) + 1;

        let listeners: Vec<ChangeListener<T>> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in &listeners {
            listener(&configured);
        }

        info!(reloads = count, "Options reloaded");
        Ok(())
    }

    /// Number of reloads published since the initial bind
    pub fn reload_count(&self) -> u64 {
        self.inner.reloads.load(Ordering::SeqCst)
    }
}

impl<T> Clone for OptionsMonitor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for OptionsMonitor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionsMonitor")
            .field("steps", &self.inner.steps.len())
            .field("reloads", &self.inner.reloads.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
