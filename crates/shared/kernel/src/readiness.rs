//! Startup readiness: an observable configuration cell and the bounded wait on it.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use topo_domain::config::ReadinessConfig;
use tracing::{debug, info, warn};

#[topo_derive::topo_error]
pub enum ReadinessError {
    #[error("Configuration not received after {attempts} attempts{}", format_context(.context))]
    ConfigNotReady { attempts: u32, context: Option<Cow<'static, str>> },

    #[error("Readiness wait cancelled during attempt {attempt}")]
    Cancelled { attempt: u32 },
}

/// Single-writer/multi-reader cell that starts empty and wakes waiters on publish.
pub struct ConfigCell<T> {
    tx: Arc<watch::Sender<Option<Arc<T>>>>,
}

impl<T> ConfigCell<T> {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Stores `value`, replacing any earlier one, and wakes every waiter.
    pub fn publish(&self, value: T) {
        self.tx.send_replace(Some(Arc::new(value)));
    }

    #[must_use]
    pub fn get(&self) -> Option<Arc<T>> {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.tx.borrow().is_some()
    }

    #[must_use]
    pub fn gate(&self) -> ReadinessGate<T> {
        ReadinessGate { cell: self.clone() }
    }
}

impl<T> Default for ConfigCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for ConfigCell<T> {
    fn clone(&self) -> Self {
        Self { tx: Arc::clone(&self.tx) }
    }
}

impl<T> fmt::Debug for ConfigCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigCell").field("ready", &self.is_ready()).finish()
    }
}

/// Blocks startup until the cell holds a value.
#[derive(Debug, Clone)]
pub struct ReadinessGate<T> {
    cell: ConfigCell<T>,
}

impl<T> ReadinessGate<T> {
    /// Waits for the first published value, one attempt per `interval`.
    ///
    /// Returns immediately when a value is already present. Each attempt sleeps on the
    /// cell's change signal for at most `interval`; after `attempts` fruitless attempts
    /// the wait fails with [`ReadinessError::ConfigNotReady`].
    ///
    /// # Errors
    /// [`ReadinessError::ConfigNotReady`] once the budget is spent;
    /// [`ReadinessError::Cancelled`] when `cancel` fires first.
    pub async fn await_config(
        &self,
        attempts: u32,
        interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<Arc<T>, ReadinessError> {
        let mut rx = self.cell.tx.subscribe();

        for attempt in 1..=attempts {
            if let Some(value) = rx.borrow_and_update().clone() {
                info!(attempt, "Configuration received");
                return Ok(value);
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    warn!(attempt, "Readiness wait cancelled");
                    return Err(ReadinessError::Cancelled { attempt });
                }
                changed = tokio::time::timeout(interval, rx.wait_for(Option::is_some)) => {
                    if let Ok(Ok(value)) = changed
                        && let Some(value) = value.as_ref()
                    {
                        info!(attempt, "Configuration received");
                        return Ok(Arc::clone(value));
                    }
                    debug!(attempt, attempts, "Configuration not received yet");
                }
            }
        }

        Err(ReadinessError::ConfigNotReady { attempts, context: None })
    }

    /// [`Self::await_config`] with the `[readiness]` budget.
    ///
    /// # Errors
    /// See [`Self::await_config`].
    pub async fn await_with(
        &self,
        config: &ReadinessConfig,
        cancel: &CancellationToken,
    ) -> Result<Arc<T>, ReadinessError> {
        self.await_config(config.attempts, Duration::from_millis(config.interval_ms), cancel).await
    }
}
