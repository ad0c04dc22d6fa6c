//! Periodic eviction of expired rate windows.
//!
//! Expired windows are already replaced lazily on access; the sweeper bounds
//! memory for keys that stop sending requests.

use crate::application::metrics::Metrics;
use crate::application::ports::Storage;
use crate::application::registry::WindowRegistry;
use crate::domain::window::RateWindow;
use std::time::Duration;

#[cfg(feature = "async")]
use tokio::{sync::oneshot, task::JoinHandle, time::interval};

/// Default time between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Error returned when sweep configuration validation fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SweepConfigError {
    #[error("sweep interval must be greater than 0")]
    ZeroInterval,
}

/// Configuration for the background sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepConfig {
    interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl SweepConfig {
    /// # Errors
    /// Returns `SweepConfigError::ZeroInterval` if `interval` is zero.
    pub fn new(interval: Duration) -> Result<Self, SweepConfigError> {
        if interval.is_zero() {
            return Err(SweepConfigError::ZeroInterval);
        }
        Ok(Self { interval })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

/// Removes expired windows from a registry.
#[derive(Debug, Clone)]
pub struct Sweeper<S>
where
    S: Storage<String, RateWindow> + Clone,
{
    registry: WindowRegistry<S>,
    metrics: Metrics,
    config: SweepConfig,
}

impl<S> Sweeper<S>
where
    S: Storage<String, RateWindow> + Clone,
{
    pub fn new(registry: WindowRegistry<S>, metrics: Metrics, config: SweepConfig) -> Self {
        Self {
            registry,
            metrics,
            config,
        }
    }

    /// Run one sweep now and return the number of windows evicted.
    pub fn sweep_once(&self) -> usize {
        let evicted = self.registry.sweep_expired();
        if evicted > 0 {
            self.metrics.record_evictions(evicted as u64);
            tracing::debug!(evicted, remaining = self.registry.len(), "swept expired windows");
        }
        evicted
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Start sweeping on the configured interval.
    ///
    /// The task runs until [`SweeperHandle::shutdown`] is called or the
    /// handle is dropped. Must be called from within a tokio runtime.
    #[cfg(feature = "async")]
    pub fn start(self) -> SweeperHandle
    where
        S: 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let period = self.config.interval;

        let join = tokio::spawn(async move {
            let mut ticker = interval(period);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep_once();
                    }
                    _ = &mut shutdown_rx => {
                        tracing::info!("window sweeper stopped");
                        break;
                    }
                }
            }
        });

        tracing::info!(interval_ms = period.as_millis() as u64, "window sweeper started");
        SweeperHandle {
            shutdown_tx: Some(shutdown_tx),
            join: Some(join),
        }
    }
}

/// Error returned when the sweeper task did not stop cleanly.
#[cfg(feature = "async")]
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("sweeper task panicked or was cancelled: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}

/// Owns a running sweeper. Dropping the handle stops the task.
#[cfg(feature = "async")]
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

#[cfg(feature = "async")]
impl SweeperHandle {
    /// Stop the sweeper and wait for the task to finish.
    pub async fn shutdown(mut self) -> Result<(), ShutdownError> {
        if let Some(tx) = self.shutdown_tx.take() {
            // The receiver is gone only if the task already ended.
            let _ = tx.send(());
        }
        match self.join.take() {
            Some(join) => join.await.map_err(ShutdownError::from),
            None => Ok(()),
        }
    }

    /// Whether the sweep task has exited.
    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

#[cfg(feature = "async")]
impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
