//! Observability metrics for admission control.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Counters describing limiter behavior.
///
/// Cloning is cheap; clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Debug, Default)]
struct MetricsInner {
    requests_admitted: AtomicU64,
    requests_denied: AtomicU64,
    windows_evicted: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_admitted(&self) {
        self.inner.requests_admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_denied(&self) {
        self.inner.requests_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, count: u64) {
        self.inner
            .windows_evicted
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Total requests admitted.
    pub fn requests_admitted(&self) -> u64 {
        self.inner.requests_admitted.load(Ordering::Relaxed)
    }

    /// Total requests denied.
    pub fn requests_denied(&self) -> u64 {
        self.inner.requests_denied.load(Ordering::Relaxed)
    }

    /// Total expired windows removed by sweeps.
    pub fn windows_evicted(&self) -> u64 {
        self.inner.windows_evicted.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_admitted: self.requests_admitted(),
            requests_denied: self.requests_denied(),
            windows_evicted: self.windows_evicted(),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.inner.requests_admitted.store(0, Ordering::Relaxed);
        self.inner.requests_denied.store(0, Ordering::Relaxed);
        self.inner.windows_evicted.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests_admitted: u64,
    pub requests_denied: u64,
    pub windows_evicted: u64,
}

impl MetricsSnapshot {
    /// Total admission checks performed.
    pub fn total_requests(&self) -> u64 {
        self.requests_admitted.saturating_add(self.requests_denied)
    }

    /// Fraction of checks that were denied (0.0 to 1.0).
    pub fn denial_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            0.0
        } else {
            self.requests_denied as f64 / total as f64
        }
    }
}
