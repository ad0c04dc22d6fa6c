//! Rate limiter coordination logic.
//!
//! The rate limiter decides whether a request is admitted, based on the
//! window tracked for its key and the policy the caller selects.

use crate::application::metrics::Metrics;
use crate::application::ports::Storage;
use crate::application::registry::WindowRegistry;
use crate::domain::policy::RateLimitPolicy;
use crate::domain::window::{AdmissionDecision, RateWindow};

/// Fixed-window rate limiter over a shared window registry.
///
/// Clones share the registry and metrics.
#[derive(Clone, Debug)]
pub struct RateLimiter<S>
where
    S: Storage<String, RateWindow> + Clone,
{
    registry: WindowRegistry<S>,
    metrics: Metrics,
}

impl<S> RateLimiter<S>
where
    S: Storage<String, RateWindow> + Clone,
{
    /// Create a new rate limiter.
    ///
    /// # Arguments
    /// * `registry` - The window registry (which contains the clock)
    /// * `metrics` - Metrics tracker
    pub fn new(registry: WindowRegistry<S>, metrics: Metrics) -> Self {
        Self { registry, metrics }
    }

    /// Count a request for `key` and decide whether to admit it.
    ///
    /// The lookup, expiry check and increment happen in one critical section
    /// for `key`, so concurrent checks never act on a stale count. This
    /// method never fails; denial is reported in the returned decision.
    ///
    /// # Example
    /// ```
    /// use doc_throttle::{
    ///     Metrics, RateLimitPolicy, RateLimiter, RateWindow, ShardedStorage, SystemClock,
    ///     WindowRegistry,
    /// };
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// let storage = Arc::new(ShardedStorage::<String, RateWindow>::new());
    /// let registry = WindowRegistry::new(storage, Arc::new(SystemClock::new()));
    /// let limiter = RateLimiter::new(registry, Metrics::new());
    /// let policy = RateLimitPolicy::new(Duration::from_secs(60), 2).unwrap();
    ///
    /// assert!(limiter.check_and_consume("ip:10.0.0.1", &policy).allowed);
    /// assert!(limiter.check_and_consume("ip:10.0.0.1", &policy).allowed);
    /// assert!(!limiter.check_and_consume("ip:10.0.0.1", &policy).allowed);
    /// ```
    pub fn check_and_consume(&self, key: &str, policy: &RateLimitPolicy) -> AdmissionDecision {
        let decision = self
            .registry
            .with_window(key.to_string(), policy, |window, now| {
                window.register(policy, now)
            });

        if decision.allowed {
            self.metrics.record_admitted();
        } else {
            self.metrics.record_denied();
            tracing::debug!(
                key,
                limit = decision.limit,
                reset_at = %decision.reset_at,
                "request denied by rate limit"
            );
        }

        decision
    }

    /// Clear the window for one key, or for every key when `key` is `None`.
    ///
    /// Safe to call while checks are in flight: a concurrent check either
    /// sees the old window or opens a fresh one.
    pub fn reset(&self, key: Option<&str>) {
        match key {
            Some(key) => {
                self.registry.remove(key);
            }
            None => self.registry.clear(),
        }
    }

    /// Get a reference to the registry.
    pub fn registry(&self) -> &WindowRegistry<S> {
        &self.registry
    }

    /// Get a reference to the metrics.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
