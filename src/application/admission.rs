//! Request admission facade.
//!
//! Ties identity resolution, the per-kind policy table and the limiter
//! together behind one `admit` call, and owns the background sweeper.

use crate::application::limiter::RateLimiter;
use crate::application::metrics::Metrics;
use crate::application::ports::{Clock, Storage};
use crate::application::registry::WindowRegistry;
use crate::application::sweeper::{SweepConfig, SweepConfigError, DEFAULT_SWEEP_INTERVAL};
use crate::domain::identity::{ClientIdentity, RequestMetadata};
use crate::domain::policy::{PolicyConfig, PolicyError, PolicyKind, PolicyTable, RateLimitPolicy};
use crate::domain::window::{AdmissionDecision, RateLimitHeaders, RateWindow};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::storage::ShardedStorage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "async")]
use crate::application::sweeper::{ShutdownError, Sweeper, SweeperHandle};
#[cfg(feature = "async")]
use std::sync::{Mutex, PoisonError};

/// Error returned when building an `AdmissionControl` fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// A configured policy is invalid
    #[error("invalid {kind} policy: {source}")]
    InvalidPolicy {
        kind: PolicyKind,
        source: PolicyError,
    },
    /// Sweep configuration validation failed
    #[error("sweep configuration error: {0}")]
    Sweep(#[from] SweepConfigError),
}

/// Deserializable limiter settings.
///
/// Missing fields fall back to the defaults.
///
/// ```
/// use doc_throttle::LimiterConfig;
///
/// let config: LimiterConfig = serde_json::from_str(
///     r#"{ "sweep_interval_ms": 5000, "ai": { "window_ms": 60000, "max_requests": 3 } }"#,
/// ).unwrap();
/// assert_eq!(config.ai.max_requests, 3);
/// assert_eq!(config.standard.max_requests, 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    pub sweep_interval_ms: u64,
    pub standard: PolicyConfig,
    pub ai: PolicyConfig,
    pub auth: PolicyConfig,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        let table = PolicyTable::default();
        Self {
            sweep_interval_ms: DEFAULT_SWEEP_INTERVAL.as_millis() as u64,
            standard: (*table.get(PolicyKind::Standard)).into(),
            ai: (*table.get(PolicyKind::Ai)).into(),
            auth: (*table.get(PolicyKind::Auth)).into(),
        }
    }
}

impl LimiterConfig {
    fn policy(&self, kind: PolicyKind) -> PolicyConfig {
        match kind {
            PolicyKind::Standard => self.standard,
            PolicyKind::Ai => self.ai,
            PolicyKind::Auth => self.auth,
        }
    }

    /// Validate every policy and build the lookup table.
    pub fn policies(&self) -> Result<PolicyTable, BuildError> {
        let mut table = PolicyTable::default();
        for kind in PolicyKind::ALL {
            let policy = RateLimitPolicy::try_from(self.policy(kind))
                .map_err(|source| BuildError::InvalidPolicy { kind, source })?;
            table.set(kind, policy);
        }
        Ok(table)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

/// Builder for constructing an `AdmissionControl`.
#[derive(Debug)]
pub struct AdmissionControlBuilder {
    policies: PolicyTable,
    sweep_interval: Duration,
    clock: Option<Arc<dyn Clock>>,
    config: Option<LimiterConfig>,
}

impl AdmissionControlBuilder {
    /// Override the policy for one endpoint class.
    pub fn with_policy(mut self, kind: PolicyKind, policy: RateLimitPolicy) -> Self {
        self.policies.set(kind, policy);
        self
    }

    /// Set a custom clock (mainly for testing).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the background sweep interval.
    ///
    /// The interval will be validated when `build()` is called.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Take policies and the sweep interval from deserialized settings.
    ///
    /// Configured policies win over `with_policy`. A later
    /// `with_sweep_interval` still overrides the configured interval.
    pub fn with_config(mut self, config: LimiterConfig) -> Self {
        self.sweep_interval = config.sweep_interval();
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<AdmissionControl, BuildError> {
        let mut policies = self.policies;
        if let Some(config) = self.config {
            let configured = config.policies()?;
            for kind in PolicyKind::ALL {
                policies.set(kind, *configured.get(kind));
            }
        }
        let sweep = SweepConfig::new(self.sweep_interval)?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock::new()));

        Ok(AdmissionControl::with_storage(
            Arc::new(ShardedStorage::new()),
            policies,
            sweep,
            clock,
        ))
    }
}

/// Result of one admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub identity: ClientIdentity,
    pub kind: PolicyKind,
    /// Window key the request was counted under
    pub key: String,
    pub decision: AdmissionDecision,
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        self.decision.allowed
    }
}

/// Per-client, per-endpoint-class admission control.
///
/// Clones share windows, metrics and the sweeper.
#[derive(Clone)]
pub struct AdmissionControl<S = Arc<ShardedStorage<String, RateWindow>>>
where
    S: Storage<String, RateWindow> + Clone,
{
    limiter: RateLimiter<S>,
    policies: PolicyTable,
    sweep: SweepConfig,
    #[cfg(feature = "async")]
    sweeper: Arc<Mutex<Option<SweeperHandle>>>,
}

impl AdmissionControl {
    /// Create a builder for configuring admission control.
    ///
    /// Defaults:
    /// - standard: 100 requests per 15 minutes
    /// - ai: 10 requests per minute
    /// - auth: 5 requests per 15 minutes
    /// - sweep interval: 60 seconds
    pub fn builder() -> AdmissionControlBuilder {
        AdmissionControlBuilder {
            policies: PolicyTable::default(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            clock: None,
            config: None,
        }
    }

    /// Create admission control with default settings.
    pub fn new() -> Self {
        Self::with_storage(
            Arc::new(ShardedStorage::new()),
            PolicyTable::default(),
            SweepConfig::default(),
            Arc::new(SystemClock::new()),
        )
    }
}

impl Default for AdmissionControl {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> AdmissionControl<S>
where
    S: Storage<String, RateWindow> + Clone,
{
    /// Create admission control over a custom window store.
    pub fn with_storage(
        storage: S,
        policies: PolicyTable,
        sweep: SweepConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let registry = WindowRegistry::new(storage, clock);
        Self {
            limiter: RateLimiter::new(registry, Metrics::new()),
            policies,
            sweep,
            #[cfg(feature = "async")]
            sweeper: Arc::new(Mutex::new(None)),
        }
    }

    /// Identify the caller and count the request against its window for `kind`.
    ///
    /// Each endpoint class has its own window per client, so heavy use of
    /// one class does not drain another's budget.
    pub fn admit(&self, meta: &RequestMetadata, kind: PolicyKind) -> Admission {
        let identity = ClientIdentity::resolve(meta);
        let key = window_key(kind, &identity);
        let decision = self.limiter.check_and_consume(&key, self.policies.get(kind));
        Admission {
            identity,
            kind,
            key,
            decision,
        }
    }

    /// Count a request for an explicit key under the policy for `kind`.
    pub fn check_and_consume(&self, key: &str, kind: PolicyKind) -> AdmissionDecision {
        self.limiter.check_and_consume(key, self.policies.get(kind))
    }

    /// Clear one window key, or every window when `key` is `None`.
    ///
    /// Keys are the composite `<kind>|<identity>` strings found in
    /// [`Admission::key`]. Use [`reset_client`](Self::reset_client) to clear
    /// a client by identity alone.
    pub fn reset(&self, key: Option<&str>) {
        self.limiter.reset(key);
    }

    /// Clear every window of one client, across all policy kinds.
    pub fn reset_client(&self, identity: &ClientIdentity) {
        for kind in PolicyKind::ALL {
            self.limiter.reset(Some(&window_key(kind, identity)));
        }
        tracing::debug!(identity = %identity.as_str(), "client windows reset");
    }

    /// Response header values for an admission, as of now.
    pub fn headers(&self, admission: &Admission) -> RateLimitHeaders {
        RateLimitHeaders::from_decision(&admission.decision, self.now())
    }

    /// Current time according to the configured clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.limiter.registry().now()
    }

    /// Get the policy table in use.
    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Get a reference to the underlying limiter.
    pub fn limiter(&self) -> &RateLimiter<S> {
        &self.limiter
    }

    /// Admission counters shared by every clone.
    pub fn metrics(&self) -> &Metrics {
        self.limiter.metrics()
    }

    /// Number of tracked windows.
    pub fn window_count(&self) -> usize {
        self.limiter.registry().len()
    }
}

#[cfg(feature = "async")]
impl<S> AdmissionControl<S>
where
    S: Storage<String, RateWindow> + Clone + 'static,
{
    /// Start the background sweeper if it is not running yet.
    ///
    /// Returns `false` when a sweeper was already running. Must be called
    /// from within a tokio runtime.
    pub fn start_sweeper(&self) -> bool {
        let mut slot = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        let sweeper = Sweeper::new(
            self.limiter.registry().clone(),
            self.limiter.metrics().clone(),
            self.sweep,
        );
        *slot = Some(sweeper.start());
        true
    }

    /// Stop the background sweeper, if any, and wait for it to finish.
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match handle {
            Some(handle) => handle.shutdown().await,
            None => Ok(()),
        }
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl<S> std::fmt::Debug for AdmissionControl<S>
where
    S: Storage<String, RateWindow> + Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionControl")
            .field("policies", &self.policies)
            .field("sweep", &self.sweep)
            .field("windows", &self.window_count())
            .finish()
    }
}

fn window_key(kind: PolicyKind, identity: &ClientIdentity) -> String {
    format!("{}|{}", kind.as_str(), identity.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mocks::MockClock;

    fn control(clock: &MockClock) -> AdmissionControl {
        AdmissionControl::builder()
            .with_clock(Arc::new(clock.clone()))
            .build()
            .unwrap()
    }

    #[test]
    fn test_default_policies() {
        let control = AdmissionControl::new();
        let policies = control.policies();
        assert_eq!(policies.get(PolicyKind::Standard).max_requests(), 100);
        assert_eq!(policies.get(PolicyKind::Ai).window(), Duration::from_secs(60));
        assert_eq!(policies.get(PolicyKind::Auth).max_requests(), 5);
    }

    #[test]
    fn test_zero_sweep_interval_rejected() {
        let result = AdmissionControl::builder()
            .with_sweep_interval(Duration::ZERO)
            .build();
        assert_eq!(
            result.unwrap_err(),
            BuildError::Sweep(SweepConfigError::ZeroInterval)
        );
    }

    #[test]
    fn test_invalid_config_policy_rejected() {
        let config = LimiterConfig {
            auth: PolicyConfig {
                window_ms: 1000,
                max_requests: 0,
            },
            ..LimiterConfig::default()
        };
        let result = AdmissionControl::builder().with_config(config).build();
        assert!(matches!(
            result,
            Err(BuildError::InvalidPolicy {
                kind: PolicyKind::Auth,
                ..
            })
        ));
    }

    #[test]
    fn test_config_defaults_round_trip() {
        let config = LimiterConfig::default();
        assert_eq!(config.policies().unwrap(), PolicyTable::default());
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_admit_resolves_identity_and_key() {
        let clock = MockClock::default();
        let control = control(&clock);
        let meta = RequestMetadata::new().with_forwarded_for("203.0.113.9, 10.0.0.1");

        let admission = control.admit(&meta, PolicyKind::Ai);

        assert!(admission.is_allowed());
        assert_eq!(admission.identity.as_str(), "ip:203.0.113.9");
        assert_eq!(admission.key, "ai|ip:203.0.113.9");
        assert_eq!(admission.decision.remaining, 9);
    }

    #[test]
    fn test_kinds_have_separate_budgets() {
        let clock = MockClock::default();
        let control = control(&clock);
        let meta = RequestMetadata::new().with_real_ip("198.51.100.4");

        for _ in 0..5 {
            assert!(control.admit(&meta, PolicyKind::Auth).is_allowed());
        }
        assert!(!control.admit(&meta, PolicyKind::Auth).is_allowed());
        assert!(control.admit(&meta, PolicyKind::Standard).is_allowed());
        assert_eq!(control.window_count(), 2);
    }

    #[test]
    fn test_headers_for_denied_admission() {
        let clock = MockClock::default();
        let control = AdmissionControl::builder()
            .with_clock(Arc::new(clock.clone()))
            .with_policy(
                PolicyKind::Standard,
                RateLimitPolicy::new(Duration::from_secs(30), 1).unwrap(),
            )
            .build()
            .unwrap();
        let meta = RequestMetadata::new();

        control.admit(&meta, PolicyKind::Standard);
        clock.advance(Duration::from_secs(10));
        let denied = control.admit(&meta, PolicyKind::Standard);
        let headers = control.headers(&denied);

        assert_eq!(headers.limit, 1);
        assert_eq!(headers.remaining, 0);
        assert_eq!(headers.retry_after, Some(20));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_sweeper_lifecycle() {
        let control = AdmissionControl::new();
        assert!(!control.is_sweeping());

        assert!(control.start_sweeper());
        assert!(!control.start_sweeper());
        assert!(control.is_sweeping());

        control.shutdown().await.unwrap();
        assert!(!control.is_sweeping());
        control.shutdown().await.unwrap();
    }
}
