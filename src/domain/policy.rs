//! Rate limiting policies for request admission.
//!
//! A policy is an immutable `(window, max_requests)` pair. Endpoint classes
//! pick their policy from a [`PolicyTable`] keyed by [`PolicyKind`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Error returned when a policy is constructed with invalid parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// A policy must admit at least one request per window
    #[error("max_requests must be greater than 0")]
    ZeroMaxRequests,
    /// The window duration must be non-zero
    #[error("window duration must be greater than 0")]
    ZeroWindow,
}

/// Fixed-window rate limiting policy.
///
/// Allows up to `max_requests` per key within each window. The window starts
/// on the first request for a key and is not aligned to wall-clock boundaries.
///
/// # Example
/// ```
/// use doc_throttle::RateLimitPolicy;
/// use std::time::Duration;
///
/// let policy = RateLimitPolicy::new(Duration::from_secs(60), 3).unwrap();
/// assert_eq!(policy.max_requests(), 3);
///
/// assert!(RateLimitPolicy::new(Duration::from_secs(60), 0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PolicyConfig", into = "PolicyConfig")]
pub struct RateLimitPolicy {
    window: Duration,
    max_requests: u32,
}

impl RateLimitPolicy {
    /// Create a new policy.
    ///
    /// # Errors
    /// Returns `PolicyError` if `max_requests` or `window` is zero.
    pub fn new(window: Duration, max_requests: u32) -> Result<Self, PolicyError> {
        if max_requests == 0 {
            return Err(PolicyError::ZeroMaxRequests);
        }
        if window.is_zero() {
            return Err(PolicyError::ZeroWindow);
        }
        Ok(Self {
            window,
            max_requests,
        })
    }

    /// Create a policy from a window expressed in milliseconds.
    pub fn from_millis(window_ms: u64, max_requests: u32) -> Result<Self, PolicyError> {
        Self::new(Duration::from_millis(window_ms), max_requests)
    }

    /// Lenient default for general API traffic: 100 requests per 15 minutes.
    pub const fn standard() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
            max_requests: 100,
        }
    }

    /// Policy for the expensive text-analysis endpoints: 10 requests per minute.
    pub const fn ai() -> Self {
        Self {
            window: Duration::from_secs(60),
            max_requests: 10,
        }
    }

    /// Strict policy for authentication endpoints: 5 requests per 15 minutes.
    pub const fn auth() -> Self {
        Self {
            window: Duration::from_secs(15 * 60),
            max_requests: 5,
        }
    }

    /// Length of one window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Maximum admitted requests per window.
    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }
}

/// Serialized form of a policy, validated on conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub window_ms: u64,
    pub max_requests: u32,
}

impl TryFrom<PolicyConfig> for RateLimitPolicy {
    type Error = PolicyError;

    fn try_from(config: PolicyConfig) -> Result<Self, Self::Error> {
        RateLimitPolicy::from_millis(config.window_ms, config.max_requests)
    }
}

impl From<RateLimitPolicy> for PolicyConfig {
    fn from(policy: RateLimitPolicy) -> Self {
        Self {
            window_ms: u64::try_from(policy.window.as_millis()).unwrap_or(u64::MAX),
            max_requests: policy.max_requests,
        }
    }
}

/// Closed set of endpoint classes, each throttled by its own policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// General API traffic
    Standard,
    /// Text-analysis endpoints
    Ai,
    /// Login and registration
    Auth,
}

impl PolicyKind {
    /// All kinds, in table order.
    pub const ALL: [PolicyKind; 3] = [PolicyKind::Standard, PolicyKind::Ai, PolicyKind::Auth];

    /// Short stable name, used as a key namespace.
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Standard => "standard",
            PolicyKind::Ai => "ai",
            PolicyKind::Auth => "auth",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lookup table from endpoint class to policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyTable {
    standard: RateLimitPolicy,
    ai: RateLimitPolicy,
    auth: RateLimitPolicy,
}

impl PolicyTable {
    /// Get the policy for an endpoint class.
    pub fn get(&self, kind: PolicyKind) -> &RateLimitPolicy {
        match kind {
            PolicyKind::Standard => &self.standard,
            PolicyKind::Ai => &self.ai,
            PolicyKind::Auth => &self.auth,
        }
    }

    /// Replace the policy for an endpoint class.
    pub fn set(&mut self, kind: PolicyKind, policy: RateLimitPolicy) {
        match kind {
            PolicyKind::Standard => self.standard = policy,
            PolicyKind::Ai => self.ai = policy,
            PolicyKind::Auth => self.auth = policy,
        }
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self {
            standard: RateLimitPolicy::standard(),
            ai: RateLimitPolicy::ai(),
            auth: RateLimitPolicy::auth(),
        }
    }
}
