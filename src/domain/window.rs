//! Fixed-window counters and the decisions they produce.

use crate::domain::error::LimitExceeded;
use crate::domain::policy::RateLimitPolicy;
use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// Per-key request counter for the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    count: u32,
    reset_at: DateTime<Utc>,
}

impl RateWindow {
    /// Create an empty window ending one policy window after `now`.
    pub fn open(policy: &RateLimitPolicy, now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            reset_at: window_end(policy, now),
        }
    }

    /// Requests counted in the current window, including denied ones.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// When the current window ends.
    pub fn reset_at(&self) -> DateTime<Utc> {
        self.reset_at
    }

    /// Whether the window has ended at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.reset_at
    }

    /// Count one request and decide whether it is admitted.
    ///
    /// An expired window is restarted before counting, so the first request
    /// after `reset_at` always opens a fresh window with `count = 1`.
    pub fn register(&mut self, policy: &RateLimitPolicy, now: DateTime<Utc>) -> AdmissionDecision {
        if self.is_expired(now) {
            self.count = 0;
            self.reset_at = window_end(policy, now);
        }

        self.count = self.count.saturating_add(1);
        let limit = policy.max_requests();

        if self.count > limit {
            AdmissionDecision::denied(limit, self.reset_at)
        } else {
            AdmissionDecision::allowed(limit, limit - self.count, self.reset_at)
        }
    }
}

fn window_end(policy: &RateLimitPolicy, now: DateTime<Utc>) -> DateTime<Utc> {
    let window = ChronoDuration::from_std(policy.window()).unwrap_or(ChronoDuration::MAX);
    now.checked_add_signed(window).unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Outcome of an admission check.
///
/// Denial is an ordinary value here, not an error: callers branch on
/// [`allowed`](Self::allowed) and use [`retry_after_secs`](Self::retry_after_secs)
/// to build the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionDecision {
    /// Whether the request is admitted
    pub allowed: bool,
    /// Requests left in the current window
    pub remaining: u32,
    /// When the current window ends
    pub reset_at: DateTime<Utc>,
    /// The policy's per-window limit
    pub limit: u32,
}

impl AdmissionDecision {
    fn allowed(limit: u32, remaining: u32, reset_at: DateTime<Utc>) -> Self {
        Self {
            allowed: true,
            remaining,
            reset_at,
            limit,
        }
    }

    fn denied(limit: u32, reset_at: DateTime<Utc>) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            reset_at,
            limit,
        }
    }

    /// Check if this decision admits the request.
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// Check if this decision denies the request.
    pub fn is_denied(&self) -> bool {
        !self.allowed
    }

    /// Seconds until the window resets, rounded up and floored at zero.
    pub fn retry_after_secs(&self, now: DateTime<Utc>) -> u64 {
        let millis = (self.reset_at - now).num_milliseconds();
        if millis <= 0 {
            0
        } else {
            (millis as u64).div_ceil(1000)
        }
    }

    /// Convert a denial into an error for callers that prefer `?`.
    pub fn into_result(self, now: DateTime<Utc>) -> Result<Self, LimitExceeded> {
        if self.allowed {
            Ok(self)
        } else {
            Err(LimitExceeded {
                retry_after_secs: self.retry_after_secs(now),
                reset_at: self.reset_at,
            })
        }
    }
}

/// Values for the standard rate limit response headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitHeaders {
    pub limit: u32,
    pub remaining: u32,
    /// RFC 3339 timestamp of the window reset
    pub reset: String,
    /// Only set on denial
    pub retry_after: Option<u64>,
}

impl RateLimitHeaders {
    pub const LIMIT: &'static str = "X-RateLimit-Limit";
    pub const REMAINING: &'static str = "X-RateLimit-Remaining";
    pub const RESET: &'static str = "X-RateLimit-Reset";
    pub const RETRY_AFTER: &'static str = "Retry-After";

    /// Build header values for a decision made at `now`.
    pub fn from_decision(decision: &AdmissionDecision, now: DateTime<Utc>) -> Self {
        Self {
            limit: decision.limit,
            remaining: decision.remaining,
            reset: decision
                .reset_at
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            retry_after: decision
                .is_denied()
                .then(|| decision.retry_after_secs(now)),
        }
    }

    /// Header name/value pairs, ready to copy onto a response.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            (Self::LIMIT, self.limit.to_string()),
            (Self::REMAINING, self.remaining.to_string()),
            (Self::RESET, self.reset.clone()),
        ];
        if let Some(retry_after) = self.retry_after {
            pairs.push((Self::RETRY_AFTER, retry_after.to_string()));
        }
        pairs
    }
}
