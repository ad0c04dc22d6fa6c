//! Registry of per-key rate windows.
//!
//! The registry owns the window map and the clock. All access to a key's
//! window goes through [`WindowRegistry::with_window`], which runs under that
//! key's entry lock.

use crate::application::ports::{Clock, Storage};
use crate::domain::policy::RateLimitPolicy;
use crate::domain::window::RateWindow;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Registry managing all rate windows.
///
/// This type is generic over the storage implementation. In production, use
/// `Arc<ShardedStorage<String, RateWindow>>`; clones of the registry then
/// share one map.
#[derive(Clone)]
pub struct WindowRegistry<S>
where
    S: Storage<String, RateWindow> + Clone,
{
    storage: S,
    clock: Arc<dyn Clock>,
}

impl<S> WindowRegistry<S>
where
    S: Storage<String, RateWindow> + Clone,
{
    /// Create a new registry over `storage`, reading time from `clock`.
    pub fn new(storage: S, clock: Arc<dyn Clock>) -> Self {
        Self { storage, clock }
    }

    /// Access or create the window for `key`.
    ///
    /// A missing window is opened for `policy`. The callback receives the
    /// window and the current time, both under the key's lock.
    pub fn with_window<F, R>(&self, key: String, policy: &RateLimitPolicy, f: F) -> R
    where
        F: FnOnce(&mut RateWindow, DateTime<Utc>) -> R,
    {
        let now = self.clock.now();
        self.storage
            .with_entry_mut(key, || RateWindow::open(policy, now), |window| f(window, now))
    }

    /// Current time according to the registry's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Get the clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Forget one key. Returns whether it was tracked.
    pub fn remove(&self, key: &str) -> bool {
        self.storage.remove(&key.to_string())
    }

    /// Forget every key.
    pub fn clear(&self) {
        self.storage.clear();
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Check if no keys are tracked.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Copy of the window for `key`, if tracked.
    pub fn snapshot(&self, key: &str) -> Option<RateWindow> {
        self.storage.peek(&key.to_string(), |window| *window)
    }

    /// Remove every window whose reset time has passed.
    ///
    /// Returns the number of windows removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut evicted = 0;
        self.storage.retain(|_, window| {
            let keep = !window.is_expired(now);
            if !keep {
                evicted += 1;
            }
            keep
        });
        evicted
    }
}

impl<S> std::fmt::Debug for WindowRegistry<S>
where
    S: Storage<String, RateWindow> + Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowRegistry")
            .field("windows", &self.storage.len())
            .finish()
    }
}
