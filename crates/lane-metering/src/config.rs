//! Metering runtime configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How metering reads behave when the usage store is unreachable.
///
/// Writes are never covered by this policy: an increment that did not land
/// must not look like one that did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Serve a zero-usage snapshot and keep the product available.
    FailOpen,
    /// Surface the outage to the caller.
    FailClosed,
}

/// Tunables for the usage meter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    /// Seconds a cached usage record stays valid.
    pub cache_ttl_secs: u64,
    /// Entry bound for the in-process cache.
    pub cache_capacity: u64,
    /// Upper bound on any single store call, in milliseconds. A call that
    /// exceeds it is treated as store unavailability.
    pub store_timeout_ms: u64,
    pub failure_policy: FailurePolicy,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            cache_capacity: 100_000,
            store_timeout_ms: 2_000,
            failure_policy: FailurePolicy::FailOpen,
        }
    }
}

impl MeterConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}
