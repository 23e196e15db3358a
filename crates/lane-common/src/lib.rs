//! Shared vocabulary for the Hirelane access layer.
//!
//! Everything here is plain data: the tier ladder, the meterable quota
//! kinds, the gated feature flags, and the usage events metering emits.
//! The decision machinery lives in the crates stacked on top of this one
//! (`lane-catalog`, `lane-metering`, `lane-guard`).

pub mod events;
pub mod tier;

pub use events::{MemoryEventSink, NullEventSink, TracingEventSink, UsageEvent, UsageEventSink};
pub use tier::{FeatureFlag, QuotaKind, Tier, UNLIMITED};

use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identifier for a Hirelane account.
pub type ActorId = uuid::Uuid;

/// Relaxed atomic counter for hot-path statistics.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn incr(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn incr_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn value(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
