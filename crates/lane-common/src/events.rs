//! Usage event plumbing.
//!
//! Metering emits one event per successful counter increment. Delivery is
//! best-effort: a sink that drops events loses analytics, never correctness,
//! so sinks must be cheap and must not fail the calling request.

use crate::{ActorId, QuotaKind};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// A single recorded consumption of metered quota.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub actor_id: ActorId,
    pub kind: QuotaKind,
    pub amount: i64,
    pub timestamp: DateTime<Utc>,
}

/// Receives usage events off the metering hot path.
pub trait UsageEventSink: Send + Sync {
    fn record(&self, event: UsageEvent);
}

/// Drops every event.
#[derive(Debug, Default)]
pub struct NullEventSink;

impl UsageEventSink for NullEventSink {
    fn record(&self, _event: UsageEvent) {}
}

/// Emits every event as a structured debug log line.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl UsageEventSink for TracingEventSink {
    fn record(&self, event: UsageEvent) {
        tracing::debug!(
            actor_id = %event.actor_id,
            kind = event.kind.as_str(),
            amount = event.amount,
            "usage recorded"
        );
    }
}

/// Buffers events in memory, for tests and local tooling.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: RwLock<Vec<UsageEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<UsageEvent> {
        self.events.read().clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Returns all buffered events and empties the buffer.
    pub fn drain(&self) -> Vec<UsageEvent> {
        std::mem::take(&mut *self.events.write())
    }
}

impl UsageEventSink for MemoryEventSink {
    fn record(&self, event: UsageEvent) {
        self.events.write().push(event);
    }
}
