//! Durable usage storage.

use crate::record::UsageRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use lane_common::{ActorId, QuotaKind, UNLIMITED};
use thiserror::Error;

/// Store failures mean the backend is unreachable or unhealthy. Absence of
/// a record is data, reported as `None`, never as an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("usage store unavailable: {0}")]
    Unavailable(String),
}

/// Outcome of a guarded increment.
#[derive(Debug, Clone, PartialEq)]
pub enum StrictIncrement {
    /// The counter moved; here is the updated record.
    Applied(UsageRecord),
    /// The increment would have pushed the counter past `limit`.
    LimitReached { used: i64, limit: i64 },
}

/// Month-scoped usage counters keyed by actor.
///
/// `now` is passed in rather than read from a wall clock so implementations
/// stay deterministic under test. Mutations must land in the period
/// containing `now`: an implementation that finds a stale record rolls it
/// forward to a fresh month before applying the change.
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn load(&self, actor_id: ActorId) -> Result<Option<UsageRecord>, StoreError>;

    async fn save(&self, record: UsageRecord) -> Result<UsageRecord, StoreError>;

    /// Atomically adds `amount` to one counter.
    async fn increment(
        &self,
        actor_id: ActorId,
        kind: QuotaKind,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<UsageRecord, StoreError>;

    /// Adds `amount` only if the result stays within `limit`, under a single
    /// mutation. Backends that push the comparison into the storage engine
    /// close the check-then-act window entirely.
    async fn increment_if_within(
        &self,
        actor_id: ActorId,
        kind: QuotaKind,
        amount: i64,
        limit: i64,
        now: DateTime<Utc>,
    ) -> Result<StrictIncrement, StoreError>;

    /// Replaces whatever is stored with a zeroed record for the current
    /// period. Safe to repeat.
    async fn reset_period(
        &self,
        actor_id: ActorId,
        now: DateTime<Utc>,
    ) -> Result<UsageRecord, StoreError>;
}

/// DashMap-backed store for tests, local development, and single-node
/// deployments. Entry locks make every mutation atomic per actor.
#[derive(Debug, Default)]
pub struct InMemoryUsageStore {
    records: DashMap<ActorId, UsageRecord>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl UsageStore for InMemoryUsageStore {
    async fn load(&self, actor_id: ActorId) -> Result<Option<UsageRecord>, StoreError> {
        Ok(self.records.get(&actor_id).map(|r| r.clone()))
    }

    async fn save(&self, record: UsageRecord) -> Result<UsageRecord, StoreError> {
        self.records.insert(record.actor_id, record.clone());
        Ok(record)
    }

    async fn increment(
        &self,
        actor_id: ActorId,
        kind: QuotaKind,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Result<UsageRecord, StoreError> {
        let mut entry = self
            .records
            .entry(actor_id)
            .or_insert_with(|| UsageRecord::fresh(actor_id, now));
        if entry.is_stale(now) {
            *entry = UsageRecord::fresh(actor_id, now);
        }
        entry.add(kind, amount, now);
        Ok(entry.clone())
    }

    async fn increment_if_within(
        &self,
        actor_id: ActorId,
        kind: QuotaKind,
        amount: i64,
        limit: i64,
        now: DateTime<Utc>,
    ) -> Result<StrictIncrement, StoreError> {
        let mut entry = self
            .records
            .entry(actor_id)
            .or_insert_with(|| UsageRecord::fresh(actor_id, now));
        if entry.is_stale(now) {
            *entry = UsageRecord::fresh(actor_id, now);
        }
        let used = entry.count(kind);
        if limit != UNLIMITED && used + amount > limit {
            return Ok(StrictIncrement::LimitReached { used, limit });
        }
        entry.add(kind, amount, now);
        Ok(StrictIncrement::Applied(entry.clone()))
    }

    async fn reset_period(
        &self,
        actor_id: ActorId,
        now: DateTime<Utc>,
    ) -> Result<UsageRecord, StoreError> {
        let fresh = UsageRecord::fresh(actor_id, now);
        self.records.insert(actor_id, fresh.clone());
        Ok(fresh)
    }
}
