//! The usage meter: cached reads, bounded store calls, calendar rollover,
//! and failure-policy degradation behind one handle.

use crate::cache::{CacheProvider, UsageCache};
use crate::config::{FailurePolicy, MeterConfig};
use crate::record::UsageRecord;
use crate::store::{StoreError, StrictIncrement, UsageStore};
use chrono::{DateTime, Utc};
use lane_catalog::TierCatalog;
use lane_common::{
    ActorId, Counter, QuotaKind, Tier, TracingEventSink, UsageEvent, UsageEventSink, UNLIMITED,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Injectable time source. Tests pin it; production uses `Utc::now`.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Error)]
pub enum MeterError {
    /// The store failed or timed out and the configuration said not to
    /// absorb it.
    #[error("usage store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for MeterError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => MeterError::StoreUnavailable(msg),
        }
    }
}

/// Result of a quota admission check.
///
/// `remaining` is headroom before the prospective amount is consumed,
/// floored at zero. Unlimited quotas report the sentinel unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaCheck {
    pub allowed: bool,
    pub used: i64,
    pub remaining: i64,
    pub limit: i64,
}

/// One row of a usage summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
    pub used: i64,
    pub limit: i64,
    pub remaining: i64,
}

/// Point-in-time meter statistics.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MeterStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub rollovers: u64,
    pub increments: u64,
    pub failed_open: u64,
}

#[derive(Debug, Default)]
struct MeterCounters {
    cache_hits: Counter,
    cache_misses: Counter,
    rollovers: Counter,
    increments: Counter,
    failed_open: Counter,
}

/// Tracks per-actor monthly consumption against catalog limits.
///
/// Reads go cache-first with the store as the source of truth; writes hit
/// the store first and refresh the cache afterwards. Every store call is
/// bounded by the configured timeout, and a timeout is treated as store
/// unavailability.
pub struct UsageMeter {
    store: Arc<dyn UsageStore>,
    cache: UsageCache,
    catalog: Arc<TierCatalog>,
    events: Arc<dyn UsageEventSink>,
    config: MeterConfig,
    clock: Clock,
    counters: MeterCounters,
}

impl UsageMeter {
    pub fn new(
        store: Arc<dyn UsageStore>,
        catalog: Arc<TierCatalog>,
        config: MeterConfig,
    ) -> Self {
        let cache = UsageCache::in_process(config.cache_ttl(), config.cache_capacity);
        Self {
            store,
            cache,
            catalog,
            events: Arc::new(TracingEventSink),
            config,
            clock: Arc::new(Utc::now),
            counters: MeterCounters::default(),
        }
    }

    /// Switches caching to a shared backend. Provider calls are bounded by
    /// the same timeout as store calls.
    pub fn with_cache_provider(mut self, provider: Arc<dyn CacheProvider>) -> Self {
        self.cache = UsageCache::shared(
            provider,
            self.config.cache_ttl(),
            self.config.store_timeout(),
        );
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn UsageEventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Pins the meter to an explicit time source.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Current instant according to the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Current-period usage for an actor, reading through the cache.
    ///
    /// Creates and persists a fresh record on first access, rolls a stale
    /// record into the new month, and under `FailOpen` degrades a store
    /// outage into an unpersisted zero-usage snapshot.
    pub async fn get_usage(&self, actor_id: ActorId) -> Result<UsageRecord, MeterError> {
        let now = self.now();

        if let Some(cached) = self.cache.get(actor_id).await {
            if cached.is_current(now) {
                self.counters.cache_hits.incr();
                return Ok(cached);
            }
            // Month flipped inside the TTL window; treat as a miss.
        }
        self.counters.cache_misses.incr();

        match self.bounded(self.store.load(actor_id)).await {
            Ok(Some(record)) if record.is_current(now) => {
                self.cache.put(&record).await;
                Ok(record)
            }
            Ok(_) => self.roll_over(actor_id, now).await,
            Err(e) => self.absorb_read_failure(actor_id, now, e),
        }
    }

    /// Evaluates one prospective consumption against an already-loaded
    /// record. Pure; request paths holding a context snapshot use this
    /// without touching store or cache.
    pub fn check_snapshot(
        &self,
        record: &UsageRecord,
        kind: QuotaKind,
        tier: Tier,
        amount: i64,
    ) -> QuotaCheck {
        let limit = self.catalog.limit(tier, kind);
        let used = record.count(kind);
        if limit == UNLIMITED {
            return QuotaCheck { allowed: true, used, remaining: UNLIMITED, limit };
        }
        QuotaCheck {
            allowed: used + amount <= limit,
            used,
            remaining: (limit - used).max(0),
            limit,
        }
    }

    /// Loads current usage and evaluates one prospective consumption.
    pub async fn can_increment(
        &self,
        actor_id: ActorId,
        kind: QuotaKind,
        tier: Tier,
        amount: i64,
    ) -> Result<QuotaCheck, MeterError> {
        let record = self.get_usage(actor_id).await?;
        Ok(self.check_snapshot(&record, kind, tier, amount))
    }

    /// Adds `amount` to a counter, unconditionally.
    ///
    /// Callers are expected to check first; the check-then-increment window
    /// is accepted, so a counter can briefly exceed its limit under
    /// contention. Write failures always surface regardless of failure
    /// policy.
    pub async fn increment_usage(
        &self,
        actor_id: ActorId,
        kind: QuotaKind,
        amount: i64,
    ) -> Result<UsageRecord, MeterError> {
        let now = self.now();
        let updated = self
            .bounded(self.store.increment(actor_id, kind, amount, now))
            .await?;
        self.cache.put(&updated).await;
        self.counters.increments.incr();
        self.events.record(UsageEvent { actor_id, kind, amount, timestamp: now });
        Ok(updated)
    }

    /// Guarded increment: the limit comparison and the write happen under
    /// one store mutation, closing the check-then-increment window.
    pub async fn increment_usage_strict(
        &self,
        actor_id: ActorId,
        kind: QuotaKind,
        tier: Tier,
        amount: i64,
    ) -> Result<StrictIncrement, MeterError> {
        let now = self.now();
        let limit = self.catalog.limit(tier, kind);
        let outcome = self
            .bounded(self.store.increment_if_within(actor_id, kind, amount, limit, now))
            .await?;
        if let StrictIncrement::Applied(record) = &outcome {
            self.cache.put(record).await;
            self.counters.increments.incr();
            self.events.record(UsageEvent { actor_id, kind, amount, timestamp: now });
        }
        Ok(outcome)
    }

    /// Per-kind usage against the limits of `tier`. Only kinds the tier
    /// carries appear.
    pub async fn usage_summary(
        &self,
        actor_id: ActorId,
        tier: Tier,
    ) -> Result<BTreeMap<QuotaKind, QuotaUsage>, MeterError> {
        let record = self.get_usage(actor_id).await?;
        let mut summary = BTreeMap::new();
        if let Ok(profile) = self.catalog.profile(tier) {
            for (kind, limit) in &profile.quota_limits {
                let used = record.count(*kind);
                let remaining = if *limit == UNLIMITED {
                    UNLIMITED
                } else {
                    (*limit - used).max(0)
                };
                summary.insert(*kind, QuotaUsage { used, limit: *limit, remaining });
            }
        }
        Ok(summary)
    }

    /// Wipes an actor's counters back to zero for the current period.
    /// Administrative operation; errors always surface.
    pub async fn reset_usage(&self, actor_id: ActorId) -> Result<UsageRecord, MeterError> {
        let now = self.now();
        let fresh = self.bounded(self.store.reset_period(actor_id, now)).await?;
        self.cache.invalidate(actor_id).await;
        self.cache.put(&fresh).await;
        tracing::info!(actor_id = %actor_id, "usage counters reset");
        Ok(fresh)
    }

    pub fn stats(&self) -> MeterStats {
        MeterStats {
            cache_hits: self.counters.cache_hits.value(),
            cache_misses: self.counters.cache_misses.value(),
            rollovers: self.counters.rollovers.value(),
            increments: self.counters.increments.value(),
            failed_open: self.counters.failed_open.value(),
        }
    }

    /// Persists a zeroed record for the month containing `now` and makes it
    /// the cached truth. Serves first access and period rollover alike.
    async fn roll_over(
        &self,
        actor_id: ActorId,
        now: DateTime<Utc>,
    ) -> Result<UsageRecord, MeterError> {
        let fresh = UsageRecord::fresh(actor_id, now);
        let saved = match self.bounded(self.store.save(fresh)).await {
            Ok(saved) => saved,
            Err(e) => return self.absorb_read_failure(actor_id, now, e),
        };
        self.cache.invalidate(actor_id).await;
        self.cache.put(&saved).await;
        self.counters.rollovers.incr();
        Ok(saved)
    }

    /// Applies the configured failure policy to a read-path store error.
    /// The fail-open snapshot is neither persisted nor cached, so the next
    /// read retries the store.
    fn absorb_read_failure(
        &self,
        actor_id: ActorId,
        now: DateTime<Utc>,
        error: StoreError,
    ) -> Result<UsageRecord, MeterError> {
        match self.config.failure_policy {
            FailurePolicy::FailOpen => {
                self.counters.failed_open.incr();
                tracing::warn!(
                    actor_id = %actor_id,
                    error = %error,
                    "usage store unavailable, serving zero-usage snapshot"
                );
                Ok(UsageRecord::fresh(actor_id, now))
            }
            FailurePolicy::FailClosed => Err(error.into()),
        }
    }

    /// Runs a store call under the configured timeout.
    async fn bounded<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let limit = self.config.store_timeout();
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!("store call exceeded {limit:?}"))),
        }
    }
}
