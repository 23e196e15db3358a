//! The access decision engine.

use crate::context::RequestContext;
use crate::decision::{AccessDecision, DenyReason};
use crate::policy::{PolicyRegistry, QuotaDemand};
use chrono::{DateTime, Utc};
use lane_catalog::TierCatalog;
use lane_common::{ActorId, Counter, Tier};
use lane_metering::{MeterError, QuotaCheck, UsageMeter};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error(transparent)]
    Metering(#[from] MeterError),
}

/// Point-in-time engine statistics.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EngineStats {
    pub allowed: u64,
    pub denied_unauthenticated: u64,
    pub denied_tier: u64,
    pub denied_feature: u64,
    pub denied_quota: u64,
}

#[derive(Debug, Default)]
struct EngineCounters {
    allowed: Counter,
    denied_unauthenticated: Counter,
    denied_tier: Counter,
    denied_feature: Counter,
    denied_quota: Counter,
}

/// Combines tier rank, feature availability, and quota headroom into one
/// allow/deny verdict per operation.
///
/// Checks run cheapest-first and short-circuit: authentication, then tier
/// rank, then feature, then quota. Only the quota step can touch storage,
/// so requests refused earlier never pay for a metering read.
pub struct AccessEngine {
    catalog: Arc<TierCatalog>,
    registry: Arc<PolicyRegistry>,
    meter: Arc<UsageMeter>,
    counters: EngineCounters,
}

impl AccessEngine {
    pub fn new(
        catalog: Arc<TierCatalog>,
        registry: Arc<PolicyRegistry>,
        meter: Arc<UsageMeter>,
    ) -> Self {
        Self { catalog, registry, meter, counters: EngineCounters::default() }
    }

    /// Evaluates `operation` for the request without consuming anything.
    ///
    /// Denials come back as `Ok` decisions; `Err` is reserved for metering
    /// failures the configured failure policy refuses to absorb.
    pub async fn decide(
        &self,
        ctx: &RequestContext,
        operation: &str,
    ) -> Result<AccessDecision, GuardError> {
        let policy = self.registry.lookup(operation);
        let now = self.meter.now();

        let Some(actor) = ctx.actor() else {
            return Ok(self.denied(operation, DenyReason::Unauthenticated, now));
        };

        let tier = actor.tier.unwrap_or_else(|| self.catalog.lowest_tier());

        if let Some(required) = policy.min_tier {
            if !self.catalog.at_least(tier, required) {
                return Ok(self.denied(
                    operation,
                    DenyReason::InsufficientTier { required, actual: tier },
                    now,
                ));
            }
        }

        if let Some(feature) = policy.required_feature {
            if !self.catalog.has_feature(tier, feature) {
                return Ok(self.denied(
                    operation,
                    DenyReason::FeatureUnavailable { feature },
                    now,
                ));
            }
        }

        if let Some(demand) = policy.quota {
            let check = self.quota_check(ctx, actor.id, tier, demand).await?;
            if !check.allowed {
                return Ok(self.denied(
                    operation,
                    DenyReason::UsageLimitExceeded {
                        kind: demand.kind,
                        used: check.used,
                        limit: check.limit,
                    },
                    now,
                ));
            }
        }

        self.counters.allowed.incr();
        Ok(AccessDecision::allow(operation, now))
    }

    /// Decides and, when a metered operation is allowed, records the
    /// demanded consumption.
    ///
    /// The check and the increment are two store operations, so two racing
    /// requests can both pass before either records; that window is
    /// accepted. A failed increment always surfaces: the caller must not
    /// proceed on consumption that was never recorded.
    pub async fn enforce(
        &self,
        ctx: &RequestContext,
        operation: &str,
    ) -> Result<AccessDecision, GuardError> {
        let decision = self.decide(ctx, operation).await?;
        if decision.allowed {
            if let (Some(actor), Some(demand)) =
                (ctx.actor(), self.registry.lookup(operation).quota)
            {
                self.meter
                    .increment_usage(actor.id, demand.kind, demand.amount)
                    .await?;
            }
        }
        Ok(decision)
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            allowed: self.counters.allowed.value(),
            denied_unauthenticated: self.counters.denied_unauthenticated.value(),
            denied_tier: self.counters.denied_tier.value(),
            denied_feature: self.counters.denied_feature.value(),
            denied_quota: self.counters.denied_quota.value(),
        }
    }

    /// Quota admission for one demand. An attached snapshot skips the
    /// metering read, but only while it is still inside its period; a
    /// snapshot that straddled a month boundary falls back to the meter.
    async fn quota_check(
        &self,
        ctx: &RequestContext,
        actor_id: ActorId,
        tier: Tier,
        demand: QuotaDemand,
    ) -> Result<QuotaCheck, GuardError> {
        if let Some(snapshot) = ctx.usage() {
            if snapshot.is_current(self.meter.now()) {
                return Ok(self
                    .meter
                    .check_snapshot(snapshot, demand.kind, tier, demand.amount));
            }
        }
        Ok(self
            .meter
            .can_increment(actor_id, demand.kind, tier, demand.amount)
            .await?)
    }

    fn denied(&self, operation: &str, reason: DenyReason, now: DateTime<Utc>) -> AccessDecision {
        match reason {
            DenyReason::Unauthenticated => self.counters.denied_unauthenticated.incr(),
            DenyReason::InsufficientTier { .. } => self.counters.denied_tier.incr(),
            DenyReason::FeatureUnavailable { .. } => self.counters.denied_feature.incr(),
            DenyReason::UsageLimitExceeded { .. } => self.counters.denied_quota.incr(),
        }
        tracing::debug!(operation, reason = reason.label(), detail = %reason, "access denied");
        AccessDecision::deny(operation, reason, now)
    }
}
