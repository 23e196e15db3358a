//! Request identity and the adapter that hydrates it at ingress.

use chrono::{DateTime, Utc};
use lane_common::{ActorId, Tier};
use lane_metering::{UsageMeter, UsageRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The authenticated account a request runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    /// Resolved subscription tier. `None` means resolution failed upstream;
    /// the engine then assumes the lowest tier.
    pub tier: Option<Tier>,
}

impl Actor {
    pub fn new(id: ActorId, tier: Tier) -> Self {
        Self { id, tier: Some(tier) }
    }

    /// Actor whose tier could not be resolved.
    pub fn untiered(id: ActorId) -> Self {
        Self { id, tier: None }
    }
}

/// Per-request view the engine evaluates: who is asking, optionally with a
/// usage snapshot loaded once at ingress so repeated checks within the same
/// request avoid extra metering reads.
#[derive(Debug, Clone)]
pub struct RequestContext {
    actor: Option<Actor>,
    usage: Option<UsageRecord>,
    received_at: DateTime<Utc>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self { actor: None, usage: None, received_at: Utc::now() }
    }

    pub fn for_actor(actor: Actor) -> Self {
        Self { actor: Some(actor), usage: None, received_at: Utc::now() }
    }

    pub fn with_usage(mut self, usage: UsageRecord) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn actor(&self) -> Option<Actor> {
        self.actor
    }

    pub fn usage(&self) -> Option<&UsageRecord> {
        self.usage.as_ref()
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

/// Builds request contexts at the service edge.
pub struct ContextAdapter {
    meter: Arc<UsageMeter>,
}

impl ContextAdapter {
    pub fn new(meter: Arc<UsageMeter>) -> Self {
        Self { meter }
    }

    /// Context for an authenticated actor, with a best-effort usage
    /// snapshot. A metering failure downgrades to a context without a
    /// snapshot instead of failing the request.
    pub async fn attach(&self, actor: Actor) -> RequestContext {
        let ctx = RequestContext::for_actor(actor);
        match self.meter.get_usage(actor.id).await {
            Ok(usage) => ctx.with_usage(usage),
            Err(e) => {
                tracing::warn!(
                    actor_id = %actor.id,
                    error = %e,
                    "usage snapshot unavailable, continuing without one"
                );
                ctx
            }
        }
    }

    /// Context for an unauthenticated request.
    pub fn anonymous(&self) -> RequestContext {
        RequestContext::anonymous()
    }
}
