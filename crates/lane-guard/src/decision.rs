//! Decision and denial types returned by the engine.

use chrono::{DateTime, Utc};
use lane_common::{FeatureFlag, QuotaKind, Tier};
use serde::Serialize;
use std::fmt;

/// Why a request was refused. Denials are verdicts, not errors: producing
/// one is the engine doing its job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenyReason {
    /// No authenticated actor on the request.
    Unauthenticated,
    /// The actor's tier ranks below the operation's minimum.
    InsufficientTier { required: Tier, actual: Tier },
    /// The operation needs a feature the actor's tier does not grant.
    FeatureUnavailable { feature: FeatureFlag },
    /// The monthly counter cannot absorb the demanded amount.
    UsageLimitExceeded { kind: QuotaKind, used: i64, limit: i64 },
}

impl DenyReason {
    /// Stable label for logs and counters.
    pub fn label(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "unauthenticated",
            DenyReason::InsufficientTier { .. } => "insufficient_tier",
            DenyReason::FeatureUnavailable { .. } => "feature_unavailable",
            DenyReason::UsageLimitExceeded { .. } => "usage_limit_exceeded",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Unauthenticated => write!(f, "request is not authenticated"),
            DenyReason::InsufficientTier { required, actual } => {
                write!(f, "requires the {required} tier or higher, account is on {actual}")
            }
            DenyReason::FeatureUnavailable { feature } => {
                write!(f, "feature {feature} is not part of the current plan")
            }
            DenyReason::UsageLimitExceeded { kind, used, limit } => {
                write!(f, "monthly {kind} limit reached ({used} of {limit} used)")
            }
        }
    }
}

/// Outcome of evaluating one operation for one request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessDecision {
    pub operation: String,
    pub allowed: bool,
    pub reason: Option<DenyReason>,
    pub decided_at: DateTime<Utc>,
}

impl AccessDecision {
    pub fn allow(operation: impl Into<String>, decided_at: DateTime<Utc>) -> Self {
        Self { operation: operation.into(), allowed: true, reason: None, decided_at }
    }

    pub fn deny(
        operation: impl Into<String>,
        reason: DenyReason,
        decided_at: DateTime<Utc>,
    ) -> Self {
        Self {
            operation: operation.into(),
            allowed: false,
            reason: Some(reason),
            decided_at,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }
}
