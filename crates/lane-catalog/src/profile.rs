//! Per-tier entitlement profile.

use lane_common::{FeatureFlag, QuotaKind, UNLIMITED};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// What one tier grants: a numeric monthly limit per quota kind and a set
/// of feature flags.
///
/// A quota kind absent from `quota_limits` is treated as a limit of zero,
/// so leaving a kind out denies it rather than opening it up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TierProfile {
    pub quota_limits: HashMap<QuotaKind, i64>,
    pub features: HashSet<FeatureFlag>,
}

impl TierProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile with every quota kind uncapped and every feature granted.
    pub fn unlimited() -> Self {
        Self {
            quota_limits: QuotaKind::ALL.iter().map(|k| (*k, UNLIMITED)).collect(),
            features: FeatureFlag::ALL.iter().copied().collect(),
        }
    }

    pub fn with_limit(mut self, kind: QuotaKind, limit: i64) -> Self {
        self.quota_limits.insert(kind, limit);
        self
    }

    pub fn with_feature(mut self, feature: FeatureFlag) -> Self {
        self.features.insert(feature);
        self
    }

    /// Monthly limit for `kind`; zero when the profile does not carry it.
    pub fn limit(&self, kind: QuotaKind) -> i64 {
        self.quota_limits.get(&kind).copied().unwrap_or(0)
    }

    pub fn has_feature(&self, feature: FeatureFlag) -> bool {
        self.features.contains(&feature)
    }

    pub fn carries(&self, kind: QuotaKind) -> bool {
        self.quota_limits.contains_key(&kind)
    }
}
