//! Operation policies and the registry that owns them.

use lane_catalog::{CatalogError, TierCatalog};
use lane_common::{FeatureFlag, QuotaKind, Tier};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Declarative requirements for one operation. Any subset of the three
/// checks may be present; an empty policy allows every authenticated actor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessPolicy {
    pub min_tier: Option<Tier>,
    pub required_feature: Option<FeatureFlag>,
    pub quota: Option<QuotaDemand>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_tier(mut self, tier: Tier) -> Self {
        self.min_tier = Some(tier);
        self
    }

    pub fn with_feature(mut self, feature: FeatureFlag) -> Self {
        self.required_feature = Some(feature);
        self
    }

    pub fn with_quota(mut self, kind: QuotaKind, amount: i64) -> Self {
        self.quota = Some(QuotaDemand { kind, amount });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.min_tier.is_none() && self.required_feature.is_none() && self.quota.is_none()
    }
}

/// Metered consumption an operation claims when it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaDemand {
    pub kind: QuotaKind,
    pub amount: i64,
}

impl QuotaDemand {
    pub fn one(kind: QuotaKind) -> Self {
        Self { kind, amount: 1 }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("operation {operation} registered twice")]
    DuplicateOperation { operation: String },

    #[error("operation {operation} requires a tier missing from the catalog: {source}")]
    UnknownTier {
        operation: String,
        #[source]
        source: CatalogError,
    },

    #[error("operation {operation} meters {kind}, which no tier carries")]
    UnmeteredKind { operation: String, kind: QuotaKind },

    #[error("operation {operation} demands a non-positive quota amount ({amount})")]
    InvalidAmount { operation: String, amount: i64 },
}

/// Maps operation identifiers to policies.
///
/// Unregistered operations resolve to the shared empty policy, which
/// requires nothing beyond authentication. Gating an operation always
/// takes an explicit registration.
#[derive(Debug, Clone)]
pub struct PolicyRegistry {
    policies: HashMap<String, AccessPolicy>,
    empty: AccessPolicy,
}

impl PolicyRegistry {
    pub fn builder() -> PolicyRegistryBuilder {
        PolicyRegistryBuilder::default()
    }

    pub fn lookup(&self, operation: &str) -> &AccessPolicy {
        self.policies.get(operation).unwrap_or(&self.empty)
    }

    pub fn is_registered(&self, operation: &str) -> bool {
        self.policies.contains_key(operation)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

/// Collects registrations and validates them against the catalog in one
/// pass at startup.
#[derive(Debug, Default)]
pub struct PolicyRegistryBuilder {
    registrations: Vec<(String, AccessPolicy)>,
}

impl PolicyRegistryBuilder {
    pub fn operation(mut self, id: impl Into<String>, policy: AccessPolicy) -> Self {
        self.registrations.push((id.into(), policy));
        self
    }

    pub fn build(self, catalog: &TierCatalog) -> Result<PolicyRegistry, RegistryError> {
        let mut policies = HashMap::new();
        for (operation, policy) in self.registrations {
            if let Some(tier) = policy.min_tier {
                if let Err(source) = catalog.rank(tier) {
                    return Err(RegistryError::UnknownTier { operation, source });
                }
            }
            if let Some(demand) = policy.quota {
                if demand.amount < 1 {
                    return Err(RegistryError::InvalidAmount {
                        operation,
                        amount: demand.amount,
                    });
                }
                if !catalog.any_tier_carries(demand.kind) {
                    return Err(RegistryError::UnmeteredKind { operation, kind: demand.kind });
                }
            }
            if policies.insert(operation.clone(), policy).is_some() {
                return Err(RegistryError::DuplicateOperation { operation });
            }
        }
        Ok(PolicyRegistry { policies, empty: AccessPolicy::default() })
    }
}
