//! The tier catalog and its build-time validation.

use crate::profile::TierProfile;
use lane_common::{FeatureFlag, QuotaKind, Tier, UNLIMITED};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("unknown tier: {0}")]
    UnknownTier(Tier),

    #[error("no profile registered for tier {0}")]
    MissingProfile(Tier),

    #[error("tier {0} registered twice")]
    DuplicateTier(Tier),

    #[error("tiers {first} and {second} share rank {rank}")]
    DuplicateRank { rank: u8, first: Tier, second: Tier },

    #[error("limit {limit} for {kind} on tier {tier} is below the unlimited sentinel")]
    InvalidLimit { tier: Tier, kind: QuotaKind, limit: i64 },
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    rank: u8,
    profile: TierProfile,
}

/// Immutable registry of tier profiles and the rank ladder.
///
/// Built once at startup. All request-path lookups are infallible
/// conveniences that lean towards denial: an unregistered tier has no
/// features and a zero limit everywhere.
#[derive(Debug, Clone)]
pub struct TierCatalog {
    entries: HashMap<Tier, CatalogEntry>,
    lowest: Tier,
}

impl TierCatalog {
    pub fn builder() -> TierCatalogBuilder {
        TierCatalogBuilder::default()
    }

    /// The tier ladder Hirelane ships with.
    pub fn hirelane_default() -> Self {
        let free = TierProfile::new()
            .with_limit(QuotaKind::JobApplications, 5)
            .with_limit(QuotaKind::ResumeExports, 3)
            .with_limit(QuotaKind::CoverLetters, 3)
            .with_limit(QuotaKind::AutoApplies, 0)
            .with_limit(QuotaKind::InterviewSessions, 1);

        let starter = TierProfile::new()
            .with_limit(QuotaKind::JobApplications, 30)
            .with_limit(QuotaKind::ResumeExports, 20)
            .with_limit(QuotaKind::CoverLetters, 25)
            .with_limit(QuotaKind::AutoApplies, 0)
            .with_limit(QuotaKind::InterviewSessions, 10)
            .with_feature(FeatureFlag::PremiumTemplates);

        let pro = TierProfile::new()
            .with_limit(QuotaKind::JobApplications, 200)
            .with_limit(QuotaKind::ResumeExports, UNLIMITED)
            .with_limit(QuotaKind::CoverLetters, 150)
            .with_limit(QuotaKind::AutoApplies, 50)
            .with_limit(QuotaKind::InterviewSessions, 60)
            .with_feature(FeatureFlag::PremiumTemplates)
            .with_feature(FeatureFlag::AdvancedAnalytics)
            .with_feature(FeatureFlag::AutoApply)
            .with_feature(FeatureFlag::PrioritySupport);

        let mut entries = HashMap::new();
        entries.insert(Tier::Free, CatalogEntry { rank: 0, profile: free });
        entries.insert(Tier::Starter, CatalogEntry { rank: 10, profile: starter });
        entries.insert(Tier::Pro, CatalogEntry { rank: 20, profile: pro });
        entries.insert(
            Tier::Elite,
            CatalogEntry { rank: 30, profile: TierProfile::unlimited() },
        );

        Self { entries, lowest: Tier::Free }
    }

    pub fn profile(&self, tier: Tier) -> Result<&TierProfile, CatalogError> {
        self.entries
            .get(&tier)
            .map(|e| &e.profile)
            .ok_or(CatalogError::UnknownTier(tier))
    }

    pub fn rank(&self, tier: Tier) -> Result<u8, CatalogError> {
        self.entries
            .get(&tier)
            .map(|e| e.rank)
            .ok_or(CatalogError::UnknownTier(tier))
    }

    /// True when `actual` ranks at or above `required`. Unregistered tiers
    /// never satisfy anything.
    pub fn at_least(&self, actual: Tier, required: Tier) -> bool {
        match (self.rank(actual), self.rank(required)) {
            (Ok(a), Ok(r)) => a >= r,
            _ => false,
        }
    }

    /// The fail-safe tier assigned when an actor's tier cannot be resolved.
    pub fn lowest_tier(&self) -> Tier {
        self.lowest
    }

    /// Monthly limit for `kind` on `tier`; zero when either is unregistered.
    pub fn limit(&self, tier: Tier, kind: QuotaKind) -> i64 {
        self.profile(tier).map(|p| p.limit(kind)).unwrap_or(0)
    }

    pub fn has_feature(&self, tier: Tier, feature: FeatureFlag) -> bool {
        self.profile(tier).map(|p| p.has_feature(feature)).unwrap_or(false)
    }

    /// True when at least one tier puts a (possibly unlimited) limit on `kind`.
    pub fn any_tier_carries(&self, kind: QuotaKind) -> bool {
        self.entries.values().any(|e| e.profile.carries(kind))
    }
}

impl Default for TierCatalog {
    fn default() -> Self {
        Self::hirelane_default()
    }
}

/// Collects tier registrations and validates the whole table at once.
#[derive(Debug, Default)]
pub struct TierCatalogBuilder {
    registrations: Vec<(Tier, u8, TierProfile)>,
}

impl TierCatalogBuilder {
    pub fn tier(mut self, tier: Tier, rank: u8, profile: TierProfile) -> Self {
        self.registrations.push((tier, rank, profile));
        self
    }

    /// Validates and freezes the catalog.
    ///
    /// Rejects double registrations, missing tiers, shared ranks, and limits
    /// below the unlimited sentinel. Meant to run at startup where any error
    /// is fatal.
    pub fn build(self) -> Result<TierCatalog, CatalogError> {
        let mut entries: HashMap<Tier, CatalogEntry> = HashMap::new();

        for (tier, rank, profile) in self.registrations {
            for (kind, limit) in &profile.quota_limits {
                if *limit < UNLIMITED {
                    return Err(CatalogError::InvalidLimit { tier, kind: *kind, limit: *limit });
                }
            }
            if entries.insert(tier, CatalogEntry { rank, profile }).is_some() {
                return Err(CatalogError::DuplicateTier(tier));
            }
        }

        for tier in Tier::ALL {
            if !entries.contains_key(&tier) {
                return Err(CatalogError::MissingProfile(tier));
            }
        }

        let mut by_rank: HashMap<u8, Tier> = HashMap::new();
        for (tier, entry) in &entries {
            if let Some(first) = by_rank.insert(entry.rank, *tier) {
                return Err(CatalogError::DuplicateRank {
                    rank: entry.rank,
                    first,
                    second: *tier,
                });
            }
        }

        let lowest = Tier::ALL
            .iter()
            .copied()
            .min_by_key(|t| entries.get(t).map(|e| e.rank).unwrap_or(u8::MAX))
            .unwrap_or(Tier::Free);

        Ok(TierCatalog { entries, lowest })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_profile() -> TierProfile {
        TierProfile::new().with_limit(QuotaKind::JobApplications, 1)
    }

    fn full_builder() -> TierCatalogBuilder {
        TierCatalog::builder()
            .tier(Tier::Free, 0, minimal_profile())
            .tier(Tier::Starter, 1, minimal_profile())
            .tier(Tier::Pro, 2, minimal_profile())
            .tier(Tier::Elite, 3, minimal_profile())
    }

    #[test]
    fn test_default_table_passes_builder_validation() {
        let default = TierCatalog::hirelane_default();
        let rebuilt = TierCatalog::builder()
            .tier(Tier::Free, 0, default.profile(Tier::Free).unwrap().clone())
            .tier(Tier::Starter, 10, default.profile(Tier::Starter).unwrap().clone())
            .tier(Tier::Pro, 20, default.profile(Tier::Pro).unwrap().clone())
            .tier(Tier::Elite, 30, default.profile(Tier::Elite).unwrap().clone())
            .build();
        assert!(rebuilt.is_ok());
    }

    #[test]
    fn test_rank_comparison_is_total_over_the_ladder() {
        let catalog = TierCatalog::hirelane_default();
        for a in Tier::ALL {
            for b in Tier::ALL {
                let expected = catalog.rank(a).unwrap() >= catalog.rank(b).unwrap();
                assert_eq!(catalog.at_least(a, b), expected, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_every_tier_satisfies_itself() {
        let catalog = TierCatalog::hirelane_default();
        for tier in Tier::ALL {
            assert!(catalog.at_least(tier, tier));
        }
    }

    #[test]
    fn test_lowest_tier_is_free() {
        assert_eq!(TierCatalog::hirelane_default().lowest_tier(), Tier::Free);
    }

    #[test]
    fn test_missing_profile_rejected() {
        let err = TierCatalog::builder()
            .tier(Tier::Free, 0, minimal_profile())
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::MissingProfile(_)));
    }

    #[test]
    fn test_double_registration_rejected() {
        let err = full_builder()
            .tier(Tier::Free, 9, minimal_profile())
            .build()
            .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateTier(Tier::Free));
    }

    #[test]
    fn test_shared_rank_rejected() {
        let err = TierCatalog::builder()
            .tier(Tier::Free, 0, minimal_profile())
            .tier(Tier::Starter, 0, minimal_profile())
            .tier(Tier::Pro, 2, minimal_profile())
            .tier(Tier::Elite, 3, minimal_profile())
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateRank { rank: 0, .. }));
    }

    #[test]
    fn test_limit_below_sentinel_rejected() {
        let err = TierCatalog::builder()
            .tier(
                Tier::Free,
                0,
                TierProfile::new().with_limit(QuotaKind::ResumeExports, -2),
            )
            .tier(Tier::Starter, 1, minimal_profile())
            .tier(Tier::Pro, 2, minimal_profile())
            .tier(Tier::Elite, 3, minimal_profile())
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::InvalidLimit { kind: QuotaKind::ResumeExports, limit: -2, .. }
        ));
    }

    #[test]
    fn test_zero_limit_and_absent_feature_deny() {
        let catalog = TierCatalog::hirelane_default();
        assert_eq!(catalog.limit(Tier::Free, QuotaKind::AutoApplies), 0);
        assert!(!catalog.has_feature(Tier::Free, FeatureFlag::ApiAccess));
    }

    #[test]
    fn test_default_limits_match_the_published_ladder() {
        let catalog = TierCatalog::hirelane_default();
        assert_eq!(catalog.limit(Tier::Free, QuotaKind::JobApplications), 5);
        assert_eq!(catalog.limit(Tier::Starter, QuotaKind::JobApplications), 30);
        assert_eq!(catalog.limit(Tier::Pro, QuotaKind::ResumeExports), UNLIMITED);
        assert_eq!(catalog.limit(Tier::Elite, QuotaKind::AutoApplies), UNLIMITED);
        assert!(catalog.has_feature(Tier::Pro, FeatureFlag::AutoApply));
        assert!(!catalog.has_feature(Tier::Starter, FeatureFlag::AutoApply));
    }
}
