//! Tier ladder and entitlement vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Sentinel limit meaning "no numeric cap for this quota kind".
///
/// The sentinel flows unchanged through quota checks so callers can tell
/// "unlimited" apart from "nothing left".
pub const UNLIMITED: i64 = -1;

/// Subscription tiers.
///
/// Deliberately does not implement `Ord`: precedence comes from the rank
/// table in the catalog, never from declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Free,
    Starter,
    Pro,
    Elite,
}

impl Tier {
    /// Every tier the product ships. Catalog validation iterates this.
    pub const ALL: [Tier; 4] = [Tier::Free, Tier::Starter, Tier::Pro, Tier::Elite];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Starter => "starter",
            Tier::Pro => "pro",
            Tier::Elite => "elite",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metered actions capped per calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QuotaKind {
    JobApplications,
    ResumeExports,
    CoverLetters,
    AutoApplies,
    InterviewSessions,
}

impl QuotaKind {
    pub const ALL: [QuotaKind; 5] = [
        QuotaKind::JobApplications,
        QuotaKind::ResumeExports,
        QuotaKind::CoverLetters,
        QuotaKind::AutoApplies,
        QuotaKind::InterviewSessions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaKind::JobApplications => "job_applications",
            QuotaKind::ResumeExports => "resume_exports",
            QuotaKind::CoverLetters => "cover_letters",
            QuotaKind::AutoApplies => "auto_applies",
            QuotaKind::InterviewSessions => "interview_sessions",
        }
    }
}

impl fmt::Display for QuotaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean entitlements gated by tier, with no usage accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureFlag {
    AdvancedAnalytics,
    AutoApply,
    PremiumTemplates,
    PrioritySupport,
    ProfileSpotlight,
    ApiAccess,
}

impl FeatureFlag {
    pub const ALL: [FeatureFlag; 6] = [
        FeatureFlag::AdvancedAnalytics,
        FeatureFlag::AutoApply,
        FeatureFlag::PremiumTemplates,
        FeatureFlag::PrioritySupport,
        FeatureFlag::ProfileSpotlight,
        FeatureFlag::ApiAccess,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureFlag::AdvancedAnalytics => "advanced_analytics",
            FeatureFlag::AutoApply => "auto_apply",
            FeatureFlag::PremiumTemplates => "premium_templates",
            FeatureFlag::PrioritySupport => "priority_support",
            FeatureFlag::ProfileSpotlight => "profile_spotlight",
            FeatureFlag::ApiAccess => "api_access",
        }
    }
}

impl fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
