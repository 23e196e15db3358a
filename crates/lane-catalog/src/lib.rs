//! Tier catalog: what each subscription tier grants.
//!
//! The catalog is immutable after construction and answers three questions
//! for the rest of the stack: how tiers rank against each other, which
//! features a tier carries, and what numeric monthly limit a tier puts on
//! each quota kind. Misconfiguration is rejected at build time so request
//! handling never sees an unknown tier.

pub mod catalog;
pub mod profile;

pub use catalog::{CatalogError, TierCatalog, TierCatalogBuilder};
pub use profile::TierProfile;
