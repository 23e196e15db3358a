//! Request-time access control for Hirelane.
//!
//! One deterministic verdict per operation: is the actor authenticated,
//! does their tier rank high enough, does the tier carry the required
//! feature, and is there monthly quota headroom left. Policies are
//! declared per operation and validated at startup; the engine evaluates
//! them in a fixed short-circuit order and the meter records what allowed
//! requests consume.
//!
//! # Decision pipeline
//!
//! ```text
//!            ┌────────────────┐
//!  request──►│ RequestContext │  actor? ──no──► DENY unauthenticated
//!            └───────┬────────┘
//!                    ▼
//!            ┌────────────────┐
//!            │   min_tier     │  rank too low ──► DENY insufficient_tier
//!            └───────┬────────┘
//!                    ▼
//!            ┌────────────────┐
//!            │ required_feature│  not granted ──► DENY feature_unavailable
//!            └───────┬────────┘
//!                    ▼
//!            ┌────────────────┐      ┌────────────┐
//!            │     quota      │─────►│ UsageMeter │  exhausted ──► DENY usage_limit_exceeded
//!            └───────┬────────┘      └────────────┘
//!                    ▼
//!                  ALLOW  (enforce() then records the consumption)
//! ```

pub mod context;
pub mod decision;
pub mod engine;
pub mod policy;

pub use context::{Actor, ContextAdapter, RequestContext};
pub use decision::{AccessDecision, DenyReason};
pub use engine::{AccessEngine, EngineStats, GuardError};
pub use policy::{AccessPolicy, PolicyRegistry, PolicyRegistryBuilder, QuotaDemand, RegistryError};
