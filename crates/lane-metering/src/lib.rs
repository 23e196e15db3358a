//! Usage metering for Hirelane.
//!
//! Durable monthly counters with calendar-month rollover, a TTL cache in
//! front of the store, bounded store calls, and configurable degradation
//! when the store is down. The [`UsageMeter`] is the single entry point;
//! storage and caching sit behind the [`UsageStore`] and [`CacheProvider`]
//! seams so deployments can swap in Redis- or Postgres-backed
//! implementations without touching decision logic.

pub mod cache;
pub mod config;
pub mod meter;
pub mod record;
pub mod store;

pub use cache::{CacheError, CacheProvider, UsageCache};
pub use config::{FailurePolicy, MeterConfig};
pub use meter::{Clock, MeterError, MeterStats, QuotaCheck, QuotaUsage, UsageMeter};
pub use record::{month_period, UsageRecord};
pub use store::{InMemoryUsageStore, StoreError, StrictIncrement, UsageStore};
