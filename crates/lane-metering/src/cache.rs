//! Read-through cache in front of the usage store.

use crate::record::UsageRecord;
use async_trait::async_trait;
use lane_common::ActorId;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Shared cache backend: string keys, string payloads, per-entry TTL.
/// Redis-shaped so production deployments can drop one in.
#[async_trait]
pub trait CacheProvider: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
    async fn del(&self, key: &str) -> Result<(), CacheError>;
}

enum Backend {
    Shared {
        provider: Arc<dyn CacheProvider>,
        call_timeout: Duration,
    },
    Local(moka::future::Cache<ActorId, UsageRecord>),
}

/// Caches current-period usage records under a TTL.
///
/// Backed by the shared provider when one is configured, otherwise by an
/// in-process cache. The choice is made once at construction; there is no
/// per-request fallback. Provider outages degrade to cache misses, the
/// store stays authoritative. Every shared-provider call runs under a
/// per-call timeout, so a hung provider cannot stall a read.
pub struct UsageCache {
    backend: Backend,
    ttl: Duration,
}

impl UsageCache {
    pub fn in_process(ttl: Duration, capacity: u64) -> Self {
        let cache = moka::future::Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { backend: Backend::Local(cache), ttl }
    }

    /// Provider calls that run past `call_timeout` are treated like
    /// provider errors.
    pub fn shared(provider: Arc<dyn CacheProvider>, ttl: Duration, call_timeout: Duration) -> Self {
        Self {
            backend: Backend::Shared { provider, call_timeout },
            ttl,
        }
    }

    fn key(actor_id: ActorId) -> String {
        format!("hirelane:usage:{actor_id}")
    }

    /// Runs one provider call under the per-call timeout.
    async fn bounded<T>(
        limit: Duration,
        call: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Backend(format!("call exceeded {limit:?}"))),
        }
    }

    pub async fn get(&self, actor_id: ActorId) -> Option<UsageRecord> {
        match &self.backend {
            Backend::Local(cache) => cache.get(&actor_id).await,
            Backend::Shared { provider, call_timeout } => {
                let fetched =
                    Self::bounded(*call_timeout, provider.get(&Self::key(actor_id))).await;
                match fetched {
                    Ok(Some(raw)) => match serde_json::from_str(&raw) {
                        Ok(record) => Some(record),
                        Err(e) => {
                            tracing::warn!(
                                actor_id = %actor_id,
                                error = %e,
                                "discarding undecodable cache entry"
                            );
                            None
                        }
                    },
                    Ok(None) => None,
                    Err(e) => {
                        tracing::warn!(
                            actor_id = %actor_id,
                            error = %e,
                            "cache read failed, treating as miss"
                        );
                        None
                    }
                }
            }
        }
    }

    pub async fn put(&self, record: &UsageRecord) {
        match &self.backend {
            Backend::Local(cache) => cache.insert(record.actor_id, record.clone()).await,
            Backend::Shared { provider, call_timeout } => {
                let raw = match serde_json::to_string(record) {
                    Ok(raw) => raw,
                    Err(e) => {
                        tracing::warn!(error = %e, "usage record failed to encode, skipping cache write");
                        return;
                    }
                };
                let written = Self::bounded(
                    *call_timeout,
                    provider.set(&Self::key(record.actor_id), raw, self.ttl),
                )
                .await;
                if let Err(e) = written {
                    tracing::warn!(
                        actor_id = %record.actor_id,
                        error = %e,
                        "cache write failed"
                    );
                }
            }
        }
    }

    pub async fn invalidate(&self, actor_id: ActorId) {
        match &self.backend {
            Backend::Local(cache) => cache.invalidate(&actor_id).await,
            Backend::Shared { provider, call_timeout } => {
                let deleted =
                    Self::bounded(*call_timeout, provider.del(&Self::key(actor_id))).await;
                if let Err(e) = deleted {
                    tracing::warn!(
                        actor_id = %actor_id,
                        error = %e,
                        "cache invalidation failed"
                    );
                }
            }
        }
    }
}

impl fmt::Debug for UsageCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let backend = match self.backend {
            Backend::Shared { .. } => "shared",
            Backend::Local(_) => "in-process",
        };
        f.debug_struct("UsageCache")
            .field("backend", &backend)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;
    use uuid::Uuid;

    /// TTL-ignoring provider double.
    #[derive(Default)]
    struct MapProvider {
        entries: DashMap<String, String>,
    }

    #[async_trait]
    impl CacheProvider for MapProvider {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            Ok(self.entries.get(key).map(|v| v.clone()))
        }

        async fn set(&self, key: &str, value: String, _ttl: Duration) -> Result<(), CacheError> {
            self.entries.insert(key.to_string(), value);
            Ok(())
        }

        async fn del(&self, key: &str) -> Result<(), CacheError> {
            self.entries.remove(key);
            Ok(())
        }
    }

    /// Provider double that fails every call.
    struct DownProvider;

    #[async_trait]
    impl CacheProvider for DownProvider {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }

        async fn del(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }
    }

    /// Provider double that stalls past any reasonable call timeout.
    struct HangingProvider;

    #[async_trait]
    impl CacheProvider for HangingProvider {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(())
        }

        async fn del(&self, _key: &str) -> Result<(), CacheError> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(())
        }
    }

    fn sample_record(actor_id: ActorId) -> UsageRecord {
        UsageRecord::fresh(actor_id, "2025-04-02T00:00:00Z".parse().unwrap())
    }

    #[tokio::test]
    async fn test_in_process_round_trip_and_invalidate() {
        let cache = UsageCache::in_process(Duration::from_secs(60), 1_000);
        let actor = Uuid::new_v4();
        let record = sample_record(actor);

        assert!(cache.get(actor).await.is_none());
        cache.put(&record).await;
        assert_eq!(cache.get(actor).await, Some(record));

        cache.invalidate(actor).await;
        assert!(cache.get(actor).await.is_none());
    }

    #[tokio::test]
    async fn test_shared_backend_round_trips_json() {
        let cache = UsageCache::shared(
            Arc::new(MapProvider::default()),
            Duration::from_secs(60),
            Duration::from_secs(1),
        );
        let actor = Uuid::new_v4();
        let record = sample_record(actor);

        cache.put(&record).await;
        assert_eq!(cache.get(actor).await, Some(record));
    }

    #[tokio::test]
    async fn test_provider_outage_degrades_to_miss() {
        let cache = UsageCache::shared(
            Arc::new(DownProvider),
            Duration::from_secs(60),
            Duration::from_secs(1),
        );
        let actor = Uuid::new_v4();

        cache.put(&sample_record(actor)).await;
        assert!(cache.get(actor).await.is_none());
        cache.invalidate(actor).await;
    }

    #[tokio::test]
    async fn test_hung_provider_degrades_to_miss() {
        let cache = UsageCache::shared(
            Arc::new(HangingProvider),
            Duration::from_secs(60),
            Duration::from_millis(10),
        );
        let actor = Uuid::new_v4();

        assert!(cache.get(actor).await.is_none());
        cache.put(&sample_record(actor)).await;
        cache.invalidate(actor).await;
    }

    #[tokio::test]
    async fn test_corrupt_entry_reads_as_miss() {
        let provider = Arc::new(MapProvider::default());
        let actor = Uuid::new_v4();
        provider
            .entries
            .insert(format!("hirelane:usage:{actor}"), "not json".to_string());

        let cache = UsageCache::shared(
            provider,
            Duration::from_secs(60),
            Duration::from_secs(1),
        );
        assert!(cache.get(actor).await.is_none());
    }
}
