pub mod key;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::booking::BookingError;
use crate::limits::MAX_CACHE_KEY_PARAMS;

/// What a write invalidates: one room, one hotel, or everything.
#[derive(Debug, Clone, Copy)]
pub enum InvalidationScope {
    Room(Ulid),
    Hotel(Ulid),
    All,
}

#[derive(Debug)]
pub enum CacheError {
    Backend(String),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::Backend(e) => write!(f, "cache backend: {e}"),
        }
    }
}

impl std::error::Error for CacheError {}

/// A computed search result plus the entity ids the computation examined.
/// Tags must cover dependencies, not just results: an entity whose change
/// could alter the result has to appear here or invalidation will miss it.
pub struct Computed<T> {
    pub value: T,
    pub tags: Vec<Ulid>,
}

/// Storage backend for cached search results. Entries are immutable once
/// written; replacement and deletion are the only mutations. Tags written
/// with an entry feed `delete_by_tag` — invalidation is indexed by entity
/// id, never by pattern-matching the (hashed, opaque) key.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;
    async fn set(
        &self,
        key: &str,
        value: Value,
        ttl: Duration,
        tags: &[Ulid],
    ) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    /// Delete every entry tagged with the entity id; returns how many went.
    async fn delete_by_tag(&self, tag: Ulid) -> Result<usize, CacheError>;
    async fn clear(&self) -> Result<usize, CacheError>;
}

/// TTL-bounded memoization in front of read-heavy search. The cache is a
/// pure optimization: every backend failure degrades to direct computation
/// and is logged, never surfaced to the caller.
pub struct SearchCache {
    backend: Arc<dyn CacheBackend>,
    default_ttl: Duration,
}

impl SearchCache {
    pub fn new(backend: Arc<dyn CacheBackend>, default_ttl: Duration) -> Self {
        Self {
            backend,
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Return the cached result for (operation, params) if a live entry
    /// exists; otherwise run `compute`, store its value with `now + ttl`
    /// and its dependency tags, and return it.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        operation: &str,
        params: &[(&str, Value)],
        ttl: Option<Duration>,
        compute: F,
    ) -> Result<T, BookingError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Computed<T>, BookingError>>,
    {
        if params.len() > MAX_CACHE_KEY_PARAMS {
            return Err(BookingError::Validation("too many search parameters"));
        }
        let key = key::encode(operation, params);

        match self.backend.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_value::<T>(raw) {
                Ok(hit) => {
                    metrics::counter!(crate::observability::CACHE_HITS_TOTAL).increment(1);
                    debug!(%key, "cache hit");
                    return Ok(hit);
                }
                Err(e) => {
                    // Stored shape no longer decodes; treat as a miss.
                    debug!(%key, "cached value failed to decode: {e}");
                    let _ = self.backend.delete(&key).await;
                }
            },
            Ok(None) => {}
            Err(e) => warn!(%key, "cache read failed, computing directly: {e}"),
        }

        metrics::counter!(crate::observability::CACHE_MISSES_TOTAL).increment(1);
        let computed = compute().await?;

        match serde_json::to_value(&computed.value) {
            Ok(raw) => {
                let ttl = ttl.unwrap_or(self.default_ttl);
                if let Err(e) = self.backend.set(&key, raw, ttl, &computed.tags).await {
                    warn!(%key, "cache write failed: {e}");
                }
            }
            Err(e) => warn!(%key, "result not cacheable: {e}"),
        }
        Ok(computed.value)
    }

    /// Drop entries whose computation could depend on the given scope.
    /// Best-effort; a backend failure here means staleness until TTL, not
    /// a failed request.
    pub async fn invalidate(&self, scope: InvalidationScope) {
        let result = match scope {
            InvalidationScope::Room(id) | InvalidationScope::Hotel(id) => {
                self.backend.delete_by_tag(id).await
            }
            InvalidationScope::All => self.backend.clear().await,
        };
        match result {
            Ok(n) => {
                metrics::counter!(crate::observability::CACHE_INVALIDATIONS_TOTAL)
                    .increment(n as u64);
                debug!(?scope, dropped = n, "cache invalidated");
            }
            Err(e) => warn!(?scope, "cache invalidation failed: {e}"),
        }
    }
}

#[derive(Clone)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
    tags: Vec<Ulid>,
}

/// In-memory backend: entry map plus a tag index (entity id → dependent
/// keys). Expired entries read as missing immediately; the sweeper purges
/// them physically.
#[derive(Default)]
pub struct MemoryBackend {
    entries: DashMap<String, CacheEntry>,
    tags: DashMap<Ulid, Vec<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Physically remove entries expired as of `now` and prune the tag
    /// index. Returns the purge count.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|e| e.expires_at <= now)
            .map(|e| e.key().clone())
            .collect();
        for key in &expired {
            self.entries.remove(key);
        }
        self.tags.retain(|_, keys| {
            keys.retain(|k| self.entries.contains_key(k));
            !keys.is_empty()
        });
        expired.len()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        let expired = match self.entries.get(key) {
            Some(e) => {
                if e.expires_at > Instant::now() {
                    return Ok(Some(e.value.clone()));
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set(
        &self,
        key: &str,
        value: Value,
        ttl: Duration,
        tags: &[Ulid],
    ) -> Result<(), CacheError> {
        for tag in tags {
            let mut keys = self.tags.entry(*tag).or_default();
            if !keys.iter().any(|k| k == key) {
                keys.push(key.to_string());
            }
        }
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
                tags: tags.to_vec(),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        if let Some((_, entry)) = self.entries.remove(key) {
            for tag in &entry.tags {
                if let Some(mut keys) = self.tags.get_mut(tag) {
                    keys.retain(|k| k != key);
                }
            }
        }
        Ok(())
    }

    async fn delete_by_tag(&self, tag: Ulid) -> Result<usize, CacheError> {
        let keys = self.tags.remove(&tag).map(|(_, v)| v).unwrap_or_default();
        let mut dropped = 0;
        for key in keys {
            if self.entries.remove(&key).is_some() {
                dropped += 1;
            }
        }
        Ok(dropped)
    }

    async fn clear(&self) -> Result<usize, CacheError> {
        let n = self.entries.len();
        self.entries.clear();
        self.tags.clear();
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(900);

    fn cache() -> (Arc<MemoryBackend>, SearchCache) {
        let backend = Arc::new(MemoryBackend::new());
        let cache = SearchCache::new(backend.clone(), TTL);
        (backend, cache)
    }

    async fn compute_count(
        cache: &SearchCache,
        params: &[(&str, Value)],
        calls: &AtomicUsize,
        tags: Vec<Ulid>,
    ) -> Vec<String> {
        cache
            .get_or_compute("op", params, None, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Computed {
                    value: vec!["result".to_string()],
                    tags,
                })
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn second_read_is_a_hit() {
        let (_, cache) = cache();
        let calls = AtomicUsize::new(0);
        let params = [("city", json!("Miami"))];

        compute_count(&cache, &params, &calls, vec![]).await;
        compute_count(&cache, &params, &calls, vec![]).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_params_compute_separately() {
        let (_, cache) = cache();
        let calls = AtomicUsize::new(0);

        compute_count(&cache, &[("city", json!("Miami"))], &calls, vec![]).await;
        compute_count(&cache, &[("city", json!("Boston"))], &calls, vec![]).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_entry_recomputes() {
        let backend = Arc::new(MemoryBackend::new());
        let cache = SearchCache::new(backend.clone(), TTL);
        let calls = AtomicUsize::new(0);
        let params = [("city", json!("Miami"))];

        cache
            .get_or_compute("op", &params, Some(Duration::from_millis(20)), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Computed {
                    value: 1u32,
                    tags: vec![],
                })
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        cache
            .get_or_compute("op", &params, None, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Computed {
                    value: 2u32,
                    tags: vec![],
                })
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_by_tag_drops_only_tagged_entries() {
        let (backend, cache) = cache();
        let calls = AtomicUsize::new(0);
        let room = Ulid::new();

        compute_count(&cache, &[("q", json!("tagged"))], &calls, vec![room]).await;
        compute_count(&cache, &[("q", json!("untagged"))], &calls, vec![]).await;
        assert_eq!(backend.len(), 2);

        cache.invalidate(InvalidationScope::Room(room)).await;
        assert_eq!(backend.len(), 1);

        // Tagged entry recomputes, untagged is still a hit.
        compute_count(&cache, &[("q", json!("tagged"))], &calls, vec![room]).await;
        compute_count(&cache, &[("q", json!("untagged"))], &calls, vec![]).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn invalidate_all_flushes() {
        let (backend, cache) = cache();
        let calls = AtomicUsize::new(0);

        compute_count(&cache, &[("q", json!("a"))], &calls, vec![Ulid::new()]).await;
        compute_count(&cache, &[("q", json!("b"))], &calls, vec![]).await;
        cache.invalidate(InvalidationScope::All).await;
        assert!(backend.is_empty());
    }

    struct FailingBackend;

    #[async_trait]
    impl CacheBackend for FailingBackend {
        async fn get(&self, _: &str) -> Result<Option<Value>, CacheError> {
            Err(CacheError::Backend("unreachable".into()))
        }
        async fn set(
            &self,
            _: &str,
            _: Value,
            _: Duration,
            _: &[Ulid],
        ) -> Result<(), CacheError> {
            Err(CacheError::Backend("unreachable".into()))
        }
        async fn delete(&self, _: &str) -> Result<(), CacheError> {
            Err(CacheError::Backend("unreachable".into()))
        }
        async fn delete_by_tag(&self, _: Ulid) -> Result<usize, CacheError> {
            Err(CacheError::Backend("unreachable".into()))
        }
        async fn clear(&self) -> Result<usize, CacheError> {
            Err(CacheError::Backend("unreachable".into()))
        }
    }

    #[tokio::test]
    async fn backend_failure_degrades_to_computation() {
        let cache = SearchCache::new(Arc::new(FailingBackend), TTL);
        let result: u32 = cache
            .get_or_compute("op", &[], None, || async {
                Ok(Computed {
                    value: 7u32,
                    tags: vec![],
                })
            })
            .await
            .unwrap();
        assert_eq!(result, 7);
        // Invalidation against a dead backend must not panic or error out.
        cache.invalidate(InvalidationScope::All).await;
    }

    #[tokio::test]
    async fn undecodable_cached_value_is_a_miss() {
        let (backend, cache) = cache();
        let key = key::encode("op", &[("q", json!("x"))]);
        backend
            .set(&key, json!("not a number"), TTL, &[])
            .await
            .unwrap();

        let calls = AtomicUsize::new(0);
        let result: u32 = cache
            .get_or_compute("op", &[("q", json!("x"))], None, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Computed {
                    value: 42u32,
                    tags: vec![],
                })
            })
            .await
            .unwrap();
        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn too_many_params_rejected() {
        let (_, cache) = cache();
        let params: Vec<(&str, Value)> = (0..MAX_CACHE_KEY_PARAMS + 1)
            .map(|_| ("p", json!(1)))
            .collect();
        let result: Result<u32, _> = cache
            .get_or_compute("op", &params, None, || async {
                Ok(Computed {
                    value: 0u32,
                    tags: vec![],
                })
            })
            .await;
        assert!(matches!(result, Err(BookingError::Validation(_))));
    }

    #[tokio::test]
    async fn purge_removes_only_expired() {
        let backend = MemoryBackend::new();
        backend
            .set("short", json!(1), Duration::from_millis(10), &[Ulid::new()])
            .await
            .unwrap();
        backend
            .set("long", json!(2), Duration::from_secs(60), &[])
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        let purged = backend.purge_expired(Instant::now());
        assert_eq!(purged, 1);
        assert_eq!(backend.len(), 1);
        assert!(backend.get("long").await.unwrap().is_some());
    }
}
