//! Entity cache
//!
//! One bounded LRU per model type. Entries expire a fixed time after they
//! were written. Models without a `CACHE` policy are never stored.

use std::any::{Any, TypeId};
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use lru::LruCache;

use super::model::{CachePolicy, Model};

struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Instant,
}

struct ModelCache {
    entries: Mutex<LruCache<i64, CacheEntry>>,
    ttl: Duration,
}

impl ModelCache {
    fn new(policy: CachePolicy) -> Self {
        let capacity = NonZeroUsize::new(policy.max_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: policy.expire_after,
        }
    }
}

#[derive(Default)]
pub struct CacheManager {
    caches: DashMap<TypeId, Arc<ModelCache>>,
}

impl CacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn cache_for<M: Model>(&self) -> Option<Arc<ModelCache>> {
        let policy = M::CACHE?;
        let entry = self
            .caches
            .entry(TypeId::of::<M>())
            .or_insert_with(|| Arc::new(ModelCache::new(policy)));
        Some(Arc::clone(entry.value()))
    }

    pub fn get<M: Model>(&self, id: i64) -> Option<M> {
        let cache = self.cache_for::<M>()?;
        let mut entries = cache.entries.lock().ok()?;

        let fresh = match entries.get(&id) {
            Some(entry) if entry.expires_at > Instant::now() => Some(Arc::clone(&entry.value)),
            Some(_) => None,
            None => return None,
        };

        match fresh {
            Some(value) => value.downcast_ref::<M>().cloned(),
            None => {
                entries.pop(&id);
                None
            }
        }
    }

    pub fn put<M: Model>(&self, entity: &M) {
        let Some(cache) = self.cache_for::<M>() else {
            return;
        };
        let Ok(mut entries) = cache.entries.lock() else {
            return;
        };
        entries.put(
            entity.id_value(),
            CacheEntry {
                value: Arc::new(entity.clone()),
                expires_at: Instant::now() + cache.ttl,
            },
        );
    }

    pub fn remove<M: Model>(&self, id: i64) {
        let Some(cache) = self.cache_for::<M>() else {
            return;
        };
        let Ok(mut entries) = cache.entries.lock() else {
            return;
        };
        entries.pop(&id);
    }

    /// Drop every cached entity of one model
    pub fn purge<M: Model>(&self) {
        let Some(cache) = self.caches.get(&TypeId::of::<M>()).map(|c| Arc::clone(c.value())) else {
            return;
        };
        let Ok(mut entries) = cache.entries.lock() else {
            return;
        };
        entries.clear();
    }

    pub fn clear(&self) {
        self.caches.clear();
    }

    pub fn len<M: Model>(&self) -> usize {
        let Some(cache) = self.caches.get(&TypeId::of::<M>()).map(|c| Arc::clone(c.value())) else {
            return 0;
        };
        let len = match cache.entries.lock() {
            Ok(entries) => entries.len(),
            Err(_) => 0,
        };
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::store::sql::Value;
    use rusqlite::Row;

    #[derive(Debug, Clone, PartialEq)]
    struct Cached {
        id: i64,
    }

    impl Model for Cached {
        const TABLE: &'static str = "cached";
        const COLUMNS: &'static [&'static str] = &["id"];
        const CACHE: Option<CachePolicy> = Some(CachePolicy {
            max_size: 2,
            expire_after: Duration::from_secs(60),
        });

        fn id_value(&self) -> i64 {
            self.id
        }
        fn set_id_value(&mut self, id: i64) {
            self.id = id;
        }
        fn values(&self) -> Vec<Value> {
            vec![self.id.into()]
        }
        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self { id: row.get(0)? })
        }
    }

    #[derive(Debug, Clone)]
    struct Expiring {
        id: i64,
    }

    impl Model for Expiring {
        const TABLE: &'static str = "expiring";
        const COLUMNS: &'static [&'static str] = &["id"];
        const CACHE: Option<CachePolicy> = Some(CachePolicy {
            max_size: 10,
            expire_after: Duration::ZERO,
        });

        fn id_value(&self) -> i64 {
            self.id
        }
        fn set_id_value(&mut self, id: i64) {
            self.id = id;
        }
        fn values(&self) -> Vec<Value> {
            vec![self.id.into()]
        }
        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self { id: row.get(0)? })
        }
    }

    #[derive(Debug, Clone)]
    struct Uncached {
        id: i64,
    }

    impl Model for Uncached {
        const TABLE: &'static str = "uncached";
        const COLUMNS: &'static [&'static str] = &["id"];

        fn id_value(&self) -> i64 {
            self.id
        }
        fn set_id_value(&mut self, id: i64) {
            self.id = id;
        }
        fn values(&self) -> Vec<Value> {
            vec![self.id.into()]
        }
        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self { id: row.get(0)? })
        }
    }

    #[test]
    fn test_put_get_remove() {
        let cache = CacheManager::new();
        cache.put(&Cached { id: 1 });
        assert_eq!(cache.get::<Cached>(1), Some(Cached { id: 1 }));
        assert_eq!(cache.get::<Cached>(2), None);

        cache.remove::<Cached>(1);
        assert_eq!(cache.get::<Cached>(1), None);
    }

    #[test]
    fn test_lru_bound() {
        let cache = CacheManager::new();
        cache.put(&Cached { id: 1 });
        cache.put(&Cached { id: 2 });
        cache.put(&Cached { id: 3 });
        assert_eq!(cache.len::<Cached>(), 2);
        assert!(cache.get::<Cached>(1).is_none());
        assert!(cache.get::<Cached>(3).is_some());
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let cache = CacheManager::new();
        cache.put(&Expiring { id: 1 });
        assert!(cache.get::<Expiring>(1).is_none());
        assert_eq!(cache.len::<Expiring>(), 0);
    }

    #[test]
    fn test_uncached_model_is_ignored() {
        let cache = CacheManager::new();
        cache.put(&Uncached { id: 1 });
        assert!(cache.get::<Uncached>(1).is_none());
        assert_eq!(cache.len::<Uncached>(), 0);
    }

    #[test]
    fn test_purge_and_clear() {
        let cache = CacheManager::new();
        cache.put(&Cached { id: 1 });
        cache.purge::<Cached>();
        assert_eq!(cache.len::<Cached>(), 0);

        cache.put(&Cached { id: 2 });
        cache.clear();
        assert!(cache.get::<Cached>(2).is_none());
    }
}
