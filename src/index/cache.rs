//! LRU cache over shards loaded back from disk.

use crate::index::shard::IndexShard;
use lru::LruCache;
use std::num::NonZeroUsize;
use tracing::debug;

/// Bounded cache of disk-loaded shards, keyed by shard id.
///
/// The active shard never enters the cache; only shards re-loaded for
/// queries live here. A capacity of zero disables caching entirely, in
/// which case every lookup loads the shard transiently.
#[derive(Debug)]
pub(crate) struct ShardCache {
    inner: Option<LruCache<usize, IndexShard>>,
}

impl ShardCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: NonZeroUsize::new(capacity).map(LruCache::new),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Fetch a cached shard, refreshing its recency and access time.
    pub fn get(&mut self, shard_id: usize) -> Option<&IndexShard> {
        let shard = self.inner.as_mut()?.get_mut(&shard_id)?;
        shard.touch();
        Some(shard)
    }

    /// Insert a freshly loaded shard, evicting the least recently accessed
    /// entry when over capacity.
    pub fn put(&mut self, shard: IndexShard) {
        let Some(inner) = self.inner.as_mut() else {
            return;
        };
        if let Some((evicted_id, _)) = inner.push(shard.shard_id(), shard) {
            debug!(shard_id = evicted_id, "evicted shard from cache");
        }
    }

    pub fn clear(&mut self) {
        if let Some(inner) = self.inner.as_mut() {
            inner.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_up_to_capacity() {
        let mut cache = ShardCache::new(2);
        cache.put(IndexShard::new(0));
        cache.put(IndexShard::new(1));
        assert!(cache.get(0).is_some());
        assert!(cache.get(1).is_some());
    }

    #[test]
    fn evicts_least_recently_used() {
        let mut cache = ShardCache::new(2);
        cache.put(IndexShard::new(0));
        cache.put(IndexShard::new(1));
        // Touch shard 0 so shard 1 is the eviction victim.
        cache.get(0);
        cache.put(IndexShard::new(2));
        assert!(cache.get(0).is_some());
        assert!(cache.get(1).is_none());
        assert!(cache.get(2).is_some());
    }

    #[test]
    fn zero_capacity_disables_caching() {
        let mut cache = ShardCache::new(0);
        assert!(!cache.is_enabled());
        cache.put(IndexShard::new(0));
        assert!(cache.get(0).is_none());
    }

    #[test]
    fn clear_drops_everything() {
        let mut cache = ShardCache::new(4);
        cache.put(IndexShard::new(0));
        cache.clear();
        assert!(cache.get(0).is_none());
    }
}
