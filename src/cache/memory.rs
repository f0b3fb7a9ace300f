use crate::cache::{CacheStats, PhotoLookupCache};
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// In-memory place-lookup cache backed by moka with TTL and bounded capacity.
pub struct MemoryPhotoCache {
    entries: Cache<String, Option<String>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryPhotoCache {
    pub fn new(ttl_seconds: u64, max_capacity: u64) -> Self {
        let entries = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_seconds))
            .max_capacity(max_capacity)
            .build();

        MemoryPhotoCache {
            entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl PhotoLookupCache for MemoryPhotoCache {
    async fn get_photo_reference(&self, key: &str) -> Option<Option<String>> {
        match self.entries.get(key).await {
            Some(reference) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Place cache hit: {}", key);
                Some(reference)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Place cache miss: {}", key);
                None
            }
        }
    }

    async fn cache_photo_reference(&self, key: &str, photo_reference: Option<String>) {
        self.entries.insert(key.to_string(), photo_reference).await;
    }

    async fn get_stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let hit_rate = if hits + misses > 0 {
            (hits as f64 / (hits + misses) as f64) * 100.0
        } else {
            0.0
        };

        CacheStats {
            hits,
            misses,
            hit_rate,
            entries: self.entries.entry_count(),
        }
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
