pub mod memory;

pub use memory::MemoryPhotoCache;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Memoises place-lookup answers keyed by normalised query text.
///
/// A cached `None` means the lookup succeeded but no result exposed a photo;
/// failed lookups are never cached.
#[async_trait]
pub trait PhotoLookupCache: Send + Sync {
    async fn get_photo_reference(&self, key: &str) -> Option<Option<String>>;
    async fn cache_photo_reference(&self, key: &str, photo_reference: Option<String>);
    async fn get_stats(&self) -> CacheStats;
    fn backend_name(&self) -> &'static str;
}

/// Build the cache key for a place query. Whitespace and case are
/// normalised; the bias point is rounded to ~1 km so nearby requests share
/// entries.
pub fn place_query_key(query: &str, bias: Option<&crate::models::Coordinates>) -> String {
    let normalized = query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    match bias {
        Some(c) => {
            let rounded = c.round(2);
            format!("place:{}@{:.2},{:.2}", normalized, rounded.lat, rounded.lng)
        }
        None => format!("place:{}", normalized),
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub entries: u64,
}
