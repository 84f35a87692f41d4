//! A thread-safe, TTL-bounded cache for index responses.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// A cache entry with expiration time.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    created_at: Instant,
    ttl: Duration,
}

impl<T> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            created_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

/// A thread-safe cache with TTL support, used by the index client to avoid
/// re-fetching a package's metadata more than once per invocation (§4.3).
pub struct Cache<K, V> {
    data: Arc<RwLock<HashMap<K, CacheEntry<V>>>>,
    default_ttl: Duration,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a new cache with the given default TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
            default_ttl,
        }
    }

    /// Gets a value from the cache, returning `None` if absent or expired.
    pub async fn get(&self, key: &K) -> Option<V> {
        let data = self.data.read().await;
        data.get(key).filter(|entry| !entry.is_expired()).map(|entry| entry.value.clone())
    }

    /// Puts a value into the cache with the default TTL.
    pub async fn put(&self, key: K, value: V) {
        let mut data = self.data.write().await;
        data.insert(key, CacheEntry::new(value, self.default_ttl));
    }

    /// Clears all entries.
    pub async fn clear(&self) {
        self.data.write().await.clear();
    }

    /// Number of entries currently stored, expired or not.
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let cache: Cache<String, Vec<u64>> = Cache::new(Duration::from_secs(60));
        cache.put("requests".to_string(), vec![1, 2, 3]).await;
        assert_eq!(cache.get(&"requests".to_string()).await, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn missing_key_returns_none() {
        let cache: Cache<String, Vec<u64>> = Cache::new(Duration::from_secs(60));
        assert_eq!(cache.get(&"missing".to_string()).await, None);
    }

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache: Cache<String, u64> = Cache::new(Duration::from_millis(20));
        cache.put("x".to_string(), 1).await;
        sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get(&"x".to_string()).await, None);
    }
}
