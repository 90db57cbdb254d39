//! Response cache
//!
//! Provides:
//! - `ResponseCache` trait consulted by the E-utilities resolvers
//! - In-memory backend with TTL expiry and an entry cap
//! - Redis backend storing JSON values
//! - Key builders for each E-utilities call
//!
//! Caching is an optimisation only: callers treat every cache error as a miss.

use crate::config::{CacheBackend, CacheSettings};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Key/value store for remote responses
#[async_trait]
pub trait ResponseCache: Send + Sync {
    /// Get a value, `None` on miss or expiry
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store a value for `ttl`
    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()>;
}

/// Default entry cap for [`MemoryCache::new`]
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

/// Process-local cache
///
/// Expired entries are swept on every write. When the cache is still full,
/// the entry closest to expiry is evicted to make room.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (Value, Instant)>>,
    max_entries: usize,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding at most `max_entries` entries (at least one)
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Number of stored entries, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => {
                debug!(key, "Cache hit");
                Ok(Some(value.clone()))
            }
            _ => {
                debug!(key, "Cache miss");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, expires_at)| *expires_at > now);

        if entries.len() >= self.max_entries && !entries.contains_key(key) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, (_, expires_at))| *expires_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                debug!(key = %oldest, "Cache full, evicted entry");
            }
        }

        entries.insert(key.to_string(), (value.clone(), now + ttl));
        debug!(key, ttl_secs = ttl.as_secs(), "Cache set");
        Ok(())
    }
}

/// Redis cache client
pub struct RedisCache {
    connection: MultiplexedConnection,
    key_prefix: String,
}

impl RedisCache {
    /// Connect to Redis
    pub async fn connect(url: &str, key_prefix: &str) -> Result<Self> {
        let client = Client::open(url).map_err(|e| AppError::CacheError {
            message: format!("Failed to create Redis client: {}", e),
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Failed to connect to Redis: {}", e),
            })?;

        Ok(Self {
            connection,
            key_prefix: key_prefix.to_string(),
        })
    }

    /// Build a prefixed key
    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    /// Ping Redis to check connectivity
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .map_err(|e| AppError::CacheError {
                message: format!("Redis ping failed: {}", e),
            })?;
        Ok(())
    }
}

#[async_trait]
impl ResponseCache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let full_key = self.key(key);
        let mut conn = self.connection.clone();

        let value: Option<String> = conn.get(&full_key).await?;

        match value {
            Some(json) => {
                let parsed = serde_json::from_str(&json).map_err(|e| AppError::CacheError {
                    message: format!("Failed to parse cached value: {}", e),
                })?;
                debug!(key = %full_key, "Cache hit");
                Ok(Some(parsed))
            }
            None => {
                debug!(key = %full_key, "Cache miss");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &Value, ttl: Duration) -> Result<()> {
        let full_key = self.key(key);
        let json = serde_json::to_string(value)?;
        let mut conn = self.connection.clone();

        let _: () = conn.set_ex(&full_key, &json, ttl.as_secs().max(1)).await?;

        debug!(key = %full_key, ttl_secs = ttl.as_secs(), "Cache set");
        Ok(())
    }
}

/// Build the cache selected by configuration
///
/// Returns `None` when caching is disabled or Redis is unreachable; the
/// service keeps running without a cache in both cases.
pub async fn create_cache(settings: &CacheSettings) -> Option<Arc<dyn ResponseCache>> {
    match settings.backend {
        CacheBackend::None => {
            info!("Response cache disabled");
            None
        }
        CacheBackend::Memory => {
            info!(max_entries = settings.max_entries, "Using in-memory response cache");
            Some(Arc::new(MemoryCache::with_capacity(settings.max_entries)))
        }
        CacheBackend::Redis => {
            let Some(url) = settings.redis_url.as_deref() else {
                warn!("cache.redis_url not set, caching disabled");
                return None;
            };
            let connected = match RedisCache::connect(url, &settings.key_prefix).await {
                Ok(cache) => cache.ping().await.map(|_| cache),
                Err(e) => Err(e),
            };
            match connected {
                Ok(cache) => {
                    info!("Redis cache connected");
                    Some(Arc::new(cache))
                }
                Err(e) => {
                    warn!(error = %e, "Failed to connect to Redis, caching disabled");
                    None
                }
            }
        }
    }
}

/// Cache key builder helpers
pub mod keys {
    use sha2::{Digest, Sha256};

    /// Build an ELink cache key
    pub fn elink(linkname: &str, id: &str, limit: usize) -> String {
        format!("elink:{}:{}:{}", linkname, id, limit)
    }

    /// Build a per-publication ESummary cache key
    pub fn esummary(id: &str) -> String {
        format!("esummary:{}", id)
    }

    /// Build an ESearch cache key; the term is hashed to keep keys bounded
    pub fn esearch(term: &str, limit: usize) -> String {
        let digest = Sha256::digest(term.trim().to_lowercase().as_bytes());
        format!("esearch:{}:{}", limit, hex::encode(&digest[..16]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_builders() {
        assert_eq!(
            keys::elink("pubmed_pubmed_refs", "123", 30),
            "elink:pubmed_pubmed_refs:123:30"
        );
        assert_eq!(keys::esummary("123"), "esummary:123");
        assert_eq!(keys::esearch("TP53 ", 5), keys::esearch("tp53", 5));
        assert_ne!(keys::esearch("tp53", 5), keys::esearch("brca1", 5));
    }

    #[tokio::test]
    async fn test_memory_cache_round_trip() {
        let cache = MemoryCache::new();
        assert_eq!(cache.get("k").await.unwrap(), None);

        cache
            .set("k", &json!(["1", "2"]), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(json!(["1", "2"])));
    }

    #[tokio::test]
    async fn test_memory_cache_expires_entries() {
        let cache = MemoryCache::new();
        cache
            .set("short", &json!(1), Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("short").await.unwrap(), None);

        cache
            .set("other", &json!(2), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_memory_cache_is_capped() {
        let cache = MemoryCache::with_capacity(3);
        for (i, ttl) in [(0, 30), (1, 10), (2, 60)] {
            cache
                .set(&format!("k{i}"), &json!(i), Duration::from_secs(ttl))
                .await
                .unwrap();
        }
        assert_eq!(cache.len().await, 3);

        // Overwriting a present key never evicts
        cache.set("k0", &json!("again"), Duration::from_secs(30)).await.unwrap();
        assert_eq!(cache.len().await, 3);

        cache.set("k3", &json!(3), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.len().await, 3);
        assert_eq!(cache.get("k1").await.unwrap(), None);
        assert_eq!(cache.get("k0").await.unwrap(), Some(json!("again")));
        assert_eq!(cache.get("k3").await.unwrap(), Some(json!(3)));

        for i in 4..100 {
            cache
                .set(&format!("k{i}"), &json!(i), Duration::from_secs(60))
                .await
                .unwrap();
        }
        assert_eq!(cache.len().await, 3);
    }

    #[tokio::test]
    async fn test_disabled_backend_builds_nothing() {
        let settings = CacheSettings {
            backend: CacheBackend::None,
            ..CacheSettings::default()
        };
        assert!(create_cache(&settings).await.is_none());

        let redis_without_url = CacheSettings {
            backend: CacheBackend::Redis,
            redis_url: None,
            ..CacheSettings::default()
        };
        assert!(create_cache(&redis_without_url).await.is_none());
    }
}
