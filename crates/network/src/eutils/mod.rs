//! NCBI E-utilities resolvers
//!
//! - `LinkResolver`: ELink citing / referenced publications
//! - `MetadataResolver`: ESummary display metadata
//! - `SearchResolver`: ESearch free-text queries
//!
//! All three share one `EutilsContext`, so request pacing and the optional
//! response cache are common to every call made for a build.

mod links;
mod metadata;
mod search;

pub use links::{parse_linkset, LinkResolver};
pub use metadata::{format_authors, parse_summary, placeholders, publication_year, MetadataResolver};
pub use search::{parse_idlist, SearchResolver};

use cocite_common::{
    cache::ResponseCache, config::EutilsConfig, metrics, ResilientFetcher,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Fetcher, endpoint and cache settings shared by the resolvers
pub struct EutilsContext {
    fetcher: ResilientFetcher,
    base_url: String,
    timeout: Duration,
    cache: Option<Arc<dyn ResponseCache>>,
    cache_ttl: Duration,
}

impl EutilsContext {
    pub fn new(
        fetcher: ResilientFetcher,
        config: &EutilsConfig,
        cache: Option<Arc<dyn ResponseCache>>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            fetcher,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
            cache,
            cache_ttl,
        }
    }

    /// Full URL of an E-utilities endpoint, e.g. `elink.fcgi`
    pub fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }

    pub fn fetcher(&self) -> &ResilientFetcher {
        &self.fetcher
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Cached value for `key`; cache errors count as misses
    pub async fn cache_get(&self, key: &str) -> Option<Value> {
        let cache = self.cache.as_ref()?;
        match cache.get(key).await {
            Ok(value) => {
                metrics::record_cache_lookup(value.is_some());
                value
            }
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, continuing without cache");
                None
            }
        }
    }

    /// Store `value` under `key`; failures are logged and ignored
    pub async fn cache_put(&self, key: &str, value: &Value) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        if let Err(e) = cache.set(key, value, self.cache_ttl).await {
            warn!(key, error = %e, "Failed to cache value, continuing without cache");
        }
    }
}
