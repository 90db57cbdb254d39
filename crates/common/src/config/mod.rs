//! Configuration management for Cocite services
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values
//!
//! `NCBI_API_KEY` is honoured when `eutils.api_key` is not set.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// NCBI E-utilities client configuration
    #[serde(default)]
    pub eutils: EutilsConfig,

    /// Citation network builder configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Response cache configuration
    #[serde(default)]
    pub cache: CacheSettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EutilsConfig {
    /// Base URL for the E-utilities endpoints
    #[serde(default = "default_eutils_base")]
    pub base_url: String,

    /// NCBI API key (raises the permitted request rate)
    pub api_key: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_eutils_timeout")]
    pub timeout_secs: u64,

    /// Total attempts for a rate-limited request
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base backoff delay in milliseconds, doubled per retry
    #[serde(default = "default_backoff_base")]
    pub backoff_base_ms: u64,

    /// Upper bound of the uniform jitter added to each backoff, in milliseconds
    #[serde(default = "default_backoff_jitter")]
    pub backoff_jitter_ms: u64,

    /// Request pacing without an API key
    #[serde(default = "default_anonymous_rps")]
    pub anonymous_rps: u32,

    /// Request pacing with an API key
    #[serde(default = "default_keyed_rps")]
    pub keyed_rps: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkConfig {
    /// Citing/cited cap used when the caller does not give one
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    /// Largest cap a caller may request
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,

    /// Shared deadline for the citing + cited lookups
    #[serde(default = "default_link_deadline")]
    pub link_deadline_secs: u64,

    /// Shared deadline for the secondary-reference lookups
    #[serde(default = "default_secondary_deadline")]
    pub secondary_deadline_secs: u64,

    /// Deadline for the batched metadata lookup
    #[serde(default = "default_metadata_deadline")]
    pub metadata_deadline_secs: u64,

    /// How many citing publications are sampled for secondary references
    #[serde(default = "default_secondary_sample")]
    pub secondary_sample: usize,

    /// Reference cap per sampled citing publication
    #[serde(default = "default_secondary_limit")]
    pub secondary_limit: usize,

    /// Number of hits requested when resolving a free-text query
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Serve fixture data instead of calling E-utilities
    #[serde(default)]
    pub mock_mode: bool,
}

/// Cache backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    None,
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSettings {
    /// Which backend to use
    #[serde(default = "default_cache_backend")]
    pub backend: CacheBackend,

    /// Redis URL, required for the redis backend
    pub redis_url: Option<String>,

    /// TTL for cached responses in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Key prefix for namespacing
    #[serde(default = "default_cache_prefix")]
    pub key_prefix: String,

    /// Entry cap for the in-memory backend
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (debug, info, cocite_network=debug, ...)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_request_timeout() -> u64 { 90 }
fn default_eutils_base() -> String { crate::DEFAULT_EUTILS_BASE.to_string() }
fn default_eutils_timeout() -> u64 { 60 }
fn default_max_attempts() -> u32 { 3 }
fn default_backoff_base() -> u64 { 2000 }
fn default_backoff_jitter() -> u64 { 1000 }
fn default_anonymous_rps() -> u32 { 3 }
fn default_keyed_rps() -> u32 { 10 }
fn default_limit() -> usize { 30 }
fn default_max_limit() -> usize { 100 }
fn default_link_deadline() -> u64 { 30 }
fn default_secondary_deadline() -> u64 { 20 }
fn default_metadata_deadline() -> u64 { 30 }
fn default_secondary_sample() -> usize { 3 }
fn default_secondary_limit() -> usize { 10 }
fn default_search_limit() -> usize { 5 }
fn default_cache_backend() -> CacheBackend { CacheBackend::Memory }
fn default_cache_ttl() -> u64 { 3600 }
fn default_cache_prefix() -> String { "cocite".to_string() }
fn default_cache_max_entries() -> usize { 10_000 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for EutilsConfig {
    fn default() -> Self {
        Self {
            base_url: default_eutils_base(),
            api_key: None,
            timeout_secs: default_eutils_timeout(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base(),
            backoff_jitter_ms: default_backoff_jitter(),
            anonymous_rps: default_anonymous_rps(),
            keyed_rps: default_keyed_rps(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            link_deadline_secs: default_link_deadline(),
            secondary_deadline_secs: default_secondary_deadline(),
            metadata_deadline_secs: default_metadata_deadline(),
            secondary_sample: default_secondary_sample(),
            secondary_limit: default_secondary_limit(),
            search_limit: default_search_limit(),
            mock_mode: false,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            redis_url: None,
            ttl_secs: default_cache_ttl(),
            key_prefix: default_cache_prefix(),
            max_entries: default_cache_max_entries(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: default_metrics_port(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // e.g. APP__EUTILS__API_KEY=..., APP__NETWORK__MOCK_MODE=true
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Self = config.try_deserialize()?;
        config.apply_ncbi_key(std::env::var("NCBI_API_KEY").ok());
        Ok(config)
    }

    /// Load from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: Self = config.try_deserialize()?;
        config.apply_ncbi_key(std::env::var("NCBI_API_KEY").ok());
        Ok(config)
    }

    /// Fill the API key from the conventional NCBI variable and drop blank keys
    fn apply_ncbi_key(&mut self, fallback: Option<String>) {
        if self.eutils.api_key.is_none() {
            self.eutils.api_key = fallback;
        }
        if self
            .eutils
            .api_key
            .as_deref()
            .is_some_and(|key| key.trim().is_empty())
        {
            self.eutils.api_key = None;
        }
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

impl EutilsConfig {
    /// Per-request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Request pacing for the configured credentials
    pub fn requests_per_second(&self) -> u32 {
        if self.api_key.is_some() {
            self.keyed_rps
        } else {
            self.anonymous_rps
        }
    }
}

impl NetworkConfig {
    pub fn link_deadline(&self) -> Duration {
        Duration::from_secs(self.link_deadline_secs)
    }

    pub fn secondary_deadline(&self) -> Duration {
        Duration::from_secs(self.secondary_deadline_secs)
    }

    pub fn metadata_deadline(&self) -> Duration {
        Duration::from_secs(self.metadata_deadline_secs)
    }

    /// Longest a build can take when every stage runs to its deadline
    pub fn build_budget(&self) -> Duration {
        self.link_deadline() + self.secondary_deadline() + self.metadata_deadline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.eutils.max_attempts, 3);
        assert_eq!(config.eutils.backoff_base_ms, 2000);
        assert_eq!(config.network.link_deadline(), Duration::from_secs(30));
        assert_eq!(config.network.secondary_deadline(), Duration::from_secs(20));
        assert_eq!(config.network.metadata_deadline(), Duration::from_secs(30));
        assert_eq!(config.network.secondary_sample, 3);
        assert!(!config.network.mock_mode);
        assert_eq!(config.cache.max_entries, 10_000);
    }

    #[test]
    fn test_default_build_budget_fits_request_timeout() {
        let config = AppConfig::default();
        assert_eq!(config.network.build_budget(), Duration::from_secs(80));
        assert!(config.network.build_budget() < config.request_timeout());
    }

    #[test]
    fn test_pacing_depends_on_api_key() {
        let mut config = AppConfig::default();
        assert_eq!(config.eutils.requests_per_second(), 3);

        config.apply_ncbi_key(Some("abc123".to_string()));
        assert_eq!(config.eutils.requests_per_second(), 10);
    }

    #[test]
    fn test_blank_api_key_is_dropped() {
        let mut config = AppConfig::default();
        config.eutils.api_key = Some("   ".to_string());
        config.apply_ncbi_key(Some("ignored".to_string()));
        assert!(config.eutils.api_key.is_none());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: AppConfig = Config::builder()
            .set_override("network.mock_mode", true)
            .unwrap()
            .set_override("cache.backend", "none")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(config.network.mock_mode);
        assert_eq!(config.cache.backend, CacheBackend::None);
        assert_eq!(config.network.default_limit, 30);
        assert_eq!(config.eutils.base_url, crate::DEFAULT_EUTILS_BASE);
    }
}
