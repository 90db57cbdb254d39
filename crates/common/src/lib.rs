//! Cocite Common Library
//!
//! Shared code for the Cocite services including:
//! - Error types and handling
//! - Configuration management
//! - Resilient HTTP fetcher for NCBI E-utilities
//! - Response cache (in-memory and Redis)
//! - Metrics and observability

pub mod cache;
pub mod config;
pub mod errors;
pub mod fetch;
pub mod metrics;

// Re-export commonly used types
pub use cache::ResponseCache;
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use fetch::{FetchError, ResilientFetcher};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default E-utilities base URL
pub const DEFAULT_EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
