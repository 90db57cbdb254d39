//! Publication data sources
//!
//! Traits the graph builder depends on, and the factory that wires either the
//! E-utilities resolvers or the in-process mock from configuration.
//!
//! Every method returns `Err` only when the remote call itself failed. Missing
//! or malformed data is reported as an empty (or placeholder) `Ok` value, so
//! callers decide for themselves how to degrade.

use crate::citation::{PublicationId, PublicationMeta};
use crate::eutils::{EutilsContext, LinkResolver, MetadataResolver, SearchResolver};
use crate::mock::MockSources;
use async_trait::async_trait;
use cocite_common::{config::AppConfig, errors::Result, ResilientFetcher, ResponseCache};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Direction of an ELink relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkRelation {
    /// Publications that cite the given one
    CitedIn,
    /// Publications the given one references
    References,
}

impl LinkRelation {
    /// ELink `linkname` for this relation
    pub fn linkname(self) -> &'static str {
        match self {
            LinkRelation::CitedIn => "pubmed_pubmed_citedin",
            LinkRelation::References => "pubmed_pubmed_refs",
        }
    }
}

/// Citation links of a single publication
#[async_trait]
pub trait CitationLinks: Send + Sync {
    /// Up to `limit` ids related to `id` through `relation`, in index order
    async fn fetch_links(
        &self,
        id: &PublicationId,
        relation: LinkRelation,
        limit: usize,
    ) -> Result<Vec<PublicationId>>;
}

/// Batched publication metadata
#[async_trait]
pub trait PublicationMetadata: Send + Sync {
    /// Metadata for every id in `ids`; unresolvable ids map to placeholders
    async fn lookup(
        &self,
        ids: &[PublicationId],
    ) -> Result<HashMap<PublicationId, PublicationMeta>>;
}

/// Free-text publication search
#[async_trait]
pub trait PublicationSearch: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PublicationId>>;
}

/// The data sources a network build needs
#[derive(Clone)]
pub struct Sources {
    pub links: Arc<dyn CitationLinks>,
    pub metadata: Arc<dyn PublicationMetadata>,
    pub search: Arc<dyn PublicationSearch>,
}

/// Create sources based on configuration
pub fn create_sources(
    config: &AppConfig,
    cache: Option<Arc<dyn ResponseCache>>,
) -> Result<Sources> {
    if config.network.mock_mode {
        info!("Mock mode enabled, serving fixture publications");
        let mock = Arc::new(MockSources::new());
        return Ok(Sources {
            links: mock.clone(),
            metadata: mock.clone(),
            search: mock,
        });
    }

    let fetcher = ResilientFetcher::from_config(&config.eutils)?;
    let context = Arc::new(EutilsContext::new(
        fetcher,
        &config.eutils,
        cache,
        std::time::Duration::from_secs(config.cache.ttl_secs),
    ));

    info!(base_url = %config.eutils.base_url, "Using NCBI E-utilities");
    Ok(Sources {
        links: Arc::new(LinkResolver::new(context.clone())),
        metadata: Arc::new(MetadataResolver::new(context.clone())),
        search: Arc::new(SearchResolver::new(context)),
    })
}
