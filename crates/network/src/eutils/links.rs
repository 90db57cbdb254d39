//! ELink citing / referenced publication lookups

use super::EutilsContext;
use crate::citation::PublicationId;
use crate::sources::{CitationLinks, LinkRelation};
use async_trait::async_trait;
use cocite_common::{cache::keys, errors::Result, fetch::decode_payload};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Resolves the citation links of one publication through ELink
pub struct LinkResolver {
    context: Arc<EutilsContext>,
}

impl LinkResolver {
    pub fn new(context: Arc<EutilsContext>) -> Self {
        Self { context }
    }

    /// Publications citing `id`; empty on any failure
    pub async fn citing_of(&self, id: &PublicationId, limit: usize) -> Vec<PublicationId> {
        self.links_or_empty(id, LinkRelation::CitedIn, limit).await
    }

    /// Publications referenced by `id`; empty on any failure
    pub async fn cited_by(&self, id: &PublicationId, limit: usize) -> Vec<PublicationId> {
        self.links_or_empty(id, LinkRelation::References, limit).await
    }

    async fn links_or_empty(
        &self,
        id: &PublicationId,
        relation: LinkRelation,
        limit: usize,
    ) -> Vec<PublicationId> {
        self.fetch_links(id, relation, limit)
            .await
            .unwrap_or_else(|e| {
                warn!(pmid = %id, linkname = relation.linkname(), error = %e, "Link lookup failed");
                Vec::new()
            })
    }
}

#[async_trait]
impl CitationLinks for LinkResolver {
    #[instrument(skip(self), fields(linkname = relation.linkname()))]
    async fn fetch_links(
        &self,
        id: &PublicationId,
        relation: LinkRelation,
        limit: usize,
    ) -> Result<Vec<PublicationId>> {
        let key = keys::elink(relation.linkname(), id.as_str(), limit);
        if let Some(cached) = self.context.cache_get(&key).await {
            if let Ok(ids) = serde_json::from_value::<Vec<PublicationId>>(cached) {
                debug!(count = ids.len(), "Links served from cache");
                return Ok(ids);
            }
        }

        let params = [
            ("dbfrom", "pubmed".to_string()),
            ("linkname", relation.linkname().to_string()),
            ("id", id.to_string()),
            ("retmode", "json".to_string()),
            ("retmax", limit.to_string()),
        ];

        let payload = self
            .context
            .fetcher()
            .fetch(&self.context.endpoint("elink.fcgi"), &params, self.context.timeout())
            .await?;

        let ids = parse_linkset(payload, relation, limit);
        debug!(count = ids.len(), "Links resolved");

        // Empty answers are not cached
        if !ids.is_empty() {
            self.context.cache_put(&key, &serde_json::json!(ids)).await;
        }
        Ok(ids)
    }
}

/// Extract the ids of `relation` from an ELink payload
///
/// Reads `linksets[0].linksetdbs[*]`, takes the first group whose `linkname`
/// matches, and coerces its `links` to ids. Anything malformed yields an empty
/// list.
pub fn parse_linkset(payload: Value, relation: LinkRelation, limit: usize) -> Vec<PublicationId> {
    let Some(payload) = decode_payload(payload) else {
        warn!(linkname = relation.linkname(), "ELink returned a non-JSON payload");
        return Vec::new();
    };

    let Some(linkset) = payload
        .get("linksets")
        .and_then(Value::as_array)
        .and_then(|sets| sets.first())
    else {
        warn!(linkname = relation.linkname(), "ELink payload has no linksets");
        return Vec::new();
    };

    // A publication without links of this kind has no linksetdbs entry at all
    let Some(group) = linkset
        .get("linksetdbs")
        .and_then(Value::as_array)
        .and_then(|groups| {
            groups.iter().find(|group| {
                group.get("linkname").and_then(Value::as_str) == Some(relation.linkname())
            })
        })
    else {
        debug!(linkname = relation.linkname(), "No link group for relation");
        return Vec::new();
    };

    group
        .get("links")
        .and_then(Value::as_array)
        .map(|links| links.iter().filter_map(coerce_id).take(limit).collect())
        .unwrap_or_default()
}

fn coerce_id(value: &Value) -> Option<PublicationId> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(PublicationId::new(s.trim())),
        Value::Number(n) => Some(PublicationId::new(n.to_string())),
        _ => None,
    }
}
