//! ESummary publication metadata

use super::EutilsContext;
use crate::citation::{PublicationId, PublicationMeta};
use crate::sources::PublicationMetadata;
use async_trait::async_trait;
use cocite_common::{cache::keys, errors::Result, fetch::decode_payload};
use regex_lite::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info, instrument, warn};

const MAX_LISTED_AUTHORS: usize = 3;

/// Resolves display metadata for publications through ESummary
pub struct MetadataResolver {
    context: Arc<EutilsContext>,
}

impl MetadataResolver {
    pub fn new(context: Arc<EutilsContext>) -> Self {
        Self { context }
    }

    /// Metadata for every id, placeholders included when the batch call fails
    pub async fn resolve(&self, ids: &[PublicationId]) -> HashMap<PublicationId, PublicationMeta> {
        match self.lookup(ids).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(count = ids.len(), error = %e, "Metadata lookup failed, using placeholders");
                placeholders(ids)
            }
        }
    }
}

#[async_trait]
impl PublicationMetadata for MetadataResolver {
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn lookup(
        &self,
        ids: &[PublicationId],
    ) -> Result<HashMap<PublicationId, PublicationMeta>> {
        let mut resolved = HashMap::with_capacity(ids.len());
        let mut missing: Vec<&PublicationId> = Vec::new();

        for id in ids {
            if resolved.contains_key(id) || missing.contains(&id) {
                continue;
            }
            let cached = self
                .context
                .cache_get(&keys::esummary(id.as_str()))
                .await
                .and_then(|value| serde_json::from_value::<PublicationMeta>(value).ok());
            match cached {
                Some(meta) => {
                    resolved.insert(id.clone(), meta);
                }
                None => missing.push(id),
            }
        }

        if missing.is_empty() {
            return Ok(resolved);
        }

        let joined = missing
            .iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let params = [
            ("db", "pubmed".to_string()),
            ("id", joined),
            ("retmode", "json".to_string()),
        ];

        let payload = self
            .context
            .fetcher()
            .fetch(&self.context.endpoint("esummary.fcgi"), &params, self.context.timeout())
            .await?;

        let result = decode_payload(payload).and_then(|p| p.get("result").cloned());
        if result.is_none() {
            warn!(count = missing.len(), "ESummary returned no result object");
        }

        let mut found = 0usize;
        for id in missing {
            let entry = result
                .as_ref()
                .and_then(|r| r.get(id.as_str()))
                .filter(|entry| entry.is_object() && entry.get("error").is_none());

            let meta = match entry {
                Some(entry) => {
                    found += 1;
                    let meta = parse_summary(entry);
                    if let Ok(value) = serde_json::to_value(&meta) {
                        self.context.cache_put(&keys::esummary(id.as_str()), &value).await;
                    }
                    meta
                }
                None => {
                    debug!(pmid = %id, "No metadata in ESummary response");
                    PublicationMeta::placeholder(id)
                }
            };
            resolved.insert(id.clone(), meta);
        }

        info!(resolved = found, total = resolved.len(), "Retrieved publication metadata");
        Ok(resolved)
    }
}

/// Placeholder metadata for every id
pub fn placeholders(ids: &[PublicationId]) -> HashMap<PublicationId, PublicationMeta> {
    ids.iter()
        .map(|id| (id.clone(), PublicationMeta::placeholder(id)))
        .collect()
}

/// Build display metadata from one ESummary record
pub fn parse_summary(entry: &Value) -> PublicationMeta {
    let title = entry
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("Unknown Title")
        .to_string();

    let names: Vec<&str> = entry
        .get("authors")
        .and_then(Value::as_array)
        .map(|authors| {
            authors
                .iter()
                .filter_map(|a| a.get("name").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    let year = entry
        .get("pubdate")
        .and_then(Value::as_str)
        .map(publication_year)
        .unwrap_or_default();

    let journal = entry
        .get("source")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("Unknown Journal")
        .to_string();

    PublicationMeta {
        title,
        authors: format_authors(&names),
        year,
        journal,
    }
}

/// First three author names, then "et al." when more are listed
pub fn format_authors(names: &[&str]) -> String {
    let names: Vec<&str> = names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty() && *n != "et al.")
        .collect();

    let mut listed = names
        .iter()
        .take(MAX_LISTED_AUTHORS)
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    if names.len() > MAX_LISTED_AUTHORS {
        listed.push_str(" et al.");
    }
    listed
}

/// Four-digit 19xx/20xx year found in a free-form publication date
pub fn publication_year(pubdate: &str) -> String {
    static YEAR: OnceLock<Regex> = OnceLock::new();
    let re = YEAR.get_or_init(|| Regex::new(r"\b(19|20)\d{2}\b").expect("valid year pattern"));
    re.find(pubdate)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}
