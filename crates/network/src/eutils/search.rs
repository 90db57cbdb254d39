//! ESearch free-text queries

use super::EutilsContext;
use crate::citation::PublicationId;
use crate::sources::PublicationSearch;
use async_trait::async_trait;
use cocite_common::{cache::keys, errors::Result, fetch::decode_payload};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub struct SearchResolver {
    context: Arc<EutilsContext>,
}

impl SearchResolver {
    pub fn new(context: Arc<EutilsContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl PublicationSearch for SearchResolver {
    #[instrument(skip(self))]
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PublicationId>> {
        let key = keys::esearch(query, limit);
        if let Some(cached) = self.context.cache_get(&key).await {
            if let Ok(ids) = serde_json::from_value::<Vec<PublicationId>>(cached) {
                debug!(count = ids.len(), "Search served from cache");
                return Ok(ids);
            }
        }

        let params = [
            ("db", "pubmed".to_string()),
            ("term", query.to_string()),
            ("retmode", "json".to_string()),
            ("retmax", limit.to_string()),
        ];

        let payload = self
            .context
            .fetcher()
            .fetch(&self.context.endpoint("esearch.fcgi"), &params, self.context.timeout())
            .await?;

        let ids = parse_idlist(payload, limit);
        debug!(count = ids.len(), "Search resolved");

        if !ids.is_empty() {
            self.context.cache_put(&key, &serde_json::json!(ids)).await;
        }
        Ok(ids)
    }
}

/// Ids listed under `esearchresult.idlist`, at most `limit`
pub fn parse_idlist(payload: Value, limit: usize) -> Vec<PublicationId> {
    let Some(payload) = decode_payload(payload) else {
        warn!("ESearch returned a non-JSON payload");
        return Vec::new();
    };

    payload
        .get("esearchresult")
        .and_then(|r| r.get("idlist"))
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(PublicationId::from)
                .take(limit)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eutils::test_support::context;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_parse_idlist() {
        let payload = json!({"esearchresult": {"count": "3", "idlist": ["1", " 2 ", "", "3"]}});
        let ids = parse_idlist(payload, 2);
        assert_eq!(ids, vec![PublicationId::from("1"), PublicationId::from("2")]);

        assert!(parse_idlist(json!({"esearchresult": {}}), 5).is_empty());
        assert!(parse_idlist(json!({"error": "bad"}), 5).is_empty());
    }

    #[tokio::test]
    async fn test_search_queries_esearch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/esearch.fcgi"))
            .and(query_param("db", "pubmed"))
            .and(query_param("term", "p53 osteosarcoma"))
            .and(query_param("retmax", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "esearchresult": {"idlist": ["34528509", "34529953"]}
            })))
            .mount(&server)
            .await;

        let resolver = SearchResolver::new(context(&server.uri(), None));
        let ids = resolver.search("p53 osteosarcoma", 5).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].as_str(), "34528509");
    }

    #[tokio::test]
    async fn test_search_failure_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let resolver = SearchResolver::new(context(&server.uri(), None));
        assert!(resolver.search("anything", 5).await.is_err());
    }
}
