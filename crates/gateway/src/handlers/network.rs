//! Publication network handler

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::AppState;
use cocite_common::{
    config::NetworkConfig,
    errors::{AppError, Result},
    metrics::RequestMetrics,
};
use cocite_network::{Graph, PublicationId};
use tracing::{info, warn};

const ENDPOINT: &str = "/api/network/publication";

/// Query parameters for a network build
#[derive(Debug, Default, Deserialize, Validate)]
pub struct NetworkQuery {
    #[validate(length(min = 1, max = 32))]
    pub pmid: Option<String>,

    /// Free-text query resolved to its best PubMed hit
    #[validate(length(min = 1, max = 1000))]
    pub query: Option<String>,

    #[validate(range(min = 1))]
    pub limit: Option<usize>,
}

impl NetworkQuery {
    /// Trim text parameters and treat blank ones as absent
    fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }
        Self {
            pmid: clean(self.pmid),
            query: clean(self.query),
            limit: self.limit,
        }
    }

    /// Requested limit, or the configured default, within the configured ceiling
    fn effective_limit(&self, network: &NetworkConfig) -> Result<usize> {
        let limit = self.limit.unwrap_or(network.default_limit);
        if limit == 0 || limit > network.max_limit {
            return Err(AppError::Validation {
                message: format!("limit must be between 1 and {}", network.max_limit),
                field: Some("limit".to_string()),
            });
        }
        Ok(limit)
    }
}

/// Build the citation network around a publication
///
/// Accepts either `pmid` or a free-text `query`; a degraded build is still
/// a successful response and carries `metadata.error`.
pub async fn publication_network(
    State(state): State<AppState>,
    Query(params): Query<NetworkQuery>,
) -> Result<Json<Graph>> {
    let request_metrics = RequestMetrics::start("GET", ENDPOINT);

    let result = build_network(&state, params.normalized()).await;
    let status = match &result {
        Ok(_) => 200,
        Err(e) => e.status_code().as_u16(),
    };
    request_metrics.finish(status);

    result.map(Json)
}

async fn build_network(state: &AppState, params: NetworkQuery) -> Result<Graph> {
    params.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;
    let limit = params.effective_limit(&state.config.network)?;
    let source_id = resolve_source(state, &params).await?;

    info!(pmid = %source_id, limit, "Building publication network");

    let timeout = state.config.request_timeout();
    match tokio::time::timeout(timeout, state.builder.build(&source_id, limit)).await {
        Ok(graph) => Ok(graph),
        Err(_) => {
            warn!(pmid = %source_id, timeout_secs = timeout.as_secs(), "Network build timed out");
            Ok(Graph::minimal(
                source_id,
                format!("network build timed out after {}s", timeout.as_secs()),
            ))
        }
    }
}

/// The publication to build around: the given pmid, or the top search hit
async fn resolve_source(state: &AppState, params: &NetworkQuery) -> Result<PublicationId> {
    if let Some(pmid) = params.pmid.as_deref() {
        let id = PublicationId::from(pmid);
        if !id.is_pmid() {
            return Err(AppError::Validation {
                message: format!("pmid must contain only digits, got '{pmid}'"),
                field: Some("pmid".to_string()),
            });
        }
        return Ok(id);
    }

    let Some(query) = params.query.as_deref() else {
        return Err(AppError::MissingField {
            field: "pmid or query".to_string(),
        });
    };

    let hits = state
        .search
        .search(query, state.config.network.search_limit)
        .await
        .map_err(|e| {
            warn!(query, error = %e, "Publication search failed");
            AppError::ServiceUnavailable {
                message: format!("publication search failed: {e}"),
            }
        })?;

    let source_id = hits
        .into_iter()
        .next()
        .ok_or_else(|| AppError::PublicationNotFound {
            query: query.to_string(),
        })?;
    info!(query, pmid = %source_id, "Resolved query to publication");
    Ok(source_id)
}
