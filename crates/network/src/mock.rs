//! In-process fixture sources for running without network access

use crate::citation::{PublicationId, PublicationMeta};
use crate::sources::{CitationLinks, LinkRelation, PublicationMetadata, PublicationSearch};
use async_trait::async_trait;
use cocite_common::errors::Result;
use std::collections::HashMap;
use tracing::debug;

struct Fixture {
    id: &'static str,
    title: &'static str,
    authors: &'static str,
    year: &'static str,
    journal: &'static str,
}

const PUBLICATIONS: &[Fixture] = &[
    Fixture {
        id: "34528509",
        title: "TP53 mutations and survival in osteosarcoma patients: a meta-analysis of published data",
        authors: "Chen Z, Guo J, Zhang K",
        year: "2021",
        journal: "Disease Markers",
    },
    Fixture {
        id: "34529953",
        title: "Revisiting the role of p53 in cancer",
        authors: "Lee D, Kim H, Park J",
        year: "2021",
        journal: "Journal of Biomedical Science",
    },
    Fixture {
        id: "34530140",
        title: "Targeting p53 for cancer therapy",
        authors: "Wang X, Zhang Y, Liu S",
        year: "2021",
        journal: "Cancer Research",
    },
];

/// (citing, cited)
const CITATIONS: &[(&str, &str)] = &[
    ("34529953", "34528509"),
    ("34530140", "34528509"),
    ("34530140", "34529953"),
];

/// Deterministic sources over a fixed three-publication corpus
#[derive(Debug, Default, Clone)]
pub struct MockSources;

impl MockSources {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CitationLinks for MockSources {
    async fn fetch_links(
        &self,
        id: &PublicationId,
        relation: LinkRelation,
        limit: usize,
    ) -> Result<Vec<PublicationId>> {
        let ids = CITATIONS
            .iter()
            .filter_map(|&(citing, cited)| match relation {
                LinkRelation::CitedIn if cited == id.as_str() => Some(citing),
                LinkRelation::References if citing == id.as_str() => Some(cited),
                _ => None,
            })
            .map(PublicationId::from)
            .take(limit)
            .collect::<Vec<_>>();
        debug!(pmid = %id, linkname = relation.linkname(), count = ids.len(), "Mock links");
        Ok(ids)
    }
}

#[async_trait]
impl PublicationMetadata for MockSources {
    async fn lookup(
        &self,
        ids: &[PublicationId],
    ) -> Result<HashMap<PublicationId, PublicationMeta>> {
        Ok(ids
            .iter()
            .map(|id| {
                let meta = PUBLICATIONS
                    .iter()
                    .find(|p| p.id == id.as_str())
                    .map(|p| PublicationMeta {
                        title: p.title.to_string(),
                        authors: p.authors.to_string(),
                        year: p.year.to_string(),
                        journal: p.journal.to_string(),
                    })
                    .unwrap_or_else(|| PublicationMeta::placeholder(id));
                (id.clone(), meta)
            })
            .collect())
    }
}

#[async_trait]
impl PublicationSearch for MockSources {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<PublicationId>> {
        let needle = query.trim().to_lowercase();
        let matching: Vec<PublicationId> = PUBLICATIONS
            .iter()
            .filter(|p| p.title.to_lowercase().contains(&needle))
            .map(|p| PublicationId::from(p.id))
            .take(limit)
            .collect();

        // Unmatched queries still get the whole corpus
        if matching.is_empty() {
            return Ok(PUBLICATIONS
                .iter()
                .map(|p| PublicationId::from(p.id))
                .take(limit)
                .collect());
        }
        Ok(matching)
    }
}
