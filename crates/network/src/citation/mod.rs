//! Citation network model
//!
//! Typed nodes and edges of the graph returned to the visualization layer.
//! Serialized field names follow the front end's wire format
//! (`source_pmid`, `label`, `type`, `metadata`).

mod builder;
mod graph;

pub use builder::{BuilderConfig, CitationGraphBuilder};
pub use graph::GraphAssembler;

use serde::{Deserialize, Serialize};
use std::fmt;

/// PubMed identifier, compared by value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicationId(String);

impl PublicationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for a non-empty, digits-only identifier
    pub fn is_pmid(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
    }
}

impl fmt::Display for PublicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PublicationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PublicationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for PublicationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Display metadata for one publication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationMeta {
    pub title: String,
    pub authors: String,
    pub year: String,
    pub journal: String,
}

impl PublicationMeta {
    /// Stand-in used whenever a publication cannot be resolved
    pub fn placeholder(id: &PublicationId) -> Self {
        Self {
            title: format!("Paper {}", id),
            authors: "Unknown Authors".to_string(),
            year: String::new(),
            journal: "Unknown Journal".to_string(),
        }
    }
}

/// Role of a node relative to the queried publication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// The queried publication
    Source,
    /// Cites the source
    Citing,
    /// Referenced by the source
    Cited,
    /// Referenced by a sampled citing publication
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// `source` cites `target`
    Cites,
    /// Both endpoints are referenced by the queried publication
    Cocitation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: PublicationId,
    #[serde(rename = "label")]
    pub title: String,
    pub authors: String,
    pub year: String,
    pub journal: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
}

impl Node {
    pub fn new(id: PublicationId, meta: PublicationMeta, kind: NodeKind) -> Self {
        Self {
            id,
            title: meta.title,
            authors: meta.authors,
            year: meta.year,
            journal: meta.journal,
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: PublicationId,
    pub target: PublicationId,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    pub weight: f64,
}

impl Edge {
    pub fn cites(source: PublicationId, target: PublicationId) -> Self {
        Self {
            source,
            target,
            kind: EdgeKind::Cites,
            weight: 1.0,
        }
    }

    pub fn cocitation(source: PublicationId, target: PublicationId) -> Self {
        Self {
            source,
            target,
            kind: EdgeKind::Cocitation,
            weight: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSummary {
    pub source_title: String,
    pub citing_count: usize,
    pub cited_count: usize,
    pub secondary_count: usize,
    pub total_nodes: usize,
    pub total_edges: usize,
    #[serde(rename = "cocitation_edges")]
    pub cocitation_edge_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Citation graph around one publication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(rename = "source_pmid")]
    pub source_id: PublicationId,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(rename = "metadata")]
    pub summary: GraphSummary,
}

impl Graph {
    /// Source node only, with placeholder metadata and the given error
    pub fn minimal(source_id: PublicationId, error: impl Into<String>) -> Self {
        let meta = PublicationMeta::placeholder(&source_id);
        let source_title = meta.title.clone();
        Self {
            nodes: vec![Node::new(source_id.clone(), meta, NodeKind::Source)],
            edges: Vec::new(),
            summary: GraphSummary {
                source_title,
                total_nodes: 1,
                error: Some(error.into()),
                ..GraphSummary::default()
            },
            source_id,
        }
    }

    pub fn source_node(&self) -> Option<&Node> {
        self.nodes.iter().find(|n| n.kind == NodeKind::Source)
    }

    pub fn node(&self, id: &PublicationId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.kind == kind)
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }

    /// True when the build degraded to an error summary
    pub fn is_degraded(&self) -> bool {
        self.summary.error.is_some()
    }
}
