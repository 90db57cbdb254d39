//! Incremental graph assembly
//!
//! Nodes are kept in discovery order and must exist before any edge that
//! touches them. The source node is always the first node.

use super::{Edge, EdgeKind, Graph, GraphSummary, Node, NodeKind, PublicationId, PublicationMeta};
use cocite_common::errors::{AppError, Result};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Collects nodes and edges for one graph build
pub struct GraphAssembler {
    source_id: PublicationId,
    metadata: HashMap<PublicationId, PublicationMeta>,
    nodes: IndexMap<PublicationId, Node>,
    edges: Vec<Edge>,
}

impl GraphAssembler {
    /// Start a graph holding only the source node
    pub fn new(source_id: PublicationId, metadata: HashMap<PublicationId, PublicationMeta>) -> Self {
        let mut assembler = Self {
            source_id: source_id.clone(),
            metadata,
            nodes: IndexMap::new(),
            edges: Vec::new(),
        };
        assembler.add_node(&source_id, NodeKind::Source);
        assembler
    }

    /// Add a node unless one with the same id exists; returns whether it was added
    pub fn add_node(&mut self, id: &PublicationId, kind: NodeKind) -> bool {
        if self.nodes.contains_key(id) {
            return false;
        }
        let meta = self
            .metadata
            .get(id)
            .cloned()
            .unwrap_or_else(|| PublicationMeta::placeholder(id));
        self.nodes.insert(id.clone(), Node::new(id.clone(), meta, kind));
        true
    }

    /// Add an edge whose endpoints are both present
    pub fn add_edge(&mut self, edge: Edge) -> Result<()> {
        for endpoint in [&edge.source, &edge.target] {
            if !self.nodes.contains_key(endpoint) {
                return Err(AppError::Internal {
                    message: format!(
                        "edge {} -> {} references unknown node {}",
                        edge.source, edge.target, endpoint
                    ),
                });
            }
        }
        self.edges.push(edge);
        Ok(())
    }

    /// One co-citation edge per unordered pair of `ids`; returns the count added
    pub fn add_cocitations(&mut self, ids: &[PublicationId]) -> Result<usize> {
        let mut added = 0;
        for (i, first) in ids.iter().enumerate() {
            for second in &ids[i + 1..] {
                self.add_edge(Edge::cocitation(first.clone(), second.clone()))?;
                added += 1;
            }
        }
        Ok(added)
    }

    /// Finalize with stage counts; totals are taken from the assembled graph
    pub fn finish(
        self,
        citing_count: usize,
        cited_count: usize,
        secondary_count: usize,
        error: Option<String>,
    ) -> Graph {
        let source_title = self
            .nodes
            .get(&self.source_id)
            .map(|n| n.title.clone())
            .unwrap_or_else(|| PublicationMeta::placeholder(&self.source_id).title);
        let cocitation_edge_count = self
            .edges
            .iter()
            .filter(|e| e.kind == EdgeKind::Cocitation)
            .count();

        let summary = GraphSummary {
            source_title,
            citing_count,
            cited_count,
            secondary_count,
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            cocitation_edge_count,
            error,
        };

        Graph {
            source_id: self.source_id,
            nodes: self.nodes.into_values().collect(),
            edges: self.edges,
            summary,
        }
    }
}
