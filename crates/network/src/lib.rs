//! Cocite Network Builder
//!
//! Builds citation / co-citation graphs around a single publication:
//! - ELink lookups for citing and referenced publications
//! - ESummary metadata for every discovered publication
//! - Deadline-bound concurrent fan-out with best-effort degradation
//! - Mock sources for running without E-utilities access

pub mod citation;
pub mod eutils;
pub mod mock;
pub mod sources;

pub use citation::{
    BuilderConfig, CitationGraphBuilder, Edge, EdgeKind, Graph, GraphSummary, Node, NodeKind,
    PublicationId, PublicationMeta,
};
pub use sources::{create_sources, CitationLinks, LinkRelation, PublicationMetadata, PublicationSearch, Sources};
