//! Citation graph builder
//!
//! Builds the graph around one publication in three stages:
//!
//! 1. citing and cited lookups for the source, run concurrently under one deadline
//! 2. reference lookups for a sample of citing publications, under a second deadline
//! 3. one metadata lookup for every id discovered, under a third deadline
//!
//! Lookups that miss their deadline are aborted and count as empty; metadata
//! that misses its deadline falls back to placeholders. A build
//! never fails: errors and panics degrade to a graph holding only the source.

use super::{Edge, Graph, GraphAssembler, NodeKind, PublicationId};
use crate::eutils::placeholders;
use crate::sources::{CitationLinks, LinkRelation, PublicationMetadata, Sources};
use cocite_common::config::NetworkConfig;
use cocite_common::errors::{AppError, Result};
use cocite_common::metrics;
use futures::FutureExt;
use indexmap::IndexSet;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, instrument, warn};

/// Stage deadlines and sampling for a build
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Shared deadline for the source's citing + cited lookups
    pub link_deadline: Duration,
    /// Shared deadline for the secondary reference lookups
    pub secondary_deadline: Duration,
    /// Citing publications sampled for secondary references
    pub secondary_sample: usize,
    /// Reference cap per sampled citing publication
    pub secondary_limit: usize,
    /// Deadline for the metadata lookup of every discovered id
    pub metadata_deadline: Duration,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            link_deadline: Duration::from_secs(30),
            secondary_deadline: Duration::from_secs(20),
            secondary_sample: 3,
            secondary_limit: 10,
            metadata_deadline: Duration::from_secs(30),
        }
    }
}

impl From<&NetworkConfig> for BuilderConfig {
    fn from(config: &NetworkConfig) -> Self {
        Self {
            link_deadline: config.link_deadline(),
            secondary_deadline: config.secondary_deadline(),
            secondary_sample: config.secondary_sample,
            secondary_limit: config.secondary_limit,
            metadata_deadline: config.metadata_deadline(),
        }
    }
}

/// How a spawned lookup ended
enum Branch<T> {
    Completed(T),
    Failed(AppError),
    Expired,
    Crashed(String),
}

impl<T: Default> Branch<T> {
    /// Failure message for lookups that errored or panicked
    fn failure(&self) -> Option<String> {
        match self {
            Branch::Failed(e) => Some(e.to_string()),
            Branch::Crashed(msg) => Some(msg.clone()),
            Branch::Completed(_) | Branch::Expired => None,
        }
    }

    fn or_empty(self) -> T {
        match self {
            Branch::Completed(value) => value,
            _ => T::default(),
        }
    }
}

pub struct CitationGraphBuilder {
    links: Arc<dyn CitationLinks>,
    metadata: Arc<dyn PublicationMetadata>,
    config: BuilderConfig,
}

impl CitationGraphBuilder {
    pub fn new(
        links: Arc<dyn CitationLinks>,
        metadata: Arc<dyn PublicationMetadata>,
        config: BuilderConfig,
    ) -> Self {
        Self {
            links,
            metadata,
            config,
        }
    }

    pub fn from_sources(sources: &Sources, config: BuilderConfig) -> Self {
        Self::new(sources.links.clone(), sources.metadata.clone(), config)
    }

    /// Build the citation graph around `source_id`
    ///
    /// `limit` caps the citing and cited lookups. Always returns a graph whose
    /// first node is the source; degraded builds carry `summary.error`.
    #[instrument(skip(self, source_id), fields(pmid = %source_id))]
    pub async fn build(&self, source_id: &PublicationId, limit: usize) -> Graph {
        let started = std::time::Instant::now();

        let graph = match AssertUnwindSafe(self.try_build(source_id, limit))
            .catch_unwind()
            .await
        {
            Ok(Ok(graph)) => graph,
            Ok(Err(e)) => {
                error!(error = %e, "Network build failed");
                Graph::minimal(source_id.clone(), e.to_string())
            }
            Err(panic) => {
                let message = format!("network build panicked: {}", panic_message(panic.as_ref()));
                error!(error = %message, "Network build failed");
                Graph::minimal(source_id.clone(), message)
            }
        };

        metrics::record_build(started, graph.is_degraded());
        info!(
            nodes = graph.summary.total_nodes,
            edges = graph.summary.total_edges,
            degraded = graph.is_degraded(),
            "Built citation network"
        );
        graph
    }

    async fn try_build(&self, source_id: &PublicationId, limit: usize) -> Result<Graph> {
        let mut failures = Vec::new();

        // Stage 1: both directions around the source
        let deadline = Instant::now() + self.config.link_deadline;
        let citing_task = self.spawn_links(source_id, LinkRelation::CitedIn, limit);
        let cited_task = self.spawn_links(source_id, LinkRelation::References, limit);

        let citing_branch = settle(citing_task, deadline, "citing").await;
        let cited_branch = settle(cited_task, deadline, "cited").await;

        if let (Some(citing_err), Some(cited_err)) =
            (citing_branch.failure(), cited_branch.failure())
        {
            failures.push(format!("citing lookup failed: {citing_err}"));
            failures.push(format!("cited lookup failed: {cited_err}"));
        }

        let citing = distinct(citing_branch.or_empty(), source_id);
        let cited = distinct(cited_branch.or_empty(), source_id);
        info!(citing = citing.len(), cited = cited.len(), "Resolved direct citations");

        // Stage 2: references of the first few citing publications
        let (secondary_ids, secondary_edges) = self.secondary_links(source_id, &citing).await;

        let mut all_ids: IndexSet<PublicationId> = IndexSet::new();
        all_ids.insert(source_id.clone());
        all_ids.extend(citing.iter().cloned());
        all_ids.extend(cited.iter().cloned());
        all_ids.extend(secondary_ids.iter().cloned());
        let all_ids: Vec<PublicationId> = all_ids.into_iter().collect();

        // Stage 3: metadata for everything discovered
        let deadline = Instant::now() + self.config.metadata_deadline;
        let metadata = match timeout_at(deadline, self.metadata.lookup(&all_ids)).await {
            Ok(Ok(metadata)) => metadata,
            Ok(Err(e)) => {
                warn!(count = all_ids.len(), error = %e, "Metadata lookup failed, using placeholders");
                failures.push(format!("metadata lookup failed: {e}"));
                placeholders(&all_ids)
            }
            Err(_) => {
                metrics::record_branch_timeout("metadata");
                warn!(count = all_ids.len(), "Metadata lookup missed its deadline, using placeholders");
                failures.push(format!(
                    "metadata lookup timed out after {}s",
                    self.config.metadata_deadline.as_secs()
                ));
                placeholders(&all_ids)
            }
        };

        let mut assembler = GraphAssembler::new(source_id.clone(), metadata);
        for id in &citing {
            assembler.add_node(id, NodeKind::Citing);
            assembler.add_edge(Edge::cites(id.clone(), source_id.clone()))?;
        }
        for id in &cited {
            assembler.add_node(id, NodeKind::Cited);
            assembler.add_edge(Edge::cites(source_id.clone(), id.clone()))?;
        }
        for id in &secondary_ids {
            assembler.add_node(id, NodeKind::Secondary);
        }
        for (from, to) in secondary_edges {
            assembler.add_edge(Edge::cites(from, to))?;
        }
        assembler.add_cocitations(&cited)?;

        let error = (!failures.is_empty()).then(|| failures.join("; "));
        Ok(assembler.finish(citing.len(), cited.len(), secondary_ids.len(), error))
    }

    /// Secondary reference ids and the `citing -> reference` edges that found them
    async fn secondary_links(
        &self,
        source_id: &PublicationId,
        citing: &[PublicationId],
    ) -> (IndexSet<PublicationId>, Vec<(PublicationId, PublicationId)>) {
        let mut secondary_ids = IndexSet::new();
        let mut edges = Vec::new();

        let sample = self.config.secondary_sample.min(citing.len());
        if sample == 0 {
            return (secondary_ids, edges);
        }

        let deadline = Instant::now() + self.config.secondary_deadline;
        let tasks: Vec<_> = citing[..sample]
            .iter()
            .map(|id| {
                let task = self.spawn_links(id, LinkRelation::References, self.config.secondary_limit);
                (id.clone(), task)
            })
            .collect();

        for (citing_id, task) in tasks {
            let branch = settle(task, deadline, "secondary").await;
            if let Some(e) = branch.failure() {
                warn!(pmid = %citing_id, error = %e, "Secondary lookup failed");
            }
            for reference in distinct(branch.or_empty(), source_id) {
                edges.push((citing_id.clone(), reference.clone()));
                secondary_ids.insert(reference);
            }
        }

        info!(sampled = sample, secondary = secondary_ids.len(), "Resolved secondary citations");
        (secondary_ids, edges)
    }

    fn spawn_links(
        &self,
        id: &PublicationId,
        relation: LinkRelation,
        limit: usize,
    ) -> JoinHandle<Result<Vec<PublicationId>>> {
        let links = self.links.clone();
        let id = id.clone();
        tokio::spawn(async move { links.fetch_links(&id, relation, limit).await })
    }
}

/// Wait for a spawned lookup until `deadline`, aborting it when the deadline passes
async fn settle<T>(
    mut task: JoinHandle<Result<T>>,
    deadline: Instant,
    stage: &'static str,
) -> Branch<T> {
    match timeout_at(deadline, &mut task).await {
        Ok(Ok(Ok(value))) => Branch::Completed(value),
        Ok(Ok(Err(e))) => {
            warn!(stage, error = %e, "Lookup failed");
            Branch::Failed(e)
        }
        Ok(Err(join_error)) => {
            warn!(stage, error = %join_error, "Lookup task crashed");
            Branch::Crashed(format!("{stage} lookup task crashed: {join_error}"))
        }
        Err(_) => {
            task.abort();
            metrics::record_branch_timeout(stage);
            warn!(stage, "Lookup missed its deadline, continuing without it");
            Branch::Expired
        }
    }
}

/// Ids in first-seen order, without repeats or `exclude`
fn distinct(ids: Vec<PublicationId>, exclude: &PublicationId) -> Vec<PublicationId> {
    let mut seen = IndexSet::with_capacity(ids.len());
    for id in ids {
        if &id != exclude {
            seen.insert(id);
        }
    }
    seen.into_iter().collect()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::{EdgeKind, PublicationMeta};
    use crate::mock::MockSources;
    use async_trait::async_trait;
    use cocite_common::FetchError;
    use std::collections::{HashMap, HashSet};

    #[derive(Clone)]
    enum Reply {
        Ids(Vec<&'static str>),
        Fail,
        Stall,
        Panic,
    }

    /// Links answered from a script keyed by relation and id; unscripted lookups are empty
    #[derive(Default)]
    struct ScriptedLinks {
        replies: HashMap<(LinkRelation, PublicationId), Reply>,
    }

    impl ScriptedLinks {
        fn citing(mut self, id: &str, reply: Reply) -> Self {
            self.replies.insert((LinkRelation::CitedIn, id.into()), reply);
            self
        }

        fn references(mut self, id: &str, reply: Reply) -> Self {
            self.replies.insert((LinkRelation::References, id.into()), reply);
            self
        }
    }

    #[async_trait]
    impl CitationLinks for ScriptedLinks {
        async fn fetch_links(
            &self,
            id: &PublicationId,
            relation: LinkRelation,
            limit: usize,
        ) -> Result<Vec<PublicationId>> {
            let reply = self
                .replies
                .get(&(relation, id.clone()))
                .cloned()
                .unwrap_or(Reply::Ids(Vec::new()));
            match reply {
                Reply::Ids(ids) => Ok(ids.into_iter().map(PublicationId::from).take(limit).collect()),
                Reply::Fail => Err(FetchError::Connection("connection refused".into()).into()),
                Reply::Stall => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(vec!["999".into()])
                }
                Reply::Panic => panic!("link source blew up"),
            }
        }
    }

    enum MetadataMode {
        Titles,
        Fail,
        Stall,
        Panic,
    }

    struct FakeMetadata(MetadataMode);

    #[async_trait]
    impl PublicationMetadata for FakeMetadata {
        async fn lookup(
            &self,
            ids: &[PublicationId],
        ) -> Result<HashMap<PublicationId, PublicationMeta>> {
            match self.0 {
                MetadataMode::Titles => Ok(ids
                    .iter()
                    .map(|id| {
                        let meta = PublicationMeta {
                            title: format!("Title {id}"),
                            authors: "A B".into(),
                            year: "2020".into(),
                            journal: "J".into(),
                        };
                        (id.clone(), meta)
                    })
                    .collect()),
                MetadataMode::Fail => Err(FetchError::Timeout { timeout_ms: 60_000 }.into()),
                MetadataMode::Stall => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(HashMap::new())
                }
                MetadataMode::Panic => panic!("metadata source blew up"),
            }
        }
    }

    fn builder(links: ScriptedLinks, metadata: MetadataMode) -> CitationGraphBuilder {
        CitationGraphBuilder::new(
            Arc::new(links),
            Arc::new(FakeMetadata(metadata)),
            BuilderConfig::default(),
        )
    }

    fn ids_of(graph: &Graph, kind: NodeKind) -> Vec<&str> {
        graph.nodes_of_kind(kind).map(|n| n.id.as_str()).collect()
    }

    fn has_edge(graph: &Graph, source: &str, target: &str, kind: EdgeKind) -> bool {
        graph
            .edges
            .iter()
            .any(|e| e.source.as_str() == source && e.target.as_str() == target && e.kind == kind)
    }

    /// Structural invariants every graph must satisfy
    fn assert_well_formed(graph: &Graph) {
        let sources: Vec<_> = graph.nodes_of_kind(NodeKind::Source).collect();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].id, graph.source_id);
        assert_eq!(graph.nodes[0].id, graph.source_id);

        let node_ids: HashSet<_> = graph.nodes.iter().map(|n| &n.id).collect();
        assert_eq!(node_ids.len(), graph.nodes.len(), "node ids must be unique");
        for edge in &graph.edges {
            assert!(node_ids.contains(&edge.source), "dangling source {}", edge.source);
            assert!(node_ids.contains(&edge.target), "dangling target {}", edge.target);
            assert_eq!(edge.weight, 1.0);
        }

        assert_eq!(graph.summary.total_nodes, graph.nodes.len());
        assert_eq!(graph.summary.total_edges, graph.edges.len());
        assert_eq!(
            graph.summary.cocitation_edge_count,
            graph.edges_of_kind(EdgeKind::Cocitation).count()
        );
    }

    #[tokio::test]
    async fn test_citing_cited_and_secondary_graph() {
        let links = ScriptedLinks::default()
            .citing("1", Reply::Ids(vec!["10", "11"]))
            .references("1", Reply::Ids(vec!["20", "21", "22"]))
            .references("10", Reply::Ids(vec!["21"]))
            .references("11", Reply::Ids(vec![]));

        let graph = builder(links, MetadataMode::Titles).build(&"1".into(), 30).await;
        assert_well_formed(&graph);

        let order: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(order, vec!["1", "10", "11", "20", "21", "22"]);
        assert_eq!(ids_of(&graph, NodeKind::Citing), vec!["10", "11"]);
        assert_eq!(ids_of(&graph, NodeKind::Cited), vec!["20", "21", "22"]);
        assert!(ids_of(&graph, NodeKind::Secondary).is_empty());

        assert_eq!(graph.edges.len(), 9);
        assert!(has_edge(&graph, "10", "1", EdgeKind::Cites));
        assert!(has_edge(&graph, "11", "1", EdgeKind::Cites));
        for cited in ["20", "21", "22"] {
            assert!(has_edge(&graph, "1", cited, EdgeKind::Cites));
        }
        assert!(has_edge(&graph, "10", "21", EdgeKind::Cites));
        assert_eq!(graph.edges_of_kind(EdgeKind::Cocitation).count(), 3);

        let summary = &graph.summary;
        assert_eq!(summary.source_title, "Title 1");
        assert_eq!(summary.citing_count, 2);
        assert_eq!(summary.cited_count, 3);
        assert_eq!(summary.secondary_count, 1);
        assert_eq!(summary.cocitation_edge_count, 3);
        assert!(summary.error.is_none());
    }

    #[tokio::test]
    async fn test_total_remote_failure_degrades_to_source() {
        let links = ScriptedLinks::default()
            .citing("1", Reply::Fail)
            .references("1", Reply::Fail);

        let graph = builder(links, MetadataMode::Fail).build(&"1".into(), 30).await;
        assert_well_formed(&graph);

        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].title, "Paper 1");
        assert_eq!(graph.nodes[0].authors, "Unknown Authors");
        assert!(graph.edges.is_empty());

        let error = graph.summary.error.as_deref().unwrap();
        assert!(error.contains("citing lookup failed"));
        assert!(error.contains("metadata lookup failed"));
    }

    #[tokio::test]
    async fn test_single_failed_direction_is_not_an_error() {
        let links = ScriptedLinks::default()
            .citing("1", Reply::Fail)
            .references("1", Reply::Ids(vec!["20"]));

        let graph = builder(links, MetadataMode::Titles).build(&"1".into(), 30).await;
        assert_well_formed(&graph);
        assert_eq!(ids_of(&graph, NodeKind::Cited), vec!["20"]);
        assert!(graph.summary.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_citing_branch_leaves_no_partial_data() {
        let links = ScriptedLinks::default()
            .citing("1", Reply::Stall)
            .references("1", Reply::Ids(vec!["20", "21"]));

        let started = Instant::now();
        let graph = builder(links, MetadataMode::Titles).build(&"1".into(), 30).await;
        let elapsed = started.elapsed();
        assert_well_formed(&graph);

        assert!(elapsed >= Duration::from_secs(30));
        assert!(elapsed < Duration::from_secs(3600));

        assert!(ids_of(&graph, NodeKind::Citing).is_empty());
        assert!(graph.node(&"999".into()).is_none());
        assert_eq!(ids_of(&graph, NodeKind::Cited), vec!["20", "21"]);
        assert!(graph.edges.iter().all(|e| e.target != graph.source_id));
        assert_eq!(graph.summary.citing_count, 0);
        assert_eq!(graph.summary.cocitation_edge_count, 1);
        assert!(graph.summary.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_secondary_branch_is_skipped() {
        let links = ScriptedLinks::default()
            .citing("1", Reply::Ids(vec!["10", "11"]))
            .references("10", Reply::Stall)
            .references("11", Reply::Ids(vec!["30", "1"]));

        let started = Instant::now();
        let graph = builder(links, MetadataMode::Titles).build(&"1".into(), 30).await;
        assert_well_formed(&graph);

        assert!(started.elapsed() >= Duration::from_secs(20));
        assert_eq!(ids_of(&graph, NodeKind::Secondary), vec!["30"]);
        assert!(has_edge(&graph, "11", "30", EdgeKind::Cites));
        // Only the direct citing edge; the secondary self-link is dropped
        let citing_edges = graph
            .edges
            .iter()
            .filter(|e| e.source.as_str() == "11" && e.target.as_str() == "1" && e.kind == EdgeKind::Cites)
            .count();
        assert_eq!(citing_edges, 1);
        assert!(graph.edges.iter().all(|e| e.source.as_str() != "10" || e.target == graph.source_id));
        assert_eq!(graph.summary.secondary_count, 1);
        assert!(graph.summary.error.is_none());
    }

    #[tokio::test]
    async fn test_only_first_citing_publications_are_sampled() {
        let links = ScriptedLinks::default()
            .citing("1", Reply::Ids(vec!["10", "11", "12", "13", "14"]))
            .references("10", Reply::Ids(vec!["40"]))
            .references("11", Reply::Ids(vec!["41"]))
            .references("12", Reply::Ids(vec!["42"]))
            .references("13", Reply::Ids(vec!["43"]))
            .references("14", Reply::Ids(vec!["44"]));

        let graph = builder(links, MetadataMode::Titles).build(&"1".into(), 30).await;
        assert_well_formed(&graph);
        assert_eq!(ids_of(&graph, NodeKind::Secondary), vec!["40", "41", "42"]);
    }

    #[tokio::test]
    async fn test_duplicates_and_self_links_are_dropped() {
        let links = ScriptedLinks::default()
            .citing("1", Reply::Ids(vec!["10", "1", "10"]))
            .references("1", Reply::Ids(vec!["20", "20", "21", "1"]));

        let graph = builder(links, MetadataMode::Titles).build(&"1".into(), 30).await;
        assert_well_formed(&graph);
        assert_eq!(graph.summary.citing_count, 1);
        assert_eq!(graph.summary.cited_count, 2);
        assert_eq!(graph.summary.cocitation_edge_count, 1);
    }

    #[tokio::test]
    async fn test_limit_caps_direct_lookups() {
        let links = ScriptedLinks::default()
            .citing("1", Reply::Ids(vec!["10", "11", "12", "13"]))
            .references("1", Reply::Ids(vec!["20", "21", "22", "23"]));

        let graph = builder(links, MetadataMode::Titles).build(&"1".into(), 2).await;
        assert_well_formed(&graph);
        assert_eq!(graph.summary.citing_count, 2);
        assert_eq!(graph.summary.cited_count, 2);
    }

    #[tokio::test]
    async fn test_failed_metadata_uses_placeholders() {
        let links = ScriptedLinks::default().references("1", Reply::Ids(vec!["20", "21"]));

        let graph = builder(links, MetadataMode::Fail).build(&"1".into(), 30).await;
        assert_well_formed(&graph);
        assert_eq!(graph.nodes.len(), 3);
        assert!(graph.nodes.iter().all(|n| n.authors == "Unknown Authors"));
        assert_eq!(graph.node(&"21".into()).unwrap().title, "Paper 21");
        assert!(graph.summary.error.as_deref().unwrap().contains("metadata"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_metadata_falls_back_to_placeholders() {
        let links = ScriptedLinks::default()
            .citing("1", Reply::Ids(vec!["10"]))
            .references("1", Reply::Ids(vec!["20", "21"]));

        let started = Instant::now();
        let graph = builder(links, MetadataMode::Stall).build(&"1".into(), 30).await;
        let elapsed = started.elapsed();
        assert_well_formed(&graph);

        assert!(elapsed >= Duration::from_secs(30));
        assert!(elapsed < Duration::from_secs(3600));

        assert_eq!(graph.nodes.len(), 4);
        assert!(graph.nodes.iter().all(|n| n.authors == "Unknown Authors"));
        assert_eq!(graph.summary.source_title, "Paper 1");
        assert_eq!(graph.summary.citing_count, 1);
        assert_eq!(graph.summary.cocitation_edge_count, 1);
        assert_eq!(
            graph.summary.error.as_deref(),
            Some("metadata lookup timed out after 30s")
        );
    }

    #[tokio::test]
    async fn test_panicking_branch_counts_as_empty() {
        let links = ScriptedLinks::default()
            .citing("1", Reply::Panic)
            .references("1", Reply::Ids(vec!["20"]));

        let graph = builder(links, MetadataMode::Titles).build(&"1".into(), 30).await;
        assert_well_formed(&graph);
        assert_eq!(ids_of(&graph, NodeKind::Cited), vec!["20"]);
        assert!(ids_of(&graph, NodeKind::Citing).is_empty());
        assert!(graph.summary.error.is_none());
    }

    #[tokio::test]
    async fn test_panicking_metadata_yields_minimal_graph() {
        let links = ScriptedLinks::default().references("1", Reply::Ids(vec!["20", "21"]));

        let graph = builder(links, MetadataMode::Panic).build(&"1".into(), 30).await;
        assert_well_formed(&graph);
        assert_eq!(graph.nodes.len(), 1);
        assert!(graph.edges.is_empty());
        assert!(graph
            .summary
            .error
            .as_deref()
            .unwrap()
            .contains("metadata source blew up"));
    }

    #[tokio::test]
    async fn test_mock_sources_build() {
        let sources = crate::sources::Sources {
            links: Arc::new(MockSources::new()),
            metadata: Arc::new(MockSources::new()),
            search: Arc::new(MockSources::new()),
        };
        let builder = CitationGraphBuilder::from_sources(&sources, BuilderConfig::default());

        let graph = builder.build(&"34530140".into(), 30).await;
        assert_well_formed(&graph);
        assert_eq!(graph.summary.source_title, "Targeting p53 for cancer therapy");
        assert_eq!(ids_of(&graph, NodeKind::Cited), vec!["34528509", "34529953"]);
        assert_eq!(graph.summary.cocitation_edge_count, 1);
    }

    #[test]
    fn test_builder_config_from_network_config() {
        let network = NetworkConfig {
            link_deadline_secs: 5,
            secondary_sample: 1,
            metadata_deadline_secs: 12,
            ..cocite_common::config::AppConfig::default().network
        };
        let config = BuilderConfig::from(&network);
        assert_eq!(config.link_deadline, Duration::from_secs(5));
        assert_eq!(config.secondary_deadline, Duration::from_secs(20));
        assert_eq!(config.secondary_sample, 1);
        assert_eq!(config.secondary_limit, 10);
        assert_eq!(config.metadata_deadline, Duration::from_secs(12));
        assert_eq!(
            BuilderConfig::default().metadata_deadline,
            BuilderConfig::from(&cocite_common::config::AppConfig::default().network).metadata_deadline
        );
    }
}
