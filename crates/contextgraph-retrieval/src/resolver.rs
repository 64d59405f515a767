use contextgraph_core::{
    ChunkStore, Embedder, GraphNode, GraphStore, NodeId, ResolutionTarget, Result,
};
use contextgraph_graph::fuzzy_eq;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// How the resolver behaves for a particular stratum.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// How many nearest chunks the vector leg considers per target.
    pub top_k: usize,
    /// Second-chance fuzzy property matching; enabled only for the
    /// graph-only stratum.
    pub fuzzy: bool,
    pub levenshtein_max_distance: usize,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            fuzzy: false,
            levenshtein_max_distance: 2,
        }
    }
}

/// Maps resolution targets to a deduplicated seed node list.
///
/// Per target, three legs run concurrently: exact label match, property
/// heuristic against the type hint, and nearest linked chunks. Their hits
/// are merged in that fixed order so first-seen dedup is stable.
pub struct EntryPointResolver {
    graph: Arc<dyn GraphStore>,
    chunks: Arc<dyn ChunkStore>,
    embedder: Arc<dyn Embedder>,
}

impl EntryPointResolver {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        chunks: Arc<dyn ChunkStore>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            graph,
            chunks,
            embedder,
        }
    }

    pub async fn resolve(
        &self,
        targets: &[ResolutionTarget],
        options: &ResolverOptions,
    ) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for target in targets {
            for id in self.resolve_target(target, options).await? {
                if seen.insert(id) {
                    out.push(id);
                }
            }
        }
        debug!(targets = targets.len(), seeds = out.len(), "targets resolved");
        Ok(out)
    }

    async fn resolve_target(
        &self,
        target: &ResolutionTarget,
        options: &ResolverOptions,
    ) -> Result<Vec<NodeId>> {
        let (by_label, by_heuristic, by_vector) = tokio::join!(
            self.by_exact_label(target),
            self.by_property_heuristic(target, options),
            self.by_nearest_chunks(target, options.top_k),
        );

        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut first_error = None;
        let mut failures = 0usize;
        for leg in [by_label, by_heuristic, by_vector] {
            match leg {
                Ok(ids) => {
                    for id in ids {
                        if seen.insert(id) {
                            out.push(id);
                        }
                    }
                }
                Err(e) => {
                    warn!(description = %target.description, error = %e, "resolver leg failed");
                    failures += 1;
                    first_error.get_or_insert(e);
                }
            }
        }
        // A target fails only when every leg failed with an error; empty
        // legs are fine.
        if failures == 3 {
            return Err(first_error.expect("three failures imply an error"));
        }
        Ok(out)
    }

    /// Leg 1: the description used verbatim as a label.
    async fn by_exact_label(&self, target: &ResolutionTarget) -> Result<Vec<NodeId>> {
        let nodes = self.graph.find_nodes_by_label(&target.description).await?;
        Ok(nodes.into_iter().map(|n| n.id).collect())
    }

    /// Leg 2: nodes of the hinted label whose string properties appear in
    /// the description. The length guard keeps short codes ("Low", "Male")
    /// from matching spuriously.
    async fn by_property_heuristic(
        &self,
        target: &ResolutionTarget,
        options: &ResolverOptions,
    ) -> Result<Vec<NodeId>> {
        let Some(hint) = target.type_hint.as_deref().filter(|h| !h.is_empty()) else {
            return Ok(Vec::new());
        };
        let candidates = self.graph.find_nodes_by_label(hint).await?;

        let exact: Vec<NodeId> = candidates
            .iter()
            .filter(|node| heuristic_match(node, &target.description))
            .map(|n| n.id)
            .collect();
        if !exact.is_empty() || !options.fuzzy {
            return Ok(exact);
        }

        // Graph-only stratum: tolerate small typos before giving up.
        Ok(candidates
            .iter()
            .filter(|node| {
                node.string_properties().any(|v| {
                    v.len() > 3 && fuzzy_eq(v, &target.description, options.levenshtein_max_distance)
                })
            })
            .map(|n| n.id)
            .collect())
    }

    /// Leg 3: embed the description and walk the nearest chunks back to
    /// their linked nodes.
    async fn by_nearest_chunks(&self, target: &ResolutionTarget, top_k: usize) -> Result<Vec<NodeId>> {
        let embedding = self.embedder.embed(&target.description).await?;
        let chunks = self.chunks.top_k_similar(&embedding, top_k).await?;
        Ok(chunks.into_iter().filter_map(|c| c.linked_node_id).collect())
    }
}

fn heuristic_match(node: &GraphNode, description: &str) -> bool {
    node.string_properties()
        .any(|v| v.len() > 3 && (description.contains(v) || v == description))
}
