use crate::combinator::{sort_ranked, CombinatorEngine};
use crate::executor::PatternExecutor;
use crate::extractor::SubgraphExtractor;
use crate::ranking::PathRanker;
use crate::resolver::{EntryPointResolver, ResolverOptions};
use contextgraph_core::{
    Chunk, ChunkStore, ContextGraphError, Embedder, GraphNode, GraphQuery, GraphStore, MatchedPath,
    NodeId, RetrievalRequest, RetrievalResult, RetrievalStrategy, Result, Settings, Subgraph,
    Validate,
};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// The 3-level fallback state machine: pattern-based retrieval, then
/// target-based graph extraction, then pure vector search.
///
/// A request is one sequential task; only store and embedder calls
/// suspend, and every one of them races the request's cancellation token.
/// The orchestrator holds no mutable cross-request state; stores and
/// settings are shared read-only.
pub struct RetrievalOrchestrator {
    chunks: Arc<dyn ChunkStore>,
    embedder: Arc<dyn Embedder>,
    graph: Arc<dyn GraphStore>,
    settings: Settings,
    resolver: EntryPointResolver,
    executor: PatternExecutor,
    extractor: SubgraphExtractor,
    semaphore: Arc<Semaphore>,
}

impl RetrievalOrchestrator {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        chunks: Arc<dyn ChunkStore>,
        embedder: Arc<dyn Embedder>,
        settings: Settings,
    ) -> Self {
        let resolver = EntryPointResolver::new(graph.clone(), chunks.clone(), embedder.clone());
        let ranker = PathRanker::new(
            graph.clone(),
            embedder.clone(),
            settings.retrieval.ranking.clone(),
        );
        let executor = PatternExecutor::new(graph.clone(), ranker);
        let extractor = SubgraphExtractor::new(graph.clone());
        let semaphore = Arc::new(Semaphore::new(settings.retrieval.max_concurrent_requests));
        Self {
            chunks,
            embedder,
            graph,
            settings,
            resolver,
            executor,
            extractor,
            semaphore,
        }
    }

    /// Run a request to completion, arming the cancellation token from the
    /// request's own timeout when present.
    pub async fn retrieve(&self, request: RetrievalRequest) -> Result<RetrievalResult> {
        let token = CancellationToken::new();
        if let Some(timeout_ms) = request.timeout_ms {
            let deadline = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(timeout_ms)).await;
                deadline.cancel();
            });
        }
        self.retrieve_with_token(request, token).await
    }

    /// Run a request under an externally supplied cancellation signal.
    #[instrument(skip(self, request, token), fields(top_k = request.top_k))]
    pub async fn retrieve_with_token(
        &self,
        request: RetrievalRequest,
        token: CancellationToken,
    ) -> Result<RetrievalResult> {
        request.validate()?;
        let _permit = guarded(&token, async {
            self.semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| ContextGraphError::Internal(e.to_string()))
        })
        .await?;

        let start = Instant::now();
        let graph_query = request.graph_query.clone().unwrap_or_default();

        if graph_query.has_patterns() {
            match guarded(&token, self.pattern_stage(&request, &graph_query)).await {
                Ok(Some(result)) => return Ok(self.finalize(result, start)),
                Ok(None) => debug!("pattern stage empty, descending"),
                Err(e) if e.is_fallback_eligible() => {
                    warn!(error = %e, "pattern stage failed, descending")
                }
                Err(e) => return Err(e),
            }
        }

        if graph_query.has_targets() {
            match guarded(&token, self.target_stage(&request, &graph_query)).await {
                Ok(Some(result)) => return Ok(self.finalize(result, start)),
                Ok(None) => debug!("target stage empty, descending"),
                Err(e) if e.is_fallback_eligible() => {
                    warn!(error = %e, "target stage failed, descending")
                }
                Err(e) => return Err(e),
            }
        }

        // Last stratum: errors here surface to the caller.
        let result = guarded(&token, self.vector_stage(&request)).await?;
        Ok(self.finalize(result, start))
    }

    /// PATTERN_BASED: resolve seeds, execute patterns, wrap the matched
    /// paths in a bounded subgraph and attach node-linked chunks.
    async fn pattern_stage(
        &self,
        request: &RetrievalRequest,
        graph_query: &GraphQuery,
    ) -> Result<Option<RetrievalResult>> {
        let seeds = self.pattern_seeds(request, graph_query).await?;
        if seeds.is_empty() {
            return Ok(None);
        }

        let strategy = graph_query.ranking_strategy;
        let paths: Vec<MatchedPath> = if let Some(combinator) = &graph_query.combinator {
            CombinatorEngine::new(&self.executor)
                .execute(combinator, &seeds, request.top_k, strategy, &request.query)
                .await?
        } else {
            // Bare pattern lists behave as a union.
            let mut all = Vec::new();
            for pattern in graph_query.patterns.iter().flatten() {
                all.extend(
                    self.executor
                        .execute(pattern, &seeds, request.top_k, strategy, &request.query)
                        .await?,
                );
            }
            sort_ranked(&mut all);
            all.truncate(request.top_k);
            all
        };
        if paths.is_empty() {
            return Ok(None);
        }

        // Seeds lead so the budget enforcer can never evict them; path
        // nodes follow in rank order.
        let mut ids: Vec<NodeId> = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::new();
        for id in seeds
            .iter()
            .copied()
            .chain(paths.iter().flat_map(|p| p.node_ids.iter().copied()))
        {
            if seen.insert(id) {
                ids.push(id);
            }
        }
        let subgraph = self
            .extractor
            .extract_bounded(&ids, 0, request.max_graph_nodes)
            .await?;
        if subgraph.is_empty() {
            return Ok(None);
        }

        let chunks = self
            .linked_chunks(&subgraph.nodes, request.max_token_budget)
            .await?;
        Ok(Some(self.compose(subgraph, chunks, RetrievalStrategy::Hybrid)))
    }

    /// Seed selection for the pattern stage: resolved targets when given,
    /// otherwise every node carrying the first step's source label.
    async fn pattern_seeds(
        &self,
        request: &RetrievalRequest,
        graph_query: &GraphQuery,
    ) -> Result<Vec<NodeId>> {
        if graph_query.has_targets() {
            let targets = graph_query.targets.as_deref().unwrap_or_default();
            return self
                .resolver
                .resolve(targets, &self.resolver_options(request, false))
                .await;
        }
        let first_pattern = graph_query
            .combinator
            .as_ref()
            .and_then(|c| c.patterns.first())
            .or_else(|| graph_query.patterns.as_ref().and_then(|p| p.first()));
        let Some(label) = first_pattern
            .and_then(|p| p.steps.first())
            .and_then(|s| s.source_label.as_deref())
        else {
            return Ok(Vec::new());
        };
        let nodes = self.graph.find_nodes_by_label(label).await?;
        Ok(nodes.into_iter().map(|n| n.id).collect())
    }

    /// TARGET_VECTOR_FIRST: resolve seeds (with fuzzy property matching)
    /// and extract the surrounding subgraph. Thin graph results get their
    /// linked chunks pulled in and are labelled EXPANSION.
    async fn target_stage(
        &self,
        request: &RetrievalRequest,
        graph_query: &GraphQuery,
    ) -> Result<Option<RetrievalResult>> {
        let targets = graph_query.targets.as_deref().unwrap_or_default();
        let seeds = self
            .resolver
            .resolve(targets, &self.resolver_options(request, true))
            .await?;
        if seeds.is_empty() {
            return Ok(None);
        }

        let depth = self.effective_depth(graph_query);
        let mut subgraph = self
            .extractor
            .extract_bounded(&seeds, depth, request.max_graph_nodes)
            .await?;
        if subgraph.is_empty() {
            return Ok(None);
        }

        // A requested relation-type filter applies to the reported edges.
        if let Some(relation_types) = graph_query
            .traversal
            .as_ref()
            .and_then(|t| t.relation_types.as_ref())
        {
            let allowed: HashSet<&str> = relation_types.iter().map(String::as_str).collect();
            subgraph
                .edges
                .retain(|e| allowed.contains(e.relation_type.as_str()));
        }

        if subgraph.nodes.len() < self.settings.retrieval.min_results_threshold {
            let chunks = self
                .linked_chunks(&subgraph.nodes, request.max_token_budget)
                .await?;
            return Ok(Some(self.compose(
                subgraph,
                chunks,
                RetrievalStrategy::Expansion,
            )));
        }
        Ok(Some(self.compose(
            subgraph,
            Vec::new(),
            RetrievalStrategy::GraphOnly,
        )))
    }

    /// VECTOR_ONLY: embed the query text (plus any semantic keywords) and
    /// return the nearest chunks.
    async fn vector_stage(&self, request: &RetrievalRequest) -> Result<RetrievalResult> {
        let mut text = request.query.clone();
        for keyword in &request.semantic_keywords {
            text.push(' ');
            text.push_str(keyword);
        }
        let embedding = self.embedder.embed(&text).await?;
        let chunks = self.chunks.top_k_similar(&embedding, request.top_k).await?;
        let chunks = apply_token_budget(chunks, request.max_token_budget);
        info!(chunks = chunks.len(), "vector-only retrieval");
        Ok(self.compose(
            Subgraph::default(),
            chunks,
            RetrievalStrategy::VectorOnly,
        ))
    }

    async fn linked_chunks(&self, nodes: &[GraphNode], budget: usize) -> Result<Vec<Chunk>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for node in nodes {
            for chunk in self.chunks.find_by_linked_node_id(node.id).await? {
                if seen.insert(chunk.id) {
                    out.push(chunk);
                }
            }
        }
        Ok(apply_token_budget(out, budget))
    }

    fn resolver_options(&self, request: &RetrievalRequest, fuzzy: bool) -> ResolverOptions {
        ResolverOptions {
            top_k: request.top_k,
            fuzzy,
            levenshtein_max_distance: self.settings.retrieval.levenshtein_max_distance,
        }
    }

    fn effective_depth(&self, graph_query: &GraphQuery) -> usize {
        let requested = graph_query
            .traversal
            .as_ref()
            .and_then(|t| t.max_depth)
            .unwrap_or(self.settings.retrieval.default_depth);
        requested.min(self.settings.graph.max_traversal_depth)
    }

    fn compose(
        &self,
        subgraph: Subgraph,
        chunks: Vec<Chunk>,
        strategy: RetrievalStrategy,
    ) -> RetrievalResult {
        let thin =
            subgraph.nodes.len() + chunks.len() < self.settings.retrieval.min_results_threshold;
        RetrievalResult {
            nodes: subgraph.nodes,
            edges: subgraph.edges,
            chunks,
            strategy,
            retrieval_time_ms: 0,
            thin,
        }
    }

    fn finalize(&self, mut result: RetrievalResult, start: Instant) -> RetrievalResult {
        result.retrieval_time_ms = start.elapsed().as_millis() as u64;
        info!(
            strategy = ?result.strategy,
            nodes = result.nodes.len(),
            edges = result.edges.len(),
            chunks = result.chunks.len(),
            elapsed_ms = result.retrieval_time_ms,
            "retrieval complete"
        );
        result
    }
}

/// Race a pipeline step against the request's cancellation token. The
/// step's future is dropped at whatever await point it was suspended on,
/// so pending store calls are abandoned and their results discarded.
async fn guarded<T, F>(token: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ContextGraphError::Cancelled),
        out = fut => out,
    }
}

/// Keep chunks while the running token estimate stays inside `budget`;
/// zero disables the budget.
fn apply_token_budget(chunks: Vec<Chunk>, budget: usize) -> Vec<Chunk> {
    if budget == 0 {
        return chunks;
    }
    let mut total = 0usize;
    let mut out = Vec::new();
    for chunk in chunks {
        total += chunk.estimated_tokens();
        if total > budget {
            break;
        }
        out.push(chunk);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use contextgraph_core::Chunk;

    #[test]
    fn token_budget_truncates_in_order() {
        let chunks: Vec<Chunk> = (0..4)
            .map(|i| Chunk::new("x".repeat(40), vec![1.0]).with_metadata("i", i))
            .collect();
        // 10 estimated tokens each; budget of 25 keeps two.
        let kept = apply_token_budget(chunks.clone(), 25);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].id, chunks[0].id);

        assert_eq!(apply_token_budget(chunks, 0).len(), 4);
    }

    #[tokio::test]
    async fn guarded_surfaces_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let out: Result<()> = guarded(&token, async { Ok(()) }).await;
        assert!(matches!(out, Err(ContextGraphError::Cancelled)));
    }
}
