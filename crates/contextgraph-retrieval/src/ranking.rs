use contextgraph_core::{
    Embedder, GraphStore, MatchedPath, NodeId, RankingStrategy, RankingWeights, Result,
};
use std::sync::Arc;
use tracing::debug;

/// Scores matched paths under a ranking strategy.
///
/// EDGE_WEIGHT and NODE_CENTRALITY re-read edges from the store; the
/// double lookup is accepted in exchange for keeping the executor's walk
/// free of edge bookkeeping.
pub struct PathRanker {
    graph: Arc<dyn GraphStore>,
    embedder: Arc<dyn Embedder>,
    weights: RankingWeights,
}

impl PathRanker {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        embedder: Arc<dyn Embedder>,
        weights: RankingWeights,
    ) -> Self {
        Self {
            graph,
            embedder,
            weights,
        }
    }

    /// Score every path in place, then sort descending with a
    /// deterministic lexicographic tie-break on node ids.
    pub async fn rank(
        &self,
        paths: &mut Vec<MatchedPath>,
        strategy: RankingStrategy,
        query_text: &str,
    ) -> Result<()> {
        let query_embedding = match strategy {
            RankingStrategy::SemanticScore | RankingStrategy::Hybrid => {
                // Scoring must not fail the whole request when the embedder
                // is down; the semantic component just contributes zero.
                self.embedder.embed(query_text).await.ok()
            }
            _ => None,
        };

        for path in paths.iter_mut() {
            path.score = self
                .score_path(path, strategy, query_embedding.as_deref())
                .await?;
        }
        paths.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.node_ids.cmp(&b.node_ids))
        });
        debug!(paths = paths.len(), ?strategy, "paths ranked");
        Ok(())
    }

    async fn score_path(
        &self,
        path: &MatchedPath,
        strategy: RankingStrategy,
        query_embedding: Option<&[f32]>,
    ) -> Result<f64> {
        match strategy {
            RankingStrategy::PathLength => Ok(path_length_score(path)),
            RankingStrategy::EdgeWeight => self.edge_weight_sum(path).await,
            RankingStrategy::NodeCentrality => self.centrality_score(path).await,
            RankingStrategy::SemanticScore => self.semantic_score(path, query_embedding).await,
            RankingStrategy::Hybrid => {
                let length = path_length_score(path);
                let weight_sum = self.edge_weight_sum(path).await?;
                let centrality = self.centrality_score(path).await?;
                let semantic = self.semantic_score(path, query_embedding).await?;
                // Squash the unbounded weight sum so every component lives
                // in [0, 1] before the weighted mean.
                Ok(self.weights.path_length * length
                    + self.weights.edge_weight * (weight_sum / (1.0 + weight_sum))
                    + self.weights.node_centrality * centrality
                    + self.weights.semantic * semantic)
            }
        }
    }

    /// Sum of traversed edge weights, resolved hop by hop.
    async fn edge_weight_sum(&self, path: &MatchedPath) -> Result<f64> {
        let mut total = 0.0;
        for (hop, pair) in path.node_ids.windows(2).enumerate() {
            let relation = &path.relation_types[hop];
            total += self.hop_weight(pair[0], pair[1], relation).await?;
        }
        Ok(total)
    }

    async fn hop_weight(&self, u: NodeId, v: NodeId, relation: &str) -> Result<f64> {
        let edges = self.graph.find_edges_for_node(u).await?;
        Ok(edges
            .iter()
            .find(|e| {
                e.relation_type == relation
                    && ((e.source_node_id == u && e.target_node_id == v)
                        || (e.source_node_id == v && e.target_node_id == u))
            })
            .map(|e| e.weight)
            .unwrap_or(1.0))
    }

    /// Mean over path nodes of `degree / (degree + 1)`.
    async fn centrality_score(&self, path: &MatchedPath) -> Result<f64> {
        if path.node_ids.is_empty() {
            return Ok(0.0);
        }
        let mut total = 0.0;
        for id in &path.node_ids {
            let degree = self.graph.find_edges_for_node(*id).await?.len() as f64;
            total += degree / (degree + 1.0);
        }
        Ok(total / path.node_ids.len() as f64)
    }

    async fn semantic_score(
        &self,
        path: &MatchedPath,
        query_embedding: Option<&[f32]>,
    ) -> Result<f64> {
        let Some(query) = query_embedding else {
            return Ok(0.0);
        };
        let Ok(description) = self.embedder.embed(&path.explanation).await else {
            return Ok(0.0);
        };
        Ok(cosine(query, &description) as f64)
    }
}

pub(crate) fn path_length_score(path: &MatchedPath) -> f64 {
    1.0 / (1.0 + path.node_ids.len() as f64)
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}
