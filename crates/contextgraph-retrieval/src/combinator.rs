use crate::executor::PatternExecutor;
use contextgraph_core::{
    CombinatorKind, MatchedPath, NodeId, QueryCombinator, RankingStrategy, Result,
};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Applies INTERSECTION / UNION / SEQUENTIAL across per-pattern results.
///
/// A failing sub-pattern contributes an empty list, never an error, so a
/// partial union stays useful.
pub struct CombinatorEngine<'a> {
    executor: &'a PatternExecutor,
}

impl<'a> CombinatorEngine<'a> {
    pub fn new(executor: &'a PatternExecutor) -> Self {
        Self { executor }
    }

    pub async fn execute(
        &self,
        combinator: &QueryCombinator,
        seeds: &[NodeId],
        max_paths: usize,
        strategy: RankingStrategy,
        query_text: &str,
    ) -> Result<Vec<MatchedPath>> {
        match combinator.kind {
            CombinatorKind::Union => {
                self.union(combinator, seeds, max_paths, strategy, query_text)
                    .await
            }
            CombinatorKind::Intersection => {
                self.intersection(combinator, seeds, max_paths, strategy, query_text)
                    .await
            }
            CombinatorKind::Sequential => {
                self.sequential(combinator, seeds, max_paths, strategy, query_text)
                    .await
            }
        }
    }

    async fn run_sub_pattern(
        &self,
        pattern: &contextgraph_core::GraphPattern,
        seeds: &[NodeId],
        max_paths: usize,
        strategy: RankingStrategy,
        query_text: &str,
    ) -> Vec<MatchedPath> {
        match self
            .executor
            .execute(pattern, seeds, max_paths, strategy, query_text)
            .await
        {
            Ok(paths) => paths,
            Err(e) => {
                warn!(pattern_id = %pattern.pattern_id, error = %e, "sub-pattern failed");
                Vec::new()
            }
        }
    }

    async fn union(
        &self,
        combinator: &QueryCombinator,
        seeds: &[NodeId],
        max_paths: usize,
        strategy: RankingStrategy,
        query_text: &str,
    ) -> Result<Vec<MatchedPath>> {
        let mut all = Vec::new();
        for pattern in &combinator.patterns {
            all.extend(
                self.run_sub_pattern(pattern, seeds, max_paths, strategy, query_text)
                    .await,
            );
        }
        sort_ranked(&mut all);
        all.truncate(max_paths);
        Ok(all)
    }

    /// A node is common when it appears in every pattern's matches; the
    /// result is the first pattern's paths touching that common set.
    async fn intersection(
        &self,
        combinator: &QueryCombinator,
        seeds: &[NodeId],
        max_paths: usize,
        strategy: RankingStrategy,
        query_text: &str,
    ) -> Result<Vec<MatchedPath>> {
        let mut per_pattern = Vec::with_capacity(combinator.patterns.len());
        for pattern in &combinator.patterns {
            per_pattern.push(
                self.run_sub_pattern(pattern, seeds, max_paths, strategy, query_text)
                    .await,
            );
        }

        let mut common: Option<HashSet<NodeId>> = None;
        for results in &per_pattern {
            let nodes: HashSet<NodeId> = results
                .iter()
                .flat_map(|p| p.node_ids.iter().copied())
                .collect();
            common = Some(match common {
                Some(acc) => acc.intersection(&nodes).copied().collect(),
                None => nodes,
            });
        }
        let common = common.unwrap_or_default();
        debug!(common = common.len(), "intersection node set");
        if common.is_empty() {
            return Ok(Vec::new());
        }

        let mut kept: Vec<MatchedPath> = per_pattern
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .filter(|p| p.node_ids.iter().any(|id| common.contains(id)))
            .collect();
        kept.truncate(max_paths);
        Ok(kept)
    }

    /// Terminal nodes of each stage seed the next; all stages contribute
    /// to the final ranking.
    async fn sequential(
        &self,
        combinator: &QueryCombinator,
        seeds: &[NodeId],
        max_paths: usize,
        strategy: RankingStrategy,
        query_text: &str,
    ) -> Result<Vec<MatchedPath>> {
        let mut all = Vec::new();
        let mut stage_seeds: Vec<NodeId> = seeds.to_vec();
        for pattern in &combinator.patterns {
            if stage_seeds.is_empty() {
                break;
            }
            let stage = self
                .run_sub_pattern(pattern, &stage_seeds, max_paths, strategy, query_text)
                .await;

            let mut next_seeds = Vec::new();
            let mut seen = HashSet::new();
            for path in &stage {
                if let Some(terminal) = path.terminal_node() {
                    if seen.insert(terminal) {
                        next_seeds.push(terminal);
                    }
                }
            }
            all.extend(stage);
            stage_seeds = next_seeds;
        }
        sort_ranked(&mut all);
        all.truncate(max_paths);
        Ok(all)
    }
}

pub(crate) fn sort_ranked(paths: &mut [MatchedPath]) {
    paths.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.node_ids.cmp(&b.node_ids))
    });
}
