use crate::constraints::constraint_holds;
use crate::ranking::PathRanker;
use contextgraph_core::{
    Constraint, GraphNode, GraphPattern, GraphStore, MatchedPath, NodeId, RankingStrategy, Result,
    TraversalStep,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Executes one traversal pattern from a seed set, producing ranked
/// matched paths.
///
/// A pattern is all-or-nothing: an accumulator that cannot extend through
/// the current step is dropped, so only full-length matches survive.
pub struct PatternExecutor {
    graph: Arc<dyn GraphStore>,
    ranker: PathRanker,
}

#[derive(Debug, Clone)]
struct PathAccumulator {
    node_ids: Vec<NodeId>,
    relation_types: Vec<String>,
    tail_label: String,
    trail: Vec<String>,
}

impl PathAccumulator {
    fn seed(node: &GraphNode) -> Self {
        Self {
            node_ids: vec![node.id],
            relation_types: Vec::new(),
            tail_label: node.label.clone(),
            trail: vec![node.label.clone()],
        }
    }

    fn extend(&self, step: &TraversalStep, neighbor: &GraphNode) -> Self {
        let mut next = self.clone();
        next.node_ids.push(neighbor.id);
        next.relation_types.push(step.relation_type.clone());
        next.tail_label = neighbor.label.clone();
        next.trail.push(step.relation_type.clone());
        next.trail.push(neighbor.label.clone());
        next
    }
}

impl PatternExecutor {
    pub fn new(graph: Arc<dyn GraphStore>, ranker: PathRanker) -> Self {
        Self { graph, ranker }
    }

    #[instrument(skip(self, pattern, seeds), fields(pattern_id = %pattern.pattern_id))]
    pub async fn execute(
        &self,
        pattern: &GraphPattern,
        seeds: &[NodeId],
        max_paths: usize,
        strategy: RankingStrategy,
        query_text: &str,
    ) -> Result<Vec<MatchedPath>> {
        if pattern.steps.is_empty() || seeds.is_empty() {
            return Ok(Vec::new());
        }

        let mut steps = pattern.steps.clone();
        steps.sort_by_key(|s| s.step_index);

        let mut active: Vec<PathAccumulator> = Vec::new();
        for seed in seeds {
            if let Some(node) = self.graph.get_node(*seed).await? {
                active.push(PathAccumulator::seed(&node));
            }
        }

        for step in &steps {
            let constraints: Vec<&Constraint> = pattern
                .constraints
                .iter()
                .filter(|c| c.at_step == step.step_index)
                .collect();

            let mut next_active = Vec::new();
            for acc in &active {
                if let Some(required) = &step.source_label {
                    if &acc.tail_label != required {
                        continue;
                    }
                }
                let tail = *acc.node_ids.last().expect("accumulator is never empty");
                let neighbors = self
                    .graph
                    .get_neighbors_by_relation_type(tail, &step.relation_type, step.direction)
                    .await?;
                for neighbor in &neighbors {
                    if neighbor.label != step.target_label {
                        continue;
                    }
                    // A path never revisits a node within itself.
                    if acc.node_ids.contains(&neighbor.id) {
                        continue;
                    }
                    if !constraints
                        .iter()
                        .all(|c| node_satisfies(neighbor, c))
                    {
                        continue;
                    }
                    next_active.push(acc.extend(step, neighbor));
                }
            }
            active = next_active;
            if active.is_empty() {
                debug!(step = step.step_index, "pattern exhausted");
                return Ok(Vec::new());
            }
        }

        let mut paths: Vec<MatchedPath> = active
            .into_iter()
            .map(|acc| {
                let mut properties = HashMap::new();
                properties.insert("hops".to_string(), json!(acc.relation_types.len()));
                properties.insert("terminalLabel".to_string(), json!(acc.tail_label));
                MatchedPath {
                    pattern_id: pattern.pattern_id.clone(),
                    explanation: acc.trail.join(" -> "),
                    node_ids: acc.node_ids,
                    relation_types: acc.relation_types,
                    path_properties: properties,
                    score: 0.0,
                }
            })
            .collect();

        for path in &paths {
            path.check_shape()?;
        }

        self.ranker.rank(&mut paths, strategy, query_text).await?;
        paths.truncate(max_paths);
        debug!(paths = paths.len(), "pattern executed");
        Ok(paths)
    }
}

fn node_satisfies(node: &GraphNode, constraint: &Constraint) -> bool {
    if !constraint.node_label.is_empty() && constraint.node_label != node.label {
        return false;
    }
    constraint_holds(
        constraint.kind,
        node.property_at(&constraint.property_path),
        &constraint.value,
    )
}
