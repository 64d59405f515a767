use crate::{ContextGraphError, Direction, GraphEdge, GraphNode, NodeId, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// An entity the resolver should map to seed node ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionTarget {
    pub description: String,
    #[serde(default)]
    pub type_hint: Option<String>,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
}

impl ResolutionTarget {
    pub fn new<T: Into<String>>(description: T) -> Self {
        Self {
            description: description.into(),
            type_hint: None,
            properties: HashMap::new(),
        }
    }

    pub fn with_type_hint<T: Into<String>>(mut self, hint: T) -> Self {
        self.type_hint = Some(hint.into());
        self
    }
}

/// One hop of a pattern. `source_label == None` means "start from the
/// result node of the previous step".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalStep {
    #[serde(default)]
    pub source_label: Option<String>,
    pub relation_type: String,
    pub target_label: String,
    pub step_index: usize,
    #[serde(default)]
    pub direction: Direction,
}

impl TraversalStep {
    pub fn new<R, T>(relation_type: R, target_label: T, step_index: usize) -> Self
    where
        R: Into<String>,
        T: Into<String>,
    {
        Self {
            source_label: None,
            relation_type: relation_type.into(),
            target_label: target_label.into(),
            step_index,
            direction: Direction::Outgoing,
        }
    }

    pub fn from_label<S: Into<String>>(mut self, label: S) -> Self {
        self.source_label = Some(label.into());
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintKind {
    PropertyEquals,
    PropertyIn,
    NotIn,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Contains,
    StartsWith,
    EndsWith,
    RegexMatch,
}

/// A predicate pinned to a pattern step via `at_step`. `property_path` uses
/// dotted-key lookup into the node's property bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    #[serde(rename = "type")]
    pub kind: ConstraintKind,
    pub node_label: String,
    pub property_path: String,
    pub value: Value,
    pub at_step: usize,
}

impl Constraint {
    pub fn new<L, P>(kind: ConstraintKind, node_label: L, property_path: P, value: Value) -> Self
    where
        L: Into<String>,
        P: Into<String>,
    {
        Self {
            kind,
            node_label: node_label.into(),
            property_path: property_path.into(),
            value,
            at_step: 0,
        }
    }

    pub fn at_step(mut self, step: usize) -> Self {
        self.at_step = step;
        self
    }
}

/// A multi-step traversal pattern with step-pinned constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphPattern {
    pub pattern_id: String,
    pub steps: Vec<TraversalStep>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub description: String,
}

impl GraphPattern {
    pub fn new<T: Into<String>>(pattern_id: T, steps: Vec<TraversalStep>) -> Self {
        Self {
            pattern_id: pattern_id.into(),
            steps,
            constraints: Vec::new(),
            description: String::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_description<T: Into<String>>(mut self, description: T) -> Self {
        self.description = description.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CombinatorKind {
    Intersection,
    Union,
    Sequential,
}

/// Combines the results of several patterns into one ranked list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryCombinator {
    #[serde(rename = "type")]
    pub kind: CombinatorKind,
    pub patterns: Vec<GraphPattern>,
}

/// Plain k-hop traversal parameters for target-based retrieval.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalSpec {
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub relation_types: Option<Vec<String>>,
    #[serde(default)]
    pub direction: Option<Direction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RankingStrategy {
    PathLength,
    EdgeWeight,
    NodeCentrality,
    SemanticScore,
    Hybrid,
}

impl Default for RankingStrategy {
    fn default() -> Self {
        RankingStrategy::Hybrid
    }
}

/// The structured half of a retrieval request: entity targets, traversal
/// parameters, patterns and an optional combinator over them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQuery {
    #[serde(default)]
    pub targets: Option<Vec<ResolutionTarget>>,
    #[serde(default)]
    pub traversal: Option<TraversalSpec>,
    #[serde(default)]
    pub patterns: Option<Vec<GraphPattern>>,
    #[serde(default)]
    pub combinator: Option<QueryCombinator>,
    #[serde(default)]
    pub ranking_strategy: RankingStrategy,
}

impl GraphQuery {
    pub fn has_patterns(&self) -> bool {
        self.combinator.as_ref().map_or(false, |c| !c.patterns.is_empty())
            || self.patterns.as_ref().map_or(false, |p| !p.is_empty())
    }

    pub fn has_targets(&self) -> bool {
        self.targets.as_ref().map_or(false, |t| !t.is_empty())
    }
}

/// An ordered node/relation sequence produced by pattern execution.
/// Shape invariant: `relation_types.len() + 1 == node_ids.len()`, and
/// `node_ids[0]` is a seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedPath {
    pub pattern_id: String,
    pub node_ids: Vec<NodeId>,
    pub relation_types: Vec<String>,
    #[serde(default)]
    pub path_properties: HashMap<String, Value>,
    pub score: f64,
    pub explanation: String,
}

impl MatchedPath {
    /// Last node of the path; feeds the next stage of a SEQUENTIAL combinator.
    pub fn terminal_node(&self) -> Option<NodeId> {
        self.node_ids.last().copied()
    }

    /// Runtime check of the shape invariant; violation is an internal error.
    pub fn check_shape(&self) -> Result<()> {
        if self.relation_types.len() + 1 != self.node_ids.len() {
            return Err(ContextGraphError::Internal(format!(
                "path shape violated: {} nodes vs {} relations",
                self.node_ids.len(),
                self.relation_types.len()
            )));
        }
        Ok(())
    }
}

/// A node/edge slice of the graph. Every edge's endpoints are present in
/// `nodes`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subgraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Subgraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }
}

/// Aggregate counts reported by a graph store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStatistics {
    pub node_count: usize,
    pub edge_count: usize,
    pub nodes_by_label: HashMap<String, usize>,
    pub edges_by_type: HashMap<String, usize>,
    pub avg_degree: f64,
}

/// Which fallback stratum produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetrievalStrategy {
    GraphOnly,
    VectorOnly,
    Hybrid,
    Expansion,
}

/// A retrieval request as it arrives on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalRequest {
    pub query: String,
    #[serde(default = "RetrievalRequest::default_top_k")]
    pub top_k: usize,
    #[serde(default = "RetrievalRequest::default_max_graph_nodes")]
    pub max_graph_nodes: usize,
    #[serde(default = "RetrievalRequest::default_max_token_budget")]
    pub max_token_budget: usize,
    #[serde(default)]
    pub graph_query: Option<GraphQuery>,
    #[serde(default)]
    pub semantic_keywords: Vec<String>,
    /// Cancellation deadline for this request, in milliseconds.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl RetrievalRequest {
    pub fn new<T: Into<String>>(query: T) -> Self {
        Self {
            query: query.into(),
            top_k: Self::default_top_k(),
            max_graph_nodes: Self::default_max_graph_nodes(),
            max_token_budget: Self::default_max_token_budget(),
            graph_query: None,
            semantic_keywords: Vec::new(),
            timeout_ms: None,
        }
    }

    pub fn with_graph_query(mut self, graph_query: GraphQuery) -> Self {
        self.graph_query = Some(graph_query);
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_max_graph_nodes(mut self, max: usize) -> Self {
        self.max_graph_nodes = max;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    fn default_top_k() -> usize {
        10
    }

    fn default_max_graph_nodes() -> usize {
        100
    }

    fn default_max_token_budget() -> usize {
        4000
    }
}

/// The assembled answer: a bounded subgraph plus related chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalResult {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub chunks: Vec<crate::Chunk>,
    pub strategy: RetrievalStrategy,
    pub retrieval_time_ms: u64,
    /// Set when the combined result size fell below the configured
    /// minimum-results threshold.
    #[serde(default)]
    pub thin: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults_from_wire_json() {
        let req: RetrievalRequest = serde_json::from_str(r#"{"query": "diabetes"}"#).unwrap();
        assert_eq!(req.top_k, 10);
        assert_eq!(req.max_graph_nodes, 100);
        assert_eq!(req.max_token_budget, 4000);
        assert!(req.graph_query.is_none());
        assert!(req.timeout_ms.is_none());
    }

    #[test]
    fn wire_names_are_camel_case() {
        let req = RetrievalRequest::new("q").with_top_k(3);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["topK"], 3);
        assert!(json.get("maxGraphNodes").is_some());
        assert!(json.get("semanticKeywords").is_some());
    }

    #[test]
    fn constraint_kind_wire_spelling() {
        let json = serde_json::to_string(&ConstraintKind::PropertyEquals).unwrap();
        assert_eq!(json, "\"PROPERTY_EQUALS\"");
        let json = serde_json::to_string(&ConstraintKind::RegexMatch).unwrap();
        assert_eq!(json, "\"REGEX_MATCH\"");
    }

    #[test]
    fn path_shape_check() {
        let a = NodeId::new_v4();
        let b = NodeId::new_v4();
        let good = MatchedPath {
            pattern_id: "p".into(),
            node_ids: vec![a, b],
            relation_types: vec!["HAS_CONDITION".into()],
            path_properties: HashMap::new(),
            score: 1.0,
            explanation: String::new(),
        };
        assert!(good.check_shape().is_ok());

        let bad = MatchedPath {
            relation_types: vec![],
            ..good
        };
        assert!(bad.check_shape().is_err());
    }

    #[test]
    fn graph_query_shape_predicates() {
        let mut gq = GraphQuery::default();
        assert!(!gq.has_patterns());
        assert!(!gq.has_targets());

        gq.targets = Some(vec![ResolutionTarget::new("PT-10001")]);
        assert!(gq.has_targets());

        gq.patterns = Some(vec![GraphPattern::new(
            "p1",
            vec![TraversalStep::new("HAS_CONDITION", "Condition", 0)],
        )]);
        assert!(gq.has_patterns());
    }
}
