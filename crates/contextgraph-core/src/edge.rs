use crate::{EdgeId, NodeId, RelationSemantics};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A directed, typed edge. Undirected semantics are modelled as paired
/// edges; a backend reports an edge once per (source, target, relation).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: EdgeId,
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    pub relation_type: String,
    #[serde(default = "GraphEdge::default_weight")]
    pub weight: f64,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
    #[serde(default)]
    pub semantics: RelationSemantics,
}

impl GraphEdge {
    pub fn new<T: Into<String>>(source: NodeId, target: NodeId, relation_type: T) -> Self {
        Self {
            id: EdgeId::new_v4(),
            source_node_id: source,
            target_node_id: target,
            relation_type: relation_type.into(),
            weight: Self::default_weight(),
            properties: HashMap::new(),
            semantics: RelationSemantics::default(),
        }
    }

    fn default_weight() -> f64 {
        1.0
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_semantics(mut self, semantics: RelationSemantics) -> Self {
        self.semantics = semantics;
        self
    }

    pub fn with_property<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The endpoint opposite to `id`, if `id` is an endpoint at all.
    pub fn other_endpoint(&self, id: NodeId) -> Option<NodeId> {
        if self.source_node_id == id {
            Some(self.target_node_id)
        } else if self.target_node_id == id {
            Some(self.source_node_id)
        } else {
            None
        }
    }
}
