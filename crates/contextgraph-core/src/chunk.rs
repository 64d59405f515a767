use crate::{ChunkId, NodeId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// A text chunk with its embedding. `linked_node_id` ties the chunk back to
/// the graph node it was extracted from, when known.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: ChunkId,
    pub content: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub linked_node_id: Option<NodeId>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Chunk {
    pub fn new<T: Into<String>>(content: T, embedding: Vec<f32>) -> Self {
        Self {
            id: ChunkId::new_v4(),
            content: content.into(),
            embedding,
            linked_node_id: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_linked_node(mut self, node_id: NodeId) -> Self {
        self.linked_node_id = Some(node_id);
        self
    }

    pub fn with_metadata<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Rough token count used for budget enforcement (4 chars per token).
    pub fn estimated_tokens(&self) -> usize {
        self.content.len() / 4
    }
}
