use crate::cosine_similarity;
use async_trait::async_trait;
use contextgraph_core::{Chunk, ChunkId, ChunkStore, ContextGraphError, NodeId, Result};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

/// In-memory `ChunkStore` backend with brute-force cosine top-K.
///
/// Ties are broken by chunk id so identical stores answer identically.
pub struct MemoryChunkStore {
    chunks: DashMap<ChunkId, Chunk>,
    by_node: DashMap<NodeId, Vec<ChunkId>>,
    dimension: RwLock<Option<usize>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self {
            chunks: DashMap::new(),
            by_node: DashMap::new(),
            dimension: RwLock::new(None),
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        let mut dim = self.dimension.write();
        match *dim {
            Some(expected) if expected != embedding.len() => Err(ContextGraphError::Internal(
                format!(
                    "embedding dimension mismatch: store holds {}, got {}",
                    expected,
                    embedding.len()
                ),
            )),
            Some(_) => Ok(()),
            None => {
                *dim = Some(embedding.len());
                Ok(())
            }
        }
    }

    fn ranked(&self, embedding: &[f32], k: usize, label: Option<&str>) -> Vec<Chunk> {
        let mut scored: Vec<(f32, Chunk)> = self
            .chunks
            .iter()
            .filter(|entry| match label {
                Some(label) => entry
                    .metadata
                    .get("label")
                    .and_then(|v| v.as_str())
                    .map_or(false, |l| l == label),
                None => true,
            })
            .map(|entry| (cosine_similarity(embedding, &entry.embedding), entry.value().clone()))
            .collect();
        scored.sort_by(|(sa, ca), (sb, cb)| {
            sb.partial_cmp(sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| ca.id.cmp(&cb.id))
        });
        scored.into_iter().take(k).map(|(_, c)| c).collect()
    }
}

impl Default for MemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<()> {
        for chunk in &chunks {
            self.check_dimension(&chunk.embedding)?;
        }
        for chunk in chunks {
            if let Some(node_id) = chunk.linked_node_id {
                self.by_node.entry(node_id).or_default().push(chunk.id);
            }
            self.chunks.insert(chunk.id, chunk);
        }
        Ok(())
    }

    async fn top_k_similar(&self, embedding: &[f32], k: usize) -> Result<Vec<Chunk>> {
        if let Some(expected) = *self.dimension.read() {
            if expected != embedding.len() {
                return Err(ContextGraphError::Internal(format!(
                    "query dimension {} does not match store dimension {}",
                    embedding.len(),
                    expected
                )));
            }
        }
        let hits = self.ranked(embedding, k, None);
        debug!(k, hits = hits.len(), "vector top-k");
        Ok(hits)
    }

    async fn top_k_similar_with_label(
        &self,
        embedding: &[f32],
        label: &str,
        k: usize,
    ) -> Result<Vec<Chunk>> {
        Ok(self.ranked(embedding, k, Some(label)))
    }

    async fn find_by_linked_node_id(&self, node_id: NodeId) -> Result<Vec<Chunk>> {
        let ids = match self.by_node.get(&node_id) {
            Some(ids) => ids.clone(),
            None => return Ok(Vec::new()),
        };
        Ok(ids
            .into_iter()
            .filter_map(|id| self.chunks.get(&id).map(|c| c.value().clone()))
            .collect())
    }

    async fn count_by_linked_node_id(&self, node_id: NodeId) -> Result<usize> {
        Ok(self.by_node.get(&node_id).map_or(0, |ids| ids.len()))
    }

    async fn delete_all(&self) -> Result<()> {
        self.chunks.clear();
        self.by_node.clear();
        *self.dimension.write() = None;
        Ok(())
    }
}
