use crate::{
    Chunk, Direction, GraphEdge, GraphNode, GraphStatistics, NodeId, RelationTypeDef, Result,
    Subgraph,
};
use async_trait::async_trait;

/// Behavioural contract of a typed labeled property graph backend.
///
/// Not-found is success-with-empty; only transport failures surface as
/// `StoreUnavailable`. Sequences are unordered unless a deterministic
/// construction order makes them so; callers must not rely on insertion
/// order beyond that.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Register the relation type vocabulary. Writes with an unregistered
    /// relation type are rejected with `UnknownRelationType`.
    async fn initialize(&self, relation_types: Vec<RelationTypeDef>) -> Result<()>;

    /// Wipe all nodes and edges.
    async fn clear(&self) -> Result<()>;

    /// Insert a batch of nodes as a single all-or-nothing transaction.
    async fn add_nodes(&self, nodes: Vec<GraphNode>) -> Result<()>;

    /// Insert a batch of edges as a single all-or-nothing transaction.
    async fn add_edges(&self, edges: Vec<GraphEdge>) -> Result<()>;

    /// Every node carrying exactly this label.
    async fn find_nodes_by_label(&self, label: &str) -> Result<Vec<GraphNode>>;

    /// Absent id yields `Ok(None)`, not an error.
    async fn get_node(&self, id: NodeId) -> Result<Option<GraphNode>>;

    /// Neighbors over edges of `relation_type` in the given direction.
    /// `Both` unions outgoing and incoming without duplication.
    async fn get_neighbors_by_relation_type(
        &self,
        id: NodeId,
        relation_type: &str,
        direction: Direction,
    ) -> Result<Vec<GraphNode>>;

    /// BFS over the undirected view from `seed_ids`, up to `depth` hops.
    /// The result contains every seed present in the store, every node
    /// reachable within `depth`, and every edge with both endpoints in the
    /// node set.
    async fn extract_subgraph(&self, seed_ids: &[NodeId], depth: usize) -> Result<Subgraph>;

    /// Ordered node ids from `source` to `target`; empty means no path
    /// within the implementation's maximum search depth.
    async fn find_shortest_path(&self, source: NodeId, target: NodeId) -> Result<Vec<NodeId>>;

    /// All edges incident to `id`, incoming and outgoing.
    async fn find_edges_for_node(&self, id: NodeId) -> Result<Vec<GraphEdge>>;

    async fn statistics(&self) -> Result<GraphStatistics>;
}

/// Behavioural contract of a chunk/vector backend.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    async fn add_chunks(&self, chunks: Vec<Chunk>) -> Result<()>;

    /// At most `k` chunks ordered by descending similarity. The metric is
    /// backend-defined; only monotone relevance is guaranteed.
    async fn top_k_similar(&self, embedding: &[f32], k: usize) -> Result<Vec<Chunk>>;

    /// `top_k_similar` restricted by a hint label, where the backend
    /// supports label filtering.
    async fn top_k_similar_with_label(
        &self,
        embedding: &[f32],
        label: &str,
        k: usize,
    ) -> Result<Vec<Chunk>>;

    /// Every chunk whose `linked_node_id` equals the argument.
    async fn find_by_linked_node_id(&self, node_id: NodeId) -> Result<Vec<Chunk>>;

    async fn count_by_linked_node_id(&self, node_id: NodeId) -> Result<usize>;

    async fn delete_all(&self) -> Result<()>;
}

/// Text-to-vector contract. Failures surface as `EmbedderUnavailable`.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Fixed output dimension of this embedder.
    fn dimension(&self) -> usize;
}
