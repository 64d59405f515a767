use contextgraph_core::{
    Chunk, GraphEdge, GraphNode, GraphStore, NodeId, RelationTypeDef, Settings,
};
use contextgraph_graph::MemoryGraphStore;
use contextgraph_retrieval::RetrievalOrchestrator;
use contextgraph_vector::{HashingEmbedder, MemoryChunkStore};
use std::sync::Arc;

pub struct Harness {
    pub graph: Arc<MemoryGraphStore>,
    pub chunks: Arc<MemoryChunkStore>,
    pub embedder: Arc<HashingEmbedder>,
    pub orchestrator: RetrievalOrchestrator,
}

pub fn harness() -> Harness {
    let graph = Arc::new(MemoryGraphStore::new());
    let chunks = Arc::new(MemoryChunkStore::new());
    let embedder = Arc::new(HashingEmbedder::default());
    let orchestrator = RetrievalOrchestrator::new(
        graph.clone(),
        chunks.clone(),
        embedder.clone(),
        Settings::default(),
    );
    Harness {
        graph,
        chunks,
        embedder,
        orchestrator,
    }
}

impl Harness {
    pub fn chunk_for(&self, text: &str, node: NodeId) -> Chunk {
        Chunk::new(text, self.embedder.embed_sync(text)).with_linked_node(node)
    }

    pub fn floating_chunk(&self, text: &str) -> Chunk {
        Chunk::new(text, self.embedder.embed_sync(text))
    }
}

/// Patient -> HAS_CONDITION -> Condition single-hop clinic used by several
/// scenarios.
pub async fn seed_clinic(harness: &Harness) -> (NodeId, NodeId) {
    harness
        .graph
        .initialize(vec![RelationTypeDef::new(
            "HAS_CONDITION",
            "Patient",
            "Condition",
        )])
        .await
        .unwrap();
    let patient = GraphNode::new("Patient")
        .with_property("name", "PT-10001")
        .with_content("Patient PT-10001");
    let condition = GraphNode::new("Condition")
        .with_property("name", "Type 2 Diabetes")
        .with_content("Type 2 Diabetes");
    let (p, c) = (patient.id, condition.id);
    harness
        .graph
        .add_nodes(vec![patient, condition])
        .await
        .unwrap();
    harness
        .graph
        .add_edges(vec![GraphEdge::new(p, c, "HAS_CONDITION")])
        .await
        .unwrap();
    (p, c)
}
