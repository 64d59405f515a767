use async_trait::async_trait;
use contextgraph_core::{
    ContextGraphError, Direction, GraphConfig, GraphEdge, GraphNode, GraphStatistics, GraphStore,
    NodeId, RelationTypeDef, Result, Subgraph,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// In-memory `GraphStore` backend.
///
/// Label index and adjacency lists keep insertion order, so a store built
/// from the same inputs answers every read identically; the pipeline's
/// determinism property leans on this.
pub struct MemoryGraphStore {
    nodes: DashMap<NodeId, GraphNode>,
    edges: DashMap<contextgraph_core::EdgeId, GraphEdge>,
    label_index: RwLock<HashMap<String, Vec<NodeId>>>,
    outgoing: DashMap<NodeId, Vec<contextgraph_core::EdgeId>>,
    incoming: DashMap<NodeId, Vec<contextgraph_core::EdgeId>>,
    edge_keys: RwLock<HashSet<(NodeId, NodeId, String)>>,
    relation_types: RwLock<HashMap<String, RelationTypeDef>>,
    config: GraphConfig,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            nodes: DashMap::new(),
            edges: DashMap::new(),
            label_index: RwLock::new(HashMap::new()),
            outgoing: DashMap::new(),
            incoming: DashMap::new(),
            edge_keys: RwLock::new(HashSet::new()),
            relation_types: RwLock::new(HashMap::new()),
            config,
        }
    }

    fn push_typed_neighbors(
        &self,
        id: NodeId,
        relation_type: &str,
        pick_source: bool,
        out: &mut Vec<NodeId>,
        seen: &mut HashSet<NodeId>,
    ) {
        let index = if pick_source {
            &self.incoming
        } else {
            &self.outgoing
        };
        let Some(edge_ids) = index.get(&id) else {
            return;
        };
        for edge_id in edge_ids.iter() {
            if let Some(edge) = self.edges.get(edge_id) {
                if edge.relation_type != relation_type {
                    continue;
                }
                let neighbor = if pick_source {
                    edge.source_node_id
                } else {
                    edge.target_node_id
                };
                if seen.insert(neighbor) {
                    out.push(neighbor);
                }
            }
        }
    }

    fn neighbors_in_direction(
        &self,
        id: NodeId,
        relation_type: &str,
        direction: Direction,
    ) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        match direction {
            Direction::Outgoing => {
                self.push_typed_neighbors(id, relation_type, false, &mut out, &mut seen)
            }
            Direction::Incoming => {
                self.push_typed_neighbors(id, relation_type, true, &mut out, &mut seen)
            }
            Direction::Both => {
                self.push_typed_neighbors(id, relation_type, false, &mut out, &mut seen);
                self.push_typed_neighbors(id, relation_type, true, &mut out, &mut seen);
            }
        }
        out
    }

    /// Undirected neighbor ids in adjacency insertion order.
    fn undirected_neighbors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        if let Some(edge_ids) = self.outgoing.get(&id) {
            for edge_id in edge_ids.iter() {
                if let Some(edge) = self.edges.get(edge_id) {
                    if seen.insert(edge.target_node_id) {
                        out.push(edge.target_node_id);
                    }
                }
            }
        }
        if let Some(edge_ids) = self.incoming.get(&id) {
            for edge_id in edge_ids.iter() {
                if let Some(edge) = self.edges.get(edge_id) {
                    if seen.insert(edge.source_node_id) {
                        out.push(edge.source_node_id);
                    }
                }
            }
        }
        out
    }
}

impl Default for MemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn initialize(&self, relation_types: Vec<RelationTypeDef>) -> Result<()> {
        let mut registry = self.relation_types.write();
        for rt in relation_types {
            registry.insert(rt.name.clone(), rt);
        }
        debug!(registered = registry.len(), "relation types registered");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.nodes.clear();
        self.edges.clear();
        self.label_index.write().clear();
        self.outgoing.clear();
        self.incoming.clear();
        self.edge_keys.write().clear();
        Ok(())
    }

    async fn add_nodes(&self, nodes: Vec<GraphNode>) -> Result<()> {
        // Single transaction: nothing to pre-validate for nodes, so the
        // batch cannot partially fail.
        let mut index = self.label_index.write();
        for node in nodes {
            let fresh = !self.nodes.contains_key(&node.id);
            if fresh {
                index.entry(node.label.clone()).or_default().push(node.id);
            }
            self.nodes.insert(node.id, node);
        }
        Ok(())
    }

    async fn add_edges(&self, edges: Vec<GraphEdge>) -> Result<()> {
        // Validate the whole batch before touching state: all-or-nothing.
        {
            let registry = self.relation_types.read();
            for edge in &edges {
                if !registry.contains_key(&edge.relation_type) {
                    return Err(ContextGraphError::UnknownRelationType(
                        edge.relation_type.clone(),
                    ));
                }
            }
        }
        let mut keys = self.edge_keys.write();
        for edge in edges {
            let key = (
                edge.source_node_id,
                edge.target_node_id,
                edge.relation_type.clone(),
            );
            // An edge is reported once per (source, target, relation type).
            if !keys.insert(key) {
                continue;
            }
            self.outgoing
                .entry(edge.source_node_id)
                .or_default()
                .push(edge.id);
            self.incoming
                .entry(edge.target_node_id)
                .or_default()
                .push(edge.id);
            self.edges.insert(edge.id, edge);
        }
        Ok(())
    }

    async fn find_nodes_by_label(&self, label: &str) -> Result<Vec<GraphNode>> {
        let index = self.label_index.read();
        let ids = match index.get(label) {
            Some(ids) => ids.clone(),
            None => return Ok(Vec::new()),
        };
        drop(index);
        Ok(ids
            .into_iter()
            .filter_map(|id| self.nodes.get(&id).map(|n| n.value().clone()))
            .collect())
    }

    async fn get_node(&self, id: NodeId) -> Result<Option<GraphNode>> {
        Ok(self.nodes.get(&id).map(|n| n.value().clone()))
    }

    async fn get_neighbors_by_relation_type(
        &self,
        id: NodeId,
        relation_type: &str,
        direction: Direction,
    ) -> Result<Vec<GraphNode>> {
        let ids = self.neighbors_in_direction(id, relation_type, direction);
        Ok(ids
            .into_iter()
            .filter_map(|id| self.nodes.get(&id).map(|n| n.value().clone()))
            .collect())
    }

    async fn extract_subgraph(&self, seed_ids: &[NodeId], depth: usize) -> Result<Subgraph> {
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut order: Vec<NodeId> = Vec::new();
        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();

        for seed in seed_ids {
            if self.nodes.contains_key(seed) && visited.insert(*seed) {
                order.push(*seed);
                queue.push_back((*seed, 0));
            }
        }

        while let Some((current, dist)) = queue.pop_front() {
            if dist >= depth {
                continue;
            }
            for neighbor in self.undirected_neighbors(current) {
                if self.nodes.contains_key(&neighbor) && visited.insert(neighbor) {
                    order.push(neighbor);
                    queue.push_back((neighbor, dist + 1));
                }
            }
        }

        let nodes: Vec<GraphNode> = order
            .iter()
            .filter_map(|id| self.nodes.get(id).map(|n| n.value().clone()))
            .collect();

        // Edges whose endpoints are both retained, deduplicated, in node
        // visit order then adjacency insertion order.
        let mut edges: Vec<GraphEdge> = Vec::new();
        let mut seen_edges: HashSet<contextgraph_core::EdgeId> = HashSet::new();
        for id in &order {
            if let Some(edge_ids) = self.outgoing.get(id) {
                for edge_id in edge_ids.iter() {
                    if let Some(edge) = self.edges.get(edge_id) {
                        if visited.contains(&edge.target_node_id) && seen_edges.insert(edge.id) {
                            edges.push(edge.value().clone());
                        }
                    }
                }
            }
        }

        debug!(
            seeds = seed_ids.len(),
            depth,
            nodes = nodes.len(),
            edges = edges.len(),
            "subgraph extracted"
        );
        Ok(Subgraph { nodes, edges })
    }

    async fn find_shortest_path(&self, source: NodeId, target: NodeId) -> Result<Vec<NodeId>> {
        if !self.nodes.contains_key(&source) || !self.nodes.contains_key(&target) {
            return Ok(Vec::new());
        }
        if source == target {
            return Ok(vec![source]);
        }

        let mut parents: HashMap<NodeId, NodeId> = HashMap::new();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();
        visited.insert(source);
        queue.push_back((source, 0));

        while let Some((current, dist)) = queue.pop_front() {
            if dist >= self.config.max_traversal_depth {
                continue;
            }
            for neighbor in self.undirected_neighbors(current) {
                if !visited.insert(neighbor) {
                    continue;
                }
                parents.insert(neighbor, current);
                if neighbor == target {
                    let mut path = vec![target];
                    let mut cursor = target;
                    while let Some(&parent) = parents.get(&cursor) {
                        path.push(parent);
                        cursor = parent;
                    }
                    path.reverse();
                    return Ok(path);
                }
                queue.push_back((neighbor, dist + 1));
            }
        }
        Ok(Vec::new())
    }

    async fn find_edges_for_node(&self, id: NodeId) -> Result<Vec<GraphEdge>> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        for index in [&self.outgoing, &self.incoming] {
            if let Some(edge_ids) = index.get(&id) {
                for edge_id in edge_ids.iter() {
                    if seen.insert(*edge_id) {
                        if let Some(edge) = self.edges.get(edge_id) {
                            out.push(edge.value().clone());
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    async fn statistics(&self) -> Result<GraphStatistics> {
        let node_count = self.nodes.len();
        let edge_count = self.edges.len();
        let nodes_by_label = self
            .label_index
            .read()
            .iter()
            .map(|(label, ids)| (label.clone(), ids.len()))
            .collect();
        let mut edges_by_type: HashMap<String, usize> = HashMap::new();
        for edge in self.edges.iter() {
            *edges_by_type.entry(edge.relation_type.clone()).or_default() += 1;
        }
        let avg_degree = if node_count == 0 {
            0.0
        } else {
            2.0 * edge_count as f64 / node_count as f64
        };
        Ok(GraphStatistics {
            node_count,
            edge_count,
            nodes_by_label,
            edges_by_type,
            avg_degree,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_store() -> (MemoryGraphStore, NodeId, NodeId, NodeId) {
        let store = MemoryGraphStore::new();
        store
            .initialize(vec![
                RelationTypeDef::new("HAS_CONDITION", "Patient", "Condition"),
                RelationTypeDef::new("PRESCRIBED_MEDICATION", "Patient", "Medication"),
            ])
            .await
            .unwrap();

        let patient = GraphNode::new("Patient").with_property("name", "PT-10001");
        let condition = GraphNode::new("Condition").with_property("name", "Type 2 Diabetes");
        let medication = GraphNode::new("Medication").with_property("name", "Metformin");
        let (p, c, m) = (patient.id, condition.id, medication.id);

        store
            .add_nodes(vec![patient, condition, medication])
            .await
            .unwrap();
        store
            .add_edges(vec![
                GraphEdge::new(p, c, "HAS_CONDITION"),
                GraphEdge::new(p, m, "PRESCRIBED_MEDICATION"),
            ])
            .await
            .unwrap();
        (store, p, c, m)
    }

    #[tokio::test]
    async fn unknown_relation_type_rejected_atomically() {
        let (store, p, c, _) = seeded_store().await;
        let before = store.statistics().await.unwrap().edge_count;

        let result = store
            .add_edges(vec![
                GraphEdge::new(c, p, "HAS_CONDITION"),
                GraphEdge::new(p, c, "NOT_REGISTERED"),
            ])
            .await;
        assert!(matches!(
            result,
            Err(ContextGraphError::UnknownRelationType(_))
        ));
        // Nothing from the failed batch landed.
        assert_eq!(store.statistics().await.unwrap().edge_count, before);
    }

    #[tokio::test]
    async fn neighbors_honour_direction() {
        let (store, p, c, m) = seeded_store().await;

        let out = store
            .get_neighbors_by_relation_type(p, "HAS_CONDITION", Direction::Outgoing)
            .await
            .unwrap();
        assert_eq!(out.iter().map(|n| n.id).collect::<Vec<_>>(), vec![c]);

        let incoming = store
            .get_neighbors_by_relation_type(c, "HAS_CONDITION", Direction::Incoming)
            .await
            .unwrap();
        assert_eq!(incoming.iter().map(|n| n.id).collect::<Vec<_>>(), vec![p]);

        // Wrong direction yields nothing.
        let none = store
            .get_neighbors_by_relation_type(c, "HAS_CONDITION", Direction::Outgoing)
            .await
            .unwrap();
        assert!(none.is_empty());

        let both = store
            .get_neighbors_by_relation_type(p, "PRESCRIBED_MEDICATION", Direction::Both)
            .await
            .unwrap();
        assert_eq!(both.iter().map(|n| n.id).collect::<Vec<_>>(), vec![m]);
    }

    #[tokio::test]
    async fn both_direction_does_not_duplicate_paired_edges() {
        let store = MemoryGraphStore::new();
        store
            .initialize(vec![RelationTypeDef::new("RELATED_TO", "Topic", "Topic").undirected()])
            .await
            .unwrap();
        let a = GraphNode::new("Topic");
        let b = GraphNode::new("Topic");
        let (ida, idb) = (a.id, b.id);
        store.add_nodes(vec![a, b]).await.unwrap();
        store
            .add_edges(vec![
                GraphEdge::new(ida, idb, "RELATED_TO"),
                GraphEdge::new(idb, ida, "RELATED_TO"),
            ])
            .await
            .unwrap();

        let neighbors = store
            .get_neighbors_by_relation_type(ida, "RELATED_TO", Direction::Both)
            .await
            .unwrap();
        assert_eq!(neighbors.len(), 1);
        assert_eq!(neighbors[0].id, idb);
    }

    #[tokio::test]
    async fn duplicate_edge_key_inserted_once() {
        let (store, p, c, _) = seeded_store().await;
        store
            .add_edges(vec![GraphEdge::new(p, c, "HAS_CONDITION")])
            .await
            .unwrap();
        let edges = store.find_edges_for_node(p).await.unwrap();
        let condition_edges = edges
            .iter()
            .filter(|e| e.relation_type == "HAS_CONDITION")
            .count();
        assert_eq!(condition_edges, 1);
    }

    #[tokio::test]
    async fn subgraph_contains_reachable_nodes_and_interior_edges() {
        let (store, p, c, m) = seeded_store().await;

        let depth0 = store.extract_subgraph(&[p], 0).await.unwrap();
        assert_eq!(depth0.node_ids(), vec![p]);
        assert!(depth0.edges.is_empty());

        let depth1 = store.extract_subgraph(&[p], 1).await.unwrap();
        assert_eq!(depth1.node_ids(), vec![p, c, m]);
        assert_eq!(depth1.edges.len(), 2);

        // Missing seeds are skipped, present ones kept.
        let ghost = NodeId::new_v4();
        let mixed = store.extract_subgraph(&[ghost, c], 0).await.unwrap();
        assert_eq!(mixed.node_ids(), vec![c]);
    }

    #[tokio::test]
    async fn subgraph_follows_edges_against_their_direction() {
        let (store, p, c, _) = seeded_store().await;
        // BFS runs over the undirected view, so seeding at the target
        // reaches the source.
        let sub = store.extract_subgraph(&[c], 1).await.unwrap();
        assert!(sub.node_ids().contains(&p));
    }

    #[tokio::test]
    async fn shortest_path_and_its_depth_cap() {
        let store = MemoryGraphStore::with_config(GraphConfig {
            max_traversal_depth: 2,
        });
        store
            .initialize(vec![RelationTypeDef::new("NEXT", "Step", "Step")])
            .await
            .unwrap();
        let nodes: Vec<GraphNode> = (0..5).map(|_| GraphNode::new("Step")).collect();
        let ids: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
        store.add_nodes(nodes).await.unwrap();
        let chain: Vec<GraphEdge> = ids
            .windows(2)
            .map(|w| GraphEdge::new(w[0], w[1], "NEXT"))
            .collect();
        store.add_edges(chain).await.unwrap();

        let path = store.find_shortest_path(ids[0], ids[2]).await.unwrap();
        assert_eq!(path, vec![ids[0], ids[1], ids[2]]);

        // ids[4] is four hops out, beyond the configured cap.
        let too_far = store.find_shortest_path(ids[0], ids[4]).await.unwrap();
        assert!(too_far.is_empty());

        let trivial = store.find_shortest_path(ids[3], ids[3]).await.unwrap();
        assert_eq!(trivial, vec![ids[3]]);
    }

    #[tokio::test]
    async fn statistics_report_counts_and_avg_degree() {
        let (store, _, _, _) = seeded_store().await;
        let stats = store.statistics().await.unwrap();
        assert_eq!(stats.node_count, 3);
        assert_eq!(stats.edge_count, 2);
        assert_eq!(stats.nodes_by_label.get("Patient"), Some(&1));
        assert_eq!(stats.edges_by_type.get("HAS_CONDITION"), Some(&1));
        assert!((stats.avg_degree - 4.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn clear_keeps_relation_registry() {
        let (store, p, c, _) = seeded_store().await;
        store.clear().await.unwrap();
        assert_eq!(store.statistics().await.unwrap().node_count, 0);
        assert!(store.get_node(p).await.unwrap().is_none());

        // Registry survives a clear; re-adding the same edge type works.
        let a = GraphNode::new("Patient");
        let b = GraphNode::new("Condition");
        let (ida, idb) = (a.id, b.id);
        store.add_nodes(vec![a, b]).await.unwrap();
        assert!(store
            .add_edges(vec![GraphEdge::new(ida, idb, "HAS_CONDITION")])
            .await
            .is_ok());
        let _ = (p, c);
    }
}
