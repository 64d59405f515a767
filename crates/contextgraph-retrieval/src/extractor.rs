use contextgraph_core::{GraphStore, NodeId, Result, Subgraph};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::debug;

/// Seeded subgraph extraction with a node ceiling.
///
/// When the store hands back more than `max_nodes`, a FIFO BFS from the
/// seeds decides what stays: seeds first, then closer nodes, then a
/// source-order fill for anything BFS cannot reach. Edges touching an
/// evicted node are dropped. Visitation order is a pure function of the
/// seed list and the store's answer, which keeps repeated requests
/// identical.
pub struct SubgraphExtractor {
    graph: Arc<dyn GraphStore>,
}

impl SubgraphExtractor {
    pub fn new(graph: Arc<dyn GraphStore>) -> Self {
        Self { graph }
    }

    pub async fn extract_bounded(
        &self,
        seeds: &[NodeId],
        depth: usize,
        max_nodes: usize,
    ) -> Result<Subgraph> {
        let subgraph = self.graph.extract_subgraph(seeds, depth).await?;
        Ok(enforce_budget(subgraph, seeds, max_nodes))
    }
}

/// Truncate `subgraph` to at most `max_nodes` nodes; `max_nodes == 0`
/// disables the ceiling.
pub fn enforce_budget(subgraph: Subgraph, seeds: &[NodeId], max_nodes: usize) -> Subgraph {
    if max_nodes == 0 || subgraph.nodes.len() <= max_nodes {
        return subgraph;
    }

    let present: HashSet<NodeId> = subgraph.nodes.iter().map(|n| n.id).collect();
    let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for edge in &subgraph.edges {
        adjacency
            .entry(edge.source_node_id)
            .or_default()
            .push(edge.target_node_id);
        adjacency
            .entry(edge.target_node_id)
            .or_default()
            .push(edge.source_node_id);
    }

    // Seeds are never evicted; they enter the kept set before anything
    // else, in the caller's order.
    let mut kept: Vec<NodeId> = Vec::with_capacity(max_nodes);
    let mut kept_set: HashSet<NodeId> = HashSet::new();
    let mut queue: VecDeque<NodeId> = VecDeque::new();
    for seed in seeds {
        if kept.len() == max_nodes {
            break;
        }
        if present.contains(seed) && kept_set.insert(*seed) {
            kept.push(*seed);
            queue.push_back(*seed);
        }
    }

    while let Some(current) = queue.pop_front() {
        if kept.len() == max_nodes {
            break;
        }
        if let Some(neighbors) = adjacency.get(&current) {
            for neighbor in neighbors {
                if kept.len() == max_nodes {
                    break;
                }
                if kept_set.insert(*neighbor) {
                    kept.push(*neighbor);
                    queue.push_back(*neighbor);
                }
            }
        }
    }

    // Disconnected leftovers fill the remaining budget in source order.
    if kept.len() < max_nodes {
        for node in &subgraph.nodes {
            if kept.len() == max_nodes {
                break;
            }
            if kept_set.insert(node.id) {
                kept.push(node.id);
            }
        }
    }

    let mut by_id: HashMap<NodeId, contextgraph_core::GraphNode> =
        subgraph.nodes.into_iter().map(|n| (n.id, n)).collect();
    let nodes = kept.iter().filter_map(|id| by_id.remove(id)).collect();
    let edges = subgraph
        .edges
        .into_iter()
        .filter(|e| kept_set.contains(&e.source_node_id) && kept_set.contains(&e.target_node_id))
        .collect();

    let result = Subgraph { nodes, edges };
    debug!(
        kept = result.nodes.len(),
        edges = result.edges.len(),
        max_nodes,
        "budget enforced"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use contextgraph_core::{GraphEdge, GraphNode};

    fn subgraph_of(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Subgraph {
        Subgraph { nodes, edges }
    }

    fn star(leaves: usize) -> (Subgraph, NodeId) {
        let hub = GraphNode::new("Hub");
        let hub_id = hub.id;
        let mut nodes = vec![hub];
        let mut edges = Vec::new();
        for _ in 0..leaves {
            let leaf = GraphNode::new("Leaf");
            edges.push(GraphEdge::new(hub_id, leaf.id, "LINKS_TO"));
            nodes.push(leaf);
        }
        (subgraph_of(nodes, edges), hub_id)
    }

    #[test]
    fn under_budget_passes_through() {
        let (sub, hub) = star(5);
        let out = enforce_budget(sub, &[hub], 100);
        assert_eq!(out.nodes.len(), 6);
        assert_eq!(out.edges.len(), 5);
    }

    #[test]
    fn zero_ceiling_disables_enforcement() {
        let (sub, hub) = star(5);
        let out = enforce_budget(sub, &[hub], 0);
        assert_eq!(out.nodes.len(), 6);
    }

    #[test]
    fn oversized_star_truncates_keeping_seed_and_closure() {
        let (sub, hub) = star(500);
        let out = enforce_budget(sub, &[hub], 50);

        assert_eq!(out.nodes.len(), 50);
        assert_eq!(out.nodes[0].id, hub, "seed survives in front");

        let kept: HashSet<NodeId> = out.nodes.iter().map(|n| n.id).collect();
        for edge in &out.edges {
            assert!(kept.contains(&edge.source_node_id));
            assert!(kept.contains(&edge.target_node_id));
        }
        // 49 leaves kept, one edge each.
        assert_eq!(out.edges.len(), 49);
    }

    #[test]
    fn disconnected_components_fill_in_source_order() {
        let (mut sub, hub) = star(2);
        let orphan_a = GraphNode::new("Orphan");
        let orphan_b = GraphNode::new("Orphan");
        let expected_fill = orphan_a.id;
        sub.nodes.push(orphan_a);
        sub.nodes.push(orphan_b);

        let out = enforce_budget(sub, &[hub], 4);
        assert_eq!(out.nodes.len(), 4);
        // BFS reaches hub + 2 leaves; the first orphan in source order
        // fills the last slot.
        assert_eq!(out.nodes[3].id, expected_fill);
    }

    #[test]
    fn truncation_is_deterministic() {
        let (sub, hub) = star(200);
        let once = enforce_budget(sub.clone(), &[hub], 20);
        let twice = enforce_budget(sub, &[hub], 20);
        assert_eq!(once.node_ids(), twice.node_ids());
    }
}
