use contextgraph_core::{GraphEdge, GraphNode, GraphStore, NodeId, RelationTypeDef};
use contextgraph_graph::MemoryGraphStore;
use uuid::Uuid;

fn fixed_id(n: u128) -> NodeId {
    Uuid::from_u128(n)
}

async fn build_star(center: NodeId, leaf_count: u128) -> MemoryGraphStore {
    let store = MemoryGraphStore::new();
    store
        .initialize(vec![RelationTypeDef::new("LINKS_TO", "Hub", "Leaf")])
        .await
        .unwrap();

    let mut hub = GraphNode::new("Hub");
    hub.id = center;
    store.add_nodes(vec![hub]).await.unwrap();

    for i in 0..leaf_count {
        let mut leaf = GraphNode::new("Leaf");
        leaf.id = fixed_id(1000 + i);
        let leaf_id = leaf.id;
        store.add_nodes(vec![leaf]).await.unwrap();
        store
            .add_edges(vec![GraphEdge::new(center, leaf_id, "LINKS_TO")])
            .await
            .unwrap();
    }
    store
}

#[tokio::test]
async fn identical_construction_yields_identical_reads() {
    let center = fixed_id(1);
    let first = build_star(center, 40).await;
    let second = build_star(center, 40).await;

    let sub_a = first.extract_subgraph(&[center], 1).await.unwrap();
    let sub_b = second.extract_subgraph(&[center], 1).await.unwrap();
    assert_eq!(sub_a.node_ids(), sub_b.node_ids());
    assert_eq!(
        sub_a.edges.iter().map(|e| e.target_node_id).collect::<Vec<_>>(),
        sub_b.edges.iter().map(|e| e.target_node_id).collect::<Vec<_>>()
    );

    let labels_a = first.find_nodes_by_label("Leaf").await.unwrap();
    let labels_b = second.find_nodes_by_label("Leaf").await.unwrap();
    assert_eq!(
        labels_a.iter().map(|n| n.id).collect::<Vec<_>>(),
        labels_b.iter().map(|n| n.id).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn every_subgraph_edge_has_both_endpoints_in_nodes() {
    let center = fixed_id(2);
    let store = build_star(center, 25).await;

    let sub = store.extract_subgraph(&[center], 2).await.unwrap();
    let ids: std::collections::HashSet<NodeId> = sub.node_ids().into_iter().collect();
    for edge in &sub.edges {
        assert!(ids.contains(&edge.source_node_id));
        assert!(ids.contains(&edge.target_node_id));
    }
}
