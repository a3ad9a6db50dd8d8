use crate::GraphSnapshot;

const DEMO_GRAPH: &str = include_str!("../data/demo_graph.json");

/// The bundled sample memory graph, used whenever no other source answers.
pub fn demo_snapshot() -> GraphSnapshot {
    serde_json::from_str(DEMO_GRAPH).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeType;

    #[test]
    fn demo_graph_parses_and_is_consistent() {
        let snap = demo_snapshot();
        assert_eq!(snap.nodes.len(), 33);
        assert_eq!(snap.links.len(), 37);

        let (clean, issues) = snap.clone().sanitized();
        assert!(issues.is_empty());
        assert_eq!(clean, snap);

        let events = snap
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Event)
            .count();
        assert_eq!(events, 11);
    }
}
