use bevy::prelude::Resource;
use graphaura_core::{Link, Node, NodeId, NodeType};
use std::collections::HashSet;
use std::sync::Arc;

use crate::graph::store::GraphStore;

/// Nodes that survive the type filter and the name search, plus the links
/// whose both endpoints survived.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibleSubgraph {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    ids: HashSet<NodeId>,
}

impl VisibleSubgraph {
    pub fn contains(&self, id: &NodeId) -> bool {
        self.ids.contains(id)
    }

    pub fn node_ids(&self) -> &HashSet<NodeId> {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

pub fn passes_type(node: &Node, filter: Option<NodeType>) -> bool {
    filter.map_or(true, |t| node.node_type == t)
}

/// `needle` must already be lowercased; an empty needle matches everything.
pub fn passes_search(node: &Node, needle: &str) -> bool {
    needle.is_empty() || node.name.to_lowercase().contains(needle)
}

pub fn visible_subgraph(
    nodes: &[Node],
    links: &[Link],
    filter: Option<NodeType>,
    query: &str,
) -> VisibleSubgraph {
    let needle = query.to_lowercase();
    let nodes: Vec<Node> = nodes
        .iter()
        .filter(|n| passes_type(n, filter) && passes_search(n, &needle))
        .cloned()
        .collect();
    let ids: HashSet<NodeId> = nodes.iter().map(|n| n.id.clone()).collect();
    let links = links
        .iter()
        .filter(|l| ids.contains(&l.source) && ids.contains(&l.target))
        .cloned()
        .collect();
    VisibleSubgraph { nodes, links, ids }
}

type CacheKey = (u64, Option<NodeType>, String);

/// Memo over (graph revision, type filter, search text).
#[derive(Resource, Default)]
pub struct VisibleCache {
    key: Option<CacheKey>,
    current: Arc<VisibleSubgraph>,
}

impl VisibleCache {
    pub fn current(&self) -> Arc<VisibleSubgraph> {
        Arc::clone(&self.current)
    }

    /// Returns the visible subgraph and whether it had to be recomputed.
    pub fn refresh(&mut self, store: &GraphStore) -> (Arc<VisibleSubgraph>, bool) {
        let view = store.view();
        let key = (
            store.revision(),
            view.filter_by_type,
            view.search_query.clone(),
        );
        if self.key.as_ref() == Some(&key) {
            return (self.current(), false);
        }
        let graph = store.graph();
        self.current = Arc::new(visible_subgraph(
            &graph.nodes,
            &graph.links,
            view.filter_by_type,
            &view.search_query,
        ));
        self.key = Some(key);
        (self.current(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphaura_core::demo::demo_snapshot;

    fn ids(v: &VisibleSubgraph) -> Vec<String> {
        let mut out: Vec<String> = v.nodes.iter().map(|n| n.id.0.clone()).collect();
        out.sort();
        out
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let nodes = vec![Node::new("s", "Sarah Chen", NodeType::Person)];
        assert_eq!(visible_subgraph(&nodes, &[], None, "sarah").nodes.len(), 1);
        assert_eq!(visible_subgraph(&nodes, &[], None, "CHEN").nodes.len(), 1);
        assert!(visible_subgraph(&nodes, &[], None, "Sarahh").is_empty());
    }

    #[test]
    fn search_keeps_surrounding_spaces() {
        let nodes = vec![
            Node::new("s", "Sarah", NodeType::Person),
            Node::new("c", "Sarah Chen", NodeType::Person),
        ];
        let vis = visible_subgraph(&nodes, &[], None, "sarah ");
        assert_eq!(ids(&vis), vec!["c"]);
        assert_eq!(visible_subgraph(&nodes, &[], None, "sarah").nodes.len(), 2);
    }

    #[test]
    fn event_filter_on_demo_graph() {
        let snap = demo_snapshot();
        let vis = visible_subgraph(&snap.nodes, &snap.links, Some(NodeType::Event), "");
        assert_eq!(vis.nodes.len(), 11);
        assert!(vis.nodes.iter().all(|n| n.node_type == NodeType::Event));
        // every demo link crosses types
        assert!(vis.links.is_empty());
    }

    #[test]
    fn links_are_induced_by_surviving_nodes() {
        let snap = demo_snapshot();
        let vis = visible_subgraph(&snap.nodes, &snap.links, Some(NodeType::Person), "");
        assert!(!vis.links.is_empty());
        for l in vis.links.iter() {
            assert!(vis.contains(&l.source) && vis.contains(&l.target));
        }
    }

    #[test]
    fn type_and_search_commute() {
        let snap = demo_snapshot();
        for t in NodeType::ALL {
            for q in ["a", "s", "trip", "zzz", ""] {
                let both = visible_subgraph(&snap.nodes, &snap.links, Some(t), q);

                let typed = visible_subgraph(&snap.nodes, &snap.links, Some(t), "");
                let type_then_search = visible_subgraph(&typed.nodes, &typed.links, None, q);

                let searched = visible_subgraph(&snap.nodes, &snap.links, None, q);
                let search_then_type =
                    visible_subgraph(&searched.nodes, &searched.links, Some(t), "");

                assert_eq!(ids(&type_then_search), ids(&search_then_type));
                assert_eq!(ids(&both), ids(&type_then_search));
                assert_eq!(type_then_search.links.len(), search_then_type.links.len());
            }
        }
    }

    #[test]
    fn empty_result_is_fine() {
        let snap = demo_snapshot();
        let vis = visible_subgraph(&snap.nodes, &snap.links, Some(NodeType::JournalEntry), "");
        assert!(vis.is_empty());
        assert!(vis.links.is_empty());
    }

    #[test]
    fn cache_skips_unchanged_inputs() {
        let mut store = GraphStore::default();
        store.set_graph_data(demo_snapshot());
        let mut cache = VisibleCache::default();

        let (_, first) = cache.refresh(&store);
        assert!(first);

        store.set_filter_by_type(Some(NodeType::Event));
        let (a, changed) = cache.refresh(&store);
        assert!(changed);

        store.set_filter_by_type(Some(NodeType::Event));
        let (b, changed) = cache.refresh(&store);
        assert!(!changed);
        assert_eq!(ids(&a), ids(&b));

        store.remove_node(&NodeId::from("event_hiking"));
        let (c, changed) = cache.refresh(&store);
        assert!(changed);
        assert_eq!(c.nodes.len(), 10);
    }
}
