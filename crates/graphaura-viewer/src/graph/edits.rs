use graphaura_core::{Extraction, Link, Msg, Node, NodeId, NodeType};

use crate::graph::store::GraphStore;
use crate::net::AgentLink;
use crate::util::ids::local_node_id;

/// Input of the add-memory form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewMemory {
    pub name: String,
    pub node_type: NodeType,
    pub description: String,
    pub connect_to: Option<NodeId>,
    pub relationship: String,
}

/// Adds the memory right away under a local id and hands it to the agent.
/// Returns the new id, or `None` when the name is blank.
pub fn create_memory(
    store: &mut GraphStore,
    agent: Option<&AgentLink>,
    form: &NewMemory,
) -> Option<NodeId> {
    let name = form.name.trim();
    if name.is_empty() {
        return None;
    }
    let mut node = Node::new(local_node_id(), name, form.node_type);
    let description = form.description.trim();
    if !description.is_empty() {
        node.metadata
            .insert("description".into(), description.to_string().into());
    }
    let id = node.id.clone();
    store.add_node(node.clone());
    if let Some(agent) = agent {
        agent.send(Msg::UpsertNode { node });
    }
    tracing::info!(%id, "memory created");

    if let Some(other) = &form.connect_to {
        let rel = match form.relationship.trim() {
            "" => "RELATED_TO",
            r => r,
        };
        connect(store, agent, &id, other, rel);
    }
    Some(id)
}

pub fn delete_memory(store: &mut GraphStore, agent: Option<&AgentLink>, id: &NodeId) -> bool {
    if !store.remove_node(id) {
        return false;
    }
    if let Some(agent) = agent {
        agent.send(Msg::RemoveNode { id: id.clone() });
    }
    tracing::info!(%id, "memory deleted");
    true
}

pub fn connect(
    store: &mut GraphStore,
    agent: Option<&AgentLink>,
    source: &NodeId,
    target: &NodeId,
    relationship: &str,
) -> bool {
    if source == target {
        return false;
    }
    let link = Link::new(source.as_str(), target.as_str(), relationship);
    if !store.add_link(link.clone()) {
        return false;
    }
    if let Some(agent) = agent {
        agent.send(Msg::UpsertLink { link });
    }
    true
}

pub fn disconnect(
    store: &mut GraphStore,
    agent: Option<&AgentLink>,
    a: &NodeId,
    b: &NodeId,
) -> bool {
    if !store.remove_link(a, b) {
        return false;
    }
    if let Some(agent) = agent {
        agent.send(Msg::RemoveLink {
            source: a.clone(),
            target: b.clone(),
        });
    }
    true
}

/// The agent's copy of a node replaces whatever the viewer holds, unless the
/// node was deleted locally in the meantime.
pub fn apply_persisted(store: &mut GraphStore, node: Node) {
    if store.node(&node.id).is_none() {
        tracing::debug!(id = %node.id, "persisted node no longer present");
        return;
    }
    store.upsert_node(node);
}

pub fn apply_extraction(store: &mut GraphStore, extraction: Extraction) -> (usize, usize) {
    let title = extraction.title.clone();
    let (nodes, links) = extraction.into_batch();
    let (n, l) = store.ingest(nodes, links);
    tracing::info!(%title, nodes = n, links = l, "extraction ingested");
    (n, l)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ids::is_local_id;
    use graphaura_core::extraction::{ExtractedEntity, SuggestedConnection};
    use graphaura_core::GraphSnapshot;

    fn store() -> GraphStore {
        let mut store = GraphStore::default();
        store.set_graph_data(GraphSnapshot::new(
            vec![Node::new("person_sarah", "Sarah Chen", NodeType::Person)],
            vec![],
        ));
        store
    }

    #[test]
    fn create_memory_uses_local_id_and_links_to_target() {
        let mut st = store();
        let form = NewMemory {
            name: "  Picnic  ".into(),
            node_type: NodeType::Event,
            description: "Lunch in the park".into(),
            connect_to: Some("person_sarah".into()),
            relationship: String::new(),
        };
        let id = create_memory(&mut st, None, &form).expect("created");
        assert!(is_local_id(id.as_str()));

        let node = st.node(&id).expect("node");
        assert_eq!(node.name, "Picnic");
        assert_eq!(node.description(), Some("Lunch in the park"));
        assert_eq!(st.graph().links.len(), 1);
        assert_eq!(st.graph().links[0].relationship, "RELATED_TO");
    }

    #[test]
    fn blank_name_creates_nothing() {
        let mut st = store();
        let rev = st.revision();
        assert!(create_memory(&mut st, None, &NewMemory::default()).is_none());
        assert_eq!(st.revision(), rev);
    }

    #[test]
    fn self_links_are_refused() {
        let mut st = store();
        let id = NodeId::from("person_sarah");
        assert!(!connect(&mut st, None, &id, &id, "KNOWS"));
    }

    #[test]
    fn persisted_record_replaces_local_copy() {
        let mut st = store();
        let mut node = Node::new("person_sarah", "Sarah C.", NodeType::Person);
        node.metadata.insert("persisted".into(), true.into());
        apply_persisted(&mut st, node);
        assert_eq!(st.node(&"person_sarah".into()).map(|n| n.name.as_str()), Some("Sarah C."));

        apply_persisted(&mut st, Node::new("gone", "Gone", NodeType::Other));
        assert!(st.node(&"gone".into()).is_none());
    }

    #[test]
    fn extraction_lands_as_one_batch() {
        let mut st = store();
        let extraction = Extraction {
            title: "Beach day".into(),
            summary: "Went to the beach with Sarah".into(),
            people: vec![ExtractedEntity {
                name: "Sarah Chen".into(),
                ..Default::default()
            }],
            locations: vec![ExtractedEntity {
                name: "Santa Monica".into(),
                ..Default::default()
            }],
            connections: vec![SuggestedConnection {
                from: "Sarah Chen".into(),
                to: "Santa Monica".into(),
                relationship: "VISITED".into(),
                strength: None,
            }],
            ..Default::default()
        };
        let (n, l) = apply_extraction(&mut st, extraction);
        assert_eq!(n, 3);
        assert_eq!(l, 3);
    }
}
