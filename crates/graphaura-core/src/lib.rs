use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

pub mod demo;
pub mod extraction;
pub mod protocol;

pub use extraction::Extraction;
pub use protocol::Msg;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Person,
    Location,
    Event,
    JournalEntry,
    #[default]
    #[serde(other)]
    Other,
}

impl NodeType {
    pub const ALL: [NodeType; 5] = [
        NodeType::Person,
        NodeType::Location,
        NodeType::Event,
        NodeType::JournalEntry,
        NodeType::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Location => "location",
            Self::Event => "event",
            Self::JournalEntry => "journal-entry",
            Self::Other => "other",
        }
    }

    pub fn default_color(self) -> &'static str {
        match self {
            Self::Person => "#3B82F6",
            Self::Location => "#10B981",
            Self::Event => "#F59E0B",
            Self::JournalEntry => "#A855F7",
            Self::Other => "#6B7280",
        }
    }
}

fn default_weight() -> f32 {
    1.0
}

/// A memory entity. Only durable fields live here; layout coordinates and
/// any other render-side data are dropped when a node is deserialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    #[serde(rename = "type", default)]
    pub node_type: NodeType,
    #[serde(default = "default_weight", alias = "val")]
    pub weight: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: NodeId(id.into()),
            name: name.into(),
            node_type,
            weight: default_weight(),
            color: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn color_or_default(&self) -> &str {
        self.color
            .as_deref()
            .unwrap_or_else(|| self.node_type.default_color())
    }

    pub fn description(&self) -> Option<&str> {
        self.metadata.get("description").and_then(|v| v.as_str())
    }
}

// Link endpoints arrive either as plain ids or as embedded node objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum EndpointRepr {
    Id(String),
    Object { id: String },
}

fn de_endpoint<'de, D>(de: D) -> Result<NodeId, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match EndpointRepr::deserialize(de)? {
        EndpointRepr::Id(id) | EndpointRepr::Object { id } => NodeId(id),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Link {
    #[serde(deserialize_with = "de_endpoint")]
    pub source: NodeId,
    #[serde(deserialize_with = "de_endpoint")]
    pub target: NodeId,
    #[serde(default, alias = "type")]
    pub relationship: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Link {
    pub fn new(source: impl Into<String>, target: impl Into<String>, relationship: &str) -> Self {
        Self {
            source: NodeId(source.into()),
            target: NodeId(target.into()),
            relationship: relationship.to_string(),
            strength: None,
            color: None,
        }
    }

    pub fn id(&self) -> LinkId {
        LinkId(format!("{}-{}", self.source.0, self.target.0))
    }

    pub fn touches(&self, id: &NodeId) -> bool {
        &self.source == id || &self.target == id
    }

    /// Orientation-free endpoint match.
    pub fn connects(&self, a: &NodeId, b: &NodeId) -> bool {
        (&self.source == a && &self.target == b) || (&self.source == b && &self.target == a)
    }

    pub fn other_end(&self, id: &NodeId) -> Option<&NodeId> {
        if &self.source == id {
            Some(&self.target)
        } else if &self.target == id {
            Some(&self.source)
        } else {
            None
        }
    }

    fn pair_key(&self) -> (NodeId, NodeId) {
        if self.source <= self.target {
            (self.source.clone(), self.target.clone())
        } else {
            (self.target.clone(), self.source.clone())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub String);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntegrityError {
    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),
    #[error("link {link} references missing node {missing}")]
    DanglingLink { link: LinkId, missing: NodeId },
}

/// A complete (nodes, links) graph value. This is also the durable shape:
/// it carries nothing that only the renderer needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default, alias = "edges")]
    pub links: Vec<Link>,
}

impl GraphSnapshot {
    pub fn new(nodes: Vec<Node>, links: Vec<Link>) -> Self {
        Self { nodes, links }
    }

    /// Builds a snapshot from a traversal result, where the same edge can be
    /// reported once from each side. The first occurrence of every unordered
    /// endpoint pair is kept.
    pub fn from_traversal(nodes: Vec<Node>, links: Vec<Link>) -> Self {
        let mut seen = HashSet::new();
        let links = links
            .into_iter()
            .filter(|l| seen.insert(l.pair_key()))
            .collect();
        Self { nodes, links }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.nodes.iter().any(|n| &n.id == id)
    }

    pub fn has_link_between(&self, a: &NodeId, b: &NodeId) -> bool {
        self.links.iter().any(|l| l.connects(a, b))
    }

    /// Drops duplicate nodes and dangling links instead of rejecting the
    /// snapshot. Every drop is returned so the caller can log it.
    pub fn sanitized(self) -> (Self, Vec<IntegrityError>) {
        let mut issues = Vec::new();
        let mut ids = HashSet::new();
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for node in self.nodes {
            if ids.insert(node.id.clone()) {
                nodes.push(node);
            } else {
                issues.push(IntegrityError::DuplicateNode(node.id));
            }
        }

        let mut links = Vec::with_capacity(self.links.len());
        for link in self.links {
            let missing = [&link.source, &link.target]
                .into_iter()
                .find(|id| !ids.contains(*id))
                .cloned();
            match missing {
                Some(missing) => issues.push(IntegrityError::DanglingLink {
                    link: link.id(),
                    missing,
                }),
                None => links.push(link),
            }
        }

        (Self { nodes, links }, issues)
    }

    pub fn count_by_type(&self) -> Vec<(NodeType, usize)> {
        NodeType::ALL
            .iter()
            .map(|t| (*t, self.nodes.iter().filter(|n| n.node_type == *t).count()))
            .filter(|(_, c)| *c > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_type_falls_back_to_other() {
        let node: Node =
            serde_json::from_str(r#"{"id":"n1","name":"Thing","type":"spaceship"}"#).unwrap();
        assert_eq!(node.node_type, NodeType::Other);
        assert_eq!(node.weight, 1.0);
        assert_eq!(node.color_or_default(), "#6B7280");
    }

    #[test]
    fn journal_entry_uses_kebab_case() {
        let node: Node =
            serde_json::from_str(r#"{"id":"j","name":"Day","type":"journal-entry","val":3}"#)
                .unwrap();
        assert_eq!(node.node_type, NodeType::JournalEntry);
        assert_eq!(node.weight, 3.0);
        let out = serde_json::to_value(&node).unwrap();
        assert_eq!(out["type"], "journal-entry");
    }

    #[test]
    fn render_fields_are_dropped() {
        let node: Node = serde_json::from_str(
            r#"{"id":"a","name":"A","type":"person","x":1.5,"y":2.0,"z":-3.0,"vx":0.1}"#,
        )
        .unwrap();
        let out = serde_json::to_value(&node).unwrap();
        assert!(out.get("x").is_none());
        assert!(out.get("vx").is_none());
    }

    #[test]
    fn link_endpoints_accept_objects() {
        let link: Link = serde_json::from_str(
            r#"{"source":{"id":"a","name":"A","x":3.0},"target":"b","relationship":"MET"}"#,
        )
        .unwrap();
        assert_eq!(link.source, NodeId::from("a"));
        assert_eq!(link.target, NodeId::from("b"));
        assert_eq!(link.id(), LinkId("a-b".to_string()));

        let out = serde_json::to_value(&link).unwrap();
        assert_eq!(out["source"], "a");
    }

    #[test]
    fn connects_ignores_orientation() {
        let link = Link::new("a", "b", "MET");
        assert!(link.connects(&"b".into(), &"a".into()));
        assert!(!link.connects(&"a".into(), &"c".into()));
        assert_eq!(link.other_end(&"b".into()), Some(&NodeId::from("a")));
    }

    #[test]
    fn traversal_dedups_unordered_pairs_first_wins() {
        let nodes = vec![
            Node::new("a", "A", NodeType::Person),
            Node::new("b", "B", NodeType::Event),
        ];
        let links = vec![
            Link::new("a", "b", "ATTENDED"),
            Link::new("b", "a", "HOSTED"),
            Link::new("a", "b", "AGAIN"),
        ];
        let snap = GraphSnapshot::from_traversal(nodes, links);
        assert_eq!(snap.links.len(), 1);
        assert_eq!(snap.links[0].relationship, "ATTENDED");
    }

    #[test]
    fn sanitize_drops_dangling_links_and_duplicates() {
        let snap = GraphSnapshot::new(
            vec![
                Node::new("a", "A", NodeType::Person),
                Node::new("b", "B", NodeType::Event),
                Node::new("a", "A again", NodeType::Location),
            ],
            vec![Link::new("a", "b", "ATTENDED"), Link::new("a", "ghost", "KNOWS")],
        );
        let (clean, issues) = snap.sanitized();
        assert_eq!(clean.nodes.len(), 2);
        assert_eq!(clean.nodes[0].name, "A");
        assert_eq!(clean.links.len(), 1);
        assert_eq!(issues.len(), 2);
        assert!(issues.contains(&IntegrityError::DanglingLink {
            link: LinkId("a-ghost".to_string()),
            missing: NodeId::from("ghost"),
        }));
    }
}
