use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::{Link, Node, NodeId, NodeType};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractedEntity {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SuggestedConnection {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub relationship: String,
    #[serde(default)]
    pub strength: Option<f32>,
}

/// Structured result of analysing a piece of free text.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Extraction {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub people: Vec<ExtractedEntity>,
    #[serde(default)]
    pub locations: Vec<ExtractedEntity>,
    #[serde(default)]
    pub events: Vec<ExtractedEntity>,
    #[serde(default)]
    pub connections: Vec<SuggestedConnection>,
    #[serde(default)]
    pub insights: Vec<String>,
}

pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut dash = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            dash = false;
        } else if !dash && !out.is_empty() {
            out.push('_');
            dash = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

fn entity_id(node_type: NodeType, name: &str) -> NodeId {
    let prefix = match node_type {
        NodeType::Person => "person",
        NodeType::Location => "place",
        NodeType::Event => "event",
        NodeType::JournalEntry => "journal",
        NodeType::Other => "memory",
    };
    NodeId(format!("{prefix}_{}", slug(name)))
}

impl Extraction {
    /// Turns the extraction into nodes and links: one journal entry for the
    /// text, one node per entity, a MENTIONS link from the entry to each
    /// entity, and every suggested connection whose names resolve.
    pub fn into_batch(self) -> (Vec<Node>, Vec<Link>) {
        let title = if self.title.trim().is_empty() {
            "Journal entry".to_string()
        } else {
            self.title.clone()
        };
        let mut entry = Node::new(
            entity_id(NodeType::JournalEntry, &title).0,
            title,
            NodeType::JournalEntry,
        );
        entry.weight = 1.5;
        if !self.summary.is_empty() {
            entry
                .metadata
                .insert("description".into(), self.summary.clone().into());
        }
        if !self.insights.is_empty() {
            entry
                .metadata
                .insert("insights".into(), self.insights.clone().into());
        }

        let mut nodes = vec![entry.clone()];
        let mut links = Vec::new();
        let mut by_name: HashMap<String, NodeId> = HashMap::new();

        let groups = [
            (NodeType::Person, self.people),
            (NodeType::Location, self.locations),
            (NodeType::Event, self.events),
        ];
        for (node_type, entities) in groups {
            for ent in entities {
                let id = entity_id(node_type, &ent.name);
                if by_name.contains_key(&ent.name.to_lowercase()) {
                    continue;
                }
                let mut node = Node::new(id.0.clone(), ent.name.clone(), node_type);
                if let Some(desc) = ent.description {
                    node.metadata.insert("description".into(), desc.into());
                }
                if let Some(conf) = ent.confidence {
                    node.metadata.insert("confidence".into(), conf.into());
                }
                node.metadata.insert("source".into(), "analysis".into());
                by_name.insert(ent.name.to_lowercase(), id.clone());
                links.push(Link::new(entry.id.0.clone(), id.0, "MENTIONS"));
                nodes.push(node);
            }
        }

        for conn in self.connections {
            let (Some(a), Some(b)) = (
                by_name.get(&conn.from.to_lowercase()),
                by_name.get(&conn.to.to_lowercase()),
            ) else {
                continue;
            };
            if a == b {
                continue;
            }
            let mut link = Link::new(a.0.clone(), b.0.clone(), &conn.relationship);
            link.strength = conn.strength;
            links.push(link);
        }

        (nodes, links)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ent(name: &str) -> ExtractedEntity {
        ExtractedEntity {
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn slug_collapses_punctuation() {
        assert_eq!(slug("Sarah  Chen!"), "sarah_chen");
        assert_eq!(slug("Lake Michigan, MI"), "lake_michigan_mi");
    }

    #[test]
    fn batch_links_entry_to_entities_and_resolves_connections() {
        let ex = Extraction {
            title: "Weekend at the lake".into(),
            summary: "Fishing with dad".into(),
            people: vec![ent("Dad")],
            locations: vec![ent("Lake Michigan")],
            events: vec![ent("Fishing Trip")],
            connections: vec![
                SuggestedConnection {
                    from: "dad".into(),
                    to: "Fishing Trip".into(),
                    relationship: "TAUGHT".into(),
                    strength: Some(0.9),
                },
                SuggestedConnection {
                    from: "Dad".into(),
                    to: "Nobody".into(),
                    relationship: "KNOWS".into(),
                    strength: None,
                },
            ],
            insights: vec!["Family time matters".into()],
        };
        let (nodes, links) = ex.into_batch();

        assert_eq!(nodes.len(), 4);
        assert_eq!(nodes[0].node_type, NodeType::JournalEntry);
        assert_eq!(nodes[0].description(), Some("Fishing with dad"));
        assert!(nodes.iter().any(|n| n.id == NodeId::from("place_lake_michigan")));

        let mentions = links.iter().filter(|l| l.relationship == "MENTIONS").count();
        assert_eq!(mentions, 3);
        assert!(links
            .iter()
            .any(|l| l.relationship == "TAUGHT" && l.strength == Some(0.9)));
        assert_eq!(links.len(), 4);
    }
}
