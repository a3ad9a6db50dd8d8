use bevy::prelude::Resource;
use graphaura_core::{GraphSnapshot, Link, LinkId, Node, NodeId, NodeType};
use std::collections::HashSet;
use std::sync::Arc;

/// What a single store mutation touched. Listeners get exactly one of these
/// per mutation, in the order the mutations were issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreChange {
    GraphReplaced,
    GraphEdited,
    GraphCleared,
    Selection,
    Hover,
    Highlight,
    TourTarget,
    Filter,
    Search,
    Loading,
    Error,
}

impl StoreChange {
    pub fn affects_scene(self) -> bool {
        !matches!(self, StoreChange::Loading | StoreChange::Error)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub selected: Option<NodeId>,
    pub hovered: Option<NodeId>,
    pub highlighted_nodes: HashSet<NodeId>,
    pub highlighted_links: HashSet<LinkId>,
    pub tour_target: Option<NodeId>,
    pub filter_by_type: Option<NodeType>,
    pub search_query: String,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl ViewState {
    pub fn highlight_active(&self) -> bool {
        !self.highlighted_nodes.is_empty() || !self.highlighted_links.is_empty()
    }

    // filter/search are user preferences and survive reloads
    fn reset_session(&mut self) {
        *self = ViewState {
            filter_by_type: self.filter_by_type,
            search_query: std::mem::take(&mut self.search_query),
            ..ViewState::default()
        };
    }

    fn forget_node(&mut self, id: &NodeId) {
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        if self.hovered.as_ref() == Some(id) {
            self.hovered = None;
        }
        if self.tour_target.as_ref() == Some(id) {
            self.tour_target = None;
        }
        self.highlighted_nodes.remove(id);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighbors {
    pub nodes: HashSet<NodeId>,
    pub links: HashSet<LinkId>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub name: Option<String>,
    pub node_type: Option<NodeType>,
    pub weight: Option<f32>,
    pub color: Option<String>,
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl NodePatch {
    fn apply_to(&self, node: &Node) -> Node {
        let mut out = node.clone();
        if let Some(name) = &self.name {
            out.name = name.clone();
        }
        if let Some(t) = self.node_type {
            out.node_type = t;
        }
        if let Some(w) = self.weight {
            out.weight = w;
        }
        if let Some(c) = &self.color {
            out.color = Some(c.clone());
        }
        if let Some(meta) = &self.metadata {
            for (k, v) in meta {
                out.metadata.insert(k.clone(), v.clone());
            }
        }
        out
    }
}

/// Where a full replacement graph came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOrigin {
    /// Served by the memory agent; it already holds this graph.
    Agent,
    /// Built in the viewer, from the cache, the demo data or a local reset.
    Local,
}

/// Receives every full snapshot the store is replaced with.
/// Implementations must return immediately and deal with their own failures.
pub trait SnapshotSink: Send + Sync {
    fn save(&self, snapshot: Arc<GraphSnapshot>, origin: SnapshotOrigin);
}

pub type Listener = Box<dyn FnMut(StoreChange) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Single owner of the graph and of the view state derived from user input.
/// Everything else reads from here and writes back through these methods.
#[derive(Resource, Default)]
pub struct GraphStore {
    graph: Arc<GraphSnapshot>,
    view: ViewState,
    revision: u64,
    /// Graph revision the current hover highlight was computed against.
    hover_revision: Option<u64>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    sinks: Vec<Box<dyn SnapshotSink>>,
}

impl GraphStore {
    // ----- Reads -----
    pub fn graph(&self) -> &GraphSnapshot {
        &self.graph
    }

    pub fn snapshot(&self) -> Arc<GraphSnapshot> {
        Arc::clone(&self.graph)
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn hover_revision(&self) -> Option<u64> {
        self.hover_revision
    }

    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.graph.node(id)
    }

    pub fn links_of<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a Link> + 'a {
        self.graph.links.iter().filter(move |l| l.touches(id))
    }

    /// One-hop neighbourhood over the full, unfiltered link set.
    pub fn get_neighbors(&self, id: &NodeId) -> Neighbors {
        let mut out = Neighbors::default();
        for link in self.graph.links.iter() {
            if let Some(other) = link.other_end(id) {
                out.nodes.insert(other.clone());
                out.links.insert(link.id());
            }
        }
        out
    }

    // ----- Observers -----
    pub fn subscribe(
        &mut self,
        listener: impl FnMut(StoreChange) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    pub fn add_sink(&mut self, sink: Box<dyn SnapshotSink>) {
        self.sinks.push(sink);
    }

    fn notify(&mut self, change: StoreChange) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(change);
        }
    }

    fn edit_graph(&mut self) -> &mut GraphSnapshot {
        self.revision += 1;
        Arc::make_mut(&mut self.graph)
    }

    // ----- Graph mutations -----
    pub fn set_graph_data(&mut self, snapshot: GraphSnapshot) {
        self.replace_graph(snapshot, SnapshotOrigin::Local);
    }

    /// Same as [`Self::set_graph_data`] for a snapshot the agent served.
    pub fn load_from_agent(&mut self, snapshot: GraphSnapshot) {
        self.replace_graph(snapshot, SnapshotOrigin::Agent);
    }

    fn replace_graph(&mut self, snapshot: GraphSnapshot, origin: SnapshotOrigin) {
        let (clean, issues) = snapshot.sanitized();
        for issue in &issues {
            tracing::warn!(%issue, "dropping inconsistent graph data");
        }
        self.graph = Arc::new(clean);
        self.revision += 1;
        self.view.reset_session();

        for sink in self.sinks.iter() {
            sink.save(Arc::clone(&self.graph), origin);
        }
        tracing::info!(
            nodes = self.graph.nodes.len(),
            links = self.graph.links.len(),
            dropped = issues.len(),
            "graph replaced"
        );
        self.notify(StoreChange::GraphReplaced);
    }

    pub fn add_node(&mut self, node: Node) -> bool {
        if self.graph.contains_node(&node.id) {
            tracing::warn!(id = %node.id, "node already exists, ignoring add");
            return false;
        }
        self.edit_graph().nodes.push(node);
        self.notify(StoreChange::GraphEdited);
        true
    }

    /// Removes the node and every link that touches it in one step.
    pub fn remove_node(&mut self, id: &NodeId) -> bool {
        if !self.graph.contains_node(id) {
            return false;
        }
        let removed: Vec<LinkId> = self.links_of(id).map(|l| l.id()).collect();
        let graph = self.edit_graph();
        graph.nodes.retain(|n| &n.id != id);
        graph.links.retain(|l| !l.touches(id));

        self.view.forget_node(id);
        for link_id in removed {
            self.view.highlighted_links.remove(&link_id);
        }
        self.notify(StoreChange::GraphEdited);
        true
    }

    pub fn update_node(&mut self, id: &NodeId, patch: NodePatch) -> bool {
        let Some(pos) = self.graph.nodes.iter().position(|n| &n.id == id) else {
            return false;
        };
        let updated = patch.apply_to(&self.graph.nodes[pos]);
        self.edit_graph().nodes[pos] = updated;
        self.notify(StoreChange::GraphEdited);
        true
    }

    /// Replaces the record with the same id, or appends it.
    pub fn upsert_node(&mut self, node: Node) {
        self.upsert_node_quiet(node);
        self.notify(StoreChange::GraphEdited);
    }

    fn upsert_node_quiet(&mut self, node: Node) {
        let pos = self.graph.nodes.iter().position(|n| n.id == node.id);
        let graph = self.edit_graph();
        match pos {
            Some(pos) => graph.nodes[pos] = node,
            None => graph.nodes.push(node),
        }
    }

    fn link_rejection(&self, link: &Link) -> Option<&'static str> {
        if !self.graph.contains_node(&link.source) || !self.graph.contains_node(&link.target) {
            Some("missing endpoint")
        } else if self.graph.has_link_between(&link.source, &link.target) {
            Some("duplicate endpoint pair")
        } else {
            None
        }
    }

    pub fn add_link(&mut self, link: Link) -> bool {
        if let Some(reason) = self.link_rejection(&link) {
            tracing::warn!(link = %link.id(), reason, "dropping link");
            return false;
        }
        self.edit_graph().links.push(link);
        self.notify(StoreChange::GraphEdited);
        true
    }

    /// Removes the link between the two ids, whichever one is the source.
    pub fn remove_link(&mut self, a: &NodeId, b: &NodeId) -> bool {
        if !self.graph.has_link_between(a, b) {
            return false;
        }
        let removed: Vec<LinkId> = self
            .graph
            .links
            .iter()
            .filter(|l| l.connects(a, b))
            .map(|l| l.id())
            .collect();
        self.edit_graph().links.retain(|l| !l.connects(a, b));
        for link_id in removed {
            self.view.highlighted_links.remove(&link_id);
        }
        self.notify(StoreChange::GraphEdited);
        true
    }

    /// Applies a batch of new or updated nodes plus links as one mutation.
    /// Returns how many nodes and links ended up in the graph.
    pub fn ingest(&mut self, nodes: Vec<Node>, links: Vec<Link>) -> (usize, usize) {
        let node_count = nodes.len();
        for node in nodes {
            self.upsert_node_quiet(node);
        }
        let mut link_count = 0;
        for link in links {
            if let Some(reason) = self.link_rejection(&link) {
                tracing::debug!(link = %link.id(), reason, "skipping ingested link");
                continue;
            }
            self.edit_graph().links.push(link);
            link_count += 1;
        }
        self.notify(StoreChange::GraphEdited);
        (node_count, link_count)
    }

    pub fn clear_graph(&mut self) {
        self.graph = Arc::new(GraphSnapshot::default());
        self.revision += 1;
        self.view.selected = None;
        self.view.hovered = None;
        self.view.tour_target = None;
        self.view.highlighted_nodes.clear();
        self.view.highlighted_links.clear();
        self.notify(StoreChange::GraphCleared);
    }

    // ----- View state -----
    pub fn set_selected_node(&mut self, id: Option<NodeId>) {
        self.view.selected = id;
        self.notify(StoreChange::Selection);
    }

    pub fn set_hovered_node(&mut self, id: Option<NodeId>) {
        self.view.hovered = id;
        self.notify(StoreChange::Hover);
    }

    pub fn set_highlighted_nodes(&mut self, ids: HashSet<NodeId>) {
        self.view.highlighted_nodes = ids;
        self.notify(StoreChange::Highlight);
    }

    pub fn set_highlighted_links(&mut self, ids: HashSet<LinkId>) {
        self.view.highlighted_links = ids;
        self.notify(StoreChange::Highlight);
    }

    /// Hover target and both highlight sets replaced together.
    pub fn set_hover_highlight(
        &mut self,
        hovered: Option<NodeId>,
        nodes: HashSet<NodeId>,
        links: HashSet<LinkId>,
    ) {
        self.hover_revision = hovered.is_some().then_some(self.revision);
        self.view.hovered = hovered;
        self.view.highlighted_nodes = nodes;
        self.view.highlighted_links = links;
        self.notify(StoreChange::Hover);
    }

    pub fn set_tour_target(&mut self, id: Option<NodeId>) {
        self.view.tour_target = id;
        self.notify(StoreChange::TourTarget);
    }

    pub fn set_filter_by_type(&mut self, filter: Option<NodeType>) {
        self.view.filter_by_type = filter;
        self.notify(StoreChange::Filter);
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.view.search_query = query.into();
        self.notify(StoreChange::Search);
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.view.is_loading = loading;
        self.notify(StoreChange::Loading);
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.view.error = error;
        self.notify(StoreChange::Error);
    }
}
