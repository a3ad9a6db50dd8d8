use graphaura_core::NodeId;

use crate::graph::store::GraphStore;

/// Highlights the hovered node, its direct neighbours (over the unfiltered
/// graph) and every link incident to it. The hovered node is always part of
/// the node set. A new hover replaces the previous sets outright. Hovering
/// the same node again recomputes only if the graph changed since.
pub fn hover_enter(store: &mut GraphStore, id: &NodeId) {
    if store.view().hovered.as_ref() == Some(id)
        && store.hover_revision() == Some(store.revision())
    {
        return;
    }
    if store.node(id).is_none() {
        hover_leave(store);
        return;
    }
    let mut neighbors = store.get_neighbors(id);
    neighbors.nodes.insert(id.clone());
    store.set_hover_highlight(Some(id.clone()), neighbors.nodes, neighbors.links);
}

pub fn hover_leave(store: &mut GraphStore) {
    let view = store.view();
    if view.hovered.is_none() && !view.highlight_active() {
        return;
    }
    store.set_hover_highlight(None, Default::default(), Default::default());
}
