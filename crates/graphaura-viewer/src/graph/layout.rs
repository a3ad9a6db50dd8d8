use bevy::prelude::{Res, ResMut, Resource, Time, Vec3};
use graphaura_core::{GraphSnapshot, NodeId, NodeType};
use std::collections::HashMap;

use crate::app::resources::SceneFlags;
use crate::graph::filter::{VisibleCache, VisibleSubgraph};
use crate::graph::store::GraphStore;
use crate::util::ids::stable_u32;

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutParams {
    pub enabled: bool,
    pub link_distance: f32,
    pub repulsion: f32,
    pub damping: f32,
    pub max_step: f32,
    pub radius: f32,
    pub y_spread: f32,
    pub gravity: f32,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            enabled: true,
            link_distance: 6.0,
            repulsion: 22.0,
            damping: 0.92,
            max_step: 0.35,
            radius: 18.0,
            y_spread: 8.0,
            gravity: 0.02,
        }
    }
}

/// Render-only node coordinates. The force simulation here is treated as an
/// oracle: nothing else depends on where it puts things.
#[derive(Resource, Default)]
pub struct Layout {
    pub params: LayoutParams,
    positions: HashMap<NodeId, Vec3>,
    velocities: HashMap<NodeId, Vec3>,
}

pub fn update_layout(
    time: Res<Time>,
    store: Res<GraphStore>,
    mut cache: ResMut<VisibleCache>,
    mut layout: ResMut<Layout>,
    flags: Res<SceneFlags>,
) {
    let (visible, recomputed) = cache.refresh(&store);
    if recomputed {
        flags.request_redraw();
    }
    layout.sync(store.graph(), &visible);
    let dt = time.delta_seconds().min(0.033);
    layout.step(&visible, dt);
}

fn ring_radius(t: NodeType, r: f32) -> f32 {
    match t {
        NodeType::JournalEntry => r * 0.3,
        NodeType::Person => r * 0.55,
        NodeType::Event => r * 0.9,
        NodeType::Location => r * 1.25,
        NodeType::Other => r * 1.5,
    }
}

impl Layout {
    pub fn new(params: LayoutParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    pub fn position(&self, id: &NodeId) -> Option<Vec3> {
        self.positions.get(id).copied()
    }

    pub fn positions(&self) -> &HashMap<NodeId, Vec3> {
        &self.positions
    }

    pub fn set_position(&mut self, id: NodeId, pos: Vec3) {
        self.velocities.insert(id.clone(), Vec3::ZERO);
        self.positions.insert(id, pos);
    }

    /// Seeds every visible node that has no position yet and forgets nodes
    /// that left the graph. Filtered-out nodes keep their last position.
    pub fn sync(&mut self, graph: &GraphSnapshot, visible: &VisibleSubgraph) {
        if self.positions.len() > graph.nodes.len() {
            self.positions.retain(|id, _| graph.contains_node(id));
            self.velocities.retain(|id, _| graph.contains_node(id));
        }
        for node in visible.nodes.iter() {
            if self.positions.contains_key(&node.id) {
                continue;
            }
            let pos = self.seed_position(&node.id, node.node_type);
            self.set_position(node.id.clone(), pos);
        }
    }

    fn seed_position(&self, id: &NodeId, t: NodeType) -> Vec3 {
        let h = stable_u32(id.as_str());
        let angle = (h & 0xFFFF) as f32 / 65536.0 * std::f32::consts::TAU;
        let r = ring_radius(t, self.params.radius.max(1.0));
        let y = if self.params.y_spread > 0.0 {
            (((h >> 16) % 7) as f32 / 6.0 - 0.5) * self.params.y_spread
        } else {
            0.0
        };
        Vec3::new(r * angle.cos(), y, r * angle.sin())
    }

    pub fn step(&mut self, visible: &VisibleSubgraph, dt: f32) {
        if !self.params.enabled {
            return;
        }
        let ids: Vec<&NodeId> = visible
            .nodes
            .iter()
            .map(|n| &n.id)
            .filter(|id| self.positions.contains_key(*id))
            .collect();
        if ids.len() <= 1 {
            return;
        }

        let link_dist = self.params.link_distance.max(0.1);
        let repulsion = self.params.repulsion.max(0.0);
        let damping = self.params.damping.clamp(0.0, 1.0);
        let max_step = self.params.max_step.max(0.001);
        let gravity = self.params.gravity.max(0.0);

        let pos: Vec<Vec3> = ids
            .iter()
            .map(|id| self.positions.get(*id).copied().unwrap_or(Vec3::ZERO))
            .collect();
        let index: HashMap<&NodeId, usize> =
            ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let mut forces = vec![Vec3::ZERO; ids.len()];

        for i in 0..ids.len() {
            forces[i] -= pos[i] * gravity;
            for j in (i + 1)..ids.len() {
                let dir = pos[i] - pos[j];
                let dist2 = dir.length_squared().max(0.01);
                let f = (repulsion / dist2) * dir.normalize_or_zero();
                forces[i] += f;
                forces[j] -= f;
            }
        }

        for link in visible.links.iter() {
            let (Some(&a), Some(&b)) = (index.get(&link.source), index.get(&link.target)) else {
                continue;
            };
            let d = pos[b] - pos[a];
            let len = d.length().max(0.001);
            let k = 0.6 * link.strength.unwrap_or(1.0).clamp(0.1, 2.0);
            let f = k * (len - link_dist) * (d / len);
            forces[a] += f;
            forces[b] -= f;
        }

        for (i, id) in ids.iter().enumerate() {
            let v = self
                .velocities
                .entry((*id).clone())
                .or_insert(Vec3::ZERO);
            *v = (*v + forces[i] * dt) * damping;

            let mut step = *v * dt;
            if step.length() > max_step {
                step = step.normalize_or_zero() * max_step;
            }
            if let Some(p) = self.positions.get_mut(*id) {
                *p += step;
            }
        }
    }
}
