use bevy::color::{Alpha, Color, Srgba};
use bevy::math::Vec3;
use graphaura_core::{Link, LinkId, Node, NodeId};
use std::collections::HashMap;

use crate::graph::filter::VisibleSubgraph;
use crate::graph::store::ViewState;

pub const FADED_ALPHA: f32 = 0.15;
pub const LINK_WIDTH: f32 = 1.5;
pub const HIGHLIGHT_LINK_WIDTH: f32 = 4.5;
pub const HIGHLIGHT_PARTICLES: u32 = 4;

const MUTED_LINK: &str = "#64748B";
const ACCENT_LINK: &str = "#FDE047";

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum SceneError {
    #[error("node {0} has a non-finite position")]
    NonFinitePosition(NodeId),
    #[error("node size {0} is not a positive number")]
    InvalidNodeSize(f32),
}

/// Strongest reason a node is drawn differently, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Emphasis {
    Normal,
    Highlighted,
    Hovered,
    Selected,
    TourTarget,
}

impl Emphasis {
    fn radius_factor(self) -> f32 {
        match self {
            Emphasis::Normal | Emphasis::Highlighted | Emphasis::Hovered => 1.0,
            Emphasis::Selected => 1.5,
            Emphasis::TourTarget => 1.8,
        }
    }

    fn emissive(self) -> f32 {
        match self {
            Emphasis::Normal => 0.0,
            Emphasis::Highlighted | Emphasis::Hovered => 0.6,
            Emphasis::Selected => 1.5,
            Emphasis::TourTarget => 3.0,
        }
    }

    /// (radius multiple, alpha) per concentric shell.
    fn shells(self) -> &'static [(f32, f32)] {
        match self {
            Emphasis::Normal | Emphasis::Highlighted => &[],
            Emphasis::Hovered => &[(1.3, 0.18), (1.6, 0.08)],
            Emphasis::Selected => &[(1.4, 0.25), (1.9, 0.12)],
            Emphasis::TourTarget => &[(1.5, 0.4), (2.1, 0.22), (2.8, 0.1)],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlowShell {
    pub radius: f32,
    pub alpha: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub text: String,
    pub size: f32,
    pub alpha: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeVisual {
    pub id: NodeId,
    pub position: Vec3,
    pub radius: f32,
    pub color: Color,
    pub alpha: f32,
    pub emphasis: Emphasis,
    pub emissive: f32,
    pub glow: Vec<GlowShell>,
    pub label: Option<LabelStyle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkVisual {
    pub id: LinkId,
    pub source: NodeId,
    pub target: NodeId,
    pub color: Color,
    pub width: f32,
    pub particles: u32,
    pub highlighted: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneDescription {
    pub nodes: Vec<NodeVisual>,
    pub links: Vec<LinkVisual>,
}

impl SceneDescription {
    pub fn node(&self, id: &NodeId) -> Option<&NodeVisual> {
        self.nodes.iter().find(|n| &n.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneStyle {
    pub node_size: f32,
    pub show_labels: bool,
}

impl Default for SceneStyle {
    fn default() -> Self {
        Self {
            node_size: 0.4,
            show_labels: true,
        }
    }
}

pub fn parse_color(hex: &str) -> Option<Color> {
    Srgba::hex(hex).ok().map(Color::from)
}

fn node_color(node: &Node) -> Color {
    parse_color(node.color_or_default())
        .or_else(|| parse_color(node.node_type.default_color()))
        .unwrap_or(Color::WHITE)
}

pub fn emphasis_of(view: &ViewState, id: &NodeId) -> Emphasis {
    if view.tour_target.as_ref() == Some(id) {
        Emphasis::TourTarget
    } else if view.selected.as_ref() == Some(id) {
        Emphasis::Selected
    } else if view.hovered.as_ref() == Some(id) {
        Emphasis::Hovered
    } else if view.highlighted_nodes.contains(id) {
        Emphasis::Highlighted
    } else {
        Emphasis::Normal
    }
}

fn link_visual(link: &Link, view: &ViewState) -> LinkVisual {
    let id = link.id();
    let highlighted = view.highlighted_links.contains(&id);
    let color = if highlighted {
        parse_color(ACCENT_LINK).unwrap_or(Color::WHITE)
    } else {
        let base = link
            .color
            .as_deref()
            .and_then(parse_color)
            .or_else(|| parse_color(MUTED_LINK))
            .unwrap_or(Color::srgb(0.4, 0.45, 0.5));
        let alpha = if view.highlight_active() { FADED_ALPHA } else { 0.6 };
        base.with_alpha(alpha)
    };
    LinkVisual {
        id,
        source: link.source.clone(),
        target: link.target.clone(),
        color,
        width: if highlighted { HIGHLIGHT_LINK_WIDTH } else { LINK_WIDTH },
        particles: if highlighted { HIGHLIGHT_PARTICLES } else { 0 },
        highlighted,
    }
}

/// Maps the visible subgraph plus view state to what should be on screen.
///
/// Nodes the layout has not placed yet are left out, as are links touching
/// them. Any non-finite coordinate is an error: the caller stops rendering
/// the scene instead of drawing garbage.
pub fn build_scene(
    visible: &VisibleSubgraph,
    view: &ViewState,
    positions: &HashMap<NodeId, Vec3>,
    style: SceneStyle,
) -> Result<SceneDescription, SceneError> {
    if !style.node_size.is_finite() || style.node_size <= 0.0 {
        return Err(SceneError::InvalidNodeSize(style.node_size));
    }
    let dimmed = view.highlight_active();

    let mut nodes = Vec::with_capacity(visible.nodes.len());
    for node in visible.nodes.iter() {
        let Some(&position) = positions.get(&node.id) else {
            continue;
        };
        if !position.is_finite() {
            return Err(SceneError::NonFinitePosition(node.id.clone()));
        }

        let emphasis = emphasis_of(view, &node.id);
        let weight = if node.weight.is_finite() && node.weight > 0.0 {
            node.weight
        } else {
            1.0
        };
        let radius = weight * style.node_size * emphasis.radius_factor();
        let alpha = if !dimmed || emphasis != Emphasis::Normal {
            1.0
        } else {
            FADED_ALPHA
        };
        let glow = emphasis
            .shells()
            .iter()
            .map(|&(scale, a)| GlowShell {
                radius: radius * scale,
                alpha: a,
            })
            .collect();
        let label = style.show_labels.then(|| {
            let tour = emphasis == Emphasis::TourTarget;
            LabelStyle {
                text: node.name.clone(),
                size: if tour { 18.0 } else { 12.0 },
                alpha: if tour { 1.0 } else { 0.75 * alpha.max(0.3) },
            }
        });

        nodes.push(NodeVisual {
            id: node.id.clone(),
            position,
            radius,
            color: node_color(node),
            alpha,
            emphasis,
            emissive: emphasis.emissive(),
            glow,
            label,
        });
    }

    let links = visible
        .links
        .iter()
        .filter(|l| positions.contains_key(&l.source) && positions.contains_key(&l.target))
        .map(|l| link_visual(l, view))
        .collect();

    Ok(SceneDescription { nodes, links })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::filter::visible_subgraph;
    use graphaura_core::NodeType;
    use std::collections::HashSet;

    fn fixture() -> (VisibleSubgraph, HashMap<NodeId, Vec3>) {
        let mut heavy = Node::new("b", "Birthday", NodeType::Event);
        heavy.weight = 4.0;
        let nodes = vec![
            Node::new("a", "Alice", NodeType::Person),
            heavy,
            Node::new("c", "Cafe", NodeType::Location),
        ];
        let links = vec![Link::new("a", "b", "ATTENDED"), Link::new("b", "c", "HELD_AT")];
        let vis = visible_subgraph(&nodes, &links, None, "");
        let positions = [
            ("a", Vec3::new(1.0, 0.0, 0.0)),
            ("b", Vec3::new(0.0, 2.0, 0.0)),
            ("c", Vec3::new(0.0, 0.0, 3.0)),
        ]
        .into_iter()
        .map(|(id, p)| (NodeId::from(id), p))
        .collect();
        (vis, positions)
    }

    fn scene(view: &ViewState) -> SceneDescription {
        let (vis, pos) = fixture();
        build_scene(&vis, view, &pos, SceneStyle::default()).expect("scene")
    }

    #[test]
    fn size_follows_weight() {
        let s = scene(&ViewState::default());
        let a = s.node(&"a".into()).expect("a");
        let b = s.node(&"b".into()).expect("b");
        assert!((b.radius / a.radius - 4.0).abs() < 1e-5);
        assert_eq!(a.color, Color::from(Srgba::hex("#3B82F6").expect("hex")));
    }

    #[test]
    fn no_highlight_means_everything_opaque() {
        let s = scene(&ViewState::default());
        assert!(s.nodes.iter().all(|n| n.alpha == 1.0 && n.glow.is_empty()));
        assert!(s.links.iter().all(|l| !l.highlighted && l.particles == 0));
    }

    #[test]
    fn highlight_fades_the_rest() {
        let view = ViewState {
            hovered: Some("a".into()),
            highlighted_nodes: HashSet::from([NodeId::from("a"), NodeId::from("b")]),
            highlighted_links: HashSet::from([LinkId("a-b".into())]),
            ..Default::default()
        };
        let s = scene(&view);
        assert_eq!(s.node(&"a".into()).map(|n| n.emphasis), Some(Emphasis::Hovered));
        assert_eq!(s.node(&"b".into()).map(|n| n.alpha), Some(1.0));
        assert_eq!(s.node(&"c".into()).map(|n| n.alpha), Some(FADED_ALPHA));

        let ab = s.links.iter().find(|l| l.id.0 == "a-b").expect("a-b");
        let bc = s.links.iter().find(|l| l.id.0 == "b-c").expect("b-c");
        assert!(ab.highlighted && ab.width > bc.width && ab.particles > bc.particles);
        assert_ne!(ab.color, bc.color);
    }

    #[test]
    fn tour_target_glows_hardest() {
        let view = ViewState {
            selected: Some("a".into()),
            hovered: Some("b".into()),
            tour_target: Some("c".into()),
            ..Default::default()
        };
        let s = scene(&view);
        let sel = s.node(&"a".into()).expect("a");
        let hov = s.node(&"b".into()).expect("b");
        let tour = s.node(&"c".into()).expect("c");

        assert_eq!(tour.emphasis, Emphasis::TourTarget);
        assert!(tour.glow.len() > sel.glow.len());
        assert!(tour.glow[0].alpha > sel.glow[0].alpha);
        assert!(sel.glow[0].alpha > hov.glow[0].alpha);
        assert!(tour.emissive > sel.emissive);

        let label = tour.label.as_ref().expect("label");
        assert_eq!(label.size, 18.0);
        assert!(sel.label.as_ref().map_or(false, |l| l.size < label.size));
    }

    #[test]
    fn tour_beats_selection_on_same_node() {
        let view = ViewState {
            selected: Some("a".into()),
            tour_target: Some("a".into()),
            ..Default::default()
        };
        assert_eq!(emphasis_of(&view, &"a".into()), Emphasis::TourTarget);
    }

    #[test]
    fn unplaced_nodes_and_their_links_are_skipped() {
        let (vis, mut pos) = fixture();
        pos.remove(&NodeId::from("c"));
        let s = build_scene(&vis, &ViewState::default(), &pos, SceneStyle::default()).expect("scene");
        assert_eq!(s.nodes.len(), 2);
        assert_eq!(s.links.len(), 1);
    }

    #[test]
    fn non_finite_position_is_an_error() {
        let (vis, mut pos) = fixture();
        pos.insert("b".into(), Vec3::new(f32::NAN, 0.0, 0.0));
        let err = build_scene(&vis, &ViewState::default(), &pos, SceneStyle::default());
        assert_eq!(err, Err(SceneError::NonFinitePosition("b".into())));
    }

    #[test]
    fn empty_subgraph_is_an_empty_scene() {
        let s = build_scene(
            &VisibleSubgraph::default(),
            &ViewState::default(),
            &HashMap::new(),
            SceneStyle::default(),
        )
        .expect("scene");
        assert!(s.nodes.is_empty() && s.links.is_empty());
    }

    #[test]
    fn labels_can_be_turned_off() {
        let (vis, pos) = fixture();
        let style = SceneStyle {
            show_labels: false,
            ..SceneStyle::default()
        };
        let s = build_scene(&vis, &ViewState::default(), &pos, style).expect("scene");
        assert!(s.nodes.iter().all(|n| n.label.is_none()));
    }
}
