use bevy::prelude::{Resource, Vec3};
use graphaura_core::{Node, NodeId, NodeType};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::time::Duration;

pub const DEFAULT_ROTATION: [NodeType; 3] =
    [NodeType::Person, NodeType::Event, NodeType::Location];
pub const MAX_STOPS: usize = 15;

/// Builds the ordered stop list for one tour.
///
/// The first stop is any node. Every following slot asks for the next type
/// in `rotation` and takes a random node of that type not visited yet; a
/// slot whose type is exhausted is skipped, so the path can come out short.
pub fn plan_tour<R: Rng + ?Sized>(
    nodes: &[Node],
    rotation: &[NodeType],
    max_stops: usize,
    rng: &mut R,
) -> Vec<NodeId> {
    let Some(first) = nodes.choose(rng) else {
        return Vec::new();
    };
    if max_stops == 0 {
        return Vec::new();
    }

    let mut visited: HashSet<&NodeId> = HashSet::from([&first.id]);
    let mut path = vec![first.id.clone()];
    if rotation.is_empty() {
        return path;
    }

    for slot in 0..max_stops - 1 {
        let due = rotation[slot % rotation.len()];
        let candidates: Vec<&Node> = nodes
            .iter()
            .filter(|n| n.node_type == due && !visited.contains(&n.id))
            .collect();
        if let Some(&pick) = candidates.choose(rng) {
            visited.insert(&pick.id);
            path.push(pick.id.clone());
        }
    }
    path
}

#[derive(Debug, Clone, PartialEq)]
pub struct TourSettings {
    pub max_stops: usize,
    pub rotation: Vec<NodeType>,
    /// Per-axis camera offset bound, in world units.
    pub jitter: f32,
    /// Camera flight time band, seconds.
    pub flight_secs: (f32, f32),
    /// Extra time spent at a stop after arriving, seconds.
    pub dwell_secs: (f32, f32),
}

impl Default for TourSettings {
    fn default() -> Self {
        Self {
            max_stops: MAX_STOPS,
            rotation: DEFAULT_ROTATION.to_vec(),
            jitter: 4.0,
            flight_secs: (1.6, 2.6),
            dwell_secs: (1.2, 2.4),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TourStop {
    pub id: NodeId,
    pub index: usize,
    pub jitter: Vec3,
    pub flight: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TourTick {
    Idle,
    Waiting,
    Visit(TourStop),
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    Running {
        path: Vec<NodeId>,
        next: usize,
        wait: Duration,
    },
}

/// Time-driven stepping over a planned path. Time comes in through
/// [`GuidedTour::tick`], so the state machine runs without a renderer.
#[derive(Resource)]
pub struct GuidedTour {
    settings: TourSettings,
    phase: Phase,
    rng: StdRng,
}

impl Default for GuidedTour {
    fn default() -> Self {
        Self::new(TourSettings::default())
    }
}

fn sample_secs(rng: &mut StdRng, (a, b): (f32, f32)) -> Duration {
    let (lo, hi) = (a.min(b).max(0.0), a.max(b).max(0.0));
    Duration::from_secs_f32(rng.gen_range(lo..=hi))
}

impl GuidedTour {
    pub fn new(settings: TourSettings) -> Self {
        Self {
            settings,
            phase: Phase::Idle,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(settings: TourSettings, seed: u64) -> Self {
        Self {
            settings,
            phase: Phase::Idle,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running { .. })
    }

    /// (stops started, total stops) while running.
    pub fn progress(&self) -> Option<(usize, usize)> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Running { path, next, .. } => Some((*next, path.len())),
        }
    }

    /// Plans and starts a tour. Ignored while one is already running.
    pub fn start(&mut self, nodes: &[Node]) -> bool {
        if self.is_running() {
            tracing::debug!("tour already running, ignoring trigger");
            return false;
        }
        let path = plan_tour(
            nodes,
            &self.settings.rotation,
            self.settings.max_stops,
            &mut self.rng,
        );
        if path.is_empty() {
            return false;
        }
        tracing::info!(stops = path.len(), "guided tour started");
        self.phase = Phase::Running {
            path,
            next: 0,
            wait: Duration::ZERO,
        };
        true
    }

    /// Advances the tour by `dt`. Stops whose node no longer passes `exists`
    /// are skipped without waiting.
    pub fn tick(&mut self, dt: Duration, exists: impl Fn(&NodeId) -> bool) -> TourTick {
        let Self {
            settings,
            phase,
            rng,
        } = self;
        let Phase::Running { path, next, wait } = phase else {
            return TourTick::Idle;
        };
        if *wait > dt {
            *wait -= dt;
            return TourTick::Waiting;
        }

        while *next < path.len() {
            let index = *next;
            *next += 1;
            let id = path[index].clone();
            if !exists(&id) {
                tracing::debug!(%id, "tour stop vanished, skipping");
                continue;
            }
            let j = settings.jitter.abs();
            let jitter = if j > 0.0 {
                Vec3::new(
                    rng.gen_range(-j..=j),
                    rng.gen_range(-j..=j),
                    rng.gen_range(-j..=j),
                )
            } else {
                Vec3::ZERO
            };
            let flight = sample_secs(rng, settings.flight_secs);
            *wait = flight + sample_secs(rng, settings.dwell_secs);
            return TourTick::Visit(TourStop {
                id,
                index,
                jitter,
                flight,
            });
        }

        *phase = Phase::Idle;
        tracing::info!("guided tour finished");
        TourTick::Finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(persons: usize, events: usize, locations: usize) -> Vec<Node> {
        let mut out = Vec::new();
        for i in 0..persons {
            out.push(Node::new(format!("p{i}"), format!("P{i}"), NodeType::Person));
        }
        for i in 0..events {
            out.push(Node::new(format!("e{i}"), format!("E{i}"), NodeType::Event));
        }
        for i in 0..locations {
            out.push(Node::new(format!("l{i}"), format!("L{i}"), NodeType::Location));
        }
        out
    }

    fn no_duplicates(path: &[NodeId]) -> bool {
        path.iter().collect::<HashSet<_>>().len() == path.len()
    }

    #[test]
    fn paths_are_unique_and_capped() {
        for seed in 0..200 {
            let mut rng = StdRng::seed_from_u64(seed);
            let sizes = (seed as usize % 9, seed as usize % 5, seed as usize % 13);
            let mut nodes = graph(sizes.0, sizes.1, sizes.2);
            nodes.push(Node::new("j", "Journal", NodeType::JournalEntry));

            let path = plan_tour(&nodes, &DEFAULT_ROTATION, MAX_STOPS, &mut rng);
            assert!(!path.is_empty());
            assert!(path.len() <= MAX_STOPS);
            assert!(no_duplicates(&path));
        }
    }

    #[test]
    fn large_graph_fills_every_slot_in_rotation() {
        let nodes = graph(10, 10, 10);
        let mut rng = StdRng::seed_from_u64(3);
        let path = plan_tour(&nodes, &DEFAULT_ROTATION, MAX_STOPS, &mut rng);
        assert_eq!(path.len(), MAX_STOPS);
        let types: Vec<char> = path[1..]
            .iter()
            .map(|id| id.as_str().chars().next().unwrap_or('?'))
            .collect();
        assert_eq!(&types[..3], &['p', 'e', 'l']);
    }

    #[test]
    fn exhausted_types_shorten_the_path() {
        let nodes = graph(2, 0, 0);
        let mut rng = StdRng::seed_from_u64(9);
        let path = plan_tour(&nodes, &DEFAULT_ROTATION, MAX_STOPS, &mut rng);
        assert_eq!(path.len(), 2);
        assert!(no_duplicates(&path));
    }

    #[test]
    fn single_node_tour_has_one_stop_and_ends() {
        let nodes = vec![Node::new("only", "Only", NodeType::Other)];
        let mut tour = GuidedTour::with_seed(TourSettings::default(), 1);
        assert!(tour.start(&nodes));
        assert_eq!(tour.progress(), Some((0, 1)));

        let TourTick::Visit(stop) = tour.tick(Duration::ZERO, |_| true) else {
            panic!("expected first stop");
        };
        assert_eq!(stop.id, NodeId::from("only"));
        assert!(stop.jitter.abs().max_element() <= 4.0);

        assert_eq!(tour.tick(Duration::from_millis(10), |_| true), TourTick::Waiting);
        assert_eq!(tour.tick(Duration::from_secs(60), |_| true), TourTick::Finished);
        assert!(!tour.is_running());
        assert_eq!(tour.tick(Duration::from_secs(1), |_| true), TourTick::Idle);
    }

    #[test]
    fn retrigger_while_running_is_ignored() {
        let nodes = graph(3, 3, 3);
        let mut tour = GuidedTour::with_seed(TourSettings::default(), 5);
        assert!(tour.start(&nodes));
        let before = tour.progress();
        assert!(!tour.start(&nodes));
        assert_eq!(tour.progress(), before);
    }

    #[test]
    fn empty_graph_does_not_start() {
        let mut tour = GuidedTour::with_seed(TourSettings::default(), 5);
        assert!(!tour.start(&[]));
        assert!(!tour.is_running());
    }

    #[test]
    fn vanished_stops_are_skipped() {
        let nodes = graph(4, 4, 4);
        let mut tour = GuidedTour::with_seed(TourSettings::default(), 8);
        assert!(tour.start(&nodes));
        let (_, total) = tour.progress().unwrap_or_default();

        let mut visited = Vec::new();
        loop {
            match tour.tick(Duration::from_secs(10), |id| !id.as_str().starts_with('e')) {
                TourTick::Visit(stop) => visited.push(stop.id),
                TourTick::Finished => break,
                TourTick::Waiting | TourTick::Idle => {}
            }
        }
        assert!(visited.iter().all(|id| !id.as_str().starts_with('e')));
        assert!(visited.len() <= total);
        assert!(no_duplicates(&visited));
    }

    #[test]
    fn stops_respect_timing_bands() {
        let nodes = graph(5, 5, 5);
        let settings = TourSettings::default();
        let mut tour = GuidedTour::with_seed(settings.clone(), 13);
        tour.start(&nodes);
        let TourTick::Visit(stop) = tour.tick(Duration::ZERO, |_| true) else {
            panic!("expected a stop");
        };
        let secs = stop.flight.as_secs_f32();
        assert!(secs >= settings.flight_secs.0 - 1e-3 && secs <= settings.flight_secs.1 + 1e-3);
        // still waiting right after the flight would have ended
        assert_eq!(tour.tick(stop.flight, |_| true), TourTick::Waiting);
    }
}
