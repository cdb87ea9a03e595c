use std::f32::consts::TAU;

use derivative::Derivative;
use egui::{Pos2, Vec2, vec2};
use gv_core::graph::{Graph, NodeId};
use indexmap::IndexMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("No node `{0}` in the layout")]
    UnknownNode(NodeId),
}

/// Parameters of the spring-electrical simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Repulsion constant `c` in `c / d²` between every pair of nodes.
    pub force_charge: f32,
    /// Spring stiffness along edges.
    pub force_spring: f32,
    pub rest_length: f32,
    /// Pull towards the origin, proportional to the distance from it.
    pub force_center: f32,
    /// Fraction of velocity kept from one tick to the next.
    pub damping_factor: f32,
    pub time_step: f32,
    /// Cap on the length of the net force on a node.
    pub force_max: f32,
    /// Distances below this are treated as this when computing repulsion.
    pub min_distance: f32,
    /// Cap on how far a node moves in one tick.
    pub max_displacement: f32,
    /// The layout is stable once both the total displacement of a tick and the total net force
    /// times the time step drop below this.
    pub convergence_threshold: f32,
    /// Half-width of the square in which new nodes are scattered around their anchor. Negative or
    /// non-finite values place new nodes exactly on their anchor.
    pub jitter: f32,
    pub seed: u64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        LayoutSettings {
            force_charge: 1.0,
            force_spring: 1.0,
            rest_length: 1.0,
            force_center: 0.05,
            damping_factor: 0.9,
            time_step: 0.1,
            force_max: 10.0,
            min_distance: 0.01,
            max_displacement: 1.0,
            convergence_threshold: 0.01,
            jitter: 0.5,
            seed: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Body {
    position: Pos2,
    velocity: Vec2,
    pinned: bool,
}

impl Body {
    fn at(position: Pos2) -> Self {
        Body {
            position,
            velocity: Vec2::ZERO,
            pinned: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LayoutSnapshot {
    pub positions: IndexMap<NodeId, Pos2>,
    /// Number of ticks since the layout was created.
    pub settle_counter: u64,
    pub stable: bool,
    /// Total distance moved by all nodes during the last tick.
    pub displacement: f32,
}

fn centroid(points: impl IntoIterator<Item = Pos2>) -> Pos2 {
    let (sum, count) = points
        .into_iter()
        .fold((Vec2::ZERO, 0.0_f32), |(sum, count), point| {
            (sum + point.to_vec2(), count + 1.0)
        });
    if count == 0.0 {
        Pos2::ZERO
    } else {
        (sum / count).to_pos2()
    }
}

fn clamp_length(vector: Vec2, max: f32) -> Vec2 {
    let length = vector.length();
    if length > max {
        vector * (max / length)
    } else {
        vector
    }
}

/// Incremental force-directed layout.
///
/// Every pair of nodes repels, every edge acts as a spring towards its rest length and a weak
/// force pulls everything towards the origin. The seeded generator is only consulted to place new
/// nodes and to separate nodes that coincide exactly, so runs from the same state are identical.
/// A tick costs `O(n² + e)`.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ForceLayout {
    settings: LayoutSettings,
    bodies: IndexMap<NodeId, Body>,
    springs: Vec<(NodeId, NodeId)>,
    #[derivative(Debug = "ignore")]
    rng: ChaCha8Rng,
    settle_counter: u64,
    displacement: f32,
    stable: bool,
}

impl ForceLayout {
    #[must_use]
    pub fn new(settings: LayoutSettings) -> Self {
        ForceLayout {
            rng: ChaCha8Rng::seed_from_u64(settings.seed),
            settings,
            bodies: IndexMap::new(),
            springs: vec![],
            settle_counter: 0,
            displacement: 0.0,
            stable: false,
        }
    }

    #[must_use]
    pub fn from_graph(graph: &Graph, settings: LayoutSettings) -> Self {
        let mut layout = Self::new(settings);
        layout.on_graph_changed(graph);
        layout
    }

    #[must_use]
    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    /// Brings the layout in line with `graph` after a mutation.
    ///
    /// Surviving nodes keep their positions and pins. A new node starts at its stored position if
    /// it has one, and otherwise near the centroid of its already placed neighbours, or of the
    /// whole layout if it has none.
    pub fn on_graph_changed(&mut self, graph: &Graph) {
        let mut previous = std::mem::take(&mut self.bodies);
        self.bodies = graph
            .nodes()
            .filter_map(|node| Some((node.id, previous.swap_remove(&node.id)?)))
            .collect();
        let removed = previous.len();

        let mut added = 0;
        for node in graph.nodes() {
            if self.bodies.contains_key(&node.id) {
                continue;
            }
            let position = match node.position {
                Some(position) => position,
                None => self.place(graph, node.id),
            };
            trace!("Placing {} at {position:?}", node.id);
            self.bodies.insert(node.id, Body::at(position));
            added += 1;
        }

        self.springs = graph
            .edges()
            .filter(|edge| !edge.is_loop())
            .map(|edge| (edge.source, edge.target))
            .collect();
        self.stable = false;
        debug!(
            "Layout updated: {added} nodes placed, {removed} dropped, {} springs",
            self.springs.len()
        );
    }

    fn place(&mut self, graph: &Graph, node: NodeId) -> Pos2 {
        let anchors: Vec<Pos2> = graph
            .incident(node)
            .into_iter()
            .flatten()
            .filter_map(|(other, _)| self.bodies.get(&other))
            .map(|body| body.position)
            .collect();
        let anchor = if anchors.is_empty() {
            centroid(self.bodies.values().map(|body| body.position))
        } else {
            centroid(anchors)
        };
        let jitter = match self.settings.jitter {
            jitter if jitter.is_finite() => jitter.max(0.0),
            _ => 0.0,
        };
        anchor
            + vec2(
                self.rng.gen_range(-jitter..=jitter),
                self.rng.gen_range(-jitter..=jitter),
            )
    }

    fn random_direction(&mut self) -> Vec2 {
        Vec2::angled(self.rng.gen_range(0.0..TAU))
    }

    /// Advances the simulation by one step.
    pub fn tick(&mut self) -> LayoutSnapshot {
        let positions: Vec<Pos2> = self.bodies.values().map(|body| body.position).collect();
        let mut forces = vec![Vec2::ZERO; positions.len()];
        let LayoutSettings {
            force_charge,
            force_spring,
            rest_length,
            force_center,
            damping_factor,
            time_step,
            force_max,
            min_distance,
            max_displacement,
            convergence_threshold,
            ..
        } = self.settings;

        for i in 0..positions.len() {
            for j in (i + 1)..positions.len() {
                let delta = positions[i] - positions[j];
                let distance = delta.length();
                let direction = if distance > 0.0 {
                    delta / distance
                } else {
                    self.random_direction()
                };
                let distance = distance.max(min_distance);
                let push = direction * (force_charge / (distance * distance)).min(force_max);
                forces[i] += push;
                forces[j] -= push;
            }
        }

        for (source, target) in &self.springs {
            let (Some(i), Some(j)) = (
                self.bodies.get_index_of(source),
                self.bodies.get_index_of(target),
            ) else {
                continue;
            };
            let delta = positions[j] - positions[i];
            let distance = delta.length();
            if distance <= 0.0 {
                continue;
            }
            let pull = delta / distance * (force_spring * (distance - rest_length));
            forces[i] += pull;
            forces[j] -= pull;
        }

        let mut displacement = 0.0;
        let mut residual = 0.0;
        for (body, force) in self.bodies.values_mut().zip(forces) {
            if body.pinned {
                body.velocity = Vec2::ZERO;
                continue;
            }
            let force = clamp_length(force - body.position.to_vec2() * force_center, force_max);
            residual += force.length();
            body.velocity = (body.velocity + force * time_step) * damping_factor;
            let step = clamp_length(body.velocity * time_step, max_displacement);
            body.position += step;
            displacement += step.length();
        }

        self.settle_counter += 1;
        self.displacement = displacement;
        // Bodies start at rest, so a small step alone does not mean equilibrium.
        let stable =
            displacement < convergence_threshold && residual * time_step < convergence_threshold;
        if stable && !self.stable {
            debug!(
                "Layout settled after {} ticks (displacement {displacement})",
                self.settle_counter
            );
        }
        self.stable = stable;
        self.snapshot()
    }

    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.stable
    }

    #[must_use]
    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            positions: self.positions().collect(),
            settle_counter: self.settle_counter,
            stable: self.stable,
            displacement: self.displacement,
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = (NodeId, Pos2)> + '_ {
        self.bodies.iter().map(|(id, body)| (*id, body.position))
    }

    #[must_use]
    pub fn position(&self, node: NodeId) -> Option<Pos2> {
        self.bodies.get(&node).map(|body| body.position)
    }

    #[must_use]
    pub fn is_pinned(&self, node: NodeId) -> bool {
        self.bodies.get(&node).is_some_and(|body| body.pinned)
    }

    fn body_mut(&mut self, node: NodeId) -> Result<&mut Body, LayoutError> {
        self.bodies
            .get_mut(&node)
            .ok_or(LayoutError::UnknownNode(node))
    }

    /// Fixes a node at `position` until [`ForceLayout::unpin`] is called.
    ///
    /// # Errors
    ///
    /// Fails if the node is not part of the layout.
    pub fn pin(&mut self, node: NodeId, position: Pos2) -> Result<(), LayoutError> {
        let body = self.body_mut(node)?;
        body.position = position;
        body.velocity = Vec2::ZERO;
        body.pinned = true;
        self.stable = false;
        Ok(())
    }

    /// # Errors
    ///
    /// Fails if the node is not part of the layout.
    pub fn unpin(&mut self, node: NodeId) -> Result<(), LayoutError> {
        self.body_mut(node)?.pinned = false;
        self.stable = false;
        Ok(())
    }

    /// Scatters every unpinned node evenly on a circle around the origin and restarts the
    /// simulation from rest.
    pub fn reset(&mut self) {
        let count = self.bodies.values().filter(|body| !body.pinned).count();
        #[allow(clippy::cast_precision_loss)]
        let (radius, step) = {
            let count = count as f32;
            (
                (self.settings.rest_length * count / TAU).max(self.settings.rest_length),
                TAU / count.max(1.0),
            )
        };
        for (i, body) in self
            .bodies
            .values_mut()
            .filter(|body| !body.pinned)
            .enumerate()
        {
            #[allow(clippy::cast_precision_loss)]
            let angle = step * i as f32;
            body.position = (Vec2::angled(angle) * radius).to_pos2();
            body.velocity = Vec2::ZERO;
        }
        self.stable = false;
        debug!("Layout reset on a circle of radius {radius}");
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use egui::pos2;
    use gv_core::graph::Graph;
    use rstest::rstest;

    use super::{ForceLayout, LayoutSettings};

    fn path(length: usize) -> Result<Graph> {
        let mut graph = Graph::undirected();
        let mut previous = graph.add_node("0");
        for i in 1..length {
            let next = graph.add_node(i.to_string());
            graph.add_edge(previous, next, None)?;
            previous = next;
        }
        Ok(graph)
    }

    #[test]
    fn ticks_are_deterministic() -> Result<()> {
        let graph = path(8)?;
        let mut first = ForceLayout::from_graph(&graph, LayoutSettings::default());
        let mut second = ForceLayout::from_graph(&graph, LayoutSettings::default());
        for _ in 0..100 {
            assert_eq!(first.tick(), second.tick());
        }
        Ok(())
    }

    #[test]
    fn different_seeds_place_differently() -> Result<()> {
        let graph = path(3)?;
        let first = ForceLayout::from_graph(&graph, LayoutSettings::default());
        let second = ForceLayout::from_graph(
            &graph,
            LayoutSettings {
                seed: 7,
                ..LayoutSettings::default()
            },
        );
        assert_ne!(first.snapshot().positions, second.snapshot().positions);
        Ok(())
    }

    #[test]
    fn coincident_nodes_are_separated() {
        let mut graph = Graph::undirected();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        graph.set_position(a, Some(pos2(1.0, 1.0))).unwrap();
        graph.set_position(b, Some(pos2(1.0, 1.0))).unwrap();
        let mut layout = ForceLayout::from_graph(&graph, LayoutSettings::default());
        let snapshot = layout.tick();
        let (pa, pb) = (snapshot.positions[&a], snapshot.positions[&b]);
        assert!(pa.x.is_finite() && pa.y.is_finite());
        assert!(pb.x.is_finite() && pb.y.is_finite());
        assert!(pa.distance(pb) > 0.0);
    }

    #[test]
    fn pinned_nodes_stay_put() -> Result<()> {
        let graph = path(4)?;
        let mut layout = ForceLayout::from_graph(&graph, LayoutSettings::default());
        let pinned = graph.find_label("2").unwrap();
        layout.pin(pinned, pos2(5.0, -5.0))?;
        for _ in 0..200 {
            layout.tick();
        }
        assert_eq!(layout.position(pinned), Some(pos2(5.0, -5.0)));
        assert!(layout.is_pinned(pinned));
        layout.unpin(pinned)?;
        layout.tick();
        assert_ne!(layout.position(pinned), Some(pos2(5.0, -5.0)));
        Ok(())
    }

    #[test]
    fn lone_self_loop_is_at_rest() -> Result<()> {
        let mut graph = Graph::directed();
        let a = graph.add_node("a");
        graph.add_edge(a, a, None)?;
        graph.set_position(a, Some(pos2(0.0, 0.0)))?;
        let mut layout = ForceLayout::from_graph(&graph, LayoutSettings::default());
        let snapshot = layout.tick();
        assert!(snapshot.stable);
        assert_eq!(snapshot.positions[&a], pos2(0.0, 0.0));
        Ok(())
    }

    #[test]
    fn first_tick_from_rest_is_not_stable() -> Result<()> {
        let mut graph = Graph::undirected();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        graph.set_position(a, Some(pos2(0.0, 0.0)))?;
        graph.set_position(b, Some(pos2(3.0, 0.0)))?;
        let mut layout = ForceLayout::from_graph(&graph, LayoutSettings::default());

        let first = layout.tick();
        assert!(first.displacement < layout.settings().convergence_threshold);
        assert!(!first.stable);

        let mut snapshot = first;
        while !snapshot.stable && snapshot.settle_counter < 10_000 {
            snapshot = layout.tick();
        }
        assert!(snapshot.stable);
        assert!(snapshot.settle_counter > 1);
        let (pa, pb) = (snapshot.positions[&a], snapshot.positions[&b]);
        assert!(pa.x < pb.x, "{pa:?} {pb:?}");
        Ok(())
    }

    #[rstest]
    #[case(-1.0)]
    #[case(f32::NAN)]
    #[case(f32::INFINITY)]
    fn unusable_jitter_places_on_the_anchor(#[case] jitter: f32) -> Result<()> {
        let graph = path(3)?;
        let layout = ForceLayout::from_graph(
            &graph,
            LayoutSettings {
                jitter,
                ..LayoutSettings::default()
            },
        );
        let positions: Vec<_> = layout.positions().map(|(_, position)| position).collect();
        assert_eq!(positions.len(), 3);
        assert!(positions.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
        Ok(())
    }

    #[test]
    fn new_nodes_start_near_their_neighbours() -> Result<()> {
        let mut graph = path(5)?;
        let settings = LayoutSettings::default();
        let mut layout = ForceLayout::from_graph(&graph, settings.clone());
        for _ in 0..50 {
            layout.tick();
        }
        let before = layout.snapshot().positions;

        let anchor = graph.find_label("4").unwrap();
        let leaf = graph.add_node("leaf");
        graph.add_edge(anchor, leaf, None)?;
        layout.on_graph_changed(&graph);

        assert!(!layout.is_stable());
        for (id, position) in &before {
            assert_eq!(layout.position(*id), Some(*position));
        }
        let offset = layout.position(leaf).unwrap() - before[&anchor];
        assert!(offset.x.abs() <= settings.jitter && offset.y.abs() <= settings.jitter);
        Ok(())
    }

    #[test]
    fn removed_nodes_leave_the_layout() -> Result<()> {
        let mut graph = path(3)?;
        let mut layout = ForceLayout::from_graph(&graph, LayoutSettings::default());
        let middle = graph.find_label("1").unwrap();
        graph.remove_node(middle)?;
        layout.on_graph_changed(&graph);
        assert_eq!(layout.position(middle), None);
        assert_eq!(layout.tick().positions.len(), 2);
        Ok(())
    }

    #[test]
    fn reset_places_nodes_on_a_circle() -> Result<()> {
        let graph = path(6)?;
        let mut layout = ForceLayout::from_graph(&graph, LayoutSettings::default());
        layout.reset();
        let radii: Vec<f32> = layout
            .positions()
            .map(|(_, position)| position.to_vec2().length())
            .collect();
        assert!(radii.iter().all(|radius| (radius - radii[0]).abs() < 1e-4));
        Ok(())
    }
}
