use derive_more::Display;
use egui::{Color32, Pos2, Rect, Vec2};
use gv_core::{
    algorithm::{AlgorithmKind, Event, Status},
    graph::{DEFAULT_WEIGHT, EdgeId, Graph, NodeId, Style},
};
use indexmap::IndexMap;

use crate::{common::MARGIN, layout::ForceLayout};

/// How an algorithm run has marked a node or edge so far.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display)]
pub enum Highlight {
    #[default]
    #[display("none")]
    None,
    #[display("visited")]
    Visited,
    #[display("finished")]
    Finished,
    #[display("relaxed")]
    Relaxed,
    #[display("tree")]
    Tree,
    #[display("discarded")]
    Discarded,
    #[display("path")]
    Path,
}

impl Highlight {
    /// `None` for elements drawn in their own style.
    #[must_use]
    pub fn color(self) -> Option<Color32> {
        match self {
            Self::None => None,
            Self::Visited => Some(Color32::from_rgb(0xff, 0xc1, 0x07)),
            Self::Finished => Some(Color32::from_rgb(0x9e, 0x9e, 0x9e)),
            Self::Relaxed => Some(Color32::from_rgb(0x21, 0x96, 0xf3)),
            Self::Tree => Some(Color32::from_rgb(0x4c, 0xaf, 0x50)),
            Self::Discarded => Some(Color32::from_rgb(0xe0, 0xe0, 0xe0)),
            Self::Path => Some(Color32::from_rgb(0xe9, 0x1e, 0x63)),
        }
    }

    /// Tree and path marks are never overwritten by later edge examinations.
    fn is_final(self) -> bool {
        matches!(self, Self::Tree | Self::Path)
    }
}

/// Highlights obtained by folding a prefix of an event sequence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HighlightState {
    nodes: IndexMap<NodeId, Highlight>,
    edges: IndexMap<EdgeId, Highlight>,
    annotations: IndexMap<NodeId, f64>,
    complete: bool,
    applied: usize,
}

impl HighlightState {
    pub fn apply(&mut self, event: &Event) {
        self.applied += 1;
        match event {
            Event::NodeVisited { node, via, value } => {
                self.nodes.insert(*node, Highlight::Visited);
                if let Some(via) = via {
                    self.edges.insert(*via, Highlight::Tree);
                }
                self.annotate(*node, *value);
            }
            Event::NodeFinished { node, value } => {
                self.nodes.insert(*node, Highlight::Finished);
                self.annotate(*node, *value);
            }
            Event::EdgeRelaxed { edge, to, value, .. } => {
                self.mark_edge(*edge, Highlight::Relaxed);
                self.annotate(*to, *value);
            }
            Event::EdgeDiscarded { edge, .. } => self.mark_edge(*edge, Highlight::Discarded),
            Event::PathFound { nodes, edges, .. } => {
                for node in nodes {
                    self.nodes.insert(*node, Highlight::Path);
                }
                for edge in edges {
                    self.edges.insert(*edge, Highlight::Path);
                }
            }
            Event::Complete => self.complete = true,
        }
    }

    fn mark_edge(&mut self, edge: EdgeId, highlight: Highlight) {
        let current = self.edges.entry(edge).or_default();
        if !current.is_final() {
            *current = highlight;
        }
    }

    fn annotate(&mut self, node: NodeId, value: Option<f64>) {
        if let Some(value) = value {
            self.annotations.insert(node, value);
        }
    }

    #[must_use]
    pub fn node(&self, node: NodeId) -> Highlight {
        self.nodes.get(&node).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn edge(&self, edge: EdgeId) -> Highlight {
        self.edges.get(&edge).copied().unwrap_or_default()
    }

    /// The latest scalar reported for a node, such as its tentative distance.
    #[must_use]
    pub fn annotation(&self, node: NodeId) -> Option<f64> {
        self.annotations.get(&node).copied()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Number of events folded in.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.applied
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeDraw {
    pub id: NodeId,
    pub position: Pos2,
    pub label: String,
    pub style: Style,
    pub highlight: Highlight,
    pub annotation: Option<f64>,
    pub enabled: bool,
    pub pinned: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EdgeDraw {
    pub id: EdgeId,
    pub from: Pos2,
    pub to: Pos2,
    /// Present for weights other than the default.
    pub weight_label: Option<String>,
    pub directed: bool,
    pub highlight: Highlight,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunView {
    pub kind: AlgorithmKind,
    pub status: Status,
    /// Events currently reflected in the highlights.
    pub position: usize,
    /// Events recorded so far.
    pub recorded: usize,
    pub paused: bool,
}

/// Everything a renderer needs for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewModel {
    pub nodes: Vec<NodeDraw>,
    /// Edges between enabled nodes.
    pub edges: Vec<EdgeDraw>,
    /// Smallest rectangle containing every node, grown by a margin.
    pub bounds: Rect,
    pub stable: bool,
    pub run: Option<RunView>,
}

impl ViewModel {
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn compose(
        graph: &Graph,
        layout: &ForceLayout,
        highlights: Option<&HighlightState>,
        run: Option<RunView>,
    ) -> Self {
        let position = |node: NodeId| layout.position(node).unwrap_or(Pos2::ZERO);
        let nodes: Vec<NodeDraw> = graph
            .nodes()
            .map(|node| NodeDraw {
                id: node.id,
                position: position(node.id),
                label: node.label.clone(),
                style: node.style,
                highlight: highlights.map(|h| h.node(node.id)).unwrap_or_default(),
                annotation: highlights.and_then(|h| h.annotation(node.id)),
                enabled: node.enabled,
                pinned: layout.is_pinned(node.id),
            })
            .collect();
        let edges = graph
            .enabled_edges()
            .map(|edge| EdgeDraw {
                id: edge.id,
                from: position(edge.source),
                to: position(edge.target),
                weight_label: (edge.weight != DEFAULT_WEIGHT).then(|| edge.weight.to_string()),
                directed: graph.is_directed(edge),
                highlight: highlights.map(|h| h.edge(edge.id)).unwrap_or_default(),
            })
            .collect();

        let bounds = if nodes.is_empty() {
            Rect::from_center_size(Pos2::ZERO, Vec2::ZERO)
        } else {
            let points: Vec<Pos2> = nodes.iter().map(|node| node.position).collect();
            Rect::from_points(&points)
        };

        ViewModel {
            nodes,
            edges,
            bounds: bounds.expand(MARGIN),
            stable: layout.is_stable(),
            run,
        }
    }
}
