use std::{cmp::Reverse, collections::VecDeque, fmt::Display};

use clap_derive::ValueEnum;
use derivative::Derivative;
use derive_more::Display;
use indexmap::IndexMap;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::graph::{EdgeId, Graph, GraphMode, NodeId};

mod shortest_path;
mod spanning_tree;
mod topological;
mod traversal;

use self::{
    shortest_path::Dijkstra,
    spanning_tree::{Kruskal, Prim},
    topological::Topological,
    traversal::{Bfs, Dfs},
};

#[derive(
    ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Hash, Display, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum AlgorithmKind {
    #[display("bfs")]
    Bfs,
    #[display("dfs")]
    Dfs,
    #[display("dijkstra")]
    Dijkstra,
    #[display("prim")]
    Prim,
    #[display("kruskal")]
    Kruskal,
    #[display("topological-sort")]
    TopologicalSort,
}

impl AlgorithmKind {
    /// The graph mode the algorithm insists on, if any.
    #[must_use]
    pub fn required_mode(self) -> Option<GraphMode> {
        match self {
            Self::Prim | Self::Kruskal => Some(GraphMode::Undirected),
            Self::TopologicalSort => Some(GraphMode::Directed),
            Self::Bfs | Self::Dfs | Self::Dijkstra => None,
        }
    }

    #[must_use]
    pub fn requires_non_negative_weights(self) -> bool {
        matches!(self, Self::Dijkstra | Self::Prim)
    }

    #[must_use]
    pub fn supports_target(self) -> bool {
        matches!(self, Self::Bfs | Self::Dfs | Self::Dijkstra)
    }
}

/// One unit of algorithmic progress.
///
/// The scalar `value` depends on the algorithm: the BFS depth, DFS timestamps, the tentative or
/// final distance for Dijkstra, the connecting weight for spanning trees, the position in a
/// topological order, or the remaining in-degree of a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum Event {
    NodeVisited {
        node: NodeId,
        via: Option<EdgeId>,
        value: Option<f64>,
    },
    NodeFinished {
        node: NodeId,
        value: Option<f64>,
    },
    EdgeRelaxed {
        edge: EdgeId,
        from: NodeId,
        to: NodeId,
        value: Option<f64>,
    },
    EdgeDiscarded {
        edge: EdgeId,
        from: NodeId,
        to: NodeId,
    },
    PathFound {
        target: NodeId,
        nodes: Vec<NodeId>,
        edges: Vec<EdgeId>,
        value: Option<f64>,
    },
    Complete,
}

struct Scalar(Option<f64>);

impl Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(value) => write!(f, " ({value})"),
            None => Ok(()),
        }
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NodeVisited { node, via, value } => {
                write!(f, "visit {node}")?;
                if let Some(via) = via {
                    write!(f, " via {via}")?;
                }
                write!(f, "{}", Scalar(*value))
            }
            Self::NodeFinished { node, value } => write!(f, "finish {node}{}", Scalar(*value)),
            Self::EdgeRelaxed {
                edge,
                from,
                to,
                value,
            } => write!(f, "relax {edge} {from}->{to}{}", Scalar(*value)),
            Self::EdgeDiscarded { edge, from, to } => write!(f, "discard {edge} {from}->{to}"),
            Self::PathFound {
                target,
                nodes,
                value,
                ..
            } => write!(
                f,
                "path {target} [{}]{}",
                nodes.iter().join(" "),
                Scalar(*value)
            ),
            Self::Complete => write!(f, "complete"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AlgorithmError {
    #[error("No such node `{0}`")]
    InvalidReference(NodeId),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("{kind} requires a {required} graph")]
    WrongGraphMode {
        kind: AlgorithmKind,
        required: GraphMode,
    },
    #[error("The algorithm has already completed")]
    AlreadyComplete,
    #[error("The algorithm was cancelled")]
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
pub enum Status {
    #[display("running")]
    Running,
    #[display("complete")]
    Complete,
    #[display("cancelled")]
    Cancelled,
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn scalar(count: usize) -> f64 {
    count as f64
}

/// Priority for queues that pop the smallest `(key, node)` first.
pub(crate) type MinKey = Reverse<(OrderedFloat<f64>, NodeId)>;

pub(crate) fn min_key(key: f64, node: NodeId) -> MinKey {
    Reverse((OrderedFloat(key), node))
}

/// A node whose edges are being examined one by one.
#[derive(Clone, Debug)]
pub(crate) struct Expansion {
    pub(crate) node: NodeId,
    pub(crate) pending: VecDeque<Adjacent>,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Adjacent {
    pub(crate) node: NodeId,
    pub(crate) edge: EdgeId,
    pub(crate) weight: f64,
}

impl Expansion {
    /// Edges that can be followed away from `node`, in adjacency order.
    pub(crate) fn neighbors(graph: &Graph, node: NodeId) -> Self {
        let pending = graph
            .neighbor_edges(node)
            .into_iter()
            .flatten()
            .map(|(other, edge)| Adjacent {
                node: other,
                edge: edge.id,
                weight: edge.weight,
            })
            .collect();
        Expansion { node, pending }
    }

    /// Every incident edge, ignoring direction.
    pub(crate) fn incident(graph: &Graph, node: NodeId) -> Self {
        let pending = graph
            .incident(node)
            .into_iter()
            .flatten()
            .map(|(other, edge)| Adjacent {
                node: other,
                edge: edge.id,
                weight: edge.weight,
            })
            .collect();
        Expansion { node, pending }
    }

    /// Directed edges leaving `node`.
    pub(crate) fn outgoing(graph: &Graph, node: NodeId) -> Self {
        let pending = graph
            .outgoing(node)
            .into_iter()
            .flatten()
            .map(|(other, edge)| Adjacent {
                node: other,
                edge: edge.id,
                weight: edge.weight,
            })
            .collect();
        Expansion { node, pending }
    }
}

/// Parent pointers of a search, from which paths are rebuilt.
#[derive(Clone, Debug, Default)]
pub(crate) struct SearchTree(IndexMap<NodeId, Option<(NodeId, EdgeId)>>);

impl SearchTree {
    pub(crate) fn root(&mut self, node: NodeId) {
        self.0.insert(node, None);
    }

    pub(crate) fn link(&mut self, node: NodeId, parent: NodeId, edge: EdgeId) {
        self.0.insert(node, Some((parent, edge)));
    }

    pub(crate) fn contains(&self, node: NodeId) -> bool {
        self.0.contains_key(&node)
    }

    pub(crate) fn via(&self, node: NodeId) -> Option<EdgeId> {
        self.0.get(&node).copied().flatten().map(|(_, edge)| edge)
    }

    /// Nodes and edges from the root to `target`.
    pub(crate) fn path(&self, target: NodeId) -> (Vec<NodeId>, Vec<EdgeId>) {
        let mut nodes = vec![target];
        let mut edges = vec![];
        let mut current = target;
        while let Some((parent, edge)) = self.0.get(&current).copied().flatten() {
            nodes.push(parent);
            edges.push(edge);
            current = parent;
        }
        nodes.reverse();
        edges.reverse();
        (nodes, edges)
    }
}

/// Shared handling of an optional target: once the target has been visited the next step reports
/// the path and the run ends.
#[derive(Debug, Default)]
pub(crate) struct Goal {
    target: Option<NodeId>,
    reached: Option<NodeId>,
    done: bool,
}

impl Goal {
    pub(crate) fn new(target: Option<NodeId>) -> Self {
        Goal {
            target,
            ..Goal::default()
        }
    }

    pub(crate) fn visit(&mut self, node: NodeId) {
        if self.target == Some(node) {
            self.reached = Some(node);
            self.done = true;
        }
    }

    /// `Some` when the run should not make any further progress.
    pub(crate) fn finish(
        &mut self,
        tree: &SearchTree,
        value: impl Fn(NodeId) -> Option<f64>,
    ) -> Option<Option<Event>> {
        if let Some(target) = self.reached.take() {
            let (nodes, edges) = tree.path(target);
            return Some(Some(Event::PathFound {
                target,
                nodes,
                edges,
                value: value(target),
            }));
        }
        self.done.then_some(None)
    }
}

#[derive(Debug)]
enum State {
    Bfs(Bfs),
    Dfs(Dfs),
    Dijkstra(Dijkstra),
    Prim(Prim),
    Kruskal(Kruskal),
    Topological(Topological),
}

/// A stepwise run of one algorithm over a private copy of a graph.
///
/// Edits made to the original graph after [`Runtime::start`] are invisible to the run.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Runtime {
    kind: AlgorithmKind,
    #[derivative(Debug = "ignore")]
    graph: Graph,
    state: State,
    status: Status,
    steps: usize,
}

impl Runtime {
    /// # Errors
    ///
    /// See [`Runtime::start_with_target`].
    pub fn start(
        kind: AlgorithmKind,
        graph: &Graph,
        start: Option<NodeId>,
    ) -> Result<Self, AlgorithmError> {
        Self::start_with_target(kind, graph, start, None)
    }

    /// Validates preconditions and captures a snapshot of `graph`.
    ///
    /// Without an explicit `start` the lowest live node id is used.
    ///
    /// # Errors
    ///
    /// - [`AlgorithmError::InvalidReference`] if `start` or `target` is not a live node.
    /// - [`AlgorithmError::InvalidInput`] for negative weights where they are disallowed, a target
    ///   for an algorithm without one, or a cyclic graph for a topological sort.
    /// - [`AlgorithmError::WrongGraphMode`] if the graph mode does not suit the algorithm.
    pub fn start_with_target(
        kind: AlgorithmKind,
        graph: &Graph,
        start: Option<NodeId>,
        target: Option<NodeId>,
    ) -> Result<Self, AlgorithmError> {
        if let Some(missing) = start
            .into_iter()
            .chain(target)
            .find(|id| !graph.contains_node(*id))
        {
            return Err(AlgorithmError::InvalidReference(missing));
        }
        if target.is_some() && !kind.supports_target() {
            return Err(AlgorithmError::InvalidInput(format!(
                "{kind} does not take a target node"
            )));
        }
        if let Some(required) = kind.required_mode() {
            if graph.mode() != required {
                return Err(AlgorithmError::WrongGraphMode { kind, required });
            }
        }
        if kind.requires_non_negative_weights() {
            // Written so that NaN weights are rejected too.
            if let Some(edge) = graph.edges().find(|edge| !(edge.weight >= 0.0)) {
                return Err(AlgorithmError::InvalidInput(format!(
                    "{kind} requires non-negative weights, but {} has weight {}",
                    edge.id, edge.weight
                )));
            }
        }

        let graph = graph.clone();
        let root = start.or_else(|| graph.nodes().map(|node| node.id).min());
        let state = match kind {
            AlgorithmKind::Bfs => State::Bfs(Bfs::new(root, target)),
            AlgorithmKind::Dfs => State::Dfs(Dfs::new(root, target)),
            AlgorithmKind::Dijkstra => State::Dijkstra(Dijkstra::new(root, target)),
            AlgorithmKind::Prim => State::Prim(Prim::new(&graph, root)),
            AlgorithmKind::Kruskal => State::Kruskal(Kruskal::new(&graph)),
            AlgorithmKind::TopologicalSort => State::Topological(
                Topological::new(&graph).ok_or_else(|| {
                    AlgorithmError::InvalidInput("graph contains a cycle".to_owned())
                })?,
            ),
        };
        info!(
            "Starting {kind} on {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(Runtime {
            kind,
            graph,
            state,
            status: Status::Running,
            steps: 0,
        })
    }

    #[must_use]
    pub fn kind(&self) -> AlgorithmKind {
        self.kind
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    /// Number of events produced so far.
    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// The snapshot the run operates on.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Advances by one unit of progress.
    ///
    /// [`Event::Complete`] is returned exactly once, when nothing is left to do.
    ///
    /// # Errors
    ///
    /// Fails with [`AlgorithmError::AlreadyComplete`] after completion and
    /// [`AlgorithmError::Cancelled`] after [`Runtime::cancel`].
    pub fn step(&mut self) -> Result<Event, AlgorithmError> {
        match self.status {
            Status::Running => {}
            Status::Complete => return Err(AlgorithmError::AlreadyComplete),
            Status::Cancelled => return Err(AlgorithmError::Cancelled),
        }

        let graph = &self.graph;
        let event = match &mut self.state {
            State::Bfs(bfs) => bfs.step(graph),
            State::Dfs(dfs) => dfs.step(graph),
            State::Dijkstra(dijkstra) => dijkstra.step(graph),
            State::Prim(prim) => prim.step(graph),
            State::Kruskal(kruskal) => kruskal.step(),
            State::Topological(topological) => topological.step(graph),
        }
        .unwrap_or(Event::Complete);

        self.steps += 1;
        if event == Event::Complete {
            debug!("{} completed after {} steps", self.kind, self.steps);
            self.status = Status::Complete;
        }
        Ok(event)
    }

    /// Invalidates the run. Every later [`Runtime::step`] fails with
    /// [`AlgorithmError::Cancelled`].
    pub fn cancel(&mut self) {
        if self.status == Status::Running {
            debug!("{} cancelled after {} steps", self.kind, self.steps);
        }
        self.status = Status::Cancelled;
    }

    /// Steps until completion, returning every event including the final
    /// [`Event::Complete`].
    ///
    /// # Errors
    ///
    /// Fails if the run is already complete or cancelled.
    pub fn run_to_completion(&mut self) -> Result<Vec<Event>, AlgorithmError> {
        let mut events = vec![];
        loop {
            let event = self.step()?;
            let done = event == Event::Complete;
            events.push(event);
            if done {
                return Ok(events);
            }
        }
    }
}
