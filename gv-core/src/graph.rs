use derive_more::{Display, From};
use ecolor::Color32;
use emath::Pos2;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[display("n{_0}")]
#[serde(transparent)]
pub struct NodeId(pub usize);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize,
)]
#[display("e{_0}")]
#[serde(transparent)]
pub struct EdgeId(pub usize);

/// Something an operation can name that may not exist in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, From)]
pub enum Reference {
    #[display("node `{_0}`")]
    Node(NodeId),
    #[display("edge `{_0}`")]
    Edge(EdgeId),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GraphError {
    #[error("No such {0}")]
    InvalidReference(Reference),
    #[error("An edge from `{from}` to `{to}` already exists (`{existing}`)")]
    DuplicateEdge {
        from: NodeId,
        to: NodeId,
        existing: EdgeId,
    },
    #[error("Edge weight {0} is not a finite number")]
    InvalidWeight(f64),
}

impl GraphError {
    fn node(id: NodeId) -> Self {
        Self::InvalidReference(Reference::Node(id))
    }

    fn edge(id: EdgeId) -> Self {
        Self::InvalidReference(Reference::Edge(id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GraphMode {
    #[default]
    #[display("directed")]
    Directed,
    #[display("undirected")]
    Undirected,
}

/// Whether more than one edge may join the same pair of nodes.
/// Fixed when the graph is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgePolicy {
    #[default]
    Simple,
    Multi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeShape {
    #[default]
    Circle,
    Square,
    Diamond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Style {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color32>,
    #[serde(default)]
    pub shape: NodeShape,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
    /// Last position written back by a layout, if any.
    pub position: Option<Pos2>,
    pub style: Style,
    /// Disabled nodes hide their incident edges from [`Graph::enabled_edges`].
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    pub weight: f64,
    /// Per-edge override of the graph mode. `None` follows the graph.
    pub directed: Option<bool>,
}

impl Edge {
    /// The endpoint opposite `node`, ignoring direction.
    #[must_use]
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if self.source == node {
            Some(self.target)
        } else if self.target == node {
            Some(self.source)
        } else {
            None
        }
    }

    #[must_use]
    pub fn is_loop(&self) -> bool {
        self.source == self.target
    }
}

pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Graph store with an incrementally maintained adjacency index.
///
/// Nodes and edges live in insertion-ordered arenas keyed by ids which are never reused.
/// Every incident edge of a node is recorded in its adjacency entry, in the order the edges were
/// added, and every mutation patches the index before returning.
#[derive(Clone, Debug, PartialEq)]
pub struct Graph {
    mode: GraphMode,
    policy: EdgePolicy,
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeId, Edge>,
    adjacency: IndexMap<NodeId, IndexSet<EdgeId>>,
    next_node: usize,
    next_edge: usize,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(GraphMode::default(), EdgePolicy::default())
    }
}

impl Graph {
    #[must_use]
    pub fn new(mode: GraphMode, policy: EdgePolicy) -> Self {
        Graph {
            mode,
            policy,
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            adjacency: IndexMap::new(),
            next_node: 0,
            next_edge: 0,
        }
    }

    #[must_use]
    pub fn directed() -> Self {
        Self::new(GraphMode::Directed, EdgePolicy::Simple)
    }

    #[must_use]
    pub fn undirected() -> Self {
        Self::new(GraphMode::Undirected, EdgePolicy::Simple)
    }

    #[must_use]
    pub fn mode(&self) -> GraphMode {
        self.mode
    }

    #[must_use]
    pub fn policy(&self) -> EdgePolicy {
        self.policy
    }

    pub fn add_node(&mut self, label: impl Into<String>) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        let node = Node {
            id,
            label: label.into(),
            position: None,
            style: Style::default(),
            enabled: true,
        };
        trace!("Adding node {id} `{}`", node.label);
        self.nodes.insert(id, node);
        self.adjacency.insert(id, IndexSet::new());
        id
    }

    /// Adds an edge following the graph's mode.
    ///
    /// # Errors
    ///
    /// Fails if either endpoint is not a live node, if the weight is infinite or NaN, or if the
    /// graph is simple and the pair is already joined.
    pub fn add_edge(
        &mut self,
        source: NodeId,
        target: NodeId,
        weight: Option<f64>,
    ) -> Result<EdgeId, GraphError> {
        self.add_edge_with(source, target, weight, None)
    }

    /// Adds an edge, optionally overriding the graph's mode for this edge alone.
    ///
    /// # Errors
    ///
    /// See [`Graph::add_edge`].
    pub fn add_edge_with(
        &mut self,
        source: NodeId,
        target: NodeId,
        weight: Option<f64>,
        directed: Option<bool>,
    ) -> Result<EdgeId, GraphError> {
        let id = EdgeId(self.next_edge);
        self.insert_edge(Edge {
            id,
            source,
            target,
            weight: weight.unwrap_or(DEFAULT_WEIGHT),
            directed,
        })?;
        Ok(id)
    }

    /// Removes a node together with every incident edge.
    ///
    /// # Errors
    ///
    /// Fails if `id` is not a live node.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Node, GraphError> {
        let incident = self.adjacency.get(&id).ok_or(GraphError::node(id))?.clone();
        for edge in incident {
            self.unlink(edge);
        }
        self.adjacency.shift_remove(&id);
        let node = self.nodes.shift_remove(&id).ok_or(GraphError::node(id))?;
        debug!("Removed node {id} `{}`", node.label);
        Ok(node)
    }

    /// # Errors
    ///
    /// Fails if `id` is not a live edge.
    pub fn remove_edge(&mut self, id: EdgeId) -> Result<Edge, GraphError> {
        if !self.edges.contains_key(&id) {
            return Err(GraphError::edge(id));
        }
        self.unlink(id).ok_or(GraphError::edge(id))
    }

    fn unlink(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.shift_remove(&id)?;
        for endpoint in [edge.source, edge.target] {
            if let Some(incident) = self.adjacency.get_mut(&endpoint) {
                incident.shift_remove(&id);
            }
        }
        trace!("Removed edge {id}");
        Some(edge)
    }

    /// Inserts a fully specified edge, keeping its id. Used by `add_edge_with` and loaders.
    pub(crate) fn insert_edge(&mut self, mut edge: Edge) -> Result<(), GraphError> {
        if !edge.weight.is_finite() {
            return Err(GraphError::InvalidWeight(edge.weight));
        }
        for endpoint in [edge.source, edge.target] {
            if !self.nodes.contains_key(&endpoint) {
                return Err(GraphError::node(endpoint));
            }
        }
        // An override that agrees with the mode carries no information.
        if edge.directed == Some(self.mode == GraphMode::Directed) {
            edge.directed = None;
        }
        if self.policy == EdgePolicy::Simple {
            let directed = self.is_directed(&edge);
            if let Some(existing) = self.find_duplicate(edge.source, edge.target, directed) {
                return Err(GraphError::DuplicateEdge {
                    from: edge.source,
                    to: edge.target,
                    existing,
                });
            }
        }
        let id = edge.id;
        for endpoint in [edge.source, edge.target] {
            if let Some(incident) = self.adjacency.get_mut(&endpoint) {
                incident.insert(id);
            }
        }
        trace!("Adding edge {id} {} -> {}", edge.source, edge.target);
        self.edges.insert(id, edge);
        self.next_edge = self.next_edge.max(id.0 + 1);
        Ok(())
    }

    /// Inserts a fully specified node, keeping its id. Used by loaders.
    pub(crate) fn insert_node(&mut self, node: Node) {
        let id = node.id;
        self.nodes.insert(id, node);
        self.adjacency.entry(id).or_default();
        self.next_node = self.next_node.max(id.0 + 1);
    }

    pub(crate) fn next_ids(&self) -> (usize, usize) {
        (self.next_node, self.next_edge)
    }

    pub(crate) fn reserve_ids(&mut self, next_node: usize, next_edge: usize) {
        self.next_node = self.next_node.max(next_node);
        self.next_edge = self.next_edge.max(next_edge);
    }

    fn find_duplicate(&self, source: NodeId, target: NodeId, directed: bool) -> Option<EdgeId> {
        self.adjacency.get(&source)?.iter().copied().find(|id| {
            let edge = &self.edges[id];
            (edge.source == source && edge.target == target)
                || ((!directed || !self.is_directed(edge))
                    && edge.source == target
                    && edge.target == source)
        })
    }

    /// Whether the edge is directed, taking the graph mode into account.
    #[must_use]
    pub fn is_directed(&self, edge: &Edge) -> bool {
        edge.directed.unwrap_or(self.mode == GraphMode::Directed)
    }

    #[must_use]
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    #[must_use]
    pub fn contains_edge(&self, id: EdgeId) -> bool {
        self.edges.contains_key(&id)
    }

    /// # Errors
    ///
    /// Fails if `id` is not a live node.
    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::node(id))
    }

    /// # Errors
    ///
    /// Fails if `id` is not a live edge.
    pub fn edge(&self, id: EdgeId) -> Result<&Edge, GraphError> {
        self.edges.get(&id).ok_or(GraphError::edge(id))
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl DoubleEndedIterator<Item = &Node> + ExactSizeIterator + '_ {
        self.nodes.values()
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl DoubleEndedIterator<Item = &Edge> + ExactSizeIterator + '_ {
        self.edges.values()
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// First node carrying `label`, in insertion order.
    #[must_use]
    pub fn find_label(&self, label: &str) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|node| node.label == label)
            .map(|node| node.id)
    }

    fn incident_edges(&self, node: NodeId) -> Result<impl Iterator<Item = &Edge> + '_, GraphError> {
        let incident = self.adjacency.get(&node).ok_or(GraphError::node(node))?;
        Ok(incident.iter().map(|id| &self.edges[id]))
    }

    /// Edges that can be followed away from `node` (outgoing or undirected), paired with the node
    /// they lead to, in edge insertion order.
    ///
    /// # Errors
    ///
    /// Fails if `node` is not a live node.
    pub fn neighbor_edges(
        &self,
        node: NodeId,
    ) -> Result<impl Iterator<Item = (NodeId, &Edge)> + '_, GraphError> {
        Ok(self.incident_edges(node)?.filter_map(move |edge| {
            if edge.source == node {
                Some((edge.target, edge))
            } else if self.is_directed(edge) {
                None
            } else {
                Some((edge.source, edge))
            }
        }))
    }

    /// # Errors
    ///
    /// Fails if `node` is not a live node.
    pub fn neighbors(
        &self,
        node: NodeId,
    ) -> Result<impl Iterator<Item = (NodeId, EdgeId)> + '_, GraphError> {
        Ok(self
            .neighbor_edges(node)?
            .map(|(neighbor, edge)| (neighbor, edge.id)))
    }

    /// Every incident edge regardless of direction, paired with the opposite endpoint.
    ///
    /// # Errors
    ///
    /// Fails if `node` is not a live node.
    pub fn incident(
        &self,
        node: NodeId,
    ) -> Result<impl Iterator<Item = (NodeId, &Edge)> + '_, GraphError> {
        Ok(self
            .incident_edges(node)?
            .filter_map(move |edge| edge.other(node).map(|other| (other, edge))))
    }

    /// Directed edges leaving `node`.
    ///
    /// # Errors
    ///
    /// Fails if `node` is not a live node.
    pub fn outgoing(
        &self,
        node: NodeId,
    ) -> Result<impl Iterator<Item = (NodeId, &Edge)> + '_, GraphError> {
        Ok(self
            .incident_edges(node)?
            .filter(move |edge| edge.source == node && self.is_directed(edge))
            .map(|edge| (edge.target, edge)))
    }

    /// Directed edges entering `node`.
    ///
    /// # Errors
    ///
    /// Fails if `node` is not a live node.
    pub fn incoming(
        &self,
        node: NodeId,
    ) -> Result<impl Iterator<Item = (NodeId, &Edge)> + '_, GraphError> {
        Ok(self
            .incident_edges(node)?
            .filter(move |edge| edge.target == node && self.is_directed(edge))
            .map(|edge| (edge.source, edge)))
    }

    /// # Errors
    ///
    /// Fails if `node` is not a live node.
    pub fn degree(&self, node: NodeId) -> Result<usize, GraphError> {
        Ok(self.incident_edges(node)?.count())
    }

    /// Edges whose endpoints are both enabled.
    pub fn enabled_edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.values().filter(|edge| {
            [edge.source, edge.target]
                .iter()
                .all(|id| self.nodes.get(id).is_some_and(|node| node.enabled))
        })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::node(id))
    }

    /// # Errors
    ///
    /// Fails if `id` is not a live node.
    pub fn set_label(&mut self, id: NodeId, label: impl Into<String>) -> Result<(), GraphError> {
        self.node_mut(id)?.label = label.into();
        Ok(())
    }

    /// # Errors
    ///
    /// Fails if `id` is not a live node.
    pub fn set_style(&mut self, id: NodeId, style: Style) -> Result<(), GraphError> {
        self.node_mut(id)?.style = style;
        Ok(())
    }

    /// # Errors
    ///
    /// Fails if `id` is not a live node.
    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) -> Result<(), GraphError> {
        self.node_mut(id)?.enabled = enabled;
        Ok(())
    }

    /// # Errors
    ///
    /// Fails if `id` is not a live node.
    pub fn set_position(&mut self, id: NodeId, position: Option<Pos2>) -> Result<(), GraphError> {
        self.node_mut(id)?.position = position;
        Ok(())
    }

    /// # Errors
    ///
    /// Fails if `id` is not a live edge or `weight` is infinite or NaN.
    pub fn set_weight(&mut self, id: EdgeId, weight: f64) -> Result<(), GraphError> {
        if !weight.is_finite() {
            return Err(GraphError::InvalidWeight(weight));
        }
        self.edges.get_mut(&id).ok_or(GraphError::edge(id))?.weight = weight;
        Ok(())
    }
}
