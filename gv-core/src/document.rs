use emath::Pos2;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::graph::{
    DEFAULT_WEIGHT, Edge, EdgeId, EdgePolicy, Graph, GraphError, GraphMode, Node, NodeId, Style,
};

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Malformed document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Node id `{0}` appears more than once")]
    DuplicateNode(NodeId),
    #[error("Edge id `{0}` appears more than once")]
    DuplicateEdge(EdgeId),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

fn default_weight() -> f64 {
    DEFAULT_WEIGHT
}

fn enabled() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Pos2>,
    #[serde(default)]
    pub style: Style,
    #[serde(default = "enabled")]
    pub enabled: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default = "default_weight")]
    pub weight: f64,
    /// Effective direction of the edge.
    pub directed: bool,
}

/// Serializable snapshot of a graph, including the id counters so that ids stay unique across a
/// save and load.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(default)]
    pub mode: GraphMode,
    #[serde(default)]
    pub policy: EdgePolicy,
    #[serde(default)]
    pub next_node: usize,
    #[serde(default)]
    pub next_edge: usize,
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct LoadOptions {
    /// Restore stored node positions instead of leaving placement to the layout.
    pub keep_positions: bool,
}

impl GraphDocument {
    /// # Errors
    ///
    /// Fails if serialization fails.
    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// # Errors
    ///
    /// Fails on malformed JSON.
    pub fn from_json(source: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(source)?)
    }
}

impl Graph {
    #[must_use]
    pub fn to_document(&self) -> GraphDocument {
        let (next_node, next_edge) = self.next_ids();
        GraphDocument {
            mode: self.mode(),
            policy: self.policy(),
            next_node,
            next_edge,
            nodes: self
                .nodes()
                .map(|node| NodeRecord {
                    id: node.id,
                    label: node.label.clone(),
                    position: node.position,
                    style: node.style,
                    enabled: node.enabled,
                })
                .collect(),
            edges: self
                .edges()
                .map(|edge| EdgeRecord {
                    id: edge.id,
                    source: edge.source,
                    target: edge.target,
                    weight: edge.weight,
                    directed: self.is_directed(edge),
                })
                .collect(),
        }
    }

    /// Rebuilds a graph, keeping every id from the document.
    ///
    /// # Errors
    ///
    /// Fails on repeated ids, edges naming missing nodes, or parallel edges in a simple graph.
    pub fn from_document(
        document: &GraphDocument,
        options: LoadOptions,
    ) -> Result<Self, DocumentError> {
        let mut graph = Graph::new(document.mode, document.policy);
        for record in &document.nodes {
            if graph.contains_node(record.id) {
                return Err(DocumentError::DuplicateNode(record.id));
            }
            graph.insert_node(Node {
                id: record.id,
                label: record.label.clone(),
                position: record.position.filter(|_| options.keep_positions),
                style: record.style,
                enabled: record.enabled,
            });
        }
        for record in &document.edges {
            if graph.contains_edge(record.id) {
                return Err(DocumentError::DuplicateEdge(record.id));
            }
            graph.insert_edge(Edge {
                id: record.id,
                source: record.source,
                target: record.target,
                weight: record.weight,
                directed: Some(record.directed),
            })?;
        }
        graph.reserve_ids(document.next_node, document.next_edge);
        debug!(
            "Loaded document with {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }
}
