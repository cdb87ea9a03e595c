use dot_structures::{Attribute, EdgeTy, Id, Stmt, Vertex};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::graph::{DEFAULT_WEIGHT, EdgePolicy, Graph, GraphError, GraphMode, NodeId};

#[derive(Error, Debug)]
pub enum DotError {
    #[error("Unsupported graph: {0}")]
    Unsupported(&'static str),
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),
}

fn id_to_string(id: &Id) -> String {
    match id {
        Id::Html(s) | Id::Plain(s) | Id::Anonymous(s) => s.clone(),
        Id::Escaped(s) => s.trim_matches(|x| x == '\"').replace("\\\"", "\""),
    }
}

fn escaped(text: &str) -> Id {
    Id::Escaped(format!("\"{}\"", text.replace('"', "\\\"")))
}

fn plain(text: impl ToString) -> Id {
    Id::Plain(text.to_string())
}

fn attribute<'a>(attributes: &'a [Attribute], key: &str) -> Option<&'a Id> {
    attributes
        .iter()
        .find(|Attribute(name, _)| id_to_string(name) == key)
        .map(|Attribute(_, value)| value)
}

fn vertex(id: NodeId) -> Vertex {
    Vertex::N(dot_structures::NodeId(plain(id), None))
}

/// Converts a graph to DOT. Nodes are named by id and carry their label; weights other than the
/// default are kept as a `weight` attribute.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn to_dot(graph: &Graph) -> dot_structures::Graph {
    let directed = graph.mode() == GraphMode::Directed;
    let mut stmts: Vec<Stmt> = graph
        .nodes()
        .map(|node| {
            Stmt::Node(dot_structures::Node {
                id: dot_structures::NodeId(plain(node.id), None),
                attributes: vec![Attribute(plain("label"), escaped(&node.label))],
            })
        })
        .collect();
    stmts.extend(graph.edges().map(|edge| {
        let mut attributes = vec![];
        if edge.weight != DEFAULT_WEIGHT {
            attributes.push(Attribute(plain("weight"), plain(edge.weight)));
        }
        match edge.directed {
            Some(false) if directed => attributes.push(Attribute(plain("dir"), plain("none"))),
            Some(true) if !directed => attributes.push(Attribute(plain("dir"), plain("forward"))),
            _ => {}
        }
        Stmt::Edge(dot_structures::Edge {
            ty: EdgeTy::Pair(vertex(edge.source), vertex(edge.target)),
            attributes,
        })
    }));

    let id = plain("G");
    let strict = graph.policy() == EdgePolicy::Simple;
    if directed {
        dot_structures::Graph::DiGraph { id, strict, stmts }
    } else {
        dot_structures::Graph::Graph { id, strict, stmts }
    }
}

/// Builds a graph from DOT. Node names become labels unless a `label` attribute is given.
///
/// Strict graphs become simple graphs, in which repeated edges are merged. Graph-level
/// attributes are ignored.
///
/// # Errors
///
/// Fails on subgraphs.
pub fn from_dot(dot: &dot_structures::Graph) -> Result<Graph, DotError> {
    let (mode, strict, stmts) = match dot {
        dot_structures::Graph::Graph { strict, stmts, .. } => {
            (GraphMode::Undirected, *strict, stmts)
        }
        dot_structures::Graph::DiGraph { strict, stmts, .. } => {
            (GraphMode::Directed, *strict, stmts)
        }
    };
    let policy = if strict {
        EdgePolicy::Simple
    } else {
        EdgePolicy::Multi
    };
    let mut graph = Graph::new(mode, policy);
    let mut names: IndexMap<String, NodeId> = IndexMap::new();
    let mut node = |graph: &mut Graph, vertex: &Vertex| match vertex {
        Vertex::N(dot_structures::NodeId(id, _)) => {
            let name = id_to_string(id);
            if let Some(&existing) = names.get(&name) {
                return Ok(existing);
            }
            let created = graph.add_node(name.as_str());
            names.insert(name, created);
            Ok(created)
        }
        Vertex::S(_) => Err(DotError::Unsupported("subgraph endpoint")),
    };

    for stmt in stmts {
        match stmt {
            Stmt::Node(dot_structures::Node { id, attributes }) => {
                let declared = node(&mut graph, &Vertex::N(id.clone()))?;
                if let Some(label) = attribute(attributes, "label") {
                    graph.set_label(declared, id_to_string(label))?;
                }
            }
            Stmt::Edge(dot_structures::Edge { ty, attributes }) => {
                let vertices = match ty {
                    EdgeTy::Pair(x, y) => vec![x.clone(), y.clone()],
                    EdgeTy::Chain(chain) => chain.clone(),
                };
                let weight = attribute(attributes, "weight")
                    .and_then(|weight| id_to_string(weight).parse::<f64>().ok());
                let directed = match attribute(attributes, "dir").map(id_to_string).as_deref() {
                    Some("none") => Some(false),
                    Some("forward") => Some(true),
                    _ => None,
                };
                for pair in vertices.windows(2) {
                    let source = node(&mut graph, &pair[0])?;
                    let target = node(&mut graph, &pair[1])?;
                    match graph.add_edge_with(source, target, weight, directed) {
                        Ok(_) => {}
                        Err(GraphError::DuplicateEdge { existing, .. }) => {
                            debug!("Merging repeated edge into {existing}");
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
            }
            Stmt::Subgraph(_) => return Err(DotError::Unsupported("subgraph")),
            Stmt::Attribute(_) | Stmt::GAttribute(_) => {}
        }
    }
    Ok(graph)
}
