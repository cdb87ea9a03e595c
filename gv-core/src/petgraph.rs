use ::petgraph::graph::NodeIndex;
use indexmap::IndexMap;

use crate::graph::{EdgeId, Graph, NodeId};

pub type PetGraph = ::petgraph::Graph<NodeId, (EdgeId, f64)>;

/// Converts to a directed petgraph graph. Undirected edges become a pair of opposing edges.
///
/// The returned map sends each node id to its petgraph index.
#[must_use]
pub fn to_pet(graph: &Graph) -> (PetGraph, IndexMap<NodeId, NodeIndex>) {
    let mut pet = PetGraph::with_capacity(graph.node_count(), graph.edge_count());
    let index: IndexMap<NodeId, NodeIndex> = graph
        .nodes()
        .map(|node| (node.id, pet.add_node(node.id)))
        .collect();

    for edge in graph.edges() {
        let (source, target) = (index[&edge.source], index[&edge.target]);
        pet.add_edge(source, target, (edge.id, edge.weight));
        if !graph.is_directed(edge) && !edge.is_loop() {
            pet.add_edge(target, source, (edge.id, edge.weight));
        }
    }

    (pet, index)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use ::petgraph::algo::{connected_components, toposort};

    use super::to_pet;
    use crate::{edge_list::parse_edge_list, graph::NodeId};

    #[test]
    fn undirected_edges_go_both_ways() -> Result<()> {
        let graph = parse_edge_list("A -- B\nB -- C\nD")?;
        let (pet, index) = to_pet(&graph);
        assert_eq!(pet.edge_count(), 4);
        assert_eq!(index.len(), 4);
        assert_eq!(connected_components(&pet), 2);
        Ok(())
    }

    #[test]
    fn weights_indices_line_up() -> Result<()> {
        let graph = parse_edge_list("A -> B : 3\nB -> C")?;
        let (pet, index) = to_pet(&graph);
        let order = toposort(&pet, None).map_err(|_| anyhow::anyhow!("cycle"))?;
        let ids: Vec<NodeId> = order.into_iter().map(|i| pet[i]).collect();
        assert_eq!(ids, [NodeId(0), NodeId(1), NodeId(2)]);
        let edge = pet.find_edge(index[&NodeId(0)], index[&NodeId(1)]);
        assert_eq!(edge.map(|e| pet[e].1), Some(3.0));
        Ok(())
    }
}
