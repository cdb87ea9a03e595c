use std::collections::BTreeSet;

use indexmap::IndexMap;

use super::{Event, Expansion, scalar};
use crate::graph::{Graph, NodeId};

/// Kahn's algorithm. Among nodes with no remaining predecessors the lowest id goes first.
///
/// Edges with an undirected override impose no order.
#[derive(Debug)]
pub(super) struct Topological {
    indegree: IndexMap<NodeId, usize>,
    ready: BTreeSet<NodeId>,
    current: Option<Expansion>,
    position: usize,
}

fn indegrees(graph: &Graph) -> IndexMap<NodeId, usize> {
    graph
        .nodes()
        .map(|node| {
            let count = graph.incoming(node.id).map_or(0, Iterator::count);
            (node.id, count)
        })
        .collect()
}

/// A full topological order, or `None` if the directed edges contain a cycle.
pub(crate) fn order(graph: &Graph) -> Option<Vec<NodeId>> {
    let mut indegree = indegrees(graph);
    let mut ready: BTreeSet<NodeId> = ready_nodes(&indegree);
    let mut order = Vec::with_capacity(indegree.len());
    while let Some(node) = ready.pop_first() {
        order.push(node);
        for (next, _) in graph.outgoing(node).into_iter().flatten() {
            let count = indegree.get_mut(&next)?;
            *count -= 1;
            if *count == 0 {
                ready.insert(next);
            }
        }
    }
    (order.len() == graph.node_count()).then_some(order)
}

fn ready_nodes(indegree: &IndexMap<NodeId, usize>) -> BTreeSet<NodeId> {
    indegree
        .iter()
        .filter(|&(_, &count)| count == 0)
        .map(|(&node, _)| node)
        .collect()
}

impl Topological {
    /// `None` if the graph is cyclic.
    pub(super) fn new(graph: &Graph) -> Option<Self> {
        order(graph)?;
        let indegree = indegrees(graph);
        Some(Topological {
            ready: ready_nodes(&indegree),
            indegree,
            current: None,
            position: 0,
        })
    }

    pub(super) fn step(&mut self, graph: &Graph) -> Option<Event> {
        if let Some(expansion) = &mut self.current {
            let from = expansion.node;
            if let Some(next) = expansion.pending.pop_front() {
                let remaining = self.indegree.get_mut(&next.node).map_or(0, |count| {
                    *count = count.saturating_sub(1);
                    *count
                });
                if remaining == 0 {
                    self.ready.insert(next.node);
                }
                return Some(Event::EdgeRelaxed {
                    edge: next.edge,
                    from,
                    to: next.node,
                    value: Some(scalar(remaining)),
                });
            }
            self.current = None;
            return Some(Event::NodeFinished {
                node: from,
                value: Some(scalar(self.position - 1)),
            });
        }

        let node = self.ready.pop_first()?;
        let position = self.position;
        self.position += 1;
        self.current = Some(Expansion::outgoing(graph, node));
        Some(Event::NodeVisited {
            node,
            via: None,
            value: Some(scalar(position)),
        })
    }
}
