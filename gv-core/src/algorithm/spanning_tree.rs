use std::collections::VecDeque;

use ::petgraph::unionfind::UnionFind;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use priority_queue::PriorityQueue;

use super::{Event, Expansion, MinKey, min_key};
use crate::graph::{EdgeId, Graph, NodeId};

/// Prim's algorithm, growing a minimum spanning forest.
///
/// Candidates of equal weight are taken lowest node id first. When the frontier runs dry the next
/// tree is rooted at the lowest id not yet reached.
#[derive(Debug)]
pub(super) struct Prim {
    queue: PriorityQueue<NodeId, MinKey>,
    /// Cheapest known edge into each node outside the forest.
    best: IndexMap<NodeId, (f64, EdgeId)>,
    forest: IndexSet<NodeId>,
    /// All node ids, ascending, for rooting new trees.
    order: Vec<NodeId>,
    current: Option<Expansion>,
}

impl Prim {
    pub(super) fn new(graph: &Graph, root: Option<NodeId>) -> Self {
        let mut queue = PriorityQueue::new();
        if let Some(root) = root {
            queue.push(root, min_key(0.0, root));
        }
        Prim {
            queue,
            best: IndexMap::new(),
            forest: IndexSet::new(),
            order: graph.nodes().map(|node| node.id).sorted().collect(),
            current: None,
        }
    }

    fn via(&self, node: NodeId) -> Option<EdgeId> {
        self.best.get(&node).map(|&(_, edge)| edge)
    }

    pub(super) fn step(&mut self, graph: &Graph) -> Option<Event> {
        if let Some(expansion) = &mut self.current {
            let from = expansion.node;
            let via = self.best.get(&from).map(|&(_, edge)| edge);
            while let Some(next) = expansion.pending.pop_front() {
                if Some(next.edge) == via {
                    continue;
                }
                let discard = Event::EdgeDiscarded {
                    edge: next.edge,
                    from,
                    to: next.node,
                };
                if self.forest.contains(&next.node)
                    || self
                        .best
                        .get(&next.node)
                        .is_some_and(|&(known, _)| known <= next.weight)
                {
                    return Some(discard);
                }
                self.best.insert(next.node, (next.weight, next.edge));
                self.queue
                    .push_increase(next.node, min_key(next.weight, next.node));
                return Some(Event::EdgeRelaxed {
                    edge: next.edge,
                    from,
                    to: next.node,
                    value: Some(next.weight),
                });
            }
            self.current = None;
            return Some(Event::NodeFinished {
                node: from,
                value: None,
            });
        }

        let node = match self.queue.pop() {
            Some((node, _)) => node,
            None => self
                .order
                .iter()
                .copied()
                .find(|node| !self.forest.contains(node))?,
        };
        self.forest.insert(node);
        self.current = Some(Expansion::incident(graph, node));
        Some(Event::NodeVisited {
            node,
            via: self.via(node),
            value: self.best.get(&node).map(|&(weight, _)| weight),
        })
    }
}

/// Kruskal's algorithm. Edges are examined by ascending weight, ties broken by edge id.
#[derive(Debug)]
pub(super) struct Kruskal {
    edges: VecDeque<(EdgeId, NodeId, NodeId, f64)>,
    index: IndexMap<NodeId, usize>,
    components: UnionFind<usize>,
    accepted: usize,
    needed: usize,
}

impl Kruskal {
    pub(super) fn new(graph: &Graph) -> Self {
        let index: IndexMap<NodeId, usize> = graph
            .nodes()
            .enumerate()
            .map(|(i, node)| (node.id, i))
            .collect();
        let edges = graph
            .edges()
            .sorted_by(|x, y| x.weight.total_cmp(&y.weight).then(x.id.cmp(&y.id)))
            .map(|edge| (edge.id, edge.source, edge.target, edge.weight))
            .collect();
        Kruskal {
            edges,
            components: UnionFind::new(index.len()),
            needed: index.len().saturating_sub(1),
            index,
            accepted: 0,
        }
    }

    pub(super) fn step(&mut self) -> Option<Event> {
        if self.accepted == self.needed {
            return None;
        }
        let (edge, from, to, weight) = self.edges.pop_front()?;
        if self.components.union(self.index[&from], self.index[&to]) {
            self.accepted += 1;
            Some(Event::EdgeRelaxed {
                edge,
                from,
                to,
                value: Some(weight),
            })
        } else {
            Some(Event::EdgeDiscarded { edge, from, to })
        }
    }
}
