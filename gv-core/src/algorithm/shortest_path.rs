use std::collections::HashSet;

use indexmap::IndexMap;
use priority_queue::PriorityQueue;

use super::{Event, Expansion, Goal, MinKey, SearchTree, min_key};
use crate::graph::{Graph, NodeId};

/// Dijkstra's algorithm. Nodes at equal distance are settled lowest id first.
#[derive(Debug)]
pub(super) struct Dijkstra {
    queue: PriorityQueue<NodeId, MinKey>,
    distance: IndexMap<NodeId, f64>,
    settled: HashSet<NodeId>,
    tree: SearchTree,
    current: Option<Expansion>,
    goal: Goal,
}

impl Dijkstra {
    pub(super) fn new(root: Option<NodeId>, target: Option<NodeId>) -> Self {
        let mut dijkstra = Dijkstra {
            queue: PriorityQueue::new(),
            distance: IndexMap::new(),
            settled: HashSet::new(),
            tree: SearchTree::default(),
            current: None,
            goal: Goal::new(target),
        };
        if let Some(root) = root {
            dijkstra.distance.insert(root, 0.0);
            dijkstra.tree.root(root);
            dijkstra.queue.push(root, min_key(0.0, root));
        }
        dijkstra
    }

    pub(super) fn step(&mut self, graph: &Graph) -> Option<Event> {
        let distance = &self.distance;
        if let Some(event) = self
            .goal
            .finish(&self.tree, |node| distance.get(&node).copied())
        {
            return event;
        }

        if let Some(expansion) = &mut self.current {
            let from = expansion.node;
            if let Some(next) = expansion.pending.pop_front() {
                let discard = Event::EdgeDiscarded {
                    edge: next.edge,
                    from,
                    to: next.node,
                };
                if self.settled.contains(&next.node) {
                    return Some(discard);
                }
                let candidate = self.distance[&from] + next.weight;
                if self
                    .distance
                    .get(&next.node)
                    .is_some_and(|&known| known <= candidate)
                {
                    return Some(discard);
                }
                self.distance.insert(next.node, candidate);
                self.tree.link(next.node, from, next.edge);
                self.queue
                    .push_increase(next.node, min_key(candidate, next.node));
                return Some(Event::EdgeRelaxed {
                    edge: next.edge,
                    from,
                    to: next.node,
                    value: Some(candidate),
                });
            }
            self.current = None;
            return Some(Event::NodeFinished {
                node: from,
                value: self.distance.get(&from).copied(),
            });
        }

        let (node, _) = self.queue.pop()?;
        self.settled.insert(node);
        self.current = Some(Expansion::neighbors(graph, node));
        self.goal.visit(node);
        Some(Event::NodeVisited {
            node,
            via: self.tree.via(node),
            value: self.distance.get(&node).copied(),
        })
    }
}
