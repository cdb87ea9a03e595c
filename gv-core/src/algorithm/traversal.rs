use std::collections::{HashMap, VecDeque};

use super::{Event, Expansion, Goal, SearchTree, scalar};
use crate::graph::{Graph, NodeId};

#[derive(Debug)]
pub(super) struct Bfs {
    queue: VecDeque<NodeId>,
    tree: SearchTree,
    depth: HashMap<NodeId, usize>,
    current: Option<Expansion>,
    goal: Goal,
}

impl Bfs {
    pub(super) fn new(root: Option<NodeId>, target: Option<NodeId>) -> Self {
        let mut bfs = Bfs {
            queue: VecDeque::new(),
            tree: SearchTree::default(),
            depth: HashMap::new(),
            current: None,
            goal: Goal::new(target),
        };
        if let Some(root) = root {
            bfs.queue.push_back(root);
            bfs.tree.root(root);
            bfs.depth.insert(root, 0);
        }
        bfs
    }

    fn depth_of(&self, node: NodeId) -> Option<f64> {
        self.depth.get(&node).copied().map(scalar)
    }

    pub(super) fn step(&mut self, graph: &Graph) -> Option<Event> {
        let depth = &self.depth;
        if let Some(event) = self
            .goal
            .finish(&self.tree, |node| depth.get(&node).copied().map(scalar))
        {
            return event;
        }

        if let Some(expansion) = &mut self.current {
            let from = expansion.node;
            if let Some(next) = expansion.pending.pop_front() {
                if self.tree.contains(next.node) {
                    return Some(Event::EdgeDiscarded {
                        edge: next.edge,
                        from,
                        to: next.node,
                    });
                }
                let depth = self.depth[&from] + 1;
                self.tree.link(next.node, from, next.edge);
                self.depth.insert(next.node, depth);
                self.queue.push_back(next.node);
                return Some(Event::EdgeRelaxed {
                    edge: next.edge,
                    from,
                    to: next.node,
                    value: Some(scalar(depth)),
                });
            }
            self.current = None;
            return Some(Event::NodeFinished {
                node: from,
                value: self.depth_of(from),
            });
        }

        let node = self.queue.pop_front()?;
        self.current = Some(Expansion::neighbors(graph, node));
        self.goal.visit(node);
        Some(Event::NodeVisited {
            node,
            via: self.tree.via(node),
            value: self.depth_of(node),
        })
    }
}

/// Depth-first search. Discovery and finishing times are reported as event values.
#[derive(Debug)]
pub(super) struct Dfs {
    stack: Vec<Expansion>,
    /// Node reached by the last tree edge, visited on the next step.
    pending: Option<NodeId>,
    tree: SearchTree,
    discovered: HashMap<NodeId, usize>,
    clock: usize,
    goal: Goal,
}

impl Dfs {
    pub(super) fn new(root: Option<NodeId>, target: Option<NodeId>) -> Self {
        let mut tree = SearchTree::default();
        if let Some(root) = root {
            tree.root(root);
        }
        Dfs {
            stack: vec![],
            pending: root,
            tree,
            discovered: HashMap::new(),
            clock: 0,
            goal: Goal::new(target),
        }
    }

    fn tick(&mut self) -> usize {
        let time = self.clock;
        self.clock += 1;
        time
    }

    pub(super) fn step(&mut self, graph: &Graph) -> Option<Event> {
        let discovered = &self.discovered;
        if let Some(event) = self
            .goal
            .finish(&self.tree, |node| discovered.get(&node).copied().map(scalar))
        {
            return event;
        }

        if let Some(node) = self.pending.take() {
            let time = self.tick();
            self.discovered.insert(node, time);
            self.stack.push(Expansion::neighbors(graph, node));
            self.goal.visit(node);
            return Some(Event::NodeVisited {
                node,
                via: self.tree.via(node),
                value: Some(scalar(time)),
            });
        }

        let top = self.stack.last_mut()?;
        let from = top.node;
        if let Some(next) = top.pending.pop_front() {
            if self.tree.contains(next.node) {
                return Some(Event::EdgeDiscarded {
                    edge: next.edge,
                    from,
                    to: next.node,
                });
            }
            self.tree.link(next.node, from, next.edge);
            self.pending = Some(next.node);
            return Some(Event::EdgeRelaxed {
                edge: next.edge,
                from,
                to: next.node,
                value: None,
            });
        }

        self.stack.pop();
        Some(Event::NodeFinished {
            node: from,
            value: Some(scalar(self.tick())),
        })
    }
}
