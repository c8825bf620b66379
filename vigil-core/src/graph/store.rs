//! Node Store
//!
//! The store owns every node of one runtime and keeps both directions of
//! each dependency edge in sync. Nodes are addressed by [`NodeId`], so
//! disposal is a matter of removing an entry and scrubbing its edges.
//!
//! # Invalidation
//!
//! When an observable changes, [`Graph::invalidate_from`] walks outward:
//!
//! 1. Computed nodes are marked dirty and their subscribers visited. A node
//!    that is already dirty is walked through as well: a failed evaluation
//!    leaves it dirty while its readers stay subscribed.
//! 2. Reactions are collected for the scheduler.
//!
//! Each node is visited at most once per walk.
//!
//! Nothing is recomputed here. Computed nodes re-evaluate on their next read.

use std::collections::{HashSet, VecDeque};

use slotmap::SlotMap;
use tracing::trace;

use super::node::{Node, NodeId, NodeKind};

/// All nodes of one runtime, indexed by ID.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: SlotMap<NodeId, Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: Node) -> NodeId {
        self.nodes.insert(node)
    }

    /// Remove a node and every edge touching it.
    ///
    /// The removed node is handed back so the caller can drop it after
    /// releasing its borrow of the graph.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let node = self.nodes.remove(id)?;

        for dep in node.dependencies() {
            if let Some(dep_node) = self.nodes.get_mut(*dep) {
                dep_node.remove_subscriber(id);
            }
        }
        for sub in node.subscribers() {
            if let Some(sub_node) = self.nodes.get_mut(*sub) {
                sub_node.remove_dependency(id);
            }
        }

        Some(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Record that `dependent` read `dependency`.
    ///
    /// Re-linking an existing edge is a no-op. Returns true if a new edge
    /// was created. Edges are always stored on both sides, so the hashed
    /// subscriber set answers the duplicate check.
    pub fn link(&mut self, dependency: NodeId, dependent: NodeId) -> bool {
        if dependency == dependent
            || !self.nodes.contains_key(dependency)
            || !self.nodes.contains_key(dependent)
        {
            return false;
        }

        if !self.nodes[dependency].add_subscriber(dependent) {
            return false;
        }
        self.nodes[dependent].push_dependency(dependency);
        trace!(dependency = ?dependency, dependent = ?dependent, "linked");
        true
    }

    /// Drop every dependency edge of `id`, on both sides.
    ///
    /// Called before re-evaluating a computed or reaction so the next run
    /// rebuilds the set from scratch.
    pub fn detach(&mut self, id: NodeId) -> usize {
        let Some(node) = self.nodes.get_mut(id) else {
            return 0;
        };
        let deps = node.take_dependencies();

        for dep in &deps {
            if let Some(dep_node) = self.nodes.get_mut(*dep) {
                dep_node.remove_subscriber(id);
            }
        }

        trace!(node = ?id, count = deps.len(), "detached");
        deps.len()
    }

    /// Push invalidation outward from `source`.
    ///
    /// Returns the reactions reached, in discovery order, without
    /// duplicates.
    pub fn invalidate_from(&mut self, source: NodeId) -> Vec<NodeId> {
        let mut reactions = Vec::new();
        let mut visited = HashSet::new();
        let mut queue: VecDeque<NodeId> = match self.nodes.get(source) {
            Some(node) => node.subscribers().iter().copied().collect(),
            None => return reactions,
        };

        while let Some(id) = queue.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };

            match node.kind() {
                NodeKind::Computed => {
                    if !node.is_dirty() {
                        node.mark_dirty();
                        trace!(node = ?id, "computed invalidated");
                    }
                    queue.extend(node.subscribers().iter().copied());
                }
                NodeKind::Reaction => reactions.push(id),
                NodeKind::Observable => {}
            }
        }

        reactions
    }
}
