//! Graph Nodes
//!
//! This module defines the node types that live in the dependency graph.
//! A node only carries topology and bookkeeping; the typed value of an
//! observable or computed lives in its handle.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexSet;
use slotmap::new_key_type;
use smallvec::SmallVec;

use crate::error::Result;

new_key_type! {
    /// Stable identifier for a node in the dependency graph.
    pub struct NodeId;
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// An observable cell or atom. These are the roots of the graph:
    /// they have subscribers but no dependencies.
    Observable,

    /// A computed value. It has dependencies and may have subscribers.
    Computed,

    /// A reaction. These are leaves: dependencies, no subscribers.
    Reaction,
}

/// Dirty state of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirtyState {
    /// The cached value is up to date.
    Clean,

    /// A dependency was written since the last evaluation.
    Dirty,
}

/// Body of a reaction, shared so the scheduler can call it without
/// holding a borrow of the graph.
pub(crate) type ReactionFn = Rc<dyn Fn() -> Result<()>>;

/// A node in the dependency graph.
pub struct Node {
    kind: NodeKind,
    dirty: DirtyState,

    /// Nodes this node read during its last evaluation.
    dependencies: SmallVec<[NodeId; 4]>,

    /// Nodes that read this node during their last evaluation.
    subscribers: IndexSet<NodeId>,

    name: Option<String>,
    reaction: Option<ReactionFn>,
    run_count: usize,
}

impl Node {
    /// Create a new node with the given kind.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            dirty: match kind {
                NodeKind::Observable => DirtyState::Clean,
                // Start dirty so the first read evaluates.
                NodeKind::Computed | NodeKind::Reaction => DirtyState::Dirty,
            },
            dependencies: SmallVec::new(),
            subscribers: IndexSet::new(),
            name: None,
            reaction: None,
            run_count: 0,
        }
    }

    pub fn observable() -> Self {
        Self::new(NodeKind::Observable)
    }

    pub fn computed() -> Self {
        Self::new(NodeKind::Computed)
    }

    pub(crate) fn reaction(body: ReactionFn, name: Option<String>) -> Self {
        let mut node = Self::new(NodeKind::Reaction);
        node.reaction = Some(body);
        node.name = name;
        node
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn dirty_state(&self) -> DirtyState {
        self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty == DirtyState::Dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = DirtyState::Clean;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = DirtyState::Dirty;
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn reaction_fn(&self) -> Option<ReactionFn> {
        self.reaction.clone()
    }

    pub fn run_count(&self) -> usize {
        self.run_count
    }

    pub(crate) fn record_run(&mut self) {
        self.run_count += 1;
    }

    /// Add a dependency. Returns false if it was already present.
    pub fn add_dependency(&mut self, id: NodeId) -> bool {
        if self.dependencies.contains(&id) {
            return false;
        }
        self.dependencies.push(id);
        true
    }

    /// Append a dependency the caller knows is new.
    pub(crate) fn push_dependency(&mut self, id: NodeId) {
        self.dependencies.push(id);
    }

    pub fn remove_dependency(&mut self, id: NodeId) {
        self.dependencies.retain(|dep| *dep != id);
    }

    pub fn dependencies(&self) -> &[NodeId] {
        &self.dependencies
    }

    pub(crate) fn take_dependencies(&mut self) -> SmallVec<[NodeId; 4]> {
        std::mem::take(&mut self.dependencies)
    }

    /// Add a subscriber. Returns false if it was already present.
    pub fn add_subscriber(&mut self, id: NodeId) -> bool {
        self.subscribers.insert(id)
    }

    /// Remove a subscriber. Does not preserve the order of the others.
    pub fn remove_subscriber(&mut self, id: NodeId) {
        self.subscribers.swap_remove(&id);
    }

    pub fn subscribers(&self) -> &IndexSet<NodeId> {
        &self.subscribers
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("dirty", &self.dirty)
            .field("name", &self.name)
            .field("dependencies", &self.dependencies.len())
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
