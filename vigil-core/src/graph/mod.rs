//! Dependency Graph
//!
//! This module implements the arena that records relationships between
//! observables, computed values and reactions.
//!
//! # Overview
//!
//! - Nodes represent observables, computed values or reactions.
//! - Edges represent reads: if A read B during its last evaluation, B lists
//!   A as a subscriber and A lists B as a dependency.
//!
//! When an observable changes, the graph marks the computed values that
//! transitively read it as dirty and reports which reactions were reached.
//! Recomputation itself is left to the reactive layer.
//!
//! # Design Decisions
//!
//! 1. Nodes live in a slot map and reference each other by [`NodeId`].
//!    Subscriber back-edges are plain indices, so there are no reference
//!    cycles to break when a node goes away.
//!
//! 2. Both directions of every edge are stored, so a node can be detached
//!    from its dependencies in time proportional to their number.

mod node;
mod store;

pub use node::{DirtyState, Node, NodeId, NodeKind};
pub(crate) use node::ReactionFn;
pub use store::Graph;
