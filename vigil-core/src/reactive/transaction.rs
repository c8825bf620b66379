//! Transaction state.
//!
//! A transaction is a depth counter plus the set of reactions waiting for
//! the outermost batch to close. Only the `end` that brings the depth back
//! to zero reports that a drain is due, and nothing drains while a drain
//! is already in progress, so N writes inside one batch run each affected
//! reaction at most once.

use std::cell::{Cell, RefCell};

use indexmap::IndexSet;

use crate::graph::NodeId;

#[derive(Debug, Default)]
pub struct Transaction {
    depth: Cell<usize>,
    action_depth: Cell<usize>,
    draining: Cell<bool>,
    pending: RefCell<IndexSet<NodeId>>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) {
        self.depth.set(self.depth.get() + 1);
    }

    /// Close one batch level.
    ///
    /// Returns true when the caller should drain: the outermost batch just
    /// closed, no drain is running and reactions are waiting.
    pub fn end(&self) -> bool {
        let depth = self.depth.get().saturating_sub(1);
        self.depth.set(depth);
        depth == 0 && !self.draining.get() && !self.pending.borrow().is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    pub fn is_open(&self) -> bool {
        self.depth.get() > 0
    }

    pub fn begin_action(&self) {
        self.action_depth.set(self.action_depth.get() + 1);
    }

    pub fn end_action(&self) {
        self.action_depth.set(self.action_depth.get().saturating_sub(1));
    }

    pub fn in_action(&self) -> bool {
        self.action_depth.get() > 0
    }

    pub fn is_draining(&self) -> bool {
        self.draining.get()
    }

    pub fn set_draining(&self, draining: bool) {
        self.draining.set(draining);
    }

    /// Queue a reaction. Returns false if it was already queued.
    pub fn enqueue(&self, id: NodeId) -> bool {
        self.pending.borrow_mut().insert(id)
    }

    pub fn dequeue(&self, id: NodeId) -> bool {
        self.pending.borrow_mut().shift_remove(&id)
    }

    pub fn is_pending(&self, id: NodeId) -> bool {
        self.pending.borrow().contains(&id)
    }

    pub fn pending_len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Take every queued reaction, leaving the set empty.
    pub fn take_pending(&self) -> IndexSet<NodeId> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }
}
