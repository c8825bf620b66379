//! Dependency Tracker
//!
//! The tracker records which computation is currently running, so that a
//! read can register that computation as a subscriber of whatever it read.
//!
//! # Implementation
//!
//! Each runtime owns one stack of frames. Entering a computed or reaction
//! pushes an owner frame; the returned guard pops it when dropped. Because
//! the pop lives in `Drop`, the stack stays balanced on early return, on
//! `?` propagation and while unwinding.
//!
//! Nested frames are expected: a reaction reading a computed that reads a
//! cell runs three levels deep, and each read is attributed to the
//! innermost owner only. An untracked frame shadows every owner below it.

use std::cell::RefCell;

use crate::graph::{NodeId, NodeKind};

/// One entry of the tracking stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// A computed or reaction is evaluating; reads subscribe it.
    Owner(NodeId, NodeKind),

    /// Reads inside this frame create no edges.
    Untracked,
}

/// Stack of currently evaluating computations.
#[derive(Debug, Default)]
pub struct Tracker {
    stack: RefCell<Vec<Frame>>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an owner frame for the given node.
    ///
    /// The frame is popped when the returned guard is dropped.
    pub fn enter(&self, id: NodeId, kind: NodeKind) -> TrackingGuard<'_> {
        self.push(Frame::Owner(id, kind))
    }

    /// Push a frame under which reads are not tracked.
    pub fn enter_untracked(&self) -> TrackingGuard<'_> {
        self.push(Frame::Untracked)
    }

    fn push(&self, frame: Frame) -> TrackingGuard<'_> {
        self.stack.borrow_mut().push(frame);
        TrackingGuard {
            tracker: self,
            frame,
        }
    }

    /// The node that a read right now would subscribe, if any.
    pub fn current_owner(&self) -> Option<NodeId> {
        match self.stack.borrow().last() {
            Some(Frame::Owner(id, _)) => Some(*id),
            _ => None,
        }
    }

    /// Whether a read right now would be tracked.
    pub fn is_active(&self) -> bool {
        self.current_owner().is_some()
    }

    /// Whether `id` is evaluating anywhere on the stack.
    pub fn contains(&self, id: NodeId) -> bool {
        self.stack
            .borrow()
            .iter()
            .any(|frame| matches!(frame, Frame::Owner(owner, _) if *owner == id))
    }

    /// The innermost owner frame, looking through untracked frames.
    pub fn innermost_owner(&self) -> Option<(NodeId, NodeKind)> {
        self.stack.borrow().iter().rev().find_map(|frame| match frame {
            Frame::Owner(id, kind) => Some((*id, *kind)),
            Frame::Untracked => None,
        })
    }

    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }
}

/// Guard that pops its frame when dropped.
pub struct TrackingGuard<'a> {
    tracker: &'a Tracker,
    frame: Frame,
}

impl Drop for TrackingGuard<'_> {
    fn drop(&mut self) {
        let popped = self.tracker.stack.borrow_mut().pop();

        debug_assert_eq!(
            popped,
            Some(self.frame),
            "tracking stack mismatch: expected {:?}, got {:?}",
            self.frame,
            popped
        );
    }
}
