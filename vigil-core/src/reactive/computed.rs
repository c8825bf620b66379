//! Computed Values
//!
//! A [`Computed`] is a cached derived value that re-evaluates only after
//! one of the values it read has changed.
//!
//! # How Computed Values Work
//!
//! 1. Nothing runs at construction. The first `get()` evaluates.
//!
//! 2. While clean, `get()` returns the cached value.
//!
//! 3. When something it read is written, the node is marked dirty at once,
//!    and so is everything downstream of it. No evaluation happens yet.
//!
//! 4. The next `get()` drops the old dependency set, evaluates again and
//!    records whatever this run reads. A branch that stopped reading a cell
//!    stops depending on it.
//!
//! # Failure Modes
//!
//! - **Self-read**: reading a computed while it is evaluating, directly or
//!   through other computed values, fails with
//!   [`ReactiveError::Cycle`](crate::ReactiveError::Cycle).
//! - **Writes**: a computed function that writes an observable gets
//!   [`ReactiveError::WriteDuringComputation`](crate::ReactiveError::WriteDuringComputation).
//!
//! In both cases the node stays dirty and the previous cache is kept.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::error::{ReactiveError, Result};
use crate::graph::{Node, NodeId, NodeKind};

use super::runtime::Runtime;

type ComputeFn<T> = Box<dyn Fn() -> Result<T>>;

struct ComputedInner<T> {
    runtime: Runtime,
    id: NodeId,
    compute: ComputeFn<T>,
    cached: RefCell<Option<T>>,
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        self.runtime.release(self.id);
    }
}

/// A lazily evaluated, memoized derivation.
///
/// Cloning the handle shares the cache.
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Computed<T> {
    pub(crate) fn new<F>(runtime: &Runtime, compute: F) -> Self
    where
        F: Fn() -> Result<T> + 'static,
    {
        let id = runtime.register(Node::computed());
        Self {
            inner: Rc::new(ComputedInner {
                runtime: runtime.clone(),
                id,
                compute: Box::new(compute),
                cached: RefCell::new(None),
            }),
        }
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Read the value, evaluating first if it is dirty.
    pub fn get(&self) -> Result<T> {
        let runtime = &self.inner.runtime;
        let id = self.inner.id;

        if runtime.is_evaluating(id) {
            return Err(ReactiveError::Cycle { node: id });
        }
        runtime.report_read(id);

        if !runtime.is_dirty(id) {
            if let Some(value) = self.inner.cached.borrow().as_ref() {
                trace!(computed = ?id, "cache hit");
                return Ok(value.clone());
            }
        }

        debug!(computed = ?id, "recomputing");
        let value = runtime.evaluate(id, NodeKind::Computed, || (self.inner.compute)())?;

        let previous = self.inner.cached.replace(Some(value.clone()));
        drop(previous);
        runtime.mark_clean(id);
        Ok(value)
    }

    /// Whether the next `get()` will evaluate.
    pub fn is_dirty(&self) -> bool {
        self.inner.runtime.is_dirty(self.inner.id)
    }

    /// Whether a value has ever been cached.
    pub fn has_value(&self) -> bool {
        self.inner.cached.borrow().is_some()
    }

    pub fn dependency_count(&self) -> usize {
        self.inner
            .runtime
            .with_node(self.inner.id, |node| node.dependencies().len())
            .unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .runtime
            .with_node(self.inner.id, |node| node.subscribers().len())
            .unwrap_or(0)
    }
}

impl<T: fmt::Debug> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.inner.id)
            .field("cached", &*self.inner.cached.borrow())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
