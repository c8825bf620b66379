//! Observable Cells
//!
//! An [`Observable`] is the smallest unit of tracked state. It holds a value
//! and a node in the runtime's graph.
//!
//! # How Observables Work
//!
//! 1. Reading inside a computed or reaction subscribes that computation.
//!
//! 2. Writing a value that the cell's equality considers unchanged does
//!    nothing at all: no invalidation, no reaction runs.
//!
//! 3. Writing a different value invalidates every subscriber, then lets
//!    the scheduler run the reactions that were reached.
//!
//! An [`Atom`] is the same thing without a value, for containers that keep
//! their own storage and only need "someone looked" / "something changed".
//!
//! # Lifetime
//!
//! Handles are reference counted. The node leaves the graph when the last
//! handle is dropped.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::graph::{Node, NodeId};

use super::runtime::Runtime;

type Equality<T> = Box<dyn Fn(&T, &T) -> bool>;

struct CellInner<T> {
    runtime: Runtime,
    id: NodeId,
    value: RefCell<T>,
    equals: Equality<T>,
}

impl<T> Drop for CellInner<T> {
    fn drop(&mut self) {
        self.runtime.release(self.id);
    }
}

/// A tracked, mutable value.
///
/// Cloning the handle shares the cell.
pub struct Observable<T> {
    inner: Rc<CellInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Observable<T> {
    pub(crate) fn new<F>(runtime: &Runtime, value: T, equals: F) -> Self
    where
        F: Fn(&T, &T) -> bool + 'static,
    {
        let id = runtime.register(Node::observable());
        Self {
            inner: Rc::new(CellInner {
                runtime: runtime.clone(),
                id,
                value: RefCell::new(value),
                equals: Box::new(equals),
            }),
        }
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.runtime
    }

    /// Read the value, subscribing the current computation.
    pub fn get(&self) -> T {
        self.inner.runtime.report_read(self.inner.id);
        self.inner.value.borrow().clone()
    }

    /// Read the value without subscribing anything.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Write a value.
    ///
    /// Returns `Ok(false)` when the value is equal to the current one and
    /// nothing was notified.
    ///
    /// # Errors
    ///
    /// Fails when called from inside a computed function, or outside an
    /// action under [`EnforceActions::Always`](crate::EnforceActions::Always).
    pub fn set(&self, value: T) -> Result<bool> {
        let runtime = &self.inner.runtime;
        runtime.check_write(self.inner.id)?;

        if (self.inner.equals)(&*self.inner.value.borrow(), &value) {
            return Ok(false);
        }

        let previous = self.inner.value.replace(value);
        drop(previous);
        runtime.report_changed(self.inner.id);
        Ok(true)
    }

    /// Write a value derived from the current one.
    pub fn update<F>(&self, f: F) -> Result<bool>
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&*self.inner.value.borrow());
        self.set(next)
    }

    /// Notify subscribers without changing the value.
    pub(crate) fn touch(&self) -> Result<()> {
        let runtime = &self.inner.runtime;
        runtime.check_write(self.inner.id)?;
        runtime.report_changed(self.inner.id);
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .runtime
            .with_node(self.inner.id, |node| node.subscribers().len())
            .unwrap_or(0)
    }

    /// Whether both handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

struct AtomInner {
    runtime: Runtime,
    id: NodeId,
}

impl Drop for AtomInner {
    fn drop(&mut self) {
        self.runtime.release(self.id);
    }
}

/// A value-less observable.
#[derive(Clone)]
pub struct Atom {
    inner: Rc<AtomInner>,
}

impl Atom {
    pub(crate) fn new(runtime: &Runtime) -> Self {
        let id = runtime.register(Node::observable());
        Self {
            inner: Rc::new(AtomInner {
                runtime: runtime.clone(),
                id,
            }),
        }
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    /// Subscribe the current computation to this atom.
    pub fn report_observed(&self) {
        self.inner.runtime.report_read(self.inner.id);
    }

    /// Invalidate everything subscribed to this atom.
    pub fn report_changed(&self) -> Result<()> {
        self.inner.runtime.check_write(self.inner.id)?;
        self.inner.runtime.report_changed(self.inner.id);
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .runtime
            .with_node(self.inner.id, |node| node.subscribers().len())
            .unwrap_or(0)
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Atom").field("id", &self.inner.id).finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
