//! Reactive Runtime
//!
//! The runtime is the central coordinator that connects observables,
//! computed values and reactions. It owns the dependency graph, the
//! tracking stack and the transaction state of one reactive world.
//!
//! # How It Works
//!
//! 1. When an observable is read inside a computed or reaction, the
//!    runtime links the two in the graph.
//!
//! 2. When an observable is written, the runtime:
//!    a. Opens a batch (writes always go through one)
//!    b. Marks the computed values that read it, directly or not, dirty
//!    c. Queues the reactions reached
//!    d. Closes the batch; if it was the outermost one, runs the queue
//!
//! 3. Computed values are lazy: they recompute on their next read.
//!
//! # Ownership
//!
//! A [`Runtime`] is a cheap handle around shared state. Every handle it
//! creates keeps the runtime alive, and two runtimes never share nodes, so
//! independent runtimes (one per test, say) cannot observe each other.
//! The runtime is single-threaded: it is neither `Send` nor `Sync`.

use std::cell::RefCell;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::{debug, error, trace, warn};

use crate::config::{EnforceActions, RuntimeConfig};
use crate::container::{ObservableList, ObservableMap, ObservableObject, ObservableValue};
use crate::error::{ReactiveError, Result};
use crate::graph::{Graph, Node, NodeId, NodeKind, ReactionFn};

use super::computed::Computed;
use super::context::Tracker;
use super::observable::{Atom, Observable};
use super::reaction::{Disposer, Reaction, ReactionFailure, ReactionOptions};
use super::transaction::Transaction;

type ErrorHook = Rc<dyn Fn(&ReactionFailure)>;

pub(crate) struct RuntimeInner {
    graph: RefCell<Graph>,
    tracker: Tracker,
    transaction: Transaction,
    config: RuntimeConfig,
    error_hook: RefCell<Option<ErrorHook>>,
}

/// Handle to one reactive world.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("nodes", &self.node_count())
            .field("batch_depth", &self.inner.transaction.depth())
            .field("pending", &self.pending_reactions())
            .field("draining", &self.inner.transaction.is_draining())
            .finish()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                graph: RefCell::new(Graph::new()),
                tracker: Tracker::new(),
                transaction: Transaction::new(),
                config,
                error_hook: RefCell::new(None),
            }),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// Whether both handles point at the same runtime.
    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> Weak<RuntimeInner> {
        Rc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<RuntimeInner>) -> Option<Runtime> {
        weak.upgrade().map(|inner| Runtime { inner })
    }

    // ------------------------------------------------------------------
    // Factories
    // ------------------------------------------------------------------

    /// Create an observable cell compared with `PartialEq` on write.
    pub fn cell<T>(&self, value: T) -> Observable<T>
    where
        T: Clone + PartialEq + 'static,
    {
        Observable::new(self, value, |a: &T, b: &T| a == b)
    }

    /// Create an observable cell with a custom "did it change" test.
    pub fn cell_with_equality<T, F>(&self, value: T, equals: F) -> Observable<T>
    where
        T: Clone + 'static,
        F: Fn(&T, &T) -> bool + 'static,
    {
        Observable::new(self, value, equals)
    }

    /// Create a value-less observable.
    pub fn atom(&self) -> Atom {
        Atom::new(self)
    }

    /// Create a lazily evaluated, memoized derivation.
    pub fn computed<T, F>(&self, compute: F) -> Computed<T>
    where
        T: Clone + 'static,
        F: Fn() -> Result<T> + 'static,
    {
        Computed::new(self, compute)
    }

    /// Create a reaction and run it once to collect its dependencies.
    pub fn autorun<F>(&self, run: F) -> Disposer
    where
        F: Fn() + 'static,
    {
        self.try_autorun(move || {
            run();
            Ok(())
        })
    }

    /// Like [`autorun`](Self::autorun) for bodies that can fail. Failures
    /// go to the error hook; the reaction stays live.
    pub fn try_autorun<F>(&self, run: F) -> Disposer
    where
        F: Fn() -> Result<()> + 'static,
    {
        Disposer::new(self.autorun_with(ReactionOptions::default(), run))
    }

    /// Create a reaction with explicit options.
    pub fn autorun_with<F>(&self, options: ReactionOptions, run: F) -> Reaction
    where
        F: Fn() -> Result<()> + 'static,
    {
        let body: ReactionFn = Rc::new(run);
        let id = self
            .inner
            .graph
            .borrow_mut()
            .insert(Node::reaction(body, options.name));
        debug!(reaction = ?id, deferred = options.defer, "reaction created");

        let reaction = Reaction::new(self.clone(), id);
        if !options.defer {
            self.run_reaction(id);
        }
        reaction
    }

    /// Track `data` and call `effect` with its result whenever that result
    /// changes. The effect does not run for the initial value and its own
    /// reads are not tracked.
    pub fn reaction<D, F, E>(&self, data: F, effect: E) -> Disposer
    where
        D: PartialEq + 'static,
        F: Fn() -> Result<D> + 'static,
        E: Fn(&D) -> Result<()> + 'static,
    {
        let weak = self.downgrade();
        let previous: RefCell<Option<D>> = RefCell::new(None);

        self.try_autorun(move || {
            let next = data()?;
            let changed = match previous.borrow().as_ref() {
                Some(prev) => prev != &next,
                None => false,
            };

            if changed {
                if let Some(rt) = Runtime::upgrade(&weak) {
                    rt.untracked(|| effect(&next))?;
                }
            }
            previous.replace(Some(next));
            Ok(())
        })
    }

    /// Wrap a plain JSON value; objects and arrays become containers,
    /// recursively.
    pub fn observable(&self, value: serde_json::Value) -> ObservableValue {
        ObservableValue::from_json(self, value)
    }

    pub fn object(&self) -> ObservableObject {
        ObservableObject::new(self)
    }

    pub fn list<T>(&self, items: impl IntoIterator<Item = T>) -> ObservableList<T>
    where
        T: Clone + PartialEq + 'static,
    {
        ObservableList::from_iter_in(self, items)
    }

    pub fn map<K, V>(&self) -> ObservableMap<K, V>
    where
        K: std::hash::Hash + Eq + Clone + 'static,
        V: Clone + PartialEq + 'static,
    {
        ObservableMap::new(self)
    }

    // ------------------------------------------------------------------
    // Scopes
    // ------------------------------------------------------------------

    /// Open a batch. Reactions invalidated while it is open run once,
    /// after the outermost batch closes.
    pub fn batch(&self) -> Batch<'_> {
        self.inner.transaction.begin();
        Batch { runtime: self }
    }

    /// Run `f` inside a batch.
    pub fn transaction<R>(&self, f: impl FnOnce() -> R) -> R {
        let _batch = self.batch();
        f()
    }

    /// Run `f` as an action: batched, untracked, and allowed to write
    /// under [`EnforceActions::Always`].
    pub fn run_in_action<R>(&self, f: impl FnOnce() -> R) -> R {
        let _batch = self.batch();
        let _action = ActionScope::enter(&self.inner.transaction);
        let _untracked = self.inner.tracker.enter_untracked();
        f()
    }

    /// Run `f` without subscribing the current computation to its reads.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _untracked = self.inner.tracker.enter_untracked();
        f()
    }

    /// Install the hook that receives reaction failures.
    pub fn on_reaction_error(&self, hook: impl Fn(&ReactionFailure) + 'static) {
        *self.inner.error_hook.borrow_mut() = Some(Rc::new(hook));
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Whether a read right now would be tracked.
    pub fn is_tracking(&self) -> bool {
        self.inner.tracker.is_active()
    }

    pub fn is_batching(&self) -> bool {
        self.inner.transaction.is_open()
    }

    pub fn in_action(&self) -> bool {
        self.inner.transaction.in_action()
    }

    pub fn pending_reactions(&self) -> usize {
        self.inner.transaction.pending_len()
    }

    /// Number of live nodes (cells, atoms, computed values, reactions).
    pub fn node_count(&self) -> usize {
        self.inner.graph.borrow().len()
    }

    // ------------------------------------------------------------------
    // Node bookkeeping used by the handles
    // ------------------------------------------------------------------

    pub(crate) fn register(&self, node: Node) -> NodeId {
        self.inner.graph.borrow_mut().insert(node)
    }

    /// Forget a node. Safe to call from `Drop`.
    pub(crate) fn release(&self, id: NodeId) {
        self.inner.transaction.dequeue(id);

        let removed = match self.inner.graph.try_borrow_mut() {
            Ok(mut graph) => graph.remove(id),
            Err(_) => {
                warn!(node = ?id, "graph busy, node not released");
                None
            }
        };
        // Dropped outside the borrow: a reaction body may own handles
        // whose own drop comes back here.
        drop(removed);
    }

    pub(crate) fn with_node<R>(&self, id: NodeId, f: impl FnOnce(&Node) -> R) -> Option<R> {
        self.inner.graph.borrow().get(id).map(f)
    }

    pub(crate) fn is_dirty(&self, id: NodeId) -> bool {
        self.with_node(id, Node::is_dirty).unwrap_or(true)
    }

    pub(crate) fn mark_clean(&self, id: NodeId) {
        if let Some(node) = self.inner.graph.borrow_mut().get_mut(id) {
            node.mark_clean();
        }
    }

    pub(crate) fn is_pending(&self, id: NodeId) -> bool {
        self.inner.transaction.is_pending(id)
    }

    pub(crate) fn is_evaluating(&self, id: NodeId) -> bool {
        self.inner.tracker.contains(id)
    }

    /// Subscribe the current computation, if any, to `id`.
    pub(crate) fn report_read(&self, id: NodeId) {
        if let Some(owner) = self.inner.tracker.current_owner() {
            self.inner.graph.borrow_mut().link(id, owner);
        }
    }

    /// Evaluate `f` as node `id`: drop its old dependencies, then record
    /// every read made during `f` as a fresh one.
    pub(crate) fn evaluate<R>(&self, id: NodeId, kind: NodeKind, f: impl FnOnce() -> R) -> R {
        self.inner.graph.borrow_mut().detach(id);
        let _frame = self.inner.tracker.enter(id, kind);
        f()
    }

    /// Reject writes that the current context does not allow.
    pub(crate) fn check_write(&self, id: NodeId) -> Result<()> {
        if let Some((computed, NodeKind::Computed)) = self.inner.tracker.innermost_owner() {
            return Err(ReactiveError::WriteDuringComputation {
                observable: id,
                computed,
            });
        }

        if self.inner.transaction.in_action() {
            return Ok(());
        }
        match self.inner.config.enforce_actions {
            EnforceActions::Never => Ok(()),
            EnforceActions::Always => Err(ReactiveError::WriteOutsideAction { observable: id }),
            EnforceActions::Observed => {
                let observed = self
                    .with_node(id, |node| !node.subscribers().is_empty())
                    .unwrap_or(false);
                if observed {
                    warn!(observable = ?id, "observed value written outside an action");
                }
                Ok(())
            }
        }
    }

    /// Propagate a committed write of `id`.
    pub(crate) fn report_changed(&self, id: NodeId) {
        let _batch = self.batch();
        let reactions = self.inner.graph.borrow_mut().invalidate_from(id);
        trace!(observable = ?id, reactions = reactions.len(), "changed");

        for reaction in reactions {
            self.schedule(reaction);
        }
    }

    fn schedule(&self, id: NodeId) {
        if self.inner.transaction.is_open() {
            self.inner.transaction.enqueue(id);
        } else {
            self.run_reaction(id);
        }
    }

    // ------------------------------------------------------------------
    // Reactions
    // ------------------------------------------------------------------

    pub(crate) fn run_reaction(&self, id: NodeId) {
        let Some(body) = self.with_node(id, Node::reaction_fn).flatten() else {
            trace!(reaction = ?id, "skipping disposed reaction");
            return;
        };
        self.inner.transaction.dequeue(id);

        // Writes made by the body are queued until it returns.
        let _batch = self.batch();
        debug!(reaction = ?id, "running reaction");

        // A panicking body is a failed run like any other; the drain goes on.
        let result = catch_unwind(AssertUnwindSafe(|| {
            self.evaluate(id, NodeKind::Reaction, || body())
        }))
        .unwrap_or_else(|payload| Err(ReactiveError::from_panic(payload)));

        if let Some(node) = self.inner.graph.borrow_mut().get_mut(id) {
            node.record_run();
            node.mark_clean();
        }
        if let Err(error) = result {
            self.report_failure(id, error);
        }
    }

    pub(crate) fn dispose_reaction(&self, id: NodeId) {
        if self.with_node(id, Node::kind) != Some(NodeKind::Reaction) {
            return;
        }
        debug!(reaction = ?id, "reaction disposed");
        self.release(id);
    }

    fn report_failure(&self, id: NodeId, error: ReactiveError) {
        let name = self.with_node(id, |node| node.name().map(str::to_owned)).flatten();
        let failure = ReactionFailure {
            reaction: id,
            name,
            error,
        };

        let hook = self.inner.error_hook.borrow().clone();
        if self.inner.config.report_reaction_errors || hook.is_none() {
            warn!(
                reaction = ?failure.reaction,
                name = failure.name.as_deref().unwrap_or("<unnamed>"),
                error = %failure.error,
                "reaction failed"
            );
        }
        if let Some(hook) = hook {
            hook(&failure);
        }
    }

    /// Run queued reactions until none are left.
    fn drain(&self) {
        let _draining = DrainScope::enter(&self.inner.transaction);
        let limit = self.inner.config.max_reaction_iterations;
        let mut passes = 0;

        loop {
            let pending = self.inner.transaction.take_pending();
            if pending.is_empty() {
                break;
            }

            passes += 1;
            if passes > limit {
                error!(passes, pending = pending.len(), "reactions did not settle");
                for id in pending {
                    self.report_failure(id, ReactiveError::ReactionLoop { iterations: limit });
                }
                break;
            }

            debug!(pass = passes, pending = pending.len(), "draining reactions");
            for id in pending {
                self.run_reaction(id);
            }
        }
    }
}

/// An open batch. Closing the outermost batch runs queued reactions.
#[must_use = "the batch closes as soon as it is dropped"]
pub struct Batch<'a> {
    runtime: &'a Runtime,
}

impl Drop for Batch<'_> {
    fn drop(&mut self) {
        let drain = self.runtime.inner.transaction.end();
        // Reactions still queued during a panic run on the next drain.
        if drain && !std::thread::panicking() {
            self.runtime.drain();
        }
    }
}

struct ActionScope<'a>(&'a Transaction);

impl<'a> ActionScope<'a> {
    fn enter(transaction: &'a Transaction) -> Self {
        transaction.begin_action();
        Self(transaction)
    }
}

impl Drop for ActionScope<'_> {
    fn drop(&mut self) {
        self.0.end_action();
    }
}

struct DrainScope<'a>(&'a Transaction);

impl<'a> DrainScope<'a> {
    fn enter(transaction: &'a Transaction) -> Self {
        transaction.set_draining(true);
        Self(transaction)
    }
}

impl Drop for DrainScope<'_> {
    fn drop(&mut self) {
        self.0.set_draining(false);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
