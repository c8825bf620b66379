//! Reactions
//!
//! A reaction is a side-effecting computation that runs again whenever
//! something it read changes. A view's render pass is the typical body.
//!
//! # How Reactions Work
//!
//! 1. When created, the reaction runs immediately to collect its
//!    dependencies (unless deferred).
//!
//! 2. When a dependency changes, the reaction is queued. It runs when the
//!    outermost batch closes, after every write in that batch committed.
//!
//! 3. Before each run the old dependencies are dropped; the run records a
//!    fresh set.
//!
//! # Differences from Computed
//!
//! - Computed values return a value; reactions do not.
//! - Computed values are lazy; reactions are eager.
//!
//! # Disposal
//!
//! A reaction lives until [`Reaction::dispose`] (or [`Disposer::dispose`])
//! is called. Disposal unsubscribes it everywhere and removes it from the
//! pending queue. A reaction that is never disposed keeps its captured
//! handles, and with them its runtime, alive.

use std::fmt;
use std::ops::Deref;

use crate::error::ReactiveError;
use crate::graph::NodeId;

use super::runtime::Runtime;

/// Options for [`Runtime::autorun_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReactionOptions {
    /// Carried into logs and [`ReactionFailure`].
    pub name: Option<String>,

    /// Register without running; call [`Reaction::run`] to start.
    pub defer: bool,
}

impl ReactionOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            defer: false,
        }
    }

    pub fn deferred(mut self) -> Self {
        self.defer = true;
        self
    }
}

/// What the error hook receives when a reaction body fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionFailure {
    pub reaction: NodeId,
    pub name: Option<String>,
    pub error: ReactiveError,
}

/// Handle to a registered reaction.
#[derive(Clone)]
pub struct Reaction {
    runtime: Runtime,
    id: NodeId,
}

impl Reaction {
    pub(crate) fn new(runtime: Runtime, id: NodeId) -> Self {
        Self { runtime, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Run the body now. Does nothing once disposed.
    pub fn run(&self) {
        self.runtime.run_reaction(self.id);
    }

    /// Unsubscribe everywhere and never run again. Idempotent.
    pub fn dispose(&self) {
        self.runtime.dispose_reaction(self.id);
    }

    pub fn is_disposed(&self) -> bool {
        self.runtime.with_node(self.id, |_| ()).is_none()
    }

    /// Whether the reaction is queued to run when the current batch closes.
    pub fn is_pending(&self) -> bool {
        self.runtime.is_pending(self.id)
    }

    /// Completed runs, including failed ones.
    pub fn run_count(&self) -> usize {
        self.runtime
            .with_node(self.id, |node| node.run_count())
            .unwrap_or(0)
    }

    pub fn dependency_count(&self) -> usize {
        self.runtime
            .with_node(self.id, |node| node.dependencies().len())
            .unwrap_or(0)
    }

    pub fn name(&self) -> Option<String> {
        self.runtime
            .with_node(self.id, |node| node.name().map(str::to_owned))
            .flatten()
    }
}

impl fmt::Debug for Reaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reaction")
            .field("id", &self.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Returned by `autorun`; call [`dispose`](Self::dispose) when the owner
/// goes away.
#[must_use = "a reaction runs until it is disposed"]
#[derive(Debug, Clone)]
pub struct Disposer {
    reaction: Reaction,
}

impl Disposer {
    pub(crate) fn new(reaction: Reaction) -> Self {
        Self { reaction }
    }

    pub fn dispose(&self) {
        self.reaction.dispose();
    }

    pub fn reaction(&self) -> &Reaction {
        &self.reaction
    }

    /// Turn the disposer into a plain callback.
    pub fn into_fn(self) -> impl FnOnce() {
        move || self.dispose()
    }
}

impl Deref for Disposer {
    type Target = Reaction;

    fn deref(&self) -> &Reaction {
        &self.reaction
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use crate::error::Result;

    fn counter() -> Rc<Cell<usize>> {
        Rc::new(Cell::new(0))
    }

    #[test]
    fn runs_on_creation() {
        let rt = Runtime::new();
        let runs = counter();
        let disposer = {
            let runs = runs.clone();
            rt.autorun(move || runs.set(runs.get() + 1))
        };

        assert_eq!(runs.get(), 1);
        assert_eq!(disposer.reaction().run_count(), 1);
    }

    #[test]
    fn deferred_does_not_run_on_creation() {
        let rt = Runtime::new();
        let runs = counter();
        let reaction = {
            let runs = runs.clone();
            rt.autorun_with(ReactionOptions::named("late").deferred(), move || {
                runs.set(runs.get() + 1);
                Ok(())
            })
        };

        assert_eq!(runs.get(), 0);
        assert_eq!(reaction.name().as_deref(), Some("late"));

        reaction.run();
        assert_eq!(runs.get(), 1);
        assert_eq!(reaction.run_count(), 1);
    }

    #[test]
    fn dependencies_are_retracked_each_run() {
        let rt = Runtime::new();
        let flag = rt.cell(true);
        let left = rt.cell(1);
        let right = rt.cell(2);
        let runs = counter();

        let disposer = {
            let (flag, left, right, runs) = (flag.clone(), left.clone(), right.clone(), runs.clone());
            rt.autorun(move || {
                runs.set(runs.get() + 1);
                if flag.get() {
                    left.get();
                } else {
                    right.get();
                }
            })
        };
        assert_eq!(disposer.reaction().dependency_count(), 2);

        flag.set(false).unwrap();
        assert_eq!(runs.get(), 2);

        left.set(10).unwrap();
        assert_eq!(runs.get(), 2);
        right.set(20).unwrap();
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn disposal_stops_future_runs() {
        let rt = Runtime::new();
        let value = rt.cell(0);
        let runs = counter();

        let disposer = {
            let (value, runs) = (value.clone(), runs.clone());
            rt.autorun(move || {
                value.get();
                runs.set(runs.get() + 1);
            })
        };

        disposer.dispose();
        assert!(disposer.reaction().is_disposed());
        assert_eq!(value.subscriber_count(), 0);

        value.set(1).unwrap();
        disposer.reaction().run();
        assert_eq!(runs.get(), 1);

        // second dispose is harmless
        disposer.dispose();
    }

    #[test]
    fn disposal_mid_batch_drops_pending_run() {
        let rt = Runtime::new();
        let value = rt.cell(0);
        let runs = counter();

        let disposer = {
            let (value, runs) = (value.clone(), runs.clone());
            rt.autorun(move || {
                value.get();
                runs.set(runs.get() + 1);
            })
        };

        rt.transaction(|| {
            value.set(1).unwrap();
            assert_eq!(rt.pending_reactions(), 1);
            assert!(disposer.is_pending());
            disposer.dispose();
            assert_eq!(rt.pending_reactions(), 0);
        });
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn failures_reach_the_hook_and_reaction_stays_live() {
        let rt = Runtime::new();
        let failures: Rc<RefCell<Vec<ReactionFailure>>> = Rc::default();
        {
            let failures = failures.clone();
            rt.on_reaction_error(move |failure| failures.borrow_mut().push(failure.clone()));
        }

        let value = rt.cell(0);
        let disposer = {
            let value = value.clone();
            rt.autorun_with(ReactionOptions::named("render"), move || -> Result<()> {
                if value.get() == 1 {
                    return Err(ReactiveError::reaction("bad value"));
                }
                Ok(())
            })
        };

        value.set(1).unwrap();
        assert_eq!(failures.borrow().len(), 1);
        assert_eq!(failures.borrow()[0].name.as_deref(), Some("render"));
        assert_eq!(failures.borrow()[0].reaction, disposer.id());
        assert!(!disposer.is_disposed());

        value.set(2).unwrap();
        assert_eq!(disposer.run_count(), 3);
        assert_eq!(failures.borrow().len(), 1);
    }

    #[test]
    fn failure_does_not_stop_sibling_reactions() {
        let rt = Runtime::new();
        let value = rt.cell(0);
        let runs = counter();

        let _failing = {
            let value = value.clone();
            rt.try_autorun(move || {
                value.get();
                Err(ReactiveError::reaction("always"))
            })
        };
        let _sibling = {
            let (value, runs) = (value.clone(), runs.clone());
            rt.autorun(move || {
                value.get();
                runs.set(runs.get() + 1);
            })
        };

        value.set(1).unwrap();
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn panicking_reaction_does_not_stop_the_drain() {
        let rt = Runtime::new();
        let failures: Rc<RefCell<Vec<ReactionFailure>>> = Rc::default();
        {
            let failures = failures.clone();
            rt.on_reaction_error(move |failure| failures.borrow_mut().push(failure.clone()));
        }

        let value = rt.cell(0);
        let runs = counter();
        let panicky = {
            let value = value.clone();
            rt.autorun(move || {
                if value.get() == 1 {
                    panic!("row 1 is broken");
                }
            })
        };
        let _sibling = {
            let (value, runs) = (value.clone(), runs.clone());
            rt.autorun(move || {
                value.get();
                runs.set(runs.get() + 1);
            })
        };

        assert!(value.set(1).unwrap());
        assert_eq!(runs.get(), 2);
        assert_eq!(rt.pending_reactions(), 0);
        assert_eq!(failures.borrow().len(), 1);
        assert_eq!(
            failures.borrow()[0].error,
            ReactiveError::reaction("panicked: row 1 is broken")
        );

        // still subscribed, and runs normally once the value is fixed
        value.set(2).unwrap();
        assert_eq!(panicky.run_count(), 3);
        assert_eq!(runs.get(), 3);
        assert_eq!(failures.borrow().len(), 1);
    }

    #[test]
    fn writes_inside_a_reaction_are_batched() {
        let rt = Runtime::new();
        let source = rt.cell(1);
        let mirror = rt.cell(0);
        let mirror_runs = counter();

        let _copy = {
            let (source, mirror) = (source.clone(), mirror.clone());
            rt.try_autorun(move || {
                mirror.set(source.get() * 10)?;
                Ok(())
            })
        };
        let _watch = {
            let (mirror, runs) = (mirror.clone(), mirror_runs.clone());
            rt.autorun(move || {
                mirror.get();
                runs.set(runs.get() + 1);
            })
        };
        assert_eq!(mirror.get(), 10);

        source.set(2).unwrap();
        assert_eq!(mirror.get(), 20);
        assert_eq!(mirror_runs.get(), 2);
    }

    #[test]
    fn runaway_reactions_are_stopped() {
        use crate::config::RuntimeConfig;

        let rt = Runtime::with_config(RuntimeConfig::default().with_max_reaction_iterations(5));
        let failures: Rc<RefCell<Vec<ReactionFailure>>> = Rc::default();
        {
            let failures = failures.clone();
            rt.on_reaction_error(move |failure| failures.borrow_mut().push(failure.clone()));
        }

        let value = rt.cell(0);
        let _looping = {
            let value = value.clone();
            rt.try_autorun(move || {
                let current = value.get();
                value.set(current + 1)?;
                Ok(())
            })
        };

        assert_eq!(failures.borrow().len(), 1);
        assert_eq!(
            failures.borrow()[0].error,
            ReactiveError::ReactionLoop { iterations: 5 }
        );
        assert_eq!(rt.pending_reactions(), 0);
    }

    #[test]
    fn data_reaction_fires_only_on_change() {
        let rt = Runtime::new();
        let price = rt.cell(100);
        let seen: Rc<RefCell<Vec<bool>>> = Rc::default();

        let _expensive = {
            let price = price.clone();
            let seen = seen.clone();
            rt.reaction(
                move || Ok(price.get() > 150),
                move |expensive| {
                    seen.borrow_mut().push(*expensive);
                    Ok(())
                },
            )
        };
        assert!(seen.borrow().is_empty());

        price.set(120).unwrap();
        assert!(seen.borrow().is_empty());

        price.set(200).unwrap();
        price.set(300).unwrap();
        assert_eq!(*seen.borrow(), vec![true]);
    }

    #[test]
    fn into_fn_disposes() {
        let rt = Runtime::new();
        let disposer = rt.autorun(|| {});
        let reaction = disposer.reaction().clone();

        let dispose = disposer.into_fn();
        dispose();
        assert!(reaction.is_disposed());
    }
}
