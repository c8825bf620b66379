//! Reactive Primitives
//!
//! This module implements the engine itself: observables, computed values,
//! reactions, the dependency tracker and batching.
//!
//! # Concepts
//!
//! ## Observables
//!
//! An [`Observable`] holds mutable state. Reading it inside a computed or
//! reaction registers that computation as a subscriber; writing a new value
//! invalidates every subscriber. Writing an equal value does nothing.
//!
//! ## Computed values
//!
//! A [`Computed`] caches a derivation. Invalidation marks it dirty right
//! away; it re-evaluates only when read again.
//!
//! ## Reactions
//!
//! A [`Reaction`] re-runs a side effect whenever something it read changes.
//! Reactions run when the outermost batch closes, at most once per batch.
//!
//! # Implementation Notes
//!
//! Each [`Runtime`] owns its own tracking stack. When a computation runs, its
//! node is pushed on the stack and every read made meanwhile is recorded as
//! one of its dependencies. Dependencies are rebuilt from scratch on each
//! run, so conditional reads never leave stale edges behind.

mod computed;
mod context;
mod observable;
mod reaction;
mod runtime;
mod transaction;

pub use computed::Computed;
pub use context::{Frame, Tracker, TrackingGuard};
pub use observable::{Atom, Observable};
pub use reaction::{Disposer, Reaction, ReactionFailure, ReactionOptions};
pub use runtime::{Batch, Runtime};
