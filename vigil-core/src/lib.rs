//! Vigil Core
//!
//! This crate provides the reactive state engine behind Vigil stores.
//! It implements:
//!
//! - Observable cells and containers (lists, maps, JSON-shaped objects)
//! - Automatic dependency tracking
//! - Lazily evaluated, memoized computed values
//! - Reactions with transactional batching
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: the node arena and its dependency edges
//! - `reactive`: the runtime, tracker, scheduler and reactive handles
//! - `container`: observable lists, maps and objects
//! - `config`: runtime settings
//! - `error`: the error type shared by every fallible operation
//!
//! # Example
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use vigil_core::Runtime;
//!
//! let rt = Runtime::new();
//! let price = rt.cell(100.0);
//! let rate = rt.cell(1.12);
//!
//! let total = {
//!     let (price, rate) = (price.clone(), rate.clone());
//!     rt.computed(move || Ok(price.get() * rate.get()))
//! };
//!
//! let runs = Rc::new(Cell::new(0));
//! let reaction = {
//!     let (total, runs) = (total.clone(), runs.clone());
//!     rt.try_autorun(move || {
//!         total.get()?;
//!         runs.set(runs.get() + 1);
//!         Ok(())
//!     })
//! };
//!
//! rt.transaction(|| {
//!     price.set(200.0).unwrap();
//!     rate.set(1.12).unwrap();
//! });
//!
//! // one batch, one run
//! assert_eq!(runs.get(), 2);
//! reaction.dispose();
//! ```

pub mod config;
pub mod container;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::{EnforceActions, RuntimeConfig};
pub use container::{ObservableList, ObservableMap, ObservableObject, ObservableValue};
pub use error::{ReactiveError, Result};
pub use graph::NodeId;
pub use reactive::{
    Atom, Batch, Computed, Disposer, Observable, Reaction, ReactionFailure, ReactionOptions,
    Runtime,
};
