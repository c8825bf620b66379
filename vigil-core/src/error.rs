//! Error types for the reactive engine.
//!
//! Every failure the engine can produce is a contract violation by the code
//! driving it (a computed that reads itself, a computed that writes state,
//! a reaction that never settles). None of them are retried automatically;
//! a failed reaction simply runs again on its next natural invalidation.

use std::any::Any;

use thiserror::Error;

use crate::graph::NodeId;

/// Result alias used throughout the crate.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

/// Errors raised by observables, computed values and reactions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// A computed value was read while it was already being evaluated,
    /// either directly or through a chain of other computed values.
    #[error("cycle detected: computed {node:?} was read during its own evaluation")]
    Cycle { node: NodeId },

    /// A computed function tried to write an observable.
    #[error("observable {observable:?} was written while computed {computed:?} was evaluating")]
    WriteDuringComputation {
        observable: NodeId,
        computed: NodeId,
    },

    /// Strict mode rejected a write made outside `run_in_action`.
    #[error("observable {observable:?} was written outside an action")]
    WriteOutsideAction { observable: NodeId },

    /// Reactions kept invalidating each other past the configured limit.
    #[error("reactions did not settle after {iterations} passes")]
    ReactionLoop { iterations: usize },

    /// A list operation addressed a slot past the end.
    #[error("index {index} is out of bounds for a list of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Failure raised by user code inside a reaction or computed function.
    #[error("{0}")]
    Reaction(String),
}

impl ReactiveError {
    /// Build a user-level failure from any displayable message.
    pub fn reaction(message: impl Into<String>) -> Self {
        Self::Reaction(message.into())
    }

    /// Build a user-level failure from a caught panic payload.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else {
            "unknown panic".to_string()
        };
        Self::Reaction(format!("panicked: {message}"))
    }

    /// True for the cycle variant.
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::KeyData;

    #[test]
    fn messages_name_the_nodes() {
        let node = NodeId::from(KeyData::from_ffi(7));
        let err = ReactiveError::Cycle { node };
        assert!(err.is_cycle());
        assert!(err.to_string().starts_with("cycle detected"));
    }

    #[test]
    fn panic_payloads_become_messages() {
        let err = ReactiveError::from_panic(Box::new("bad row"));
        assert_eq!(err, ReactiveError::reaction("panicked: bad row"));

        let err = ReactiveError::from_panic(Box::new(String::from("bad total")));
        assert_eq!(err.to_string(), "panicked: bad total");

        let err = ReactiveError::from_panic(Box::new(7_u8));
        assert_eq!(err.to_string(), "panicked: unknown panic");
    }

    #[test]
    fn user_failures_keep_their_message() {
        let err = ReactiveError::reaction("render failed");
        assert_eq!(err.to_string(), "render failed");
        assert!(!err.is_cycle());
    }
}
