//! Runtime configuration.
//!
//! A [`RuntimeConfig`] is fixed when a [`Runtime`](crate::Runtime) is
//! created. It can be built in code or deserialized from JSON; missing
//! fields fall back to their defaults.

use serde::{Deserialize, Serialize};

/// How strictly writes must be wrapped in actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnforceActions {
    /// Writes are allowed anywhere.
    #[default]
    Never,

    /// Writing an observed cell outside an action logs a warning.
    Observed,

    /// Any write outside an action is rejected.
    Always,
}

/// Settings shared by every node of one runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Drain passes allowed before the scheduler gives up on reactions
    /// that keep invalidating each other.
    pub max_reaction_iterations: usize,

    /// Action strictness for writes.
    pub enforce_actions: EnforceActions,

    /// Log reaction failures even when an error hook is installed.
    pub report_reaction_errors: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_reaction_iterations: 100,
            enforce_actions: EnforceActions::Never,
            report_reaction_errors: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse a config from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_max_reaction_iterations(mut self, iterations: usize) -> Self {
        self.max_reaction_iterations = iterations.max(1);
        self
    }

    pub fn with_enforce_actions(mut self, mode: EnforceActions) -> Self {
        self.enforce_actions = mode;
        self
    }

    pub fn with_report_reaction_errors(mut self, report: bool) -> Self {
        self.report_reaction_errors = report;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_permissive() {
        let config = RuntimeConfig::default();
        assert_eq!(config.max_reaction_iterations, 100);
        assert_eq!(config.enforce_actions, EnforceActions::Never);
        assert!(config.report_reaction_errors);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = RuntimeConfig::from_json(r#"{"enforce_actions": "always"}"#).unwrap();
        assert_eq!(config.enforce_actions, EnforceActions::Always);
        assert_eq!(config.max_reaction_iterations, 100);
    }

    #[test]
    fn iteration_limit_is_at_least_one() {
        let config = RuntimeConfig::default().with_max_reaction_iterations(0);
        assert_eq!(config.max_reaction_iterations, 1);
    }
}
