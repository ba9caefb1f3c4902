//! Orchestrator configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::verify::UnknownCheckPolicy;

/// Configuration for the recovery orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Timeout applied to actions that do not declare their own, in seconds.
    #[serde(default = "default_action_timeout_secs")]
    pub default_action_timeout_secs: u64,

    /// Outcome of a verification whose type has no registered check.
    #[serde(default)]
    pub unknown_check_policy: UnknownCheckPolicy,

    /// Default window for incident history queries, in days.
    #[serde(default = "default_history_days")]
    pub history_days: u32,

    /// Default window for statistics queries, in days.
    #[serde(default = "default_stats_days")]
    pub stats_days: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_action_timeout_secs: default_action_timeout_secs(),
            unknown_check_policy: UnknownCheckPolicy::default(),
            history_days: default_history_days(),
            stats_days: default_stats_days(),
        }
    }
}

impl OrchestratorConfig {
    /// Default action timeout as a duration.
    pub fn default_action_timeout(&self) -> Duration {
        Duration::from_secs(self.default_action_timeout_secs)
    }
}

fn default_action_timeout_secs() -> u64 {
    60
}

fn default_history_days() -> u32 {
    7
}

fn default_stats_days() -> u32 {
    30
}
