//! Runbook registry.
//!
//! Static mapping from failure-type key to the runbook that remediates it.

use std::collections::HashMap;

use heal_types::{ActionSpec, Runbook, Severity, VerificationSpec};

use crate::error::{HealError, HealResult};
use crate::verify::MANUAL_CHECK;

/// Failure-type keys known to the standard catalog.
pub mod failure_types {
    pub const DB_CONNECTION: &str = "db_connection";
    pub const CACHE_CORRUPT: &str = "cache_corrupt";
    pub const HIGH_MEMORY: &str = "high_memory";
    pub const DISK_FULL: &str = "disk_full";
    pub const SERVICE_DOWN: &str = "service_down";
    pub const SLOW_RESPONSE: &str = "slow_response";
    pub const HIGH_ERROR_RATE: &str = "high_error_rate";
}

/// Lookup table of runbooks keyed by failure type.
#[derive(Debug, Clone, Default)]
pub struct RunbookRegistry {
    runbooks: HashMap<String, Runbook>,
}

impl RunbookRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a list of runbooks, validating each one.
    ///
    /// A later runbook replaces an earlier one with the same failure type.
    pub fn from_runbooks(runbooks: impl IntoIterator<Item = Runbook>) -> HealResult<Self> {
        let mut registry = Self::new();
        for runbook in runbooks {
            registry.register(runbook)?;
        }
        Ok(registry)
    }

    /// The standard remediation catalog.
    ///
    /// `db_connection` and `disk_full` are deliberately absent: they always
    /// go to an operator.
    pub fn standard() -> Self {
        let runbooks = [
            Runbook::new(failure_types::CACHE_CORRUPT, "Clear and rebuild cache")
                .with_severity(Severity::Medium)
                .with_action(
                    ActionSpec::new("shell")
                        .with_param("command", "drush cr")
                        .with_timeout_secs(60),
                )
                .with_verification(
                    VerificationSpec::new("health_check").with_param("endpoint", "/health"),
                )
                .with_max_retries(3),
            Runbook::new(failure_types::HIGH_MEMORY, "Release memory")
                .with_severity(Severity::High)
                .with_action(
                    ActionSpec::new("shell")
                        .with_param("command", "drush cr")
                        .with_timeout_secs(30),
                )
                .with_action(ActionSpec::new("callback").with_param("callback", "release_opcache"))
                .with_verification(
                    VerificationSpec::new("memory_check").with_param("threshold", 80),
                )
                .with_max_retries(2),
            Runbook::new(failure_types::SLOW_RESPONSE, "Optimize slow responses")
                .with_severity(Severity::Medium)
                .with_action(
                    ActionSpec::new("shell")
                        .with_param("command", "drush cr")
                        .with_timeout_secs(60),
                )
                .with_action(ActionSpec::new("callback").with_param("callback", "optimize_queries"))
                .with_verification(
                    VerificationSpec::new("response_time").with_param("threshold_ms", 2000),
                )
                .with_max_retries(2),
            Runbook::new(failure_types::HIGH_ERROR_RATE, "Mitigate high error rate")
                .with_severity(Severity::High)
                .with_action(
                    ActionSpec::new("shell")
                        .with_param("command", "drush cr")
                        .with_timeout_secs(60),
                )
                .with_action(
                    ActionSpec::new("callback").with_param("callback", "enable_circuit_breaker"),
                )
                .with_verification(VerificationSpec::new("error_rate").with_param("threshold", 5))
                .with_max_retries(1)
                .escalate_if_failed(true),
            Runbook::new(failure_types::SERVICE_DOWN, "Restart service")
                .with_severity(Severity::Critical)
                .with_action(ActionSpec::new("alert").with_param("channel", "ops"))
                .with_verification(VerificationSpec::new(MANUAL_CHECK))
                .with_max_retries(0)
                .escalate_if_failed(true),
        ];

        Self {
            runbooks: runbooks
                .into_iter()
                .map(|r| (r.failure_type.clone(), r))
                .collect(),
        }
    }

    /// Add or replace a runbook, returning the one it replaced.
    pub fn register(&mut self, runbook: Runbook) -> HealResult<Option<Runbook>> {
        validate(&runbook)?;
        Ok(self.runbooks.insert(runbook.failure_type.clone(), runbook))
    }

    /// Find the runbook for a failure type.
    pub fn lookup(&self, failure_type: &str) -> Option<&Runbook> {
        self.runbooks.get(failure_type)
    }

    /// Registered failure types, sorted.
    pub fn failure_types(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.runbooks.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Registered runbooks, sorted by failure type.
    pub fn runbooks(&self) -> Vec<&Runbook> {
        let mut runbooks: Vec<&Runbook> = self.runbooks.values().collect();
        runbooks.sort_by(|a, b| a.failure_type.cmp(&b.failure_type));
        runbooks
    }

    pub fn len(&self) -> usize {
        self.runbooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runbooks.is_empty()
    }
}

fn validate(runbook: &Runbook) -> HealResult<()> {
    if runbook.failure_type.trim().is_empty() {
        return Err(HealError::Configuration(
            "runbook failure_type must not be empty".to_string(),
        ));
    }
    if runbook.name.trim().is_empty() {
        return Err(HealError::Configuration(format!(
            "runbook for {} has no name",
            runbook.failure_type
        )));
    }
    if let Some(position) = runbook
        .actions
        .iter()
        .position(|a| a.action_type.trim().is_empty())
    {
        return Err(HealError::Configuration(format!(
            "runbook for {} has an action without a type at position {}",
            runbook.failure_type, position
        )));
    }
    if let Some(verification) = &runbook.verification {
        if verification.check_type.trim().is_empty() {
            return Err(HealError::Configuration(format!(
                "runbook for {} has a verification without a type",
                runbook.failure_type
            )));
        }
    }
    Ok(())
}
