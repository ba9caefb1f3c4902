//! Runbook definitions
//!
//! A Runbook is the static remediation procedure for one failure type: an
//! ordered list of actions, an optional verification, and the retry and
//! escalation policy applied when the actions do not resolve the failure.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Retry count applied when a runbook definition omits it
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Advisory severity of a failure type (not used for control flow)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// A single remediation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    /// Dispatch key (e.g. `shell`, `callback`, `alert`)
    #[serde(rename = "type")]
    pub action_type: String,

    /// Upper bound on how long the step may run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Handler-specific parameters
    #[serde(flatten)]
    pub params: serde_json::Map<String, Value>,
}

impl ActionSpec {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            timeout_secs: None,
            params: serde_json::Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

/// A named post-remediation check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSpec {
    /// Dispatch key (e.g. `memory_check`, `health_check`)
    #[serde(rename = "type")]
    pub check_type: String,

    /// Check-specific parameters such as thresholds
    #[serde(flatten)]
    pub params: serde_json::Map<String, Value>,
}

impl VerificationSpec {
    pub fn new(check_type: impl Into<String>) -> Self {
        Self {
            check_type: check_type.into(),
            params: serde_json::Map::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(Value::as_f64)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

/// Remediation procedure for one failure type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runbook {
    /// Failure-type key this runbook handles
    pub failure_type: String,

    /// Human-readable name
    pub name: String,

    /// Advisory severity
    #[serde(default)]
    pub severity: Severity,

    /// Steps executed in order on every attempt
    #[serde(default)]
    pub actions: Vec<ActionSpec>,

    /// Check run after all steps of an attempt succeed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationSpec>,

    /// Additional attempts after the first one
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Escalate instead of failing once attempts are exhausted
    #[serde(default)]
    pub escalate_if_failed: bool,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Runbook {
    /// Create an empty runbook with default policy
    pub fn new(failure_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            failure_type: failure_type.into(),
            name: name.into(),
            severity: Severity::default(),
            actions: Vec::new(),
            verification: None,
            max_retries: DEFAULT_MAX_RETRIES,
            escalate_if_failed: false,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_action(mut self, action: ActionSpec) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_verification(mut self, verification: VerificationSpec) -> Self {
        self.verification = Some(verification);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn escalate_if_failed(mut self, escalate: bool) -> Self {
        self.escalate_if_failed = escalate;
        self
    }

    /// Total attempts this runbook allows
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runbook_defaults_from_json() {
        let runbook: Runbook = serde_json::from_value(serde_json::json!({
            "failure_type": "cache_corrupt",
            "name": "Clear and rebuild cache",
            "actions": [{ "type": "shell", "command": "drush cr", "timeout_secs": 60 }],
            "verification": { "type": "health_check", "endpoint": "/health" }
        }))
        .unwrap();

        assert_eq!(runbook.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(runbook.total_attempts(), 4);
        assert!(!runbook.escalate_if_failed);
        assert_eq!(runbook.severity, Severity::Medium);

        let action = &runbook.actions[0];
        assert_eq!(action.action_type, "shell");
        assert_eq!(action.param_str("command"), Some("drush cr"));
        assert_eq!(action.timeout(), Some(Duration::from_secs(60)));

        let verification = runbook.verification.unwrap();
        assert_eq!(verification.check_type, "health_check");
        assert_eq!(verification.param_str("endpoint"), Some("/health"));
    }

    #[test]
    fn test_zero_retries_means_one_attempt() {
        let runbook = Runbook::new("service_down", "Restart service").with_max_retries(0);
        assert_eq!(runbook.total_attempts(), 1);
    }

    #[test]
    fn test_verification_threshold_param() {
        let spec = VerificationSpec::new("memory_check").with_param("threshold", 80);
        assert_eq!(spec.param_f64("threshold"), Some(80.0));
        assert_eq!(spec.param_f64("missing"), None);
    }
}
