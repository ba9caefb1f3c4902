//! Incident types
//!
//! An Incident records one failure occurrence and the remediation attempts
//! made against it. Its status follows a small monotonic state machine:
//!
//! ```text
//! Detected ──► Healing ──► Healed
//!    │            ├──────► Failed
//!    └────────────┴──────► Escalated
//! ```
//!
//! `Healed`, `Failed` and `Escalated` are terminal.

use crate::IncidentId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Caller-supplied diagnostic payload attached to an incident
pub type IncidentContext = serde_json::Map<String, serde_json::Value>;

/// Incident lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    /// Failure reported, no remediation started yet
    Detected,

    /// Runbook is being executed
    Healing,

    /// Remediation succeeded (and verified, when the runbook has a check)
    Healed,

    /// Remediation exhausted its attempts without escalation
    Failed,

    /// Handed over to human operators
    Escalated,
}

impl IncidentStatus {
    /// All statuses, in lifecycle order
    pub const ALL: [IncidentStatus; 5] = [
        IncidentStatus::Detected,
        IncidentStatus::Healing,
        IncidentStatus::Healed,
        IncidentStatus::Failed,
        IncidentStatus::Escalated,
    ];

    /// Is this a terminal status?
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            IncidentStatus::Healed | IncidentStatus::Failed | IncidentStatus::Escalated
        )
    }

    /// Is `to` a legal next status from this one?
    pub fn can_transition_to(&self, to: IncidentStatus) -> bool {
        use IncidentStatus::*;
        matches!(
            (self, to),
            (Detected, Healing)
                | (Detected, Escalated)
                | (Healing, Healed)
                | (Healing, Failed)
                | (Healing, Escalated)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentStatus::Detected => "detected",
            IncidentStatus::Healing => "healing",
            IncidentStatus::Healed => "healed",
            IncidentStatus::Failed => "failed",
            IncidentStatus::Escalated => "escalated",
        }
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown incident status: {0}")]
pub struct ParseStatusError(pub String);

impl FromStr for IncidentStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IncidentStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseStatusError(s.to_string()))
    }
}

/// Rejected status change
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition for incident {incident_id}: {from} -> {to}")]
pub struct TransitionError {
    pub incident_id: IncidentId,
    pub from: IncidentStatus,
    pub to: IncidentStatus,
}

/// Structured result of a single remediation step
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionResult {
    /// Whether the step succeeded
    pub success: bool,

    /// Output captured from the step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Error description when the step failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Values made visible to the following steps of the same run
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub context_updates: IncidentContext,
}

impl ActionResult {
    /// A successful step with no output
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// A successful step with captured output
    pub fn ok_with_output(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            ..Default::default()
        }
    }

    /// A failed step
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Attach a value for later steps to observe
    pub fn with_context_update(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.context_updates.insert(key.into(), value.into());
        self
    }
}

/// One entry of the append-only action log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedAction {
    /// Dispatch key of the executed action
    pub action_type: String,

    /// What the handler reported
    pub result: ActionResult,

    /// Zero-based attempt this execution belongs to
    pub attempt: u32,
}

/// A tracked failure occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Unique incident identifier
    pub id: IncidentId,

    /// Failure category key (e.g. `cache_corrupt`)
    pub failure_type: String,

    /// Current lifecycle status
    pub status: IncidentStatus,

    /// Diagnostic payload supplied by the caller
    pub context: IncidentContext,

    /// Name of the runbook that handled this incident, if any
    pub runbook_name: Option<String>,

    /// Every action executed, in order
    pub actions_executed: Vec<ExecutedAction>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,

    /// Time the incident reached a terminal status
    pub resolved_at: Option<DateTime<Utc>>,

    /// Human-readable terminal explanation
    pub resolution_message: Option<String>,
}

impl Incident {
    /// Create a freshly detected incident
    pub fn new(
        id: IncidentId,
        failure_type: impl Into<String>,
        context: IncidentContext,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            failure_type: failure_type.into(),
            status: IncidentStatus::Detected,
            context,
            runbook_name: None,
            actions_executed: Vec::new(),
            created_at: now,
            updated_at: now,
            resolved_at: None,
            resolution_message: None,
        }
    }

    /// Move to a new status, stamping `resolved_at` on terminal ones
    pub fn transition_to(
        &mut self,
        to: IncidentStatus,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError {
                incident_id: self.id.clone(),
                from: self.status,
                to,
            });
        }

        self.status = to;
        self.updated_at = now;
        if to.is_terminal() {
            self.resolved_at = Some(now);
        }
        Ok(())
    }

    /// Move to a terminal status with an explanation
    pub fn resolve(
        &mut self,
        to: IncidentStatus,
        message: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        if !to.is_terminal() {
            return Err(TransitionError {
                incident_id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.transition_to(to, now)?;
        self.resolution_message = Some(message.into());
        Ok(())
    }

    /// Append an action execution to the log
    pub fn record_action(&mut self, entry: ExecutedAction, now: DateTime<Utc>) {
        self.actions_executed.push(entry);
        self.updated_at = now;
    }

    /// Time from creation to resolution
    pub fn time_to_resolve(&self) -> Option<chrono::Duration> {
        self.resolved_at.map(|resolved| resolved - self.created_at)
    }

    /// Build the caller-facing summary for this incident
    pub fn summary(&self, message: impl Into<String>) -> IncidentSummary {
        IncidentSummary {
            incident_id: self.id.clone(),
            status: self.status,
            runbook_name: self.runbook_name.clone(),
            actions_executed: self.actions_executed.clone(),
            message: message.into(),
        }
    }
}

/// Result of handling one failure signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentSummary {
    pub incident_id: IncidentId,
    pub status: IncidentStatus,
    pub runbook_name: Option<String>,
    pub actions_executed: Vec<ExecutedAction>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident() -> Incident {
        Incident::new(
            IncidentId::new("INC-20260101-000001"),
            "cache_corrupt",
            IncidentContext::new(),
            Utc::now(),
        )
    }

    #[test]
    fn test_status_edges() {
        use IncidentStatus::*;
        assert!(Detected.can_transition_to(Healing));
        assert!(Detected.can_transition_to(Escalated));
        assert!(!Detected.can_transition_to(Healed));
        assert!(Healing.can_transition_to(Failed));
        assert!(!Healing.can_transition_to(Detected));

        for terminal in [Healed, Failed, Escalated] {
            assert!(terminal.is_terminal());
            for to in IncidentStatus::ALL {
                assert!(!terminal.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_terminal_incident_rejects_transition() {
        let mut incident = incident();
        let now = Utc::now();
        incident.transition_to(IncidentStatus::Healing, now).unwrap();
        incident
            .resolve(IncidentStatus::Healed, "done", now)
            .unwrap();
        assert_eq!(incident.resolved_at, Some(now));

        let err = incident
            .transition_to(IncidentStatus::Escalated, now)
            .unwrap_err();
        assert_eq!(err.from, IncidentStatus::Healed);
        assert_eq!(incident.status, IncidentStatus::Healed);
    }

    #[test]
    fn test_resolve_requires_terminal_status() {
        let mut incident = incident();
        assert!(incident
            .resolve(IncidentStatus::Healing, "not terminal", Utc::now())
            .is_err());
        assert_eq!(incident.status, IncidentStatus::Detected);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(
            "Escalated".parse::<IncidentStatus>().unwrap(),
            IncidentStatus::Escalated
        );
        assert!("rebooting".parse::<IncidentStatus>().is_err());
    }

    #[test]
    fn test_record_action_appends_and_touches() {
        let mut incident = incident();
        let later = incident.updated_at + chrono::Duration::seconds(5);
        incident.record_action(
            ExecutedAction {
                action_type: "shell".into(),
                result: ActionResult::failure("boom"),
                attempt: 0,
            },
            later,
        );
        assert_eq!(incident.actions_executed.len(), 1);
        assert_eq!(incident.updated_at, later);
    }

    #[test]
    fn test_action_result_serialization_skips_empty_fields() {
        let json = serde_json::to_value(ActionResult::ok()).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true }));

        let flagged = ActionResult::ok().with_context_update("circuit_breaker_active", true);
        let json = serde_json::to_value(flagged).unwrap();
        assert_eq!(json["context_updates"]["circuit_breaker_active"], true);
    }
}
