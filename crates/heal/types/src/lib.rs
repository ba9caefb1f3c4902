//! HEAL Types - Core types for incident recovery orchestration
//!
//! HEAL turns a detected platform failure into a sequence of remediation
//! attempts driven by a predefined runbook, and records the outcome as an
//! incident that operators can query afterwards.
//!
//! ## Key Concepts
//!
//! - **Incident**: One tracked occurrence of a failure and its remediation attempts
//! - **Runbook**: Ordered remediation procedure for one failure type, with retry
//!   and escalation policy
//! - **ActionSpec**: A single remediation step, dispatched by type tag
//! - **VerificationSpec**: A named post-remediation check
//! - **IncidentStats**: Aggregate healing rate and MTTR over a window

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod ids;
pub mod incident;
pub mod runbook;
pub mod stats;

// Re-export main types
pub use ids::IncidentId;
pub use incident::{
    ActionResult, ExecutedAction, Incident, IncidentContext, IncidentStatus, IncidentSummary,
    ParseStatusError, TransitionError,
};
pub use runbook::{ActionSpec, Runbook, Severity, VerificationSpec};
pub use stats::IncidentStats;
