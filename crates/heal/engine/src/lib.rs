//! # HEAL Engine - Incident Recovery Orchestration
//!
//! Turns a reported platform failure into runbook-driven remediation with
//! bounded retries, post-remediation verification and escalation, and keeps
//! a queryable record of every incident.
//!
//! ## Key Components
//!
//! - [`RecoveryOrchestrator`]: Runs one incident from detection to a terminal status
//! - [`RunbookRegistry`]: Failure type to runbook lookup, with a standard catalog
//! - [`ActionRegistry`]: Dispatches remediation steps to registered handlers
//! - [`Verifier`]: Dispatches post-remediation checks
//! - [`store`]: Incident persistence (in-memory, PostgreSQL behind `postgres`)
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use heal_engine::{
//!     ActionRegistry, InMemoryIncidentStore, NoopCheck, OrchestratorConfig,
//!     RecoveryOrchestrator, RunbookRegistry, Verifier,
//! };
//! use heal_types::IncidentContext;
//!
//! # async fn example() -> heal_engine::HealResult<()> {
//! let config = OrchestratorConfig::default();
//! let actions = ActionRegistry::new(config.default_action_timeout());
//! // register "shell", "callback" and "alert" handlers here
//! let verifier = Verifier::new(config.unknown_check_policy)
//!     .with_check("health_check", Arc::new(NoopCheck));
//!
//! let orchestrator = RecoveryOrchestrator::new(
//!     config,
//!     Arc::new(RunbookRegistry::standard()),
//!     Arc::new(actions),
//!     Arc::new(verifier),
//!     Arc::new(InMemoryIncidentStore::new()),
//! );
//!
//! let summary = orchestrator
//!     .handle_failure("cache_corrupt", IncidentContext::new())
//!     .await?;
//! println!("{}: {}", summary.incident_id, summary.message);
//! # Ok(())
//! # }
//! ```
//!
//! ## Outcomes
//!
//! A missing runbook, a failing action, a failing check or a timeout are
//! ordinary outcomes recorded on the incident. Only store failures are
//! returned as [`HealError`].

#![deny(unsafe_code)]

pub mod action;
pub mod clock;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod runbook;
pub mod store;
pub mod verify;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use action::{ActionHandler, ActionRegistry, SyncActionHandler};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::OrchestratorConfig;
pub use error::{HealError, HealResult, StoreError, StoreResult};
pub use orchestrator::RecoveryOrchestrator;
pub use runbook::{failure_types, RunbookRegistry};
pub use store::{IncidentStore, InMemoryIncidentStore};
#[cfg(feature = "postgres")]
pub use store::PostgresIncidentStore;
pub use verify::{
    CheckError, ManualCheck, MetricSource, NoopCheck, ThresholdCheck, UnknownCheckPolicy,
    VerificationCheck, Verifier, MANUAL_CHECK,
};
