//! Test doubles for handlers, checks and stores.
//!
//! Available to this crate's tests and, through the `test-utils` feature,
//! to downstream crates.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heal_types::{
    ActionResult, ActionSpec, Incident, IncidentContext, IncidentId, IncidentStatus,
    VerificationSpec,
};

use crate::action::ActionHandler;
use crate::error::{StoreError, StoreResult};
use crate::store::IncidentStore;
use crate::verify::{CheckError, MetricSource, VerificationCheck};

/// Handler that always succeeds without doing anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpActionHandler;

#[async_trait]
impl ActionHandler for NoOpActionHandler {
    async fn execute(&self, _action: &ActionSpec, _context: &IncidentContext) -> ActionResult {
        ActionResult::ok()
    }
}

/// Handler that always fails with a fixed message.
#[derive(Debug, Clone)]
pub struct FailingActionHandler {
    message: String,
}

impl FailingActionHandler {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ActionHandler for FailingActionHandler {
    async fn execute(&self, _action: &ActionSpec, _context: &IncidentContext) -> ActionResult {
        ActionResult::failure(self.message.clone())
    }
}

/// Handler that replays queued results, then repeats a fallback.
///
/// Also records every context it was called with.
#[derive(Debug)]
pub struct ScriptedActionHandler {
    script: Mutex<VecDeque<ActionResult>>,
    fallback: ActionResult,
    seen: Mutex<Vec<IncidentContext>>,
}

impl ScriptedActionHandler {
    /// Replay `script` in order, then return `fallback` forever.
    pub fn new(script: impl IntoIterator<Item = ActionResult>, fallback: ActionResult) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Always return `result`.
    pub fn always(result: ActionResult) -> Self {
        Self::new(std::iter::empty(), result)
    }

    /// Number of executions so far.
    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Contexts passed to each execution, in order.
    pub fn seen_contexts(&self) -> Vec<IncidentContext> {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ActionHandler for ScriptedActionHandler {
    async fn execute(&self, _action: &ActionSpec, context: &IncidentContext) -> ActionResult {
        self.seen
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(context.clone());
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// Handler that sleeps before succeeding.
#[derive(Debug, Clone, Copy)]
pub struct SlowActionHandler {
    delay: Duration,
}

impl SlowActionHandler {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ActionHandler for SlowActionHandler {
    async fn execute(&self, _action: &ActionSpec, _context: &IncidentContext) -> ActionResult {
        tokio::time::sleep(self.delay).await;
        ActionResult::ok()
    }
}

/// Metric source with a fixed reading.
#[derive(Debug, Clone, Copy)]
pub struct FixedMetric {
    value: Option<f64>,
}

impl FixedMetric {
    pub fn new(value: f64) -> Self {
        Self { value: Some(value) }
    }

    /// A source whose reads always fail.
    pub fn unavailable() -> Self {
        Self { value: None }
    }
}

#[async_trait]
impl MetricSource for FixedMetric {
    async fn read(&self) -> Result<f64, CheckError> {
        self.value
            .ok_or_else(|| CheckError("metric unavailable".to_string()))
    }
}

/// Check that replays queued outcomes, then repeats the last one.
#[derive(Debug)]
pub struct ScriptedCheck {
    outcomes: Mutex<VecDeque<bool>>,
    last: bool,
    calls: AtomicUsize,
}

impl ScriptedCheck {
    pub fn new(outcomes: impl IntoIterator<Item = bool>) -> Self {
        let outcomes: VecDeque<bool> = outcomes.into_iter().collect();
        let last = outcomes.back().copied().unwrap_or(true);
        Self {
            outcomes: Mutex::new(outcomes),
            last,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerificationCheck for ScriptedCheck {
    async fn check(&self, _spec: &VerificationSpec) -> Result<bool, CheckError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .outcomes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(self.last))
    }
}

/// Store whose every operation fails with a connection error.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStore;

impl UnavailableStore {
    fn error<T>() -> StoreResult<T> {
        Err(StoreError::Connection("store unavailable".to_string()))
    }
}

#[async_trait]
impl IncidentStore for UnavailableStore {
    async fn insert_incident(&self, _incident: &Incident) -> StoreResult<()> {
        Self::error()
    }

    async fn update_incident(&self, _incident: &Incident) -> StoreResult<()> {
        Self::error()
    }

    async fn get_incident(&self, _id: &IncidentId) -> StoreResult<Option<Incident>> {
        Self::error()
    }

    async fn list_incidents(
        &self,
        _since: DateTime<Utc>,
        _status: Option<IncidentStatus>,
    ) -> StoreResult<Vec<Incident>> {
        Self::error()
    }
}
