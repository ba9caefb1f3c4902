//! Recovery orchestrator.
//!
//! Drives one incident from detection to a terminal status: runbook lookup,
//! ordered action execution, verification, bounded retries and escalation.
//! Expected failures end up as the incident's status and message; only
//! store failures surface as errors.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use heal_types::{
    ExecutedAction, Incident, IncidentContext, IncidentId, IncidentStats, IncidentStatus,
    IncidentSummary, Runbook,
};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::action::ActionRegistry;
use crate::clock::{Clock, SystemClock};
use crate::config::OrchestratorConfig;
use crate::error::HealResult;
use crate::runbook::RunbookRegistry;
use crate::store::IncidentStore;
use crate::verify::Verifier;

pub const NO_RUNBOOK_MESSAGE: &str = "No automated runbook found";
pub const HEALED_VERIFIED_MESSAGE: &str = "System healed successfully";
pub const HEALED_UNVERIFIED_MESSAGE: &str = "Healing actions completed";
pub const EXHAUSTED_SUMMARY_MESSAGE: &str = "Healing failed, manual intervention required";

/// How a run of attempts ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptOutcome {
    /// Actions succeeded and verification passed.
    Verified,

    /// Actions succeeded and the runbook has no verification.
    Completed,

    /// Every attempt failed an action or its verification.
    Exhausted,

    /// Shutdown was requested before the run finished.
    Interrupted,
}

/// Runs runbooks against reported failures and records the incidents.
///
/// Holds no per-incident state, so separate failures may be handled
/// concurrently from clones of the same `Arc`.
pub struct RecoveryOrchestrator {
    /// Configuration.
    config: OrchestratorConfig,

    /// Runbooks by failure type.
    runbooks: Arc<RunbookRegistry>,

    /// Action handlers by action type.
    actions: Arc<ActionRegistry>,

    /// Verification checks by check type.
    verifier: Arc<Verifier>,

    /// Incident persistence.
    store: Arc<dyn IncidentStore>,

    /// Time source.
    clock: Arc<dyn Clock>,
}

impl RecoveryOrchestrator {
    /// Create an orchestrator using the system clock.
    pub fn new(
        config: OrchestratorConfig,
        runbooks: Arc<RunbookRegistry>,
        actions: Arc<ActionRegistry>,
        verifier: Arc<Verifier>,
        store: Arc<dyn IncidentStore>,
    ) -> Self {
        Self {
            config,
            runbooks,
            actions,
            verifier,
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn runbooks(&self) -> &RunbookRegistry {
        &self.runbooks
    }

    /// Handle a failure signal to completion.
    ///
    /// Not cancel-safe: dropping the returned future mid-run leaves the
    /// stored incident in `healing`. Callers that may be cancelled should
    /// use [`spawn_failure`](Self::spawn_failure).
    pub async fn handle_failure(
        &self,
        failure_type: &str,
        context: IncidentContext,
    ) -> HealResult<IncidentSummary> {
        self.handle(failure_type, context, None).await
    }

    /// Handle a failure signal, giving up when `shutdown` turns `true`.
    ///
    /// An interrupted run drops the in-flight action or check and escalates
    /// the incident.
    pub async fn handle_failure_with_shutdown(
        &self,
        failure_type: &str,
        context: IncidentContext,
        shutdown: watch::Receiver<bool>,
    ) -> HealResult<IncidentSummary> {
        self.handle(failure_type, context, Some(shutdown)).await
    }

    /// Handle a failure signal on its own task.
    ///
    /// The run continues to a terminal status even if the returned handle
    /// is dropped; only `shutdown` cuts it short.
    pub fn spawn_failure(
        self: &Arc<Self>,
        failure_type: impl Into<String>,
        context: IncidentContext,
        shutdown: Option<watch::Receiver<bool>>,
    ) -> JoinHandle<HealResult<IncidentSummary>> {
        let orchestrator = Arc::clone(self);
        let failure_type = failure_type.into();
        tokio::spawn(async move { orchestrator.handle(&failure_type, context, shutdown).await })
    }

    #[instrument(skip(self, context, shutdown), fields(failure_type = %failure_type))]
    async fn handle(
        &self,
        failure_type: &str,
        context: IncidentContext,
        shutdown: Option<watch::Receiver<bool>>,
    ) -> HealResult<IncidentSummary> {
        let now = self.clock.now();
        let mut incident = Incident::new(IncidentId::generate(now), failure_type, context, now);
        self.store.insert_incident(&incident).await?;

        warn!(
            incident_id = %incident.id,
            failure_type = %failure_type,
            "Incident created"
        );

        let runbook = match self.runbooks.lookup(failure_type) {
            Some(runbook) => runbook.clone(),
            None => {
                warn!(
                    incident_id = %incident.id,
                    failure_type = %failure_type,
                    "No runbook for failure type, escalating"
                );
                return self
                    .finish(
                        &mut incident,
                        IncidentStatus::Escalated,
                        NO_RUNBOOK_MESSAGE,
                        NO_RUNBOOK_MESSAGE,
                    )
                    .await;
            }
        };

        incident.runbook_name = Some(runbook.name.clone());
        incident.transition_to(IncidentStatus::Healing, self.clock.now())?;
        self.store.update_incident(&incident).await?;

        info!(
            incident_id = %incident.id,
            runbook = %runbook.name,
            max_retries = runbook.max_retries,
            "Executing runbook"
        );

        let mut attempts = 0u32;
        let outcome = match shutdown {
            Some(mut shutdown) => {
                tokio::select! {
                    biased;
                    _ = shutdown_requested(&mut shutdown) => AttemptOutcome::Interrupted,
                    outcome = self.run_attempts(&mut incident, &runbook, &mut attempts) => outcome,
                }
            }
            None => self.run_attempts(&mut incident, &runbook, &mut attempts).await,
        };

        match outcome {
            AttemptOutcome::Verified => {
                info!(incident_id = %incident.id, attempts, "System healed");
                self.finish(
                    &mut incident,
                    IncidentStatus::Healed,
                    HEALED_VERIFIED_MESSAGE,
                    HEALED_VERIFIED_MESSAGE,
                )
                .await
            }
            AttemptOutcome::Completed => {
                info!(incident_id = %incident.id, attempts, "Healing actions completed");
                self.finish(
                    &mut incident,
                    IncidentStatus::Healed,
                    HEALED_UNVERIFIED_MESSAGE,
                    HEALED_UNVERIFIED_MESSAGE,
                )
                .await
            }
            AttemptOutcome::Exhausted => {
                let status = if runbook.escalate_if_failed {
                    IncidentStatus::Escalated
                } else {
                    IncidentStatus::Failed
                };
                warn!(
                    incident_id = %incident.id,
                    attempts,
                    status = %status,
                    "Healing failed"
                );
                let resolution = format!("Healing failed after {} attempts", attempts);
                self.finish(&mut incident, status, &resolution, EXHAUSTED_SUMMARY_MESSAGE)
                    .await
            }
            AttemptOutcome::Interrupted => {
                warn!(incident_id = %incident.id, attempts, "Recovery interrupted by shutdown");
                let message = format!(
                    "Recovery interrupted by shutdown after {} attempts",
                    attempts
                );
                self.finish(&mut incident, IncidentStatus::Escalated, &message, &message)
                    .await
            }
        }
    }

    /// Run up to `max_retries + 1` attempts of the runbook.
    ///
    /// `attempts` counts attempts started, so an interrupted run still
    /// reports how far it got.
    async fn run_attempts(
        &self,
        incident: &mut Incident,
        runbook: &Runbook,
        attempts: &mut u32,
    ) -> AttemptOutcome {
        let mut working = incident.context.clone();

        for attempt in 0..=runbook.max_retries {
            *attempts = attempt + 1;
            debug!(incident_id = %incident.id, attempt, "Starting attempt");

            if !self.run_actions(incident, runbook, attempt, &mut working).await {
                continue;
            }

            match &runbook.verification {
                None => return AttemptOutcome::Completed,
                Some(verification) => {
                    if self.verifier.verify(verification).await {
                        return AttemptOutcome::Verified;
                    }
                    warn!(
                        incident_id = %incident.id,
                        attempt,
                        check_type = %verification.check_type,
                        "Verification failed"
                    );
                }
            }
        }

        AttemptOutcome::Exhausted
    }

    /// Execute the runbook's actions in order, stopping at the first failure.
    ///
    /// Returns whether every action succeeded.
    async fn run_actions(
        &self,
        incident: &mut Incident,
        runbook: &Runbook,
        attempt: u32,
        working: &mut IncidentContext,
    ) -> bool {
        for action in &runbook.actions {
            let result = self.actions.execute(action, working).await;
            let success = result.success;

            for (key, value) in &result.context_updates {
                working.insert(key.clone(), value.clone());
            }

            if !success {
                warn!(
                    incident_id = %incident.id,
                    attempt,
                    action_type = %action.action_type,
                    error = result.error.as_deref().unwrap_or("unknown error"),
                    "Action failed"
                );
            }

            incident.record_action(
                ExecutedAction {
                    action_type: action.action_type.clone(),
                    result,
                    attempt,
                },
                self.clock.now(),
            );

            if !success {
                return false;
            }
        }
        true
    }

    async fn finish(
        &self,
        incident: &mut Incident,
        status: IncidentStatus,
        resolution: &str,
        summary: &str,
    ) -> HealResult<IncidentSummary> {
        incident.resolve(status, resolution, self.clock.now())?;
        self.store.update_incident(incident).await?;
        Ok(incident.summary(summary))
    }

    /// Incidents created within the last `since_days` days, newest first.
    pub async fn incident_history(
        &self,
        since_days: u32,
        status: Option<IncidentStatus>,
    ) -> HealResult<Vec<Incident>> {
        let since = self.window_start(since_days);
        Ok(self.store.list_incidents(since, status).await?)
    }

    /// Healing statistics over the last `since_days` days.
    pub async fn stats(&self, since_days: u32) -> HealResult<IncidentStats> {
        let since = self.window_start(since_days);
        Ok(self.store.stats(since, since_days).await?)
    }

    pub async fn get_incident(&self, id: &IncidentId) -> HealResult<Option<Incident>> {
        Ok(self.store.get_incident(id).await?)
    }

    /// Start of a window reaching `days` back from now.
    ///
    /// Windows older than the representable range start at the earliest
    /// representable instant, covering every incident.
    fn window_start(&self, days: u32) -> DateTime<Utc> {
        TimeDelta::try_days(i64::from(days))
            .and_then(|span| self.clock.now().checked_sub_signed(span))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Resolves once the shutdown flag reads `true`.
///
/// Never resolves if the sender is dropped without signalling.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
