//! Incident handlers

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use heal_types::{
    Incident, IncidentContext, IncidentId, IncidentStats, IncidentStatus, IncidentSummary, Runbook,
};
use serde::Deserialize;

/// Failure report
#[derive(Debug, Deserialize)]
pub struct ReportIncidentRequest {
    pub failure_type: String,
    #[serde(default)]
    pub context: IncidentContext,
}

/// History query parameters
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub days: Option<u32>,
    pub status: Option<String>,
}

/// Stats query parameters
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub days: Option<u32>,
}

/// Report a failure and run its runbook
///
/// Responds once the incident reaches a terminal status. The run outlives a
/// disconnected client; daemon shutdown interrupts it and escalates the
/// incident.
pub async fn report_incident(
    State(state): State<AppState>,
    Json(request): Json<ReportIncidentRequest>,
) -> ApiResult<Json<IncidentSummary>> {
    let failure_type = request.failure_type.trim();
    if failure_type.is_empty() {
        return Err(ApiError::BadRequest("failure_type must not be empty".to_string()));
    }

    // Runs on its own task so a client disconnect cannot abandon the incident.
    let summary = state
        .orchestrator
        .spawn_failure(failure_type, request.context, Some(state.shutdown_signal()))
        .await
        .map_err(|e| ApiError::Internal(format!("recovery task failed: {}", e)))??;

    tracing::info!(
        incident_id = %summary.incident_id,
        status = %summary.status,
        "Incident handled"
    );

    Ok(Json(summary))
}

/// List recent incidents, newest first
pub async fn list_incidents(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<Incident>>> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<IncidentStatus>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let days = query
        .days
        .unwrap_or(state.orchestrator.config().history_days);

    let incidents = state.orchestrator.incident_history(days, status).await?;
    Ok(Json(incidents))
}

/// Get a specific incident
pub async fn get_incident(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Incident>> {
    let incident = state
        .orchestrator
        .get_incident(&IncidentId::new(id.clone()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Incident {} not found", id)))?;
    Ok(Json(incident))
}

/// Healing statistics
pub async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<IncidentStats>> {
    let days = query.days.unwrap_or(state.orchestrator.config().stats_days);
    Ok(Json(state.orchestrator.stats(days).await?))
}

/// Configured runbooks, sorted by failure type
pub async fn list_runbooks(State(state): State<AppState>) -> Json<Vec<Runbook>> {
    Json(
        state
            .orchestrator
            .runbooks()
            .runbooks()
            .into_iter()
            .cloned()
            .collect(),
    )
}
