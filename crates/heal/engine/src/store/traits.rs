//! Incident store trait definition

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heal_types::{Incident, IncidentId, IncidentStats, IncidentStatus};

use crate::error::StoreResult;

/// Durable record store for incidents.
///
/// Stores persist and retrieve incidents exactly as given; they never
/// derive or alter incident state. A read issued after a write for the
/// same incident has returned must observe that write.
#[async_trait]
pub trait IncidentStore: Send + Sync {
    /// Persist a new incident. Fails with `Conflict` if the id exists.
    async fn insert_incident(&self, incident: &Incident) -> StoreResult<()>;

    /// Overwrite an existing incident. Fails with `NotFound` if absent.
    async fn update_incident(&self, incident: &Incident) -> StoreResult<()>;

    /// Get an incident by id
    async fn get_incident(&self, id: &IncidentId) -> StoreResult<Option<Incident>>;

    /// Incidents created strictly after `since`, newest first, optionally
    /// restricted to one status
    async fn list_incidents(
        &self,
        since: DateTime<Utc>,
        status: Option<IncidentStatus>,
    ) -> StoreResult<Vec<Incident>>;

    /// Aggregate statistics over incidents created strictly after `since`
    async fn stats(&self, since: DateTime<Utc>, period_days: u32) -> StoreResult<IncidentStats> {
        let incidents = self.list_incidents(since, None).await?;
        Ok(IncidentStats::from_incidents(period_days, &incidents))
    }
}
