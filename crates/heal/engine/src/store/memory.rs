//! In-memory incident store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heal_types::{Incident, IncidentId, IncidentStatus};
use tokio::sync::RwLock;

use super::traits::IncidentStore;
use crate::error::{StoreError, StoreResult};

/// In-memory store for development and testing
#[derive(Debug, Clone, Default)]
pub struct InMemoryIncidentStore {
    incidents: Arc<RwLock<HashMap<IncidentId, Incident>>>,
}

impl InMemoryIncidentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored incidents
    pub async fn len(&self) -> usize {
        self.incidents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.incidents.read().await.is_empty()
    }
}

#[async_trait]
impl IncidentStore for InMemoryIncidentStore {
    async fn insert_incident(&self, incident: &Incident) -> StoreResult<()> {
        let mut incidents = self.incidents.write().await;
        if incidents.contains_key(&incident.id) {
            return Err(StoreError::Conflict(format!(
                "incident {} already exists",
                incident.id
            )));
        }
        incidents.insert(incident.id.clone(), incident.clone());
        Ok(())
    }

    async fn update_incident(&self, incident: &Incident) -> StoreResult<()> {
        let mut incidents = self.incidents.write().await;
        match incidents.get_mut(&incident.id) {
            Some(stored) => {
                *stored = incident.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("incident {}", incident.id))),
        }
    }

    async fn get_incident(&self, id: &IncidentId) -> StoreResult<Option<Incident>> {
        let incidents = self.incidents.read().await;
        Ok(incidents.get(id).cloned())
    }

    async fn list_incidents(
        &self,
        since: DateTime<Utc>,
        status: Option<IncidentStatus>,
    ) -> StoreResult<Vec<Incident>> {
        let incidents = self.incidents.read().await;
        let mut matching: Vec<Incident> = incidents
            .values()
            .filter(|i| i.created_at > since)
            .filter(|i| status.map_or(true, |s| i.status == s))
            .cloned()
            .collect();

        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(matching)
    }
}
