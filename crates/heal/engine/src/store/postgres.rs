//! PostgreSQL incident store

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use heal_types::{stats::healing_rate, stats::round_one_decimal};
use heal_types::{Incident, IncidentId, IncidentStats, IncidentStatus};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, postgres::PgRow, PgPool, Row};
use tracing::debug;

use super::traits::IncidentStore;
use crate::error::{StoreError, StoreResult};

const SELECT_COLUMNS: &str = "id, failure_type, status, context, actions, runbook_name, \
                              created, updated, resolved_at, resolution_message";

/// PostgreSQL-backed incident store
#[derive(Debug, Clone)]
pub struct PostgresIncidentStore {
    pool: PgPool,
}

impl PostgresIncidentStore {
    /// Connect to PostgreSQL and initialize schema
    pub async fn new(
        url: &str,
        max_connections: u32,
        connect_timeout_secs: u64,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connect_timeout_secs))
            .connect(url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        let store = Self { pool };
        store.initialize_schema().await?;
        Ok(store)
    }

    /// Wrap an existing pool. The schema must already exist.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn initialize_schema(&self) -> StoreResult<()> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS heal_incidents (
                id TEXT PRIMARY KEY,
                failure_type TEXT NOT NULL,
                status TEXT NOT NULL,
                context JSONB NOT NULL,
                actions JSONB NOT NULL,
                runbook_name TEXT,
                created TIMESTAMPTZ NOT NULL,
                updated TIMESTAMPTZ NOT NULL,
                resolved_at TIMESTAMPTZ,
                resolution_message TEXT
            );
            "#,
            r#"CREATE INDEX IF NOT EXISTS heal_incidents_created ON heal_incidents(created DESC);"#,
            r#"CREATE INDEX IF NOT EXISTS heal_incidents_status ON heal_incidents(status);"#,
        ];

        for stmt in statements {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Query(e.to_string()))?;
        }

        debug!("Incident schema ready");
        Ok(())
    }

    /// `TIMESTAMPTZ` cannot hold chrono's full range; no incident predates the epoch.
    fn window_floor(since: DateTime<Utc>) -> DateTime<Utc> {
        since.max(DateTime::UNIX_EPOCH)
    }

    fn to_json<T: serde::Serialize>(value: &T) -> StoreResult<Value> {
        serde_json::to_value(value)
            .map_err(|e| StoreError::InvalidData(format!("json serialize error: {}", e)))
    }

    fn from_json<T: serde::de::DeserializeOwned>(value: Value) -> StoreResult<T> {
        serde_json::from_value(value)
            .map_err(|e| StoreError::InvalidData(format!("json deserialize error: {}", e)))
    }

    fn column<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        row.try_get(name)
            .map_err(|e| StoreError::Query(e.to_string()))
    }

    fn row_to_incident(row: &PgRow) -> StoreResult<Incident> {
        let status: String = Self::column(row, "status")?;
        let status: IncidentStatus = status
            .parse()
            .map_err(|e| StoreError::InvalidData(format!("{}", e)))?;

        Ok(Incident {
            id: IncidentId::new(Self::column::<String>(row, "id")?),
            failure_type: Self::column(row, "failure_type")?,
            status,
            context: Self::from_json(Self::column(row, "context")?)?,
            runbook_name: Self::column(row, "runbook_name")?,
            actions_executed: Self::from_json(Self::column(row, "actions")?)?,
            created_at: Self::column(row, "created")?,
            updated_at: Self::column(row, "updated")?,
            resolved_at: Self::column(row, "resolved_at")?,
            resolution_message: Self::column(row, "resolution_message")?,
        })
    }
}

#[async_trait]
impl IncidentStore for PostgresIncidentStore {
    async fn insert_incident(&self, incident: &Incident) -> StoreResult<()> {
        let context = Self::to_json(&incident.context)?;
        let actions = Self::to_json(&incident.actions_executed)?;

        let result = sqlx::query(
            r#"
            INSERT INTO heal_incidents
                (id, failure_type, status, context, actions, runbook_name,
                 created, updated, resolved_at, resolution_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(incident.id.as_str())
        .bind(&incident.failure_type)
        .bind(incident.status.as_str())
        .bind(context)
        .bind(actions)
        .bind(incident.runbook_name.as_deref())
        .bind(incident.created_at)
        .bind(incident.updated_at)
        .bind(incident.resolved_at)
        .bind(incident.resolution_message.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "incident {} already exists",
                incident.id
            )));
        }
        Ok(())
    }

    async fn update_incident(&self, incident: &Incident) -> StoreResult<()> {
        let context = Self::to_json(&incident.context)?;
        let actions = Self::to_json(&incident.actions_executed)?;

        let result = sqlx::query(
            r#"
            UPDATE heal_incidents
            SET failure_type = $2, status = $3, context = $4, actions = $5,
                runbook_name = $6, updated = $7, resolved_at = $8,
                resolution_message = $9
            WHERE id = $1
            "#,
        )
        .bind(incident.id.as_str())
        .bind(&incident.failure_type)
        .bind(incident.status.as_str())
        .bind(context)
        .bind(actions)
        .bind(incident.runbook_name.as_deref())
        .bind(incident.updated_at)
        .bind(incident.resolved_at)
        .bind(incident.resolution_message.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("incident {}", incident.id)));
        }
        Ok(())
    }

    async fn get_incident(&self, id: &IncidentId) -> StoreResult<Option<Incident>> {
        let query = format!("SELECT {} FROM heal_incidents WHERE id = $1", SELECT_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        row.as_ref().map(Self::row_to_incident).transpose()
    }

    async fn list_incidents(
        &self,
        since: DateTime<Utc>,
        status: Option<IncidentStatus>,
    ) -> StoreResult<Vec<Incident>> {
        let query = format!(
            "SELECT {} FROM heal_incidents \
             WHERE created > $1 AND ($2::TEXT IS NULL OR status = $2) \
             ORDER BY created DESC, id DESC",
            SELECT_COLUMNS
        );
        let rows = sqlx::query(&query)
            .bind(Self::window_floor(since))
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Query(e.to_string()))?;

        rows.iter().map(Self::row_to_incident).collect()
    }

    async fn stats(&self, since: DateTime<Utc>, period_days: u32) -> StoreResult<IncidentStats> {
        let since = Self::window_floor(since);
        let totals = sqlx::query(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'healed') AS healed,
                   (AVG(EXTRACT(EPOCH FROM (resolved_at - created)))
                        FILTER (WHERE resolved_at IS NOT NULL) / 60.0)::FLOAT8 AS mttr
            FROM heal_incidents
            WHERE created > $1
            "#,
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        let total: i64 = Self::column(&totals, "total")?;
        let healed: i64 = Self::column(&totals, "healed")?;
        let mttr: Option<f64> = Self::column(&totals, "mttr")?;

        let rows = sqlx::query(
            r#"
            SELECT failure_type, COUNT(*) AS count
            FROM heal_incidents
            WHERE created > $1
            GROUP BY failure_type
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut stats = IncidentStats::empty(period_days);
        for row in &rows {
            let failure_type: String = Self::column(row, "failure_type")?;
            let count: i64 = Self::column(row, "count")?;
            stats
                .by_failure_type
                .insert(failure_type, count.max(0) as u64);
        }

        stats.total_incidents = total.max(0) as u64;
        stats.auto_healed = healed.max(0) as u64;
        stats.healing_rate_percent = healing_rate(stats.total_incidents, stats.auto_healed);
        stats.mttr_minutes = mttr.map(round_one_decimal).unwrap_or(0.0);
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use heal_types::{ActionResult, ExecutedAction, IncidentContext};

    async fn connect() -> Option<PostgresIncidentStore> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let store = PostgresIncidentStore::new(&url, 2, 5).await.unwrap();
        sqlx::query("DELETE FROM heal_incidents")
            .execute(&store.pool)
            .await
            .unwrap();
        Some(store)
    }

    fn incident(id: &str, failure_type: &str, created: DateTime<Utc>) -> Incident {
        let mut context = IncidentContext::new();
        context.insert("site".into(), "main".into());
        Incident::new(IncidentId::new(id), failure_type, context, created)
    }

    // Single test: every step shares the heal_incidents table.
    #[tokio::test]
    #[ignore = "requires DATABASE_URL pointing at a disposable PostgreSQL database"]
    async fn test_postgres_store_roundtrip_and_aggregates() {
        let Some(store) = connect().await else {
            return;
        };
        let base = DateTime::from_timestamp(Utc::now().timestamp() - 3600, 0).unwrap();
        let minutes = |m: i64| base + TimeDelta::minutes(m);

        let mut healed = incident("INC-PG-0001", "cache_corrupt", base);
        let mut escalated = incident("INC-PG-0002", "service_down", minutes(1));
        let detected = incident("INC-PG-0003", "cache_corrupt", minutes(2));
        let mut old = incident("INC-PG-0000", "disk_full", base - TimeDelta::days(10));

        for inc in [&healed, &escalated, &detected, &old] {
            store.insert_incident(inc).await.unwrap();
        }
        assert!(matches!(
            store.insert_incident(&healed).await,
            Err(StoreError::Conflict(_))
        ));

        healed.runbook_name = Some("Clear and rebuild cache".into());
        healed.transition_to(IncidentStatus::Healing, minutes(1)).unwrap();
        healed.record_action(
            ExecutedAction {
                action_type: "shell".into(),
                result: ActionResult::ok_with_output("cache rebuilt"),
                attempt: 0,
            },
            minutes(1),
        );
        healed
            .resolve(IncidentStatus::Healed, "System healed successfully", minutes(2))
            .unwrap();
        store.update_incident(&healed).await.unwrap();

        escalated
            .resolve(IncidentStatus::Escalated, "No automated runbook found", minutes(2))
            .unwrap();
        store.update_incident(&escalated).await.unwrap();
        old.resolve(IncidentStatus::Escalated, "No automated runbook found", minutes(-1))
            .unwrap();
        store.update_incident(&old).await.unwrap();

        let missing = incident("INC-PG-9999", "cache_corrupt", base);
        assert!(matches!(
            store.update_incident(&missing).await,
            Err(StoreError::NotFound(_))
        ));

        let fetched = store.get_incident(&healed.id).await.unwrap().unwrap();
        assert_eq!(fetched, healed);
        assert!(store
            .get_incident(&IncidentId::new("INC-PG-4040"))
            .await
            .unwrap()
            .is_none());

        let since = base - TimeDelta::days(1);
        let listed = store.list_incidents(since, None).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["INC-PG-0003", "INC-PG-0002", "INC-PG-0001"]);

        let only_escalated = store
            .list_incidents(since, Some(IncidentStatus::Escalated))
            .await
            .unwrap();
        assert_eq!(only_escalated.len(), 1);
        assert_eq!(only_escalated[0].id, escalated.id);

        let everything = store
            .list_incidents(DateTime::<Utc>::MIN_UTC, None)
            .await
            .unwrap();
        assert_eq!(everything.len(), 4);

        let stats = store.stats(since, 1).await.unwrap();
        assert_eq!(stats.period_days, 1);
        assert_eq!(stats.total_incidents, 3);
        assert_eq!(stats.auto_healed, 1);
        assert_eq!(stats.healing_rate_percent, 33.3);
        assert_eq!(stats.by_failure_type["cache_corrupt"], 2);
        assert_eq!(stats.by_failure_type["service_down"], 1);
        // healed after 2 minutes, escalated after 1, detected unresolved
        assert_eq!(stats.mttr_minutes, 1.5);

        let empty = store.stats(minutes(10), 1).await.unwrap();
        assert_eq!(empty.total_incidents, 0);
        assert_eq!(empty.mttr_minutes, 0.0);
    }
}
