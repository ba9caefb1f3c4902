//! REST API tests against an in-memory daemon.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use heal_daemon::api::create_router;
use heal_daemon::api::rest::state::AppState;
use heal_engine::testing::{NoOpActionHandler, SlowActionHandler};
use heal_engine::{
    ActionHandler, ActionRegistry, InMemoryIncidentStore, NoopCheck, OrchestratorConfig,
    RecoveryOrchestrator, RunbookRegistry, Verifier,
};
use heal_types::{Incident, IncidentStats, IncidentSummary, Runbook};
use serde_json::{json, Value};
use tokio::sync::watch;
use tower::ServiceExt;

fn app() -> Router {
    app_with_shell(Arc::new(NoOpActionHandler))
}

fn app_with_shell(shell: Arc<dyn ActionHandler>) -> Router {
    let actions = ActionRegistry::default()
        .with_handler("shell", shell)
        .with_handler("callback", Arc::new(NoOpActionHandler))
        .with_handler("alert", Arc::new(NoOpActionHandler));
    let verifier = Verifier::default().with_check("health_check", Arc::new(NoopCheck));
    let orchestrator = RecoveryOrchestrator::new(
        OrchestratorConfig::default(),
        Arc::new(RunbookRegistry::standard()),
        Arc::new(actions),
        Arc::new(verifier),
        Arc::new(InMemoryIncidentStore::new()),
    );
    let (shutdown_tx, _) = watch::channel(false);
    create_router(AppState::new(Arc::new(orchestrator), shutdown_tx), false)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_version() {
    let app = app();
    let (status, body) = send(&app, get("/api/v1/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn reported_incident_is_queryable() {
    let app = app();

    let (status, body) = send(
        &app,
        post_json(
            "/api/v1/incidents",
            json!({ "failure_type": "cache_corrupt", "context": { "site": "main" } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let summary: IncidentSummary = serde_json::from_value(body).unwrap();
    assert_eq!(summary.status.as_str(), "healed");
    assert_eq!(summary.message, "System healed successfully");

    let (status, body) = send(
        &app,
        get(&format!("/api/v1/incidents/{}", summary.incident_id)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let incident: Incident = serde_json::from_value(body).unwrap();
    assert_eq!(incident.context["site"], "main");
    assert_eq!(incident.runbook_name.as_deref(), Some("Clear and rebuild cache"));
}

#[tokio::test]
async fn unknown_failure_type_escalates() {
    let app = app();
    let (status, body) = send(
        &app,
        post_json("/api/v1/incidents", json!({ "failure_type": "unknown_x" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "escalated");
    assert_eq!(body["message"], "No automated runbook found");
    assert_eq!(body["actions_executed"], json!([]));
}

#[tokio::test]
async fn empty_failure_type_is_rejected() {
    let app = app();
    let (status, body) = send(
        &app,
        post_json("/api/v1/incidents", json!({ "failure_type": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test(start_paused = true)]
async fn disconnected_client_does_not_strand_incident() {
    let app = app_with_shell(Arc::new(SlowActionHandler::new(Duration::from_secs(30))));

    let abandoned = tokio::time::timeout(
        Duration::from_secs(1),
        send(
            &app,
            post_json("/api/v1/incidents", json!({ "failure_type": "cache_corrupt" })),
        ),
    )
    .await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_secs(60)).await;

    let (status, body) = send(&app, get("/api/v1/incidents")).await;
    assert_eq!(status, StatusCode::OK);
    let incidents: Vec<Incident> = serde_json::from_value(body).unwrap();
    assert_eq!(incidents.len(), 1);
    assert_eq!(incidents[0].status.as_str(), "healed");
}

#[tokio::test]
async fn history_filters_by_status() {
    let app = app();
    for failure_type in ["cache_corrupt", "service_down", "disk_full"] {
        send(
            &app,
            post_json("/api/v1/incidents", json!({ "failure_type": failure_type })),
        )
        .await;
    }

    let (status, body) = send(&app, get("/api/v1/incidents?days=7")).await;
    assert_eq!(status, StatusCode::OK);
    let all: Vec<Incident> = serde_json::from_value(body).unwrap();
    assert_eq!(all.len(), 3);

    let (_, body) = send(&app, get("/api/v1/incidents?status=escalated")).await;
    let escalated: Vec<Incident> = serde_json::from_value(body).unwrap();
    assert_eq!(escalated.len(), 2);

    let (status, _) = send(&app, get("/api/v1/incidents?status=sleeping")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_incident_is_not_found() {
    let app = app();
    let (status, body) = send(&app, get("/api/v1/incidents/INC-20260101-abcdef")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn stats_and_runbooks() {
    let app = app();

    let (status, body) = send(&app, get("/api/v1/stats")).await;
    assert_eq!(status, StatusCode::OK);
    let empty: IncidentStats = serde_json::from_value(body).unwrap();
    assert_eq!(empty.period_days, 30);
    assert_eq!(empty.total_incidents, 0);

    send(
        &app,
        post_json("/api/v1/incidents", json!({ "failure_type": "cache_corrupt" })),
    )
    .await;
    send(
        &app,
        post_json("/api/v1/incidents", json!({ "failure_type": "db_connection" })),
    )
    .await;

    let (_, body) = send(&app, get("/api/v1/stats?days=7")).await;
    let stats: IncidentStats = serde_json::from_value(body).unwrap();
    assert_eq!(stats.period_days, 7);
    assert_eq!(stats.total_incidents, 2);
    assert_eq!(stats.auto_healed, 1);
    assert_eq!(stats.healing_rate_percent, 50.0);

    let (status, body) = send(&app, get("/api/v1/runbooks")).await;
    assert_eq!(status, StatusCode::OK);
    let runbooks: Vec<Runbook> = serde_json::from_value(body).unwrap();
    assert_eq!(runbooks.len(), 5);
    assert_eq!(runbooks[0].failure_type, "cache_corrupt");
}
