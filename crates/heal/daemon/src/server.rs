//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::{DaemonConfig, StorageConfig};
use crate::error::{DaemonError, DaemonResult};
use crate::remediation;
use heal_engine::{
    HealError, InMemoryIncidentStore, IncidentStore, PostgresIncidentStore, RecoveryOrchestrator,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// HEAL Daemon Server
pub struct Server {
    config: DaemonConfig,
    orchestrator: Arc<RecoveryOrchestrator>,
}

impl Server {
    /// Create a new server with the given configuration
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let store = open_store(&config.storage).await?;
        let orchestrator = build_orchestrator(&config, store)?;

        Ok(Self {
            config,
            orchestrator: Arc::new(orchestrator),
        })
    }

    pub fn orchestrator(&self) -> Arc<RecoveryOrchestrator> {
        self.orchestrator.clone()
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let state = AppState::new(self.orchestrator.clone(), shutdown_tx.clone());
        let app = create_router(state, self.config.server.enable_cors);

        let listener = TcpListener::bind(addr).await?;

        tracing::info!("HEAL daemon listening on {}", addr);
        tracing::info!(
            runbooks = self.orchestrator.runbooks().len(),
            "Runbook catalog loaded"
        );

        // Flip the shared flag on SIGINT/SIGTERM so running recoveries stop
        tokio::spawn(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        });

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.wait_for(|stop| *stop).await;
            })
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("HEAL daemon shut down");
        Ok(())
    }
}

/// Open the configured incident store
pub async fn open_store(config: &StorageConfig) -> DaemonResult<Arc<dyn IncidentStore>> {
    match config {
        StorageConfig::Memory => {
            tracing::info!("Using in-memory incident store");
            Ok(Arc::new(InMemoryIncidentStore::new()))
        }
        StorageConfig::Postgres {
            url,
            max_connections,
            connect_timeout_secs,
        } => {
            tracing::info!(max_connections, "Connecting to PostgreSQL incident store");
            let store = PostgresIncidentStore::new(url, *max_connections, *connect_timeout_secs)
                .await
                .map_err(HealError::from)?;
            Ok(Arc::new(store))
        }
    }
}

/// Wire runbooks, handlers and checks into an orchestrator
pub fn build_orchestrator(
    config: &DaemonConfig,
    store: Arc<dyn IncidentStore>,
) -> DaemonResult<RecoveryOrchestrator> {
    let runbooks = config.runbook_registry()?;
    let actions = remediation::action_registry(config)?;
    let verifier = remediation::verifier(config);

    Ok(RecoveryOrchestrator::new(
        config.engine.clone(),
        Arc::new(runbooks),
        Arc::new(actions),
        Arc::new(verifier),
        store,
    ))
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
