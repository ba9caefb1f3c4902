//! Configuration for heal-daemon

use heal_engine::{OrchestratorConfig, RunbookRegistry};
use heal_types::Runbook;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Orchestrator configuration
    #[serde(default)]
    pub engine: OrchestratorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Alert delivery
    #[serde(default)]
    pub alerts: AlertConfig,

    /// Verification check tuning
    #[serde(default)]
    pub checks: ChecksConfig,

    /// Runbook catalog. Empty means the standard catalog.
    #[serde(default)]
    pub runbooks: Vec<Runbook>,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            enable_cors: true,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage (for development/testing)
    #[default]
    Memory,

    /// PostgreSQL storage
    Postgres {
        /// Connection URL
        url: String,

        /// Maximum connections in pool
        #[serde(default = "default_pool_size")]
        max_connections: u32,

        /// Connection timeout in seconds
        #[serde(default = "default_connection_timeout")]
        connect_timeout_secs: u64,
    },
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Alert delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertConfig {
    /// Webhook receiving alert payloads. Alerts are only logged when unset.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Webhook request timeout in seconds
    #[serde(default = "default_alert_timeout")]
    pub timeout_secs: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_alert_timeout(),
        }
    }
}

/// Verification check configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecksConfig {
    /// Memory usage percent under which `memory_check` passes when the
    /// runbook gives no threshold
    #[serde(default = "default_memory_threshold")]
    pub memory_threshold_percent: f64,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            memory_threshold_percent: default_memory_threshold(),
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_pool_size() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_alert_timeout() -> u64 {
    10
}

fn default_memory_threshold() -> f64 {
    80.0
}

impl DaemonConfig {
    /// Load configuration from defaults, an optional file and `HEAL_`
    /// environment variables, in increasing priority.
    ///
    /// Nested keys use a double underscore: `HEAL_SERVER__LISTEN_ADDR`.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("HEAL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Runbooks to serve: the configured ones, or the standard catalog.
    pub fn runbook_registry(&self) -> heal_engine::HealResult<RunbookRegistry> {
        if self.runbooks.is_empty() {
            Ok(RunbookRegistry::standard())
        } else {
            RunbookRegistry::from_runbooks(self.runbooks.iter().cloned())
        }
    }
}
