//! Remediation handlers and verification checks served by the daemon.
//!
//! The engine only knows action and check types as strings; this module
//! binds the ones the standard catalog uses to real implementations.

mod alert;
mod callback;
mod checks;
mod shell;

use std::sync::Arc;

use heal_engine::{ActionRegistry, NoopCheck, ThresholdCheck, Verifier};

use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};

pub use alert::{AlertActionHandler, AlertPayload};
pub use callback::{Callback, CallbackActionHandler, CIRCUIT_BREAKER_ACTIVE};
pub use checks::SystemMemory;
pub use shell::ShellActionHandler;

/// Checks that have no probe yet and always pass.
pub const PLACEHOLDER_CHECKS: [&str; 3] = ["health_check", "response_time", "error_rate"];

/// Action registry with the `shell`, `callback` and `alert` handlers.
pub fn action_registry(config: &DaemonConfig) -> DaemonResult<ActionRegistry> {
    let alert = AlertActionHandler::new(&config.alerts)
        .map_err(|e| DaemonError::Config(format!("Invalid alert client settings: {}", e)))?;

    Ok(ActionRegistry::new(config.engine.default_action_timeout())
        .with_handler("shell", Arc::new(ShellActionHandler::new()))
        .with_handler("callback", Arc::new(CallbackActionHandler::standard()))
        .with_handler("alert", Arc::new(alert)))
}

/// Verifier with `memory_check` backed by host memory and placeholder
/// checks for the rest of the standard catalog.
pub fn verifier(config: &DaemonConfig) -> Verifier {
    let memory = ThresholdCheck::new(
        Arc::new(SystemMemory::new()),
        "threshold",
        config.checks.memory_threshold_percent,
    );

    PLACEHOLDER_CHECKS.iter().fold(
        Verifier::new(config.engine.unknown_check_policy)
            .with_check("memory_check", Arc::new(memory)),
        |verifier, check_type| verifier.with_check(*check_type, Arc::new(NoopCheck)),
    )
}
