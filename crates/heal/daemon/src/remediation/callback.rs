//! `callback` action: named in-process remediation routines.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use heal_engine::ActionHandler;
use heal_types::{ActionResult, ActionSpec, IncidentContext};
use tracing::{info, warn};

/// Context key set once the circuit breaker callback has run.
pub const CIRCUIT_BREAKER_ACTIVE: &str = "circuit_breaker_active";

/// An in-process remediation routine.
pub type Callback = Arc<dyn Fn(&ActionSpec, &IncidentContext) -> ActionResult + Send + Sync>;

/// Dispatches on `params.callback` to a named routine.
pub struct CallbackActionHandler {
    callbacks: HashMap<String, Callback>,
}

impl Default for CallbackActionHandler {
    fn default() -> Self {
        Self::standard()
    }
}

impl CallbackActionHandler {
    /// Handler with no callbacks registered.
    pub fn empty() -> Self {
        Self {
            callbacks: HashMap::new(),
        }
    }

    /// Handler with the built-in callbacks used by the standard catalog.
    pub fn standard() -> Self {
        Self::empty()
            .with_callback("release_opcache", |_, _| {
                info!("Requesting opcode cache reset");
                ActionResult::ok_with_output("opcode cache reset requested")
            })
            .with_callback("optimize_queries", |_, _| {
                info!("Requesting query cache flush");
                ActionResult::ok_with_output("query cache flush requested")
            })
            .with_callback("enable_circuit_breaker", |_, context| {
                if context
                    .get(CIRCUIT_BREAKER_ACTIVE)
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false)
                {
                    return ActionResult::ok_with_output("circuit breaker already active");
                }
                warn!("Enabling circuit breaker");
                ActionResult::ok_with_output("circuit breaker enabled")
                    .with_context_update(CIRCUIT_BREAKER_ACTIVE, true)
            })
    }

    /// Register a callback under `name`, replacing any existing one.
    pub fn with_callback<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ActionSpec, &IncidentContext) -> ActionResult + Send + Sync + 'static,
    {
        self.callbacks.insert(name.into(), Arc::new(f));
        self
    }

    /// Registered callback names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.callbacks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[async_trait]
impl ActionHandler for CallbackActionHandler {
    async fn execute(&self, action: &ActionSpec, context: &IncidentContext) -> ActionResult {
        let Some(name) = action.param_str("callback") else {
            return ActionResult::failure("callback action has no callback name");
        };

        match self.callbacks.get(name) {
            Some(callback) => callback(action, context),
            None => {
                warn!(callback = %name, "Unknown callback");
                ActionResult::failure(format!("unknown callback: {}", name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callback(name: &str) -> ActionSpec {
        ActionSpec::new("callback").with_param("callback", name)
    }

    #[test]
    fn test_standard_callbacks() {
        assert_eq!(
            CallbackActionHandler::standard().names(),
            vec!["enable_circuit_breaker", "optimize_queries", "release_opcache"]
        );
    }

    #[tokio::test]
    async fn test_circuit_breaker_reports_context_update() {
        let handler = CallbackActionHandler::standard();
        let result = handler
            .execute(&callback("enable_circuit_breaker"), &IncidentContext::new())
            .await;
        assert!(result.success);
        assert_eq!(result.context_updates[CIRCUIT_BREAKER_ACTIVE], true);

        let mut context = IncidentContext::new();
        context.insert(CIRCUIT_BREAKER_ACTIVE.into(), true.into());
        let again = handler
            .execute(&callback("enable_circuit_breaker"), &context)
            .await;
        assert!(again.success);
        assert!(again.context_updates.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_callback_fails() {
        let result = CallbackActionHandler::standard()
            .execute(&callback("reticulate_splines"), &IncidentContext::new())
            .await;
        assert!(!result.success);
        assert_eq!(
            result.error.as_deref(),
            Some("unknown callback: reticulate_splines")
        );
    }

    #[tokio::test]
    async fn test_custom_callback() {
        let handler = CallbackActionHandler::empty()
            .with_callback("purge_sessions", |_, _| ActionResult::ok_with_output("purged"));
        let result = handler
            .execute(&callback("purge_sessions"), &IncidentContext::new())
            .await;
        assert_eq!(result.output.as_deref(), Some("purged"));
    }
}
