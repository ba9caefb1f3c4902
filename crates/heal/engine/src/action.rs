//! Action handler registry.
//!
//! Maps an action's type tag to the handler that performs it. The engine
//! ships without handlers: the embedding application registers the ones it
//! can execute (shell commands, in-process callbacks, alerts, ...).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use heal_types::{ActionResult, ActionSpec, IncidentContext};
use tracing::{debug, instrument, warn};

/// Performs one remediation step.
///
/// Handlers report failure through [`ActionResult::failure`]; they never
/// return errors to the orchestrator.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    /// Execute the action against the current working context.
    async fn execute(&self, action: &ActionSpec, context: &IncidentContext) -> ActionResult;
}

/// Adapter turning a synchronous closure into an [`ActionHandler`].
pub struct SyncActionHandler<F> {
    f: F,
}

impl<F> SyncActionHandler<F>
where
    F: Fn(&ActionSpec, &IncidentContext) -> ActionResult + Send + Sync + 'static,
{
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> ActionHandler for SyncActionHandler<F>
where
    F: Fn(&ActionSpec, &IncidentContext) -> ActionResult + Send + Sync + 'static,
{
    async fn execute(&self, action: &ActionSpec, context: &IncidentContext) -> ActionResult {
        (self.f)(action, context)
    }
}

/// Registry of action handlers keyed by action type.
pub struct ActionRegistry {
    /// Registered handlers.
    handlers: DashMap<String, Arc<dyn ActionHandler>>,

    /// Timeout for actions that do not declare one.
    default_timeout: Duration,
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            handlers: DashMap::new(),
            default_timeout,
        }
    }

    /// Register a handler, returning the one it replaced.
    pub fn register(
        &self,
        action_type: impl Into<String>,
        handler: Arc<dyn ActionHandler>,
    ) -> Option<Arc<dyn ActionHandler>> {
        let action_type = action_type.into();
        debug!(action_type = %action_type, "Registering action handler");
        self.handlers.insert(action_type, handler)
    }

    /// Builder-style registration.
    pub fn with_handler(
        self,
        action_type: impl Into<String>,
        handler: Arc<dyn ActionHandler>,
    ) -> Self {
        self.register(action_type, handler);
        self
    }

    /// Is there a handler for this type?
    pub fn contains(&self, action_type: &str) -> bool {
        self.handlers.contains_key(action_type)
    }

    /// Registered action types, sorted.
    pub fn action_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.iter().map(|e| e.key().clone()).collect();
        types.sort();
        types
    }

    /// Dispatch an action to its handler under a timeout.
    ///
    /// Unknown types and timeouts come back as failed results.
    #[instrument(skip(self, context), fields(action_type = %action.action_type))]
    pub async fn execute(&self, action: &ActionSpec, context: &IncidentContext) -> ActionResult {
        let handler = match self.handlers.get(&action.action_type) {
            Some(entry) => entry.value().clone(),
            None => {
                warn!(action_type = %action.action_type, "No handler registered for action type");
                return ActionResult::failure(format!(
                    "unknown action type: {}",
                    action.action_type
                ));
            }
        };

        let limit = action.timeout().unwrap_or(self.default_timeout);
        match tokio::time::timeout(limit, handler.execute(action, context)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout = ?limit, "Action timed out");
                ActionResult::failure(format!("action timed out after {:?}", limit))
            }
        }
    }
}
