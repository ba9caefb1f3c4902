//! `shell` action: run an external command.

use async_trait::async_trait;
use heal_engine::ActionHandler;
use heal_types::{ActionResult, ActionSpec, IncidentContext};
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info};

/// Runs `params.command`.
///
/// With `params.args` the command is executed directly with those
/// arguments; without them the command line goes through `sh -c`. The
/// child is killed when the action is dropped, so registry timeouts and
/// shutdown stop it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellActionHandler;

impl ShellActionHandler {
    pub fn new() -> Self {
        Self
    }

    fn build(&self, action: &ActionSpec, command: &str) -> Command {
        let args: Option<Vec<String>> =
            action.params.get("args").and_then(Value::as_array).map(|a| {
                a.iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            });

        let mut cmd = match args {
            Some(args) => {
                let mut cmd = Command::new(command);
                cmd.args(args);
                cmd
            }
            None => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c").arg(command);
                cmd
            }
        };

        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl ActionHandler for ShellActionHandler {
    async fn execute(&self, action: &ActionSpec, _context: &IncidentContext) -> ActionResult {
        let Some(command) = action.param_str("command") else {
            return ActionResult::failure("shell action has no command");
        };

        info!(command = %command, "Running remediation command");
        let output = match self.build(action, command).output().await {
            Ok(output) => output,
            Err(e) => return ActionResult::failure(format!("failed to run {}: {}", command, e)),
        };

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        debug!(command = %command, status = %output.status, "Command finished");

        if output.status.success() {
            ActionResult::ok_with_output(stdout)
        } else if stderr.is_empty() {
            ActionResult::failure(format!("{} exited with {}", command, output.status))
        } else {
            ActionResult::failure(stderr)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_command_line_via_shell() {
        let handler = ShellActionHandler::new();
        let result = handler
            .execute(
                &ActionSpec::new("shell").with_param("command", "echo cache rebuilt"),
                &IncidentContext::new(),
            )
            .await;
        assert!(result.success);
        assert_eq!(result.output.as_deref(), Some("cache rebuilt"));
    }

    #[tokio::test]
    async fn test_explicit_args() {
        let handler = ShellActionHandler::new();
        let action = ActionSpec::new("shell")
            .with_param("command", "echo")
            .with_param("args", serde_json::json!(["-n", "hello"]));
        let result = handler.execute(&action, &IncidentContext::new()).await;
        assert_eq!(result.output.as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_fails() {
        let handler = ShellActionHandler::new();
        let result = handler
            .execute(
                &ActionSpec::new("shell").with_param("command", "echo boom >&2; exit 3"),
                &IncidentContext::new(),
            )
            .await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_missing_command() {
        let result = ShellActionHandler::new()
            .execute(&ActionSpec::new("shell"), &IncidentContext::new())
            .await;
        assert!(!result.success);
    }
}
