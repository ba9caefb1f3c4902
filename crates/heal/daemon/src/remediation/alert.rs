//! `alert` action: page operators.

use std::time::Duration;

use async_trait::async_trait;
use heal_engine::ActionHandler;
use heal_types::{ActionResult, ActionSpec, IncidentContext};
use serde::Serialize;
use tracing::{error, warn};

use crate::config::AlertConfig;

const DEFAULT_CHANNEL: &str = "ops";

/// Payload posted to the alert webhook
#[derive(Debug, Serialize)]
pub struct AlertPayload<'a> {
    pub channel: &'a str,
    pub incident_context: &'a IncidentContext,
}

/// Logs an alert and, when a webhook is configured, delivers it.
///
/// Delivery failures fail the action. Without a webhook the alert is only
/// logged and the action succeeds.
#[derive(Debug, Clone)]
pub struct AlertActionHandler {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl AlertActionHandler {
    pub fn new(config: &AlertConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            webhook_url: config.webhook_url.clone(),
        })
    }

    async fn deliver(&self, url: &str, payload: &AlertPayload<'_>) -> Result<(), String> {
        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| format!("alert delivery failed: {}", e))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("alert webhook returned {}", status))
        }
    }
}

#[async_trait]
impl ActionHandler for AlertActionHandler {
    async fn execute(&self, action: &ActionSpec, context: &IncidentContext) -> ActionResult {
        let channel = action.param_str("channel").unwrap_or(DEFAULT_CHANNEL);

        error!(
            channel = %channel,
            incident_context = %serde_json::Value::Object(context.clone()),
            "Self-healing alert"
        );

        let Some(url) = &self.webhook_url else {
            return ActionResult::ok_with_output(format!("alert logged for {}", channel));
        };

        let payload = AlertPayload {
            channel,
            incident_context: context,
        };
        match self.deliver(url, &payload).await {
            Ok(()) => ActionResult::ok_with_output(format!("alert sent to {}", channel)),
            Err(e) => {
                warn!(channel = %channel, error = %e, "Alert delivery failed");
                ActionResult::failure(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_alert_without_webhook_is_logged() {
        let handler = AlertActionHandler::new(&AlertConfig::default()).unwrap();
        let result = handler
            .execute(
                &ActionSpec::new("alert").with_param("channel", "ops"),
                &IncidentContext::new(),
            )
            .await;
        assert!(result.success);
        assert_eq!(result.output.as_deref(), Some("alert logged for ops"));
    }

    #[tokio::test]
    async fn test_unreachable_webhook_fails() {
        let config = AlertConfig {
            // port 9 on loopback: nothing listens there
            webhook_url: Some("http://127.0.0.1:9/alerts".to_string()),
            timeout_secs: 2,
        };
        let handler = AlertActionHandler::new(&config).unwrap();
        let result = handler
            .execute(&ActionSpec::new("alert"), &IncidentContext::new())
            .await;
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("alert delivery failed"));
    }
}
