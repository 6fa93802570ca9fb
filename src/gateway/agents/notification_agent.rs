//! `notification` agent (§4.3).

use crate::gateway::agent::{header, Agent, Capabilities};
use crate::gateway::cancellation::RequestContext;
use crate::gateway::emitter::Emitter;
use crate::gateway::notify::{route, send_slack, send_teams, Channel, EventSeverity, EventType};
use crate::gateway::parser::IacFormat;
use crate::gateway::request::AgentRequest;
use async_trait::async_trait;
use std::error::Error;

fn classify_event(message: &str) -> (EventType, EventSeverity) {
    let lower = message.to_lowercase();

    let event = if lower.contains("security") || lower.contains("breach") || lower.contains("incident") {
        EventType::Security
    } else if lower.contains("deploy") || lower.contains("promot") || lower.contains("rollback") {
        EventType::Deployment
    } else if lower.contains("cost") || lower.contains("budget") || lower.contains("spend") {
        EventType::Cost
    } else {
        EventType::Policy
    };

    let severity = if lower.contains("fail") || lower.contains("error") || lower.contains("critical") {
        EventSeverity::Error
    } else if lower.contains("warn") || lower.contains("drift") || lower.contains("exceed") {
        EventSeverity::Warning
    } else {
        EventSeverity::Info
    };

    (event, severity)
}

pub struct NotificationAgent {
    capabilities: Capabilities,
    enable_notifications: bool,
    teams_webhook_url: Option<String>,
    slack_webhook_url: Option<String>,
}

impl NotificationAgent {
    pub fn new(enable_notifications: bool, teams_webhook_url: Option<String>, slack_webhook_url: Option<String>) -> Self {
        Self {
            capabilities: Capabilities {
                id: "notification",
                name: "Notification",
                description: "Routes gateway events to Teams, Slack, email, or a webhook.",
                version: "1.0.0",
                supported_formats: &[],
                needs_iac_input: false,
            },
            enable_notifications,
            teams_webhook_url,
            slack_webhook_url,
        }
    }
}

#[async_trait]
impl Agent for NotificationAgent {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn handle(
        &self,
        _ctx: &RequestContext,
        request: &AgentRequest,
        emitter: &(dyn Emitter + Sync),
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        emitter.message(&header("Notification")).await;

        let message = request.last_user_message().unwrap_or("");
        let (event, severity) = classify_event(message);
        let channels = route(event, severity);

        if channels.is_empty() {
            emitter
                .message("No notification channel is configured for this event.\n")
                .await;
            return Ok(());
        }

        if !self.enable_notifications {
            let names: Vec<&str> = channels.iter().map(Channel::as_str).collect();
            emitter
                .message(&format!(
                    "Would route to: {} (notifications are disabled, so nothing was sent).\n",
                    names.join(", ")
                ))
                .await;
            return Ok(());
        }

        for channel in channels {
            let outcome = match channel {
                Channel::Teams => match &self.teams_webhook_url {
                    Some(url) => send_teams(url, "Gateway Notification", message).await,
                    None => Err("no Teams webhook URL configured".into()),
                },
                Channel::Slack => match &self.slack_webhook_url {
                    Some(url) => send_slack(url, message).await,
                    None => Err("no Slack webhook URL configured".into()),
                },
                Channel::Email | Channel::Webhook => Err("channel not wired to a delivery adapter".into()),
            };

            match outcome {
                Ok(()) => emitter.message(&format!("Delivered to {}.\n", channel.as_str())).await,
                Err(e) => {
                    emitter
                        .message(&format!("Failed to deliver to {}: {}\n", channel.as_str(), e))
                        .await
                }
            }
        }

        Ok(())
    }
}
