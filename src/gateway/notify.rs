//! Routing and delivery adapters for the `notification` agent (§4.3
//! "notification").

use crate::gateway::clients::http_pool::{client_for, ClientKind};
use async_trait::async_trait;
use serde_json::json;
use std::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Security,
    Deployment,
    Policy,
    Cost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Teams,
    Slack,
    Email,
    Webhook,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Teams => "teams",
            Channel::Slack => "slack",
            Channel::Email => "email",
            Channel::Webhook => "webhook",
        }
    }
}

/// Fixed routing table mapping `(event, severity)` to the channels that get
/// notified (§4.3). `security` routes on every severity; the rest match a
/// specific severity.
pub fn route(event: EventType, severity: EventSeverity) -> &'static [Channel] {
    match (event, severity) {
        (EventType::Security, _) => &[Channel::Teams, Channel::Email, Channel::Webhook],
        (EventType::Deployment, EventSeverity::Error) => &[Channel::Teams, Channel::Slack, Channel::Email],
        (EventType::Deployment, EventSeverity::Info) => &[Channel::Slack],
        (EventType::Policy, EventSeverity::Warning) => &[Channel::Slack],
        (EventType::Cost, EventSeverity::Warning) => &[Channel::Slack],
        _ => &[],
    }
}

#[derive(Debug, Clone)]
pub struct NotificationOutcome {
    pub channel: Channel,
    pub delivered: bool,
    pub error: Option<String>,
}

/// Post a Teams MessageCard payload.
pub async fn send_teams(webhook_url: &str, title: &str, text: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let payload = json!({
        "@type": "MessageCard",
        "@context": "http://schema.org/extensions",
        "summary": title,
        "title": title,
        "text": text,
    });
    post_webhook(webhook_url, &payload).await
}

/// Post a Slack `text` payload.
pub async fn send_slack(webhook_url: &str, text: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    let payload = json!({ "text": text });
    post_webhook(webhook_url, &payload).await
}

async fn post_webhook(url: &str, payload: &serde_json::Value) -> Result<(), Box<dyn Error + Send + Sync>> {
    let client = client_for(url, ClientKind::Webhook);
    client.post(url).json(payload).send().await?.error_for_status()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_events_route_to_teams_email_and_webhook_regardless_of_severity() {
        assert_eq!(
            route(EventType::Security, EventSeverity::Info),
            &[Channel::Teams, Channel::Email, Channel::Webhook]
        );
    }

    #[test]
    fn deployment_error_routes_to_three_channels() {
        assert_eq!(
            route(EventType::Deployment, EventSeverity::Error),
            &[Channel::Teams, Channel::Slack, Channel::Email]
        );
    }

    #[test]
    fn deployment_info_routes_to_slack_only() {
        assert_eq!(route(EventType::Deployment, EventSeverity::Info), &[Channel::Slack]);
    }

    #[test]
    fn policy_warning_routes_to_slack_only() {
        assert_eq!(route(EventType::Policy, EventSeverity::Warning), &[Channel::Slack]);
    }

    #[test]
    fn unmapped_combination_routes_nowhere() {
        assert!(route(EventType::Cost, EventSeverity::Info).is_empty());
    }
}
