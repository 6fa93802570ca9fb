//! The inbound chat turn (§3 Data Model "AgentRequest").

use crate::gateway::parser::{IacFormat, Resource};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// A client-supplied attachment (editor selection, open file, etc).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
    pub language: Option<String>,
}

/// IaC enriched onto the request by the host once an agent declaring
/// `needs_iac_input` is dispatched to — never set directly by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IacContext {
    pub format: IacFormat,
    pub resources: Vec<Resource>,
    pub raw_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentRequestBody {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub references: Vec<Reference>,
}

/// One chat turn as it travels through the orchestrator and into an agent.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub messages: Vec<ChatMessage>,
    pub references: Vec<Reference>,
    pub iac: Option<IacContext>,
    /// GitHub OAuth token extracted from the inbound request, used for
    /// downstream LLM calls.
    pub token: Option<String>,
}

impl AgentRequest {
    pub fn from_body(body: AgentRequestBody, token: Option<String>) -> Self {
        Self {
            messages: body.messages,
            references: body.references,
            iac: None,
            token,
        }
    }

    /// The last `user` message, which carries the active prompt (§3).
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.as_str())
    }

    /// Enrich the request with parsed IaC, extracted from the last user
    /// message's fenced code blocks. Agents that declare `needs_iac_input`
    /// call this lazily rather than the host doing it unconditionally, so
    /// agents that don't need it never pay the parse cost.
    pub fn with_parsed_iac(mut self) -> Self {
        if self.iac.is_some() {
            return self;
        }
        let Some(message) = self.last_user_message() else {
            return self;
        };
        let raw_code = crate::gateway::parser::resolve_source(message);
        let (format, resources) = crate::gateway::parser::parse_from_message(message);
        self.iac = Some(IacContext {
            format,
            resources,
            raw_code,
        });
        self
    }
}
