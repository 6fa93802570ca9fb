//! The common worker contract every specialized agent implements
//! (§3 Data Model "Agent").

use crate::gateway::cancellation::RequestContext;
use crate::gateway::emitter::Emitter;
use crate::gateway::parser::IacFormat;
use crate::gateway::request::AgentRequest;
use async_trait::async_trait;
use serde::Serialize;
use std::error::Error;

/// Static description of what an agent is and what it needs, surfaced
/// verbatim by `GET /agents` and `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct Capabilities {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub version: &'static str,
    pub supported_formats: &'static [IacFormat],
    pub needs_iac_input: bool,
}

/// A polymorphic worker. All agents except `deploy` are stateless; the
/// deploy agent guards its `DeploymentState` behind its own mutex rather
/// than exposing any mutability through this trait (§9 "Mutable deploy
/// state").
#[async_trait]
pub trait Agent: Send + Sync {
    fn capabilities(&self) -> &Capabilities;

    /// Run the agent. The emitter receives zero or more message chunks;
    /// the caller (orchestrator or transport) is responsible for closing
    /// the stream once every dispatched agent has returned.
    async fn handle(
        &self,
        ctx: &RequestContext,
        request: &AgentRequest,
        emitter: &(dyn Emitter + Sync),
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

/// Markdown header every agent begins its output with, naming itself
/// (§4.3: "All agents begin their output with a level-2 Markdown header
/// naming the agent").
pub fn header(name: &str) -> String {
    format!("## {}\n\n", name)
}
