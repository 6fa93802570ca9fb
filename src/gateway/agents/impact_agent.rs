//! `impact` agent (§4.3).

use crate::gateway::agent::{header, Agent, Capabilities};
use crate::gateway::agents::require_iac;
use crate::gateway::cancellation::RequestContext;
use crate::gateway::emitter::Emitter;
use crate::gateway::parser::IacFormat;
use crate::gateway::request::AgentRequest;
use crate::gateway::rules::score_impact;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::Write as _;

pub struct ImpactAgent {
    capabilities: Capabilities,
}

impl ImpactAgent {
    pub fn new() -> Self {
        Self {
            capabilities: Capabilities {
                id: "impact",
                name: "Impact",
                description: "Computes a blast-radius score across declared resources.",
                version: "1.0.0",
                supported_formats: &[IacFormat::Terraform, IacFormat::Bicep],
                needs_iac_input: true,
            },
        }
    }
}

impl Default for ImpactAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for ImpactAgent {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn handle(
        &self,
        _ctx: &RequestContext,
        request: &AgentRequest,
        emitter: &(dyn Emitter + Sync),
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        emitter.message(&header("Impact")).await;

        let iac = require_iac(request)?;
        let radius = score_impact(&iac.resources);

        let mut out = String::new();
        let _ = write!(out, "Blast radius: **{}** ({:?})\n\n", radius.total, radius.level);
        out.push_str("| Resource | Weight |\n|---|---|\n");
        for risk in &radius.per_resource {
            let _ = write!(out, "| {} ({}) | {} |\n", risk.resource_name, risk.resource_type, risk.weight);
        }

        emitter.message(&out).await;
        Ok(())
    }
}
