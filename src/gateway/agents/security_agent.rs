//! `security` agent (§4.3).

use crate::gateway::agent::{header, Agent, Capabilities};
use crate::gateway::agents::{render_findings_table, require_iac};
use crate::gateway::cancellation::RequestContext;
use crate::gateway::emitter::Emitter;
use crate::gateway::parser::IacFormat;
use crate::gateway::request::AgentRequest;
use crate::gateway::rules::{Category, RuleCatalog};
use async_trait::async_trait;
use std::error::Error;

pub struct SecurityAgent {
    capabilities: Capabilities,
    catalog: RuleCatalog,
}

impl SecurityAgent {
    pub fn new() -> Self {
        Self {
            capabilities: Capabilities {
                id: "security",
                name: "Security",
                description: "Checks parsed IaC resources against the security rule set.",
                version: "1.0.0",
                supported_formats: &[IacFormat::Terraform, IacFormat::Bicep],
                needs_iac_input: true,
            },
            catalog: RuleCatalog::standard(),
        }
    }
}

impl Default for SecurityAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for SecurityAgent {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn handle(
        &self,
        _ctx: &RequestContext,
        request: &AgentRequest,
        emitter: &(dyn Emitter + Sync),
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        emitter.message(&header("Security")).await;

        let iac = require_iac(request)?;
        let findings: Vec<_> = self
            .catalog
            .evaluate(&iac.resources)
            .into_iter()
            .filter(|f| f.category == Category::Security)
            .collect();

        emitter.message(&render_findings_table(&findings)).await;
        Ok(())
    }
}
