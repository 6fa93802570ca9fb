//! `compliance` agent (§4.3). Its findings are a projection over the
//! policy/security results, not an independent scan (§4.2).

use crate::gateway::agent::{header, Agent, Capabilities};
use crate::gateway::agents::{render_findings_table, require_iac};
use crate::gateway::cancellation::RequestContext;
use crate::gateway::emitter::Emitter;
use crate::gateway::parser::IacFormat;
use crate::gateway::request::AgentRequest;
use crate::gateway::rules::RuleCatalog;
use async_trait::async_trait;
use std::error::Error;

pub struct ComplianceAgent {
    capabilities: Capabilities,
    catalog: RuleCatalog,
}

impl ComplianceAgent {
    pub fn new() -> Self {
        Self {
            capabilities: Capabilities {
                id: "compliance",
                name: "Compliance",
                description: "Projects NIST/CIS controls over existing policy and security findings.",
                version: "1.0.0",
                supported_formats: &[IacFormat::Terraform, IacFormat::Bicep],
                needs_iac_input: true,
            },
            catalog: RuleCatalog::standard(),
        }
    }
}

impl Default for ComplianceAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for ComplianceAgent {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn handle(
        &self,
        _ctx: &RequestContext,
        request: &AgentRequest,
        emitter: &(dyn Emitter + Sync),
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        emitter.message(&header("Compliance")).await;

        let iac = require_iac(request)?;
        let base = self.catalog.evaluate(&iac.resources);
        let compliance = self.catalog.evaluate_compliance(&base);

        emitter.message(&render_findings_table(&compliance)).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::emitter::ReferenceLink;
    use std::sync::Mutex;

    struct CapturingEmitter(Mutex<String>);

    #[async_trait]
    impl Emitter for CapturingEmitter {
        async fn message(&self, chunk: &str) {
            self.0.lock().unwrap().push_str(chunk);
        }
        async fn references(&self, _refs: Vec<ReferenceLink>) {}
    }

    #[tokio::test]
    async fn projects_nist_sc28_from_storage_violations() {
        let agent = ComplianceAgent::new();
        let message = "analyze\n```hcl\nresource \"azurerm_storage_account\" \"s\" { enable_https_traffic_only = false }\n```";
        let request = AgentRequest {
            messages: vec![crate::gateway::request::ChatMessage {
                role: crate::gateway::request::ChatRole::User,
                content: message.to_string(),
            }],
            references: vec![],
            iac: None,
            token: None,
        }
        .with_parsed_iac();

        let emitter = CapturingEmitter(Mutex::new(String::new()));
        let ctx = RequestContext::new("r1");
        agent.handle(&ctx, &request, &emitter).await.unwrap();

        let output = emitter.0.lock().unwrap().clone();
        assert!(output.contains("NIST-SC28"));
    }
}
