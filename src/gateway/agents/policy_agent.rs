//! `policy` agent (§4.3).

use crate::gateway::agent::{header, Agent, Capabilities};
use crate::gateway::agents::{render_findings_table, require_iac};
use crate::gateway::cancellation::RequestContext;
use crate::gateway::emitter::Emitter;
use crate::gateway::parser::IacFormat;
use crate::gateway::request::AgentRequest;
use crate::gateway::rules::{Category, RuleCatalog};
use async_trait::async_trait;
use std::error::Error;

pub struct PolicyAgent {
    capabilities: Capabilities,
    catalog: RuleCatalog,
}

impl PolicyAgent {
    pub fn new() -> Self {
        Self {
            capabilities: Capabilities {
                id: "policy",
                name: "Policy",
                description: "Checks parsed IaC resources against the policy rule set.",
                version: "1.0.0",
                supported_formats: &[IacFormat::Terraform, IacFormat::Bicep],
                needs_iac_input: true,
            },
            catalog: RuleCatalog::standard(),
        }
    }
}

impl Default for PolicyAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for PolicyAgent {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn handle(
        &self,
        _ctx: &RequestContext,
        request: &AgentRequest,
        emitter: &(dyn Emitter + Sync),
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        emitter.message(&header("Policy")).await;

        let iac = require_iac(request)?;
        let findings: Vec<_> = self
            .catalog
            .evaluate(&iac.resources)
            .into_iter()
            .filter(|f| f.category == Category::Policy)
            .collect();

        emitter.message(&render_findings_table(&findings)).await;
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
    async fn reports_pol_001_and_pol_003_for_insecure_storage() {
        let agent = PolicyAgent::new();
        let message = "analyze\n```hcl\nresource \"azurerm_storage_account\" \"s\" { enable_https_traffic_only = false min_tls_version = \"TLS1_0\" }\n```";
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
        assert!(output.contains("POL-001"));
        assert!(output.contains("POL-003"));
    }

    #[tokio::test]
    async fn errors_without_iac_input() {
        let agent = PolicyAgent::new();
        let request = AgentRequest {
            messages: vec![],
            references: vec![],
            iac: None,
            token: None,
        };
        let emitter = CapturingEmitter(Mutex::new(String::new()));
        let ctx = RequestContext::new("r1");
        assert!(agent.handle(&ctx, &request, &emitter).await.is_err());
    }
}
