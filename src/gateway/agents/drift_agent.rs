//! `drift` agent (§4.3).

use crate::gateway::agent::{header, Agent, Capabilities};
use crate::gateway::agents::require_iac;
use crate::gateway::cancellation::RequestContext;
use crate::gateway::drift::{compare, DriftStatus, ResourceGraphLookup};
use crate::gateway::emitter::Emitter;
use crate::gateway::parser::IacFormat;
use crate::gateway::request::AgentRequest;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::Write as _;
use std::sync::Arc;

pub struct DriftAgent {
    capabilities: Capabilities,
    graph: Arc<dyn ResourceGraphLookup>,
}

impl DriftAgent {
    pub fn new(graph: Arc<dyn ResourceGraphLookup>) -> Self {
        Self {
            capabilities: Capabilities {
                id: "drift",
                name: "Drift",
                description: "Compares declared resources against observed live state.",
                version: "1.0.0",
                supported_formats: &[IacFormat::Terraform, IacFormat::Bicep],
                needs_iac_input: true,
            },
            graph,
        }
    }
}

fn status_label(status: &DriftStatus) -> &'static str {
    match status {
        DriftStatus::InSync => "in sync",
        DriftStatus::Drifted => "drifted",
        DriftStatus::MissingInAzure => "missing in Azure",
        DriftStatus::MissingInIac => "missing in IaC",
    }
}

#[async_trait]
impl Agent for DriftAgent {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn handle(
        &self,
        _ctx: &RequestContext,
        request: &AgentRequest,
        emitter: &(dyn Emitter + Sync),
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        emitter.message(&header("Drift")).await;

        let iac = require_iac(request)?;
        let live = self.graph.live_state().await?;
        let findings = compare(&iac.resources, &live);

        let mut out = String::from("| Resource | Status | Detail |\n|---|---|---|\n");
        for f in &findings {
            let _ = writeln!(
                out,
                "| {} ({}) | {} | {} |",
                f.resource_name,
                f.resource_type,
                status_label(&f.status),
                f.detail.as_deref().unwrap_or("-"),
            );
        }

        emitter.message(&out).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::drift::SyntheticResourceGraph;
    use crate::gateway::emitter::ReferenceLink;
    use crate::gateway::request::{ChatMessage, ChatRole};
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
    async fn reports_drift_for_the_synthetic_storage_case() {
        let agent = DriftAgent::new(Arc::new(SyntheticResourceGraph));
        let message = "check drift\n```hcl\nresource \"azurerm_storage_account\" \"s\" { enable_https_traffic_only = true }\n```";
        let request = AgentRequest {
            messages: vec![ChatMessage {
                role: ChatRole::User,
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
        assert!(output.contains("drifted"));
    }
}
