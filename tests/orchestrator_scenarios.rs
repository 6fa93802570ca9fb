//! End-to-end scenarios against the in-process orchestrator, independent
//! of the HTTP/stdio transports (§8 "Concrete Scenarios").

use async_trait::async_trait;
use chrono::Utc;
use iacgate::gateway::agent::{Agent, Capabilities};
use iacgate::gateway::agents::compliance_agent::ComplianceAgent;
use iacgate::gateway::agents::cost_agent::CostAgent;
use iacgate::gateway::agents::deploy_agent::DeployAgent;
use iacgate::gateway::agents::drift_agent::DriftAgent;
use iacgate::gateway::agents::impact_agent::ImpactAgent;
use iacgate::gateway::agents::orchestrator::Orchestrator;
use iacgate::gateway::agents::policy_agent::PolicyAgent;
use iacgate::gateway::agents::security_agent::SecurityAgent;
use iacgate::gateway::cancellation::RequestContext;
use iacgate::gateway::cost::SyntheticPriceLookup;
use iacgate::gateway::drift::SyntheticResourceGraph;
use iacgate::gateway::emitter::{Emitter, ReferenceLink};
use iacgate::gateway::registry::AgentRegistryBuilder;
use iacgate::gateway::request::{AgentRequest, ChatMessage, ChatRole};
use std::sync::{Arc, Mutex};

struct CapturingEmitter(Mutex<String>);

impl CapturingEmitter {
    fn new() -> Self {
        Self(Mutex::new(String::new()))
    }

    fn output(&self) -> String {
        self.0.lock().unwrap().clone()
    }
}

#[async_trait]
impl Emitter for CapturingEmitter {
    async fn message(&self, chunk: &str) {
        self.0.lock().unwrap().push_str(chunk);
    }
    async fn references(&self, _refs: Vec<ReferenceLink>) {}
}

fn full_registry() -> AgentRegistryBuilder {
    AgentRegistryBuilder::new()
        .register(Arc::new(PolicyAgent::new()))
        .register(Arc::new(SecurityAgent::new()))
        .register(Arc::new(ComplianceAgent::new()))
        .register(Arc::new(ImpactAgent::new()))
        .register(Arc::new(CostAgent::new(false, Arc::new(SyntheticPriceLookup), None)))
        .register(Arc::new(DriftAgent::new(Arc::new(SyntheticResourceGraph))))
        .register(Arc::new(DeployAgent::new(Utc::now())))
}

fn request(message: &str) -> AgentRequest {
    AgentRequest {
        messages: vec![ChatMessage {
            role: ChatRole::User,
            content: message.to_string(),
        }],
        references: vec![],
        iac: None,
        token: None,
    }
}

#[tokio::test]
async fn storage_with_disabled_https_reports_pol_001_and_pol_003() {
    let registry = full_registry().build();
    let orchestrator = Orchestrator::new(registry, None, false);
    let emitter = CapturingEmitter::new();
    let ctx = RequestContext::new("scenario-1");

    let message = "analyze\n```hcl\nresource \"azurerm_storage_account\" \"s\" { enable_https_traffic_only = false  min_tls_version = \"TLS1_0\" }\n```";
    orchestrator.handle(&ctx, &request(message), &emitter).await.unwrap();

    let output = emitter.output();
    assert!(output.contains("POL-001"));
    assert!(output.contains("POL-003"));
    assert!(output.contains("high"));
}

#[tokio::test]
async fn cost_intent_runs_only_the_cost_agent() {
    let registry = full_registry().build();
    let orchestrator = Orchestrator::new(registry, None, false);
    let emitter = CapturingEmitter::new();
    let ctx = RequestContext::new("scenario-3");

    orchestrator
        .handle(&ctx, &request("estimate cost for 3x Standard_D2s_v3 VMs in eastus"), &emitter)
        .await
        .unwrap();

    let output = emitter.output();
    assert!(output.contains("## Cost"));
    assert!(output.contains("210.24"));
    assert!(!output.contains("## Policy"));
}

#[tokio::test]
async fn orchestrator_with_missing_agents_reports_each_and_still_runs_policy() {
    let registry = AgentRegistryBuilder::new().register(Arc::new(PolicyAgent::new())).build();
    let orchestrator = Orchestrator::new(registry, None, false);
    let emitter = CapturingEmitter::new();
    let ctx = RequestContext::new("scenario-6");

    let message = "analyze\n```hcl\nresource \"azurerm_storage_account\" \"s\" { enable_https_traffic_only = false }\n```";
    orchestrator.handle(&ctx, &request(message), &emitter).await.unwrap();

    let output = emitter.output();
    assert!(output.contains("## Policy"));
    assert!(output.contains("Agent 'security' is not registered."));
    assert!(output.contains("Agent 'compliance' is not registered."));
    assert!(output.contains("Agent 'impact' is not registered."));
}

#[tokio::test]
async fn analyze_agents_run_in_policy_security_compliance_impact_order() {
    let registry = full_registry().build();
    let orchestrator = Orchestrator::new(registry, None, false);
    let emitter = CapturingEmitter::new();
    let ctx = RequestContext::new("scenario-order");

    let message = "please analyze\n```hcl\nresource \"azurerm_storage_account\" \"s\" { enable_https_traffic_only = false }\n```";
    orchestrator.handle(&ctx, &request(message), &emitter).await.unwrap();

    let output = emitter.output();
    let policy = output.find("## Policy").unwrap();
    let security = output.find("## Security").unwrap();
    let compliance = output.find("## Compliance").unwrap();
    let impact = output.find("## Impact").unwrap();
    assert!(policy < security && security < compliance && compliance < impact);
}

#[tokio::test]
async fn cancelling_before_dispatch_halts_without_running_any_agent() {
    let registry = full_registry().build();
    let orchestrator = Orchestrator::new(registry, None, false);
    let emitter = CapturingEmitter::new();
    let ctx = RequestContext::new("scenario-cancel");
    ctx.cancellation.cancel();

    let message = "analyze\n```hcl\nresource \"azurerm_storage_account\" \"s\" { enable_https_traffic_only = false }\n```";
    orchestrator.handle(&ctx, &request(message), &emitter).await.unwrap();

    let output = emitter.output();
    assert!(output.contains("cancelled"));
    assert!(!output.contains("## Policy"));
}

#[tokio::test]
async fn deploy_promotion_sequence_matches_the_state_machine_rules() {
    let registry = full_registry().build();
    let orchestrator = Orchestrator::new(registry, None, false);
    let ctx = RequestContext::new("scenario-deploy");

    let e1 = CapturingEmitter::new();
    orchestrator.handle(&ctx, &request("promote dev to staging"), &e1).await.unwrap();
    assert!(e1.output().contains("Promoted"));

    let e2 = CapturingEmitter::new();
    orchestrator.handle(&ctx, &request("promote staging to prod"), &e2).await.unwrap();
    assert!(e2.output().contains("requires manual approval"));

    let e3 = CapturingEmitter::new();
    orchestrator.handle(&ctx, &request("promote dev to prod"), &e3).await.unwrap();
    assert!(e3.output().contains("rejected"));
}

/// A panicking stub agent to confirm the orchestrator's per-agent error
/// handling surfaces a message rather than losing the whole response.
struct FailingAgent(Capabilities);

#[async_trait]
impl Agent for FailingAgent {
    fn capabilities(&self) -> &Capabilities {
        &self.0
    }

    async fn handle(
        &self,
        _ctx: &RequestContext,
        _request: &AgentRequest,
        _emitter: &(dyn Emitter + Sync),
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err("synthetic failure".into())
    }
}

#[tokio::test]
async fn an_agent_error_is_surfaced_inline_and_does_not_abort_the_stream() {
    use iacgate::gateway::parser::IacFormat;

    let registry = AgentRegistryBuilder::new()
        .register(Arc::new(FailingAgent(Capabilities {
            id: "policy",
            name: "policy",
            description: "stub",
            version: "0.1.0",
            supported_formats: &[IacFormat::Terraform],
            needs_iac_input: false,
        })))
        .register(Arc::new(SecurityAgent::new()))
        .build();
    let orchestrator = Orchestrator::new(registry, None, false);
    let emitter = CapturingEmitter::new();
    let ctx = RequestContext::new("scenario-panic");

    let message = "analyze\n```hcl\nresource \"azurerm_storage_account\" \"s\" { enable_https_traffic_only = false }\n```";
    orchestrator.handle(&ctx, &request(message), &emitter).await.unwrap();

    let output = emitter.output();
    assert!(output.contains("synthetic failure"));
}
