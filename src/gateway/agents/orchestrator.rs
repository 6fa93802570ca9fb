//! The orchestrator (§4.4): intent classification plus composed streaming
//! across the agents that intent selects. Not registered in the
//! [`AgentRegistry`] itself — the transport layer owns one directly, since
//! it alone needs the caller's raw emitter to wrap in a tee.

use crate::gateway::agent::Agent;
use crate::gateway::cancellation::RequestContext;
use crate::gateway::clients::llm_client::{ChatTurn, LlmClient, Role};
use crate::gateway::emitter::{Emitter, TeeEmitter};
use crate::gateway::intent::{classify_keywords, classify_llm, Intent};
use crate::gateway::registry::AgentRegistry;
use crate::gateway::request::AgentRequest;
use std::error::Error;
use std::sync::Arc;

const HELP_TEXT: &str = "## Help\n\n\
I can analyze Terraform/Bicep for policy, security, compliance, and blast-radius issues; \
estimate monthly cost; check deployment drift; manage promotions across dev/staging/prod; \
route notifications; and validate module sources.\n\n\
Try: \"scan this terraform for issues\", \"estimate cost for 3x Standard_D2s_v3\", or \"deploy to staging\".\n";

const EXECUTIVE_SUMMARY_PROMPT: &str = "Summarize the findings below for a platform engineer in three to five bullet points, highlighting the most severe issues first. Do not repeat the raw tables verbatim.";

pub struct Orchestrator {
    registry: AgentRegistry,
    llm: Option<Arc<dyn LlmClient>>,
    enable_llm: bool,
}

impl Orchestrator {
    pub fn new(registry: AgentRegistry, llm: Option<Arc<dyn LlmClient>>, enable_llm: bool) -> Self {
        Self { registry, llm, enable_llm }
    }

    async fn classify(&self, request: &AgentRequest) -> Intent {
        let message = request.last_user_message().unwrap_or("");

        if self.enable_llm {
            if let (Some(llm), Some(token)) = (&self.llm, &request.token) {
                if let Ok(intent) = classify_llm(llm.as_ref(), message, token).await {
                    return intent;
                }
            }
        }

        classify_keywords(message)
    }

    /// Run the full request: classify intent, dispatch sequentially to the
    /// selected agents through a tee emitter, then (for `analyze`, when an
    /// LLM and token are available) stream an executive summary.
    pub async fn handle(
        &self,
        ctx: &RequestContext,
        request: &AgentRequest,
        emitter: &(dyn Emitter + Sync),
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        let intent = self.classify(request).await;

        if intent == Intent::Help {
            emitter.message(HELP_TEXT).await;
            emitter.done().await;
            return Ok(());
        }

        let tee = TeeEmitter::new(emitter);

        for agent_id in intent.agent_ids() {
            if ctx.is_cancelled() {
                tee.message(&format!("\n_Request cancelled before running `{}`._\n", agent_id))
                    .await;
                break;
            }

            match self.registry.get(agent_id) {
                None => {
                    tee.message(&format!("Agent '{}' is not registered.\n", agent_id)).await;
                }
                Some(agent) => {
                    let request = Self::prepare_request(agent.as_ref(), request);
                    if let Err(e) = agent.handle(ctx, &request, &tee).await {
                        tee.message(&format!("\n_Agent `{}` failed: {}_\n", agent_id, e)).await;
                    }
                }
            }
        }

        if intent == Intent::Analyze && self.enable_llm {
            if let (Some(llm), Some(token)) = (&self.llm, &request.token) {
                let transcript = tee.transcript(4000).await;
                let turns = [
                    ChatTurn {
                        role: Role::System,
                        content: EXECUTIVE_SUMMARY_PROMPT.to_string(),
                    },
                    ChatTurn {
                        role: Role::User,
                        content: transcript,
                    },
                ];
                if let Ok(summary) = llm.send_message(&turns, token).await {
                    tee.message("\n## Executive Summary\n\n").await;
                    tee.message(&summary).await;
                }
            }
        }

        tee.done().await;
        Ok(())
    }

    /// Agents that declare `needs_iac_input` get IaC lazily parsed onto
    /// their own copy of the request; others get the request untouched.
    fn prepare_request(agent: &dyn Agent, request: &AgentRequest) -> AgentRequest {
        if agent.capabilities().needs_iac_input {
            request.clone().with_parsed_iac()
        } else {
            request.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::agent::{header, Capabilities};
    use crate::gateway::emitter::ReferenceLink;
    use crate::gateway::parser::IacFormat;
    use crate::gateway::registry::AgentRegistryBuilder;
    use crate::gateway::request::{ChatMessage, ChatRole};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoAgent(Capabilities);

    #[async_trait]
    impl Agent for EchoAgent {
        fn capabilities(&self) -> &Capabilities {
            &self.0
        }

        async fn handle(
            &self,
            _ctx: &RequestContext,
            _request: &AgentRequest,
            emitter: &(dyn Emitter + Sync),
        ) -> Result<(), Box<dyn Error + Send + Sync>> {
            emitter.message(&header(self.0.name)).await;
            Ok(())
        }
    }

    fn echo(id: &'static str) -> Arc<dyn Agent> {
        Arc::new(EchoAgent(Capabilities {
            id,
            name: id,
            description: "echo",
            version: "0.1.0",
            supported_formats: &[IacFormat::Terraform],
            needs_iac_input: false,
        }))
    }

    struct CapturingEmitter(Mutex<String>);

    #[async_trait]
    impl Emitter for CapturingEmitter {
        async fn message(&self, chunk: &str) {
            self.0.lock().unwrap().push_str(chunk);
        }
        async fn references(&self, _refs: Vec<ReferenceLink>) {}
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
    async fn dispatches_analyze_agents_in_declared_order() {
        let registry = AgentRegistryBuilder::new()
            .register(echo("policy"))
            .register(echo("security"))
            .register(echo("compliance"))
            .register(echo("impact"))
            .build();
        let orchestrator = Orchestrator::new(registry, None, false);
        let emitter = CapturingEmitter(Mutex::new(String::new()));
        let ctx = RequestContext::new("r1");

        orchestrator
            .handle(&ctx, &request("please scan this terraform"), &emitter)
            .await
            .unwrap();

        let output = emitter.0.lock().unwrap().clone();
        let policy_pos = output.find("## policy").unwrap();
        let security_pos = output.find("## security").unwrap();
        let compliance_pos = output.find("## compliance").unwrap();
        let impact_pos = output.find("## impact").unwrap();
        assert!(policy_pos < security_pos);
        assert!(security_pos < compliance_pos);
        assert!(compliance_pos < impact_pos);
    }

    #[tokio::test]
    async fn missing_agent_reports_and_continues() {
        let registry = AgentRegistryBuilder::new().register(echo("policy")).build();
        let orchestrator = Orchestrator::new(registry, None, false);
        let emitter = CapturingEmitter(Mutex::new(String::new()));
        let ctx = RequestContext::new("r1");

        orchestrator
            .handle(&ctx, &request("scan this terraform"), &emitter)
            .await
            .unwrap();

        let output = emitter.0.lock().unwrap().clone();
        assert!(output.contains("Agent 'security' is not registered."));
        assert!(output.contains("## policy"));
    }

    #[tokio::test]
    async fn help_intent_dispatches_no_agents() {
        let registry = AgentRegistryBuilder::new().register(echo("policy")).build();
        let orchestrator = Orchestrator::new(registry, None, false);
        let emitter = CapturingEmitter(Mutex::new(String::new()));
        let ctx = RequestContext::new("r1");

        orchestrator.handle(&ctx, &request("help me"), &emitter).await.unwrap();

        let output = emitter.0.lock().unwrap().clone();
        assert!(output.contains("## Help"));
        assert!(!output.contains("## policy"));
    }

    #[tokio::test]
    async fn cancellation_aborts_remaining_dispatch() {
        let registry = AgentRegistryBuilder::new()
            .register(echo("policy"))
            .register(echo("security"))
            .build();
        let orchestrator = Orchestrator::new(registry, None, false);
        let emitter = CapturingEmitter(Mutex::new(String::new()));
        let ctx = RequestContext::new("r1");
        ctx.cancellation.cancel();

        orchestrator
            .handle(&ctx, &request("scan this terraform for policy and security issues"), &emitter)
            .await
            .unwrap();

        let output = emitter.0.lock().unwrap().clone();
        assert!(output.contains("cancelled"));
        assert!(!output.contains("## policy"));
    }
}
