//! `cost` agent (§4.3).

use crate::gateway::agent::{header, Agent, Capabilities};
use crate::gateway::cancellation::RequestContext;
use crate::gateway::clients::llm_client::{ChatTurn, LlmClient, Role};
use crate::gateway::cost::{estimate_direct, estimate_report, CostLine, PriceLookup};
use crate::gateway::emitter::Emitter;
use crate::gateway::parser::IacFormat;
use crate::gateway::request::AgentRequest;
use async_trait::async_trait;
use regex::Regex;
use std::error::Error;
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::OnceLock;

const OPTIMIZATION_PROMPT: &str = "Given this cost breakdown, suggest Reserved Instance, Spot, or right-sizing opportunities in two or three short bullet points.";

fn direct_query_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\d+)\s*[x×]\s*([A-Za-z0-9_]+)").unwrap())
}

pub struct CostAgent {
    capabilities: Capabilities,
    enable_cost_api: bool,
    retail: Arc<dyn PriceLookup>,
    llm: Option<Arc<dyn LlmClient>>,
}

impl CostAgent {
    pub fn new(enable_cost_api: bool, retail: Arc<dyn PriceLookup>, llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self {
            capabilities: Capabilities {
                id: "cost",
                name: "Cost",
                description: "Estimates monthly USD cost for declared or queried resources.",
                version: "1.0.0",
                supported_formats: &[IacFormat::Terraform, IacFormat::Bicep],
                needs_iac_input: false,
            },
            enable_cost_api,
            retail,
            llm,
        }
    }
}

fn render_breakdown(lines: &[CostLine]) -> String {
    let mut out = String::from("| Resource | Qty | Unit Price (USD/hr or USD/GB) | Monthly (USD) |\n");
    out.push_str("|---|---|---|---|\n");
    let mut total = 0.0;
    for line in lines {
        let _ = writeln!(
            out,
            "| {} ({}) | {} | {:.4} | {:.2} |",
            line.resource_name, line.resource_type, line.quantity, line.unit_price, line.monthly
        );
        total += line.monthly;
    }
    let _ = writeln!(out, "\n**Total: ${:.2}/month**\n", total);
    out
}

#[async_trait]
impl Agent for CostAgent {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn handle(
        &self,
        _ctx: &RequestContext,
        request: &AgentRequest,
        emitter: &(dyn Emitter + Sync),
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        emitter.message(&header("Cost")).await;

        let enriched = request.clone().with_parsed_iac();
        let lines: Vec<CostLine> = if let Some(iac) = &enriched.iac {
            if !iac.resources.is_empty() {
                estimate_report(&iac.resources, self.enable_cost_api, self.retail.as_ref())
                    .await
                    .lines
            } else {
                Vec::new()
            }
        } else {
            Vec::new()
        };

        let lines = if lines.is_empty() {
            match request
                .last_user_message()
                .and_then(|m| direct_query_pattern().captures(m))
            {
                Some(caps) => {
                    let quantity: u32 = caps[1].parse().unwrap_or(1);
                    let sku = caps[2].to_string();
                    vec![estimate_direct(&sku, quantity, self.enable_cost_api, self.retail.as_ref()).await]
                }
                None => Vec::new(),
            }
        } else {
            lines
        };

        if lines.is_empty() {
            emitter
                .message("Could not identify any resources or a quantity/SKU pair to estimate.\n")
                .await;
            return Ok(());
        }

        let breakdown = render_breakdown(&lines);
        emitter.message(&breakdown).await;

        if let (Some(llm), Some(token)) = (&self.llm, &request.token) {
            let turns = [
                ChatTurn {
                    role: Role::System,
                    content: OPTIMIZATION_PROMPT.to_string(),
                },
                ChatTurn {
                    role: Role::User,
                    content: breakdown,
                },
            ];
            match llm.send_message(&turns, token).await {
                Ok(summary) => {
                    emitter.message("\n### Optimization suggestions\n\n").await;
                    emitter.message(&summary).await;
                }
                Err(_) => {
                    emitter
                        .message("\n_Optimization summary unavailable: service unavailable, continuing with cached data._\n")
                        .await;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::cost::SyntheticPriceLookup;
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
    async fn estimates_a_direct_quantity_and_sku_query() {
        let agent = CostAgent::new(false, Arc::new(SyntheticPriceLookup), None);
        let request = AgentRequest {
            messages: vec![ChatMessage {
                role: ChatRole::User,
                content: "estimate cost for 3x Standard_D2s_v3 VMs in eastus".to_string(),
            }],
            references: vec![],
            iac: None,
            token: None,
        };

        let emitter = CapturingEmitter(Mutex::new(String::new()));
        let ctx = RequestContext::new("r1");
        agent.handle(&ctx, &request, &emitter).await.unwrap();

        let output = emitter.0.lock().unwrap().clone();
        assert!(output.contains("210.24"));
    }
}
