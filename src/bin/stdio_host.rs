// src/bin/stdio_host.rs

use chrono::Utc;
use iacgate::gateway::agents::compliance_agent::ComplianceAgent;
use iacgate::gateway::agents::cost_agent::CostAgent;
use iacgate::gateway::agents::deploy_agent::DeployAgent;
use iacgate::gateway::agents::drift_agent::DriftAgent;
use iacgate::gateway::agents::impact_agent::ImpactAgent;
use iacgate::gateway::agents::module_agent::ModuleAgent;
use iacgate::gateway::agents::notification_agent::NotificationAgent;
use iacgate::gateway::agents::orchestrator::Orchestrator;
use iacgate::gateway::agents::policy_agent::PolicyAgent;
use iacgate::gateway::agents::security_agent::SecurityAgent;
use iacgate::gateway::clients::azure_inference::AzureInferenceClient;
use iacgate::gateway::clients::llm_client::LlmClient;
use iacgate::gateway::config::EnvironmentConfig;
use iacgate::gateway::cost::{PriceLookup, RetailPriceClient, SyntheticPriceLookup};
use iacgate::gateway::drift::{ResourceGraphLookup, SyntheticResourceGraph};
use iacgate::gateway::registry::AgentRegistryBuilder;
use iacgate::transport::stdio::StdioHost;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    let config = EnvironmentConfig::from_env()?;
    log::info!("starting iacgate stdio host in {} mode", config.environment.as_str());

    let llm: Option<Arc<dyn LlmClient>> = if config.enable_llm {
        Some(Arc::new(AzureInferenceClient::new(
            config.model_endpoint.clone(),
            config.model_name.clone(),
        )))
    } else {
        None
    };

    let retail: Arc<dyn PriceLookup> = if config.enable_cost_api {
        Arc::new(RetailPriceClient::new())
    } else {
        Arc::new(SyntheticPriceLookup)
    };

    let graph: Arc<dyn ResourceGraphLookup> = Arc::new(SyntheticResourceGraph);

    let registry = AgentRegistryBuilder::new()
        .register(Arc::new(PolicyAgent::new()))
        .register(Arc::new(SecurityAgent::new()))
        .register(Arc::new(ComplianceAgent::new()))
        .register(Arc::new(ImpactAgent::new()))
        .register(Arc::new(CostAgent::new(config.enable_cost_api, retail, llm.clone())))
        .register(Arc::new(DriftAgent::new(graph)))
        .register(Arc::new(DeployAgent::new(Utc::now())))
        .register(Arc::new(NotificationAgent::new(
            config.enable_notifications,
            config.teams_webhook_url.clone(),
            config.slack_webhook_url.clone(),
        )))
        .register(Arc::new(ModuleAgent::new()))
        .build();

    let registry = Arc::new(registry);
    let orchestrator = Arc::new(Orchestrator::new((*registry).clone(), llm, config.enable_llm));

    StdioHost::new(registry, orchestrator).run().await;
    Ok(())
}
