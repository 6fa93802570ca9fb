//! The specialized agents (§4.3).

pub mod compliance_agent;
pub mod cost_agent;
pub mod deploy_agent;
pub mod drift_agent;
pub mod impact_agent;
pub mod module_agent;
pub mod notification_agent;
pub mod orchestrator;
pub mod policy_agent;
pub mod security_agent;

use crate::gateway::rules::Finding;

/// Render a severity-sorted findings table, shared by the policy, security,
/// and compliance agents (§4.3: "emit a severity-sorted table plus
/// remediation guidance").
pub fn render_findings_table(findings: &[Finding]) -> String {
    if findings.is_empty() {
        return "No findings.\n".to_string();
    }

    let mut out = String::from("| Rule | Severity | Resource | Message | Remediation |\n");
    out.push_str("|---|---|---|---|---|\n");
    for f in findings {
        out.push_str(&format!(
            "| {} | {} | {} ({}) | {} | {} |\n",
            f.rule_id,
            f.severity.as_str(),
            f.resource_name,
            f.resource_type,
            f.message,
            f.remediation.unwrap_or("-"),
        ));
    }
    out
}

/// Require an `AgentRequest` to already carry parsed IaC, the common
/// precondition for `needs_iac_input` agents.
pub fn require_iac(
    request: &crate::gateway::request::AgentRequest,
) -> Result<&crate::gateway::request::IacContext, Box<dyn std::error::Error + Send + Sync>> {
    request
        .iac
        .as_ref()
        .filter(|iac| !iac.resources.is_empty())
        .ok_or_else(|| Box::new(crate::gateway::errors::AgentError::MissingIacInput) as Box<dyn std::error::Error + Send + Sync>)
}
