//! Compliance controls, expressed purely as references into the policy and
//! security rule set (§4.2 "Compliance (2-6)"). No independent scanning
//! logic lives here — a control fires exactly when one of its referenced
//! rules already fired.

use super::catalog::ComplianceControl;

pub fn controls() -> Vec<ComplianceControl> {
    vec![
        ComplianceControl {
            id: "NIST-SC7",
            title: "Boundary Protection",
            references: &["SEC-002", "SEC-005", "POL-004"],
        },
        ComplianceControl {
            id: "NIST-SC28",
            title: "Protection of Information at Rest",
            references: &["POL-001", "POL-003", "SEC-004"],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::parser;
    use crate::gateway::rules::catalog::RuleCatalog;

    #[test]
    fn nist_sc28_projects_from_storage_policy_violations() {
        let src = r#"resource "azurerm_storage_account" "s" { enable_https_traffic_only = false min_tls_version = "TLS1_0" }"#;
        let (_, resources) = parser::parse(src);
        let catalog = RuleCatalog::standard();
        let findings = catalog.evaluate(&resources);
        let compliance = catalog.evaluate_compliance(&findings);
        assert!(compliance.iter().any(|f| f.rule_id == "NIST-SC28"));
        assert!(controls().iter().any(|c| c.id == "NIST-SC28"));
    }
}
