//! Policy rules POL-001..006 (§4.2 "Policy (6)").

use super::catalog::{Category, Rule, Severity};
use crate::gateway::parser::Resource;

const STORAGE: &[&str] = &["azurerm_storage_account"];
const AKS: &[&str] = &["azurerm_kubernetes_cluster"];
const STORAGE_AND_APP: &[&str] = &["azurerm_storage_account", "azurerm_app_service"];
const KEY_VAULT: &[&str] = &["azurerm_key_vault"];

pub fn rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "POL-001",
            category: Category::Policy,
            severity: Severity::High,
            applies_to: STORAGE,
            remediation: "Set enable_https_traffic_only = true.",
            eval: |r: &Resource| -> Vec<String> {
                match r.get_bool("enable_https_traffic_only") {
                    Some(true) => vec![],
                    _ => vec![format!(
                        "{} does not enforce HTTPS-only traffic",
                        r.name
                    )],
                }
            },
        },
        Rule {
            id: "POL-002",
            category: Category::Policy,
            severity: Severity::High,
            applies_to: AKS,
            remediation: "Enable Azure RBAC for the cluster (role_based_access_control_enabled = true).",
            eval: |r: &Resource| -> Vec<String> {
                match r.get_bool("role_based_access_control_enabled") {
                    Some(true) => vec![],
                    _ => vec![format!("{} does not have RBAC enabled", r.name)],
                }
            },
        },
        Rule {
            id: "POL-003",
            category: Category::Policy,
            severity: Severity::High,
            applies_to: STORAGE_AND_APP,
            remediation: "Set min_tls_version = \"TLS1_2\".",
            eval: |r: &Resource| -> Vec<String> {
                match r.get_str("min_tls_version") {
                    Some("TLS1_2") => vec![],
                    Some(other) => vec![format!(
                        "{} allows TLS below 1.2 (min_tls_version = {})",
                        r.name, other
                    )],
                    None => vec![format!("{} does not set a minimum TLS version", r.name)],
                }
            },
        },
        Rule {
            id: "POL-004",
            category: Category::Policy,
            severity: Severity::Critical,
            applies_to: STORAGE,
            remediation: "Set allow_blob_public_access = false.",
            eval: |r: &Resource| -> Vec<String> {
                match r.get_bool("allow_blob_public_access") {
                    Some(false) | None => vec![],
                    Some(true) => vec![format!("{} allows public blob access", r.name)],
                }
            },
        },
        Rule {
            id: "POL-005",
            category: Category::Policy,
            severity: Severity::High,
            applies_to: KEY_VAULT,
            remediation: "Set soft_delete_retention_days >= 7 (soft_delete_enabled = true).",
            eval: |r: &Resource| -> Vec<String> {
                match r.get_bool("soft_delete_enabled") {
                    Some(true) => vec![],
                    _ => vec![format!(
                        "{} does not have soft delete enabled for at least 7 days",
                        r.name
                    )],
                }
            },
        },
        Rule {
            id: "POL-006",
            category: Category::Policy,
            severity: Severity::High,
            applies_to: KEY_VAULT,
            remediation: "Set purge_protection_enabled = true.",
            eval: |r: &Resource| -> Vec<String> {
                match r.get_bool("purge_protection_enabled") {
                    Some(true) => vec![],
                    _ => vec![format!("{} does not have purge protection enabled", r.name)],
                }
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::parser;

    #[test]
    fn pol_001_and_pol_003_fire_on_insecure_storage() {
        let src = r#"resource "azurerm_storage_account" "s" { enable_https_traffic_only = false min_tls_version = "TLS1_0" }"#;
        let (_, resources) = parser::parse(src);
        let catalog = super::super::catalog::RuleCatalog::standard();
        let findings = catalog.evaluate(&resources);
        let ids: Vec<&str> = findings.iter().map(|f| f.rule_id).collect();
        assert!(ids.contains(&"POL-001"));
        assert!(ids.contains(&"POL-003"));
    }

    #[test]
    fn pol_004_does_not_fire_when_public_access_already_disabled() {
        let r = {
            let mut r = Resource::new("azurerm_storage_account", "s", 1);
            r.properties.insert(
                "allow_blob_public_access".into(),
                crate::gateway::parser::PropertyValue::Bool(false),
            );
            r
        };
        let hits = (rules().into_iter().find(|r| r.id == "POL-004").unwrap().eval)(&r);
        assert!(hits.is_empty());
    }
}
