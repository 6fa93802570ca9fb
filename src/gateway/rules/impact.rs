//! Blast-radius scoring (§4.2 "Impact").

use crate::gateway::parser::Resource;
use serde::{Deserialize, Serialize};

/// Fixed per-type weight table. Checked by prefix/suffix heuristics so the
/// Bicep-mapped `azurerm_*` type names all resolve the same as their
/// Terraform originals.
fn weight_for(resource_type: &str) -> i32 {
    match resource_type {
        "azurerm_kubernetes_cluster" => 8,
        "azurerm_mssql_server" => 7,
        "azurerm_cosmosdb_account" => 7,
        "azurerm_key_vault" => 6,
        "azurerm_mssql_database" => 6,
        "azurerm_virtual_machine" | "azurerm_redis_cache" => 5,
        "azurerm_storage_account" | "azurerm_container_registry" | "azurerm_network_security_group" => 4,
        "azurerm_virtual_network" | "azurerm_app_service" | "azurerm_service_plan" => 3,
        t if t.contains("subnet") => 2,
        _ => 2,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ImpactLevel {
    fn from_score(score: i32) -> Self {
        match score {
            s if s <= 5 => ImpactLevel::Low,
            s if s <= 10 => ImpactLevel::Medium,
            s if s <= 20 => ImpactLevel::High,
            _ => ImpactLevel::Critical,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRisk {
    pub resource_type: String,
    pub resource_name: String,
    pub weight: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlastRadius {
    pub total: i32,
    pub level: ImpactLevel,
    pub per_resource: Vec<ResourceRisk>,
}

/// Score a declared resource set (§4.2 "sum across declared resources").
pub fn score(resources: &[Resource]) -> BlastRadius {
    let per_resource: Vec<ResourceRisk> = resources
        .iter()
        .map(|r| ResourceRisk {
            resource_type: r.resource_type.clone(),
            resource_name: r.name.clone(),
            weight: weight_for(&r.resource_type),
        })
        .collect();

    let total: i32 = per_resource.iter().map(|r| r.weight).sum();
    BlastRadius {
        total,
        level: ImpactLevel::from_score(total),
        per_resource,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(t: &str) -> Resource {
        Resource {
            resource_type: t.to_string(),
            name: "r".to_string(),
            properties: Default::default(),
            line: 1,
            raw_block: String::new(),
        }
    }

    #[test]
    fn single_aks_cluster_scores_high() {
        let radius = score(&[resource("azurerm_kubernetes_cluster")]);
        assert_eq!(radius.total, 8);
        assert_eq!(radius.level, ImpactLevel::Medium);
    }

    #[test]
    fn thresholds_match_spec_bands() {
        assert_eq!(ImpactLevel::from_score(5), ImpactLevel::Low);
        assert_eq!(ImpactLevel::from_score(10), ImpactLevel::Medium);
        assert_eq!(ImpactLevel::from_score(20), ImpactLevel::High);
        assert_eq!(ImpactLevel::from_score(21), ImpactLevel::Critical);
    }

    #[test]
    fn multiple_resources_sum_weights() {
        let radius = score(&[
            resource("azurerm_kubernetes_cluster"),
            resource("azurerm_mssql_server"),
            resource("azurerm_storage_account"),
        ]);
        assert_eq!(radius.total, 8 + 7 + 4);
    }
}
