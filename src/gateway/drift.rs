//! Live-state comparison for the `drift` agent (§4.3 "drift").

use crate::gateway::parser::{PropertyValue, Resource};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatus {
    InSync,
    Drifted,
    MissingInAzure,
    MissingInIac,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriftFinding {
    pub resource_type: String,
    pub resource_name: String,
    pub status: DriftStatus,
    pub detail: Option<String>,
}

/// The live state of one resource, as observed by a
/// [`ResourceGraphLookup`]. Only the properties relevant to drift
/// comparison need to be populated.
#[derive(Debug, Clone)]
pub struct LiveResourceState {
    pub resource_type: String,
    pub name: String,
    pub properties: BTreeMap<String, PropertyValue>,
}

/// Pluggable resource-graph query, with a production implementation behind
/// a real Azure Resource Graph client and a synthetic one for tests and
/// offline operation (§9 "Pluggable I/O").
#[async_trait]
pub trait ResourceGraphLookup: Send + Sync {
    async fn live_state(&self) -> Result<Vec<LiveResourceState>, Box<dyn Error + Send + Sync>>;
}

/// Built-in snapshot covering the drift cases this gateway needs to exercise: a
/// storage account that regressed to `enable_https_traffic_only=false,
/// min_tls_version=TLS1_0`, and an AKS cluster still at `1.27.0`.
pub struct SyntheticResourceGraph;

#[async_trait]
impl ResourceGraphLookup for SyntheticResourceGraph {
    async fn live_state(&self) -> Result<Vec<LiveResourceState>, Box<dyn Error + Send + Sync>> {
        let mut storage_props = BTreeMap::new();
        storage_props.insert("enable_https_traffic_only".to_string(), PropertyValue::Bool(false));
        storage_props.insert("min_tls_version".to_string(), PropertyValue::String("TLS1_0".to_string()));

        let mut aks_props = BTreeMap::new();
        aks_props.insert("kubernetes_version".to_string(), PropertyValue::String("1.27.0".to_string()));

        Ok(vec![
            LiveResourceState {
                resource_type: "azurerm_storage_account".to_string(),
                name: "s".to_string(),
                properties: storage_props,
            },
            LiveResourceState {
                resource_type: "azurerm_kubernetes_cluster".to_string(),
                name: "aks".to_string(),
                properties: aks_props,
            },
        ])
    }
}

/// Compare declared resources against observed live state.
pub fn compare(declared: &[Resource], live: &[LiveResourceState]) -> Vec<DriftFinding> {
    let mut findings = Vec::new();

    for resource in declared {
        match live
            .iter()
            .find(|l| l.resource_type == resource.resource_type && l.name == resource.name)
        {
            None => findings.push(DriftFinding {
                resource_type: resource.resource_type.clone(),
                resource_name: resource.name.clone(),
                status: DriftStatus::MissingInAzure,
                detail: None,
            }),
            Some(live_resource) => {
                let mismatches = diff_properties(&resource.properties, &live_resource.properties);
                if mismatches.is_empty() {
                    findings.push(DriftFinding {
                        resource_type: resource.resource_type.clone(),
                        resource_name: resource.name.clone(),
                        status: DriftStatus::InSync,
                        detail: None,
                    });
                } else {
                    findings.push(DriftFinding {
                        resource_type: resource.resource_type.clone(),
                        resource_name: resource.name.clone(),
                        status: DriftStatus::Drifted,
                        detail: Some(mismatches.join("; ")),
                    });
                }
            }
        }
    }

    for live_resource in live {
        let still_declared = declared
            .iter()
            .any(|r| r.resource_type == live_resource.resource_type && r.name == live_resource.name);
        if !still_declared {
            findings.push(DriftFinding {
                resource_type: live_resource.resource_type.clone(),
                resource_name: live_resource.name.clone(),
                status: DriftStatus::MissingInIac,
                detail: None,
            });
        }
    }

    findings
}

fn diff_properties(
    declared: &BTreeMap<String, PropertyValue>,
    live: &BTreeMap<String, PropertyValue>,
) -> Vec<String> {
    let mut mismatches = Vec::new();
    for (key, declared_value) in declared {
        if let Some(live_value) = live.get(key) {
            if live_value != declared_value {
                mismatches.push(format!(
                    "{}: declared={:?} live={:?}",
                    key, declared_value, live_value
                ));
            }
        }
    }
    mismatches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn detects_the_built_in_storage_drift_case() {
        let mut declared = Resource::new("azurerm_storage_account", "s", 1);
        declared.properties.insert(
            "enable_https_traffic_only".into(),
            PropertyValue::Bool(true),
        );

        let live = SyntheticResourceGraph.live_state().await.unwrap();
        let findings = compare(&[declared], &live);
        let storage_finding = findings.iter().find(|f| f.resource_name == "s").unwrap();
        assert_eq!(storage_finding.status, DriftStatus::Drifted);
    }

    #[test]
    fn resource_absent_from_live_state_is_missing_in_azure() {
        let declared = Resource::new("azurerm_key_vault", "kv", 1);
        let findings = compare(&[declared], &[]);
        assert_eq!(findings[0].status, DriftStatus::MissingInAzure);
    }

    #[test]
    fn live_resource_absent_from_declared_set_is_missing_in_iac() {
        let live = vec![LiveResourceState {
            resource_type: "azurerm_storage_account".to_string(),
            name: "orphan".to_string(),
            properties: BTreeMap::new(),
        }];
        let findings = compare(&[], &live);
        assert_eq!(findings[0].status, DriftStatus::MissingInIac);
    }
}
