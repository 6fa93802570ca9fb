//! Cost estimation: three-tier price lookup plus the resource-specific
//! formulas in §4.3 ("cost").

use crate::gateway::clients::http_pool::{client_for, ClientKind};
use crate::gateway::parser::Resource;
use async_trait::async_trait;
use serde::Serialize;
use std::error::Error;

const HOURS_PER_MONTH: f64 = 730.0;
const AKS_LOAD_BALANCER_MONTHLY: f64 = 18.25;
const DEFAULT_STORAGE_GB: f64 = 100.0;
const DEFAULT_VM_HOURLY: f64 = 0.10;

/// Tier 1: an in-memory SKU → hourly USD table, the fast path that needs no
/// network access.
const VM_HOURLY_USD: &[(&str, f64)] = &[
    ("Standard_B2s", 0.0416),
    ("Standard_D2s_v3", 0.096),
    ("Standard_D4s_v3", 0.192),
    ("Standard_E2s_v3", 0.126),
];

const STORAGE_GB_MONTHLY_USD: f64 = 0.0208;

/// Tier 2: a pluggable price source, implemented against the Azure Retail
/// Prices endpoint in production and a synthetic table in tests (§9
/// "Pluggable I/O").
#[async_trait]
pub trait PriceLookup: Send + Sync {
    async fn hourly_price(&self, sku: &str) -> Result<Option<f64>, Box<dyn Error + Send + Sync>>;
}

/// Production implementation: a filtered call to the public Azure Retail
/// Prices API.
pub struct RetailPriceClient {
    base_url: String,
}

impl RetailPriceClient {
    pub fn new() -> Self {
        Self {
            base_url: "https://prices.azure.com/api/retail/prices".to_string(),
        }
    }
}

impl Default for RetailPriceClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceLookup for RetailPriceClient {
    async fn hourly_price(&self, sku: &str) -> Result<Option<f64>, Box<dyn Error + Send + Sync>> {
        let client = client_for(&self.base_url, ClientKind::PriceLookup);
        let filter = format!("armSkuName eq '{}' and priceType eq 'Consumption'", sku);
        let response = client
            .get(&self.base_url)
            .query(&[("$filter", filter.as_str())])
            .send()
            .await?
            .error_for_status()?;
        let body: serde_json::Value = response.json().await?;
        Ok(body["Items"][0]["retailPrice"].as_f64())
    }
}

/// Synthetic fallback used when `enable_cost_api` is off or the tier-2 call
/// fails, keeping cost estimation testable without network access.
pub struct SyntheticPriceLookup;

#[async_trait]
impl PriceLookup for SyntheticPriceLookup {
    async fn hourly_price(&self, _sku: &str) -> Result<Option<f64>, Box<dyn Error + Send + Sync>> {
        Ok(None)
    }
}

fn in_memory_vm_price(sku: &str) -> Option<f64> {
    VM_HOURLY_USD.iter().find(|(k, _)| *k == sku).map(|(_, v)| *v)
}

/// Resolve an hourly VM price through the three-tier lookup: in-memory
/// table, then (if enabled) the retail API, then a flat default.
async fn vm_hourly_price(sku: &str, enable_cost_api: bool, retail: &dyn PriceLookup) -> f64 {
    if let Some(price) = in_memory_vm_price(sku) {
        return price;
    }
    if enable_cost_api {
        if let Ok(Some(price)) = retail.hourly_price(sku).await {
            return price;
        }
    }
    DEFAULT_VM_HOURLY
}

#[derive(Debug, Clone, Serialize)]
pub struct CostLine {
    pub resource_type: String,
    pub resource_name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub monthly: f64,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostReport {
    pub lines: Vec<CostLine>,
    pub total_monthly: f64,
}

/// `node_count` lives either at the top level or nested under the
/// `default_node_pool { ... }` block, depending on how the resource was
/// declared.
fn aks_node_count(resource: &Resource) -> Option<u32> {
    if let Some(n) = resource.get_i64("node_count") {
        return Some(n as u32);
    }
    resource
        .get("default_node_pool")
        .and_then(crate::gateway::parser::PropertyValue::as_map)
        .and_then(|m| m.get("node_count"))
        .and_then(crate::gateway::parser::PropertyValue::as_i64)
        .map(|n| n as u32)
}

fn is_free_resource(resource_type: &str) -> bool {
    matches!(
        resource_type,
        "azurerm_virtual_network" | "azurerm_network_security_group"
    ) || resource_type.contains("subnet")
}

/// Estimate one resource's monthly cost per the resource-specific rules in
/// §4.3. `sku` and `quantity` come from the caller (either a parsed
/// resource's `sku`/`size` property, or a direct cost-query prompt).
pub async fn estimate_resource(
    resource: &Resource,
    enable_cost_api: bool,
    retail: &dyn PriceLookup,
) -> CostLine {
    if is_free_resource(&resource.resource_type) {
        return CostLine {
            resource_type: resource.resource_type.clone(),
            resource_name: resource.name.clone(),
            quantity: 1,
            unit_price: 0.0,
            monthly: 0.0,
            note: None,
        };
    }

    match resource.resource_type.as_str() {
        "azurerm_kubernetes_cluster" => {
            let node_count = aks_node_count(resource).unwrap_or(3);
            let vm_size = resource.get_str("vm_size").unwrap_or("Standard_D2s_v3");
            let hourly = vm_hourly_price(vm_size, enable_cost_api, retail).await;
            let monthly = node_count as f64 * hourly * HOURS_PER_MONTH + AKS_LOAD_BALANCER_MONTHLY;
            CostLine {
                resource_type: resource.resource_type.clone(),
                resource_name: resource.name.clone(),
                quantity: node_count,
                unit_price: hourly,
                monthly,
                note: Some("includes load balancer".to_string()),
            }
        }
        "azurerm_virtual_machine" => {
            let sku = resource.get_str("vm_size").unwrap_or("Standard_D2s_v3");
            let mut hourly = vm_hourly_price(sku, enable_cost_api, retail).await;
            let is_windows = resource
                .get_str("os_type")
                .map(|s| s.eq_ignore_ascii_case("windows"))
                .unwrap_or(false);
            if is_windows {
                hourly *= 1.5;
            }
            CostLine {
                resource_type: resource.resource_type.clone(),
                resource_name: resource.name.clone(),
                quantity: 1,
                unit_price: hourly,
                monthly: hourly * HOURS_PER_MONTH,
                note: is_windows.then(|| "Windows licensing premium applied".to_string()),
            }
        }
        "azurerm_storage_account" => {
            let gb = resource.get_f64("size_gb").unwrap_or(DEFAULT_STORAGE_GB);
            CostLine {
                resource_type: resource.resource_type.clone(),
                resource_name: resource.name.clone(),
                quantity: gb as u32,
                unit_price: STORAGE_GB_MONTHLY_USD,
                monthly: gb * STORAGE_GB_MONTHLY_USD,
                note: None,
            }
        }
        _ => CostLine {
            resource_type: resource.resource_type.clone(),
            resource_name: resource.name.clone(),
            quantity: 1,
            unit_price: DEFAULT_VM_HOURLY,
            monthly: DEFAULT_VM_HOURLY * HOURS_PER_MONTH,
            note: Some("no specific pricing rule; flat estimate".to_string()),
        },
    }
}

pub async fn estimate_report(
    resources: &[Resource],
    enable_cost_api: bool,
    retail: &dyn PriceLookup,
) -> CostReport {
    let mut lines = Vec::with_capacity(resources.len());
    for resource in resources {
        lines.push(estimate_resource(resource, enable_cost_api, retail).await);
    }
    let total_monthly = lines.iter().map(|l| l.monthly).sum();
    CostReport { lines, total_monthly }
}

/// Estimate a direct quantity × SKU cost query (e.g. "3x Standard_D2s_v3 VMs"),
/// bypassing the resource parser entirely (§8 scenario 3).
pub async fn estimate_direct(
    sku: &str,
    quantity: u32,
    enable_cost_api: bool,
    retail: &dyn PriceLookup,
) -> CostLine {
    let hourly = vm_hourly_price(sku, enable_cost_api, retail).await;
    CostLine {
        resource_type: "azurerm_virtual_machine".to_string(),
        resource_name: sku.to_string(),
        quantity,
        unit_price: hourly,
        monthly: quantity as f64 * hourly * HOURS_PER_MONTH,
        note: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn direct_vm_estimate_matches_the_spec_scenario() {
        let line = estimate_direct("Standard_D2s_v3", 3, false, &SyntheticPriceLookup).await;
        assert!((line.unit_price - 0.096).abs() < 1e-9);
        assert!((line.monthly - 210.24).abs() < 1e-6);
    }

    #[tokio::test]
    async fn windows_vm_costs_one_point_five_times_linux() {
        let mut r = Resource::new("azurerm_virtual_machine", "w", 1);
        r.properties.insert(
            "vm_size".into(),
            crate::gateway::parser::PropertyValue::String("Standard_D2s_v3".into()),
        );
        r.properties.insert(
            "os_type".into(),
            crate::gateway::parser::PropertyValue::String("Windows".into()),
        );
        let line = estimate_resource(&r, false, &SyntheticPriceLookup).await;
        assert!((line.unit_price - 0.096 * 1.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn free_resources_report_zero_cost() {
        let r = Resource::new("azurerm_virtual_network", "v", 1);
        let line = estimate_resource(&r, false, &SyntheticPriceLookup).await;
        assert_eq!(line.monthly, 0.0);
    }
}
