//! Bicep resource extraction and normalization to the Terraform vocabulary
//! (§4.1 "Resource extraction (Bicep)", §6 type-mapping tables).

use super::types::{PropertyValue, Resource};
use std::collections::BTreeMap;

/// Bicep resource type → canonical Terraform type (§6, stable table).
const TYPE_TABLE: &[(&str, &str)] = &[
    ("Microsoft.Storage/storageAccounts", "azurerm_storage_account"),
    ("Microsoft.KeyVault/vaults", "azurerm_key_vault"),
    ("Microsoft.Network/virtualNetworks", "azurerm_virtual_network"),
    ("Microsoft.Network/networkSecurityGroups", "azurerm_network_security_group"),
    ("Microsoft.ContainerService/managedClusters", "azurerm_kubernetes_cluster"),
    ("Microsoft.ContainerRegistry/registries", "azurerm_container_registry"),
    ("Microsoft.Web/serverfarms", "azurerm_service_plan"),
    ("Microsoft.Web/sites", "azurerm_app_service"),
    ("Microsoft.Compute/virtualMachines", "azurerm_virtual_machine"),
    ("Microsoft.Sql/servers", "azurerm_mssql_server"),
    ("Microsoft.Sql/servers/databases", "azurerm_mssql_database"),
    ("Microsoft.Cache/redis", "azurerm_redis_cache"),
    ("Microsoft.DocumentDB/databaseAccounts", "azurerm_cosmosdb_account"),
];

/// Bicep property name → Terraform property name (§4.1).
const PROPERTY_TABLE: &[(&str, &str)] = &[
    ("supportsHttpsTrafficOnly", "enable_https_traffic_only"),
    ("minimumTlsVersion", "min_tls_version"),
    ("allowBlobPublicAccess", "allow_blob_public_access"),
    ("enableSoftDelete", "soft_delete_enabled"),
    ("enablePurgeProtection", "purge_protection_enabled"),
    ("enableRbac", "role_based_access_control_enabled"),
    ("publicNetworkAccess", "public_network_access_enabled"),
    ("networkAcls", "network_rules"),
    ("defaultAction", "default_action"),
];

fn map_type(bicep_type: &str) -> String {
    TYPE_TABLE
        .iter()
        .find(|(k, _)| *k == bicep_type)
        .map(|(_, v)| v.to_string())
        .unwrap_or_else(|| bicep_type.to_string())
}

fn map_property_name(name: &str) -> String {
    PROPERTY_TABLE
        .iter()
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.to_string())
        .unwrap_or_else(|| name.to_string())
}

pub fn parse(source: &str) -> Vec<Resource> {
    let mut resources = Vec::new();
    let mut search_from = 0usize;

    while let Some(rel) = source[search_from..].find("resource ") {
        let header_start = search_from + rel;
        let Some((name, bicep_type, open_idx)) = parse_header(source, header_start) else {
            search_from = header_start + "resource ".len();
            continue;
        };

        let bytes = source.as_bytes();
        let Some(close_idx) = find_matching_brace(bytes, open_idx) else {
            break;
        };

        let body = &source[open_idx + 1..close_idx];
        let line = source[..header_start].matches('\n').count() + 1;
        let resource_type = map_type(strip_version(&bicep_type));

        let mut resource = Resource::new(resource_type, name, line);
        let raw_props = parse_body(body);
        resource.properties = flatten_and_rename(raw_props);
        resource.raw_block = source[header_start..=close_idx].to_string();
        resources.push(resource);

        search_from = close_idx + 1;
    }

    resources
}

fn strip_version(type_at_version: &str) -> &str {
    type_at_version.split('@').next().unwrap_or(type_at_version)
}

/// Parse `N 'T@V' = {` starting at `resource `. Returns `(name, type@version,
/// absolute offset of the opening brace)`.
fn parse_header(source: &str, header_start: usize) -> Option<(String, String, usize)> {
    let rest = &source[header_start..];
    let after_kw = rest.strip_prefix("resource ")?;
    let name_end = after_kw.find(char::is_whitespace)?;
    let name = after_kw[..name_end].to_string();

    let after_name = &after_kw[name_end..];
    let quote_start = after_name.find('\'')? + 1;
    let type_rest = &after_name[quote_start..];
    let type_end = type_rest.find('\'')?;
    let type_at_version = type_rest[..type_end].to_string();

    let after_type = &type_rest[type_end + 1..];
    let brace_rel = after_type.find('{')?;

    let consumed =
        "resource ".len() + name_end + quote_start + (type_end + 1) + brace_rel;
    Some((name, type_at_version, header_start + consumed))
}

/// Like [`super::terraform::find_matching_brace`] but treats single quotes
/// as Bicep's string delimiter instead of double quotes.
fn find_matching_brace(bytes: &[u8], open_idx: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut i = open_idx;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if in_string {
            if c == '\'' {
                in_string = false;
            }
        } else {
            match c {
                '\'' => in_string = true,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }
    None
}

/// Parse a Bicep object body of `key: value` pairs and nested `key: { ... }`
/// blocks. Trailing commas are stripped from scalar values.
fn parse_body(body: &str) -> BTreeMap<String, PropertyValue> {
    let mut props = BTreeMap::new();
    let bytes = body.as_bytes();
    let mut i = 0usize;

    while i < bytes.len() {
        while i < bytes.len() && (bytes[i] as char).is_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        let key_start = i;
        while i < bytes.len() && is_ident_char(bytes[i] as char) {
            i += 1;
        }
        if i == key_start {
            i += 1;
            continue;
        }
        let key = body[key_start..i].to_string();

        while i < bytes.len() && (bytes[i] as char).is_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] as char != ':' {
            continue;
        }
        i += 1;
        while i < bytes.len() && (bytes[i] as char).is_whitespace() {
            i += 1;
        }

        if i < bytes.len() && bytes[i] as char == '{' {
            let close = find_matching_brace(bytes, i).unwrap_or(bytes.len() - 1);
            let nested = parse_body(&body[i + 1..close]);
            props.insert(key, PropertyValue::Map(nested));
            i = close + 1;
        } else {
            let (value, next) = read_scalar(body, i);
            props.insert(key, PropertyValue::parse_scalar(&value));
            i = next;
        }
    }

    props
}

fn read_scalar(body: &str, start: usize) -> (String, usize) {
    let bytes = body.as_bytes();
    let mut i = start;
    let mut in_string = false;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if in_string {
            if c == '\'' {
                in_string = false;
            }
        } else if c == '\'' {
            in_string = true;
        } else if c == '\n' || c == ',' {
            break;
        }
        i += 1;
    }
    (body[start..i].trim().to_string(), i)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Flatten a top-level `properties` map one level and rename every key
/// (recursively) through the Bicep→Terraform property table.
fn flatten_and_rename(mut raw: BTreeMap<String, PropertyValue>) -> BTreeMap<String, PropertyValue> {
    if let Some(PropertyValue::Map(inner)) = raw.remove("properties") {
        for (k, v) in inner {
            raw.insert(k, v);
        }
    }
    rename_keys(raw)
}

fn rename_keys(map: BTreeMap<String, PropertyValue>) -> BTreeMap<String, PropertyValue> {
    map.into_iter()
        .map(|(k, v)| {
            let renamed_key = map_property_name(&k);
            let renamed_value = match v {
                PropertyValue::Map(inner) => PropertyValue::Map(rename_keys(inner)),
                other => other,
            };
            (renamed_key, renamed_value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_type_and_flattens_properties() {
        let src = "resource s 'Microsoft.Storage/storageAccounts@2023-01-01' = { properties: { supportsHttpsTrafficOnly: false, minimumTlsVersion: 'TLS1_0' } }";
        let resources = parse(src);
        assert_eq!(resources.len(), 1);
        let r = &resources[0];
        assert_eq!(r.resource_type, "azurerm_storage_account");
        assert_eq!(r.name, "s");
        assert_eq!(r.get_bool("enable_https_traffic_only"), Some(false));
        assert_eq!(r.get_str("min_tls_version"), Some("TLS1_0"));
    }

    #[test]
    fn unknown_bicep_types_pass_through_verbatim() {
        let src = "resource x 'Some.Unknown/thing@2021-01-01' = { properties: {} }";
        let resources = parse(src);
        assert_eq!(resources[0].resource_type, "Some.Unknown/thing");
    }

    #[test]
    fn parity_with_terraform_equivalent() {
        use super::super::terraform;
        let tf_src = r#"resource "azurerm_storage_account" "s" { enable_https_traffic_only = false min_tls_version = "TLS1_0" }"#;
        let bicep_src = "resource s 'Microsoft.Storage/storageAccounts@2023-01-01' = { properties: { supportsHttpsTrafficOnly: false, minimumTlsVersion: 'TLS1_0' } }";

        let tf = &terraform::parse(tf_src)[0];
        let bicep = &parse(bicep_src)[0];
        assert_eq!(tf.resource_type, bicep.resource_type);
        assert_eq!(
            tf.get_bool("enable_https_traffic_only"),
            bicep.get_bool("enable_https_traffic_only")
        );
        assert_eq!(tf.get_str("min_tls_version"), bicep.get_str("min_tls_version"));
    }
}
