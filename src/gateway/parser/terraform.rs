//! Terraform HCL resource extraction (§4.1 "Resource extraction (Terraform)").

use super::types::{PropertyValue, Resource};
use std::collections::BTreeMap;

/// Extract every `resource "T" "N" { ... }` block from `source`.
pub fn parse(source: &str) -> Vec<Resource> {
    let mut resources = Vec::new();
    let bytes = source.as_bytes();
    let mut search_from = 0usize;

    while let Some(rel) = source[search_from..].find("resource \"") {
        let header_start = search_from + rel;
        let Some((resource_type, name, body_open)) = parse_header(&source[header_start..]) else {
            search_from = header_start + "resource \"".len();
            continue;
        };
        let open_idx = header_start + body_open;
        let Some(close_idx) = find_matching_brace(bytes, open_idx) else {
            break;
        };

        let body = &source[open_idx + 1..close_idx];
        let line = source[..header_start].matches('\n').count() + 1;
        let mut resource = Resource::new(resource_type, name, line);
        resource.properties = parse_body(body);
        resource.raw_block = source[header_start..=close_idx].to_string();
        resources.push(resource);

        search_from = close_idx + 1;
    }

    resources
}

/// Parse the `"T" "N" {` header following the `resource ` keyword (the
/// caller has already located `"resource \""`). Returns the type, name, and
/// the byte offset of the opening `{` relative to the start of `header`.
fn parse_header(header: &str) -> Option<(String, String, usize)> {
    let rest = header.strip_prefix("resource \"")?;
    let type_end = rest.find('"')?;
    let resource_type = rest[..type_end].to_string();

    let after_type = &rest[type_end + 1..];
    let name_start = after_type.find('"')? + 1;
    let name_rest = &after_type[name_start..];
    let name_end = name_rest.find('"')?;
    let name = name_rest[..name_end].to_string();

    let after_name = &name_rest[name_end + 1..];
    let brace_rel = after_name.find('{')?;

    let consumed = header.len() - rest.len()
        + (type_end + 1)
        + name_start
        + (name_end + 1)
        + brace_rel;
    Some((resource_type, name, consumed))
}

/// Find the index (in `bytes`) of the `}` that closes the `{` at `open_idx`,
/// counting brace depth while ignoring braces inside double-quoted strings.
pub fn find_matching_brace(bytes: &[u8], open_idx: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    let mut i = open_idx;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else {
            match c {
                '"' => in_string = true,
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

/// Parse the body of a `{ ... }` block into a property map, recursing into
/// nested `key = { ... }` maps and bare `blockname { ... }` child blocks.
pub fn parse_body(body: &str) -> BTreeMap<String, PropertyValue> {
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
            // Not an identifier start (stray punctuation); skip it.
            i += 1;
            continue;
        }
        let key = body[key_start..i].to_string();

        while i < bytes.len() && (bytes[i] as char).is_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }

        if bytes[i] as char == '=' {
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
        } else if bytes[i] as char == '{' {
            let close = find_matching_brace(bytes, i).unwrap_or(bytes.len() - 1);
            let nested = parse_body(&body[i + 1..close]);
            props.insert(key, PropertyValue::Map(nested));
            i = close + 1;
        }
        // Anything else (e.g. a type token with no value) is skipped; the
        // loop resumes scanning from the current position.
    }

    props
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-' || c == '.'
}

/// Read a scalar value starting at `start`, stopping at a newline that is
/// not inside a quoted string, and return it alongside the index just past
/// the value.
fn read_scalar(body: &str, start: usize) -> (String, usize) {
    let bytes = body.as_bytes();
    let mut i = start;
    let mut in_string = false;
    let mut escaped = false;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else {
            if c == '"' {
                in_string = true;
            } else if c == '\n' {
                break;
            }
        }
        i += 1;
    }
    (body[start..i].trim().to_string(), i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_resource_with_scalars() {
        let src = r#"resource "azurerm_storage_account" "s" { enable_https_traffic_only = false min_tls_version = "TLS1_0" }"#;
        let resources = parse(src);
        assert_eq!(resources.len(), 1);
        let r = &resources[0];
        assert_eq!(r.resource_type, "azurerm_storage_account");
        assert_eq!(r.name, "s");
        assert_eq!(r.get_bool("enable_https_traffic_only"), Some(false));
        assert_eq!(r.get_str("min_tls_version"), Some("TLS1_0"));
    }

    #[test]
    fn parses_nested_blocks_into_the_same_properties_tree() {
        let src = r#"resource "azurerm_network_security_group" "nsg" {
            security_rule {
                source_address_prefix = "0.0.0.0/0"
                destination_port_range = "22"
            }
        }"#;
        let resources = parse(src);
        let r = &resources[0];
        let nested = r.get("security_rule").and_then(PropertyValue::as_map).unwrap();
        assert_eq!(
            nested.get("source_address_prefix").and_then(PropertyValue::as_str),
            Some("0.0.0.0/0")
        );
    }

    #[test]
    fn empty_source_yields_no_resources() {
        assert!(parse("").is_empty());
        assert!(parse("# just a comment\n// another").is_empty());
    }

    #[test]
    fn braces_inside_strings_do_not_confuse_depth_counting() {
        let src = r#"resource "azurerm_app_service" "a" { tags = { note = "contains } a brace" } }"#;
        let resources = parse(src);
        assert_eq!(resources.len(), 1);
    }
}
