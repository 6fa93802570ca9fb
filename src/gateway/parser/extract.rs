//! Format detection and code-block extraction (§4.1 "Format detection").

use super::types::IacFormat;

const TERRAFORM_MARKERS: &[&str] = &[
    "resource \"",
    "variable \"",
    "provider \"",
    "terraform {",
    "module \"",
    "data \"",
];

const BICEP_MARKERS: &[&str] = &["resource ", "param ", "targetScope =", "module "];

/// Detect the IaC format of `source`, per the precedence test in §4.1:
/// Terraform's markers are checked first and win ties against Bicep's.
pub fn detect_format(source: &str) -> IacFormat {
    let looks_terraform = TERRAFORM_MARKERS.iter().any(|m| source.contains(m))
        && (source.contains('"') || source.contains("terraform {"));
    if looks_terraform {
        return IacFormat::Terraform;
    }

    let looks_bicep = BICEP_MARKERS.iter().any(|m| source.contains(m))
        && (source.contains('\'') || source.contains("targetScope"));
    if looks_bicep {
        return IacFormat::Bicep;
    }

    IacFormat::Unknown
}

/// Pull every fenced code block (```lang\n...\n```` or plain ```...````) out
/// of a chat message, in order of appearance. Used both to locate embedded
/// IaC source and, by the intent classifier, to strip code before keyword
/// scoring.
pub fn extract_code_blocks(message: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut rest = message;
    while let Some(start) = rest.find("```") {
        let after_fence = &rest[start + 3..];
        // Skip an optional language tag up to the first newline.
        let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after_fence[body_start..];
        match body.find("```") {
            Some(end) => {
                blocks.push(body[..end].to_string());
                rest = &body[end + 3..];
            }
            None => break,
        }
    }
    blocks
}

/// Strip fenced code blocks out of a message, leaving the surrounding prose.
/// Used by the intent classifier so property names inside code (e.g.
/// `min_tls_version`) cannot masquerade as `ops` keywords.
pub fn strip_code_blocks(message: &str) -> String {
    let mut out = String::new();
    let mut rest = message;
    while let Some(start) = rest.find("```") {
        out.push_str(&rest[..start]);
        let after_fence = &rest[start + 3..];
        match after_fence.find("```") {
            Some(end) => rest = &after_fence[end + 3..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Combine every fenced block in a chat message into one source blob for
/// parsing. Multiple blocks are joined with a blank line so brace-depth
/// scanning in the per-format parsers still treats each block's content
/// independently (no block straddles another's braces in well-formed input).
pub fn combined_source(message: &str) -> String {
    extract_code_blocks(message).join("\n\n")
}

/// Pull every inline single-backtick fragment out of a message, in order of
/// appearance. Fallback source for messages that inline a property or
/// resource reference (`` `azurerm_storage_account.s` ``) rather than
/// fencing a full block.
pub fn extract_inline_fragments(message: &str) -> Vec<String> {
    let mut fragments = Vec::new();
    let mut rest = message;
    while let Some(start) = rest.find('`') {
        let after = &rest[start + 1..];
        match after.find('`') {
            Some(end) => {
                fragments.push(after[..end].to_string());
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    fragments
}

/// Resolve the IaC source to parse out of a raw chat message, per the
/// fallback order in §4.1: concatenate fenced blocks; else concatenate
/// inline backtick fragments; else, if the whole message is itself detected
/// as IaC, use it unchanged; else empty.
pub fn resolve_source(message: &str) -> String {
    let fenced = combined_source(message);
    if !fenced.trim().is_empty() {
        return fenced;
    }

    let inline = extract_inline_fragments(message).join("\n\n");
    if !inline.trim().is_empty() {
        return inline;
    }

    if detect_format(message) != IacFormat::Unknown {
        return message.to_string();
    }

    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_terraform_over_bicep_on_tie() {
        let src = "resource \"azurerm_storage_account\" \"s\" { enable_https_traffic_only = false }";
        assert_eq!(detect_format(src), IacFormat::Terraform);
    }

    #[test]
    fn detects_bicep() {
        let src = "resource s 'Microsoft.Storage/storageAccounts@2023-01-01' = { properties: {} }";
        assert_eq!(detect_format(src), IacFormat::Bicep);
    }

    #[test]
    fn unknown_when_no_markers_present() {
        assert_eq!(detect_format("just chatting about infrastructure"), IacFormat::Unknown);
    }

    #[test]
    fn extracts_single_fenced_block_regardless_of_surrounding_prose() {
        let message = "analyze this:\n```hcl\nresource \"azurerm_storage_account\" \"s\" { enable_https_traffic_only = false }\n```\nthanks";
        let blocks = extract_code_blocks(message);
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].contains("azurerm_storage_account"));
    }

    #[test]
    fn extracts_multiple_fenced_blocks() {
        let message = "```hcl\nresource \"a\" \"b\" {}\n```\nand\n```hcl\nresource \"c\" \"d\" {}\n```";
        assert_eq!(extract_code_blocks(message).len(), 2);
    }

    #[test]
    fn resolve_source_falls_back_to_inline_fragments_when_no_fence_present() {
        let message = "does `resource \"azurerm_storage_account\" \"s\" {}` look right to you?";
        let resolved = resolve_source(message);
        assert!(resolved.contains("azurerm_storage_account"));
    }

    #[test]
    fn resolve_source_falls_back_to_the_whole_message_when_it_is_itself_iac() {
        let message = "resource \"azurerm_storage_account\" \"s\" { enable_https_traffic_only = false }";
        assert_eq!(resolve_source(message), message);
    }

    #[test]
    fn resolve_source_is_empty_when_nothing_looks_like_iac() {
        assert_eq!(resolve_source("just chatting about infrastructure"), "");
    }
}
