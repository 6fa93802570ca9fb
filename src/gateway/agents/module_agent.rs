//! `module` agent (§4.3 "module"): validates `module "N" { source, version }`
//! blocks against an allowlist and a small built-in registry catalog.

use crate::gateway::agent::{header, Agent, Capabilities};
use crate::gateway::cancellation::RequestContext;
use crate::gateway::emitter::Emitter;
use crate::gateway::parser::terraform::{find_matching_brace, parse_body};
use crate::gateway::parser::{combined_source, IacFormat};
use crate::gateway::request::AgentRequest;
use async_trait::async_trait;
use std::error::Error;
use std::fmt::Write as _;

/// One `module "N" { source = "...", version = "..." }` declaration.
struct ModuleBlock {
    name: String,
    source: String,
    version: Option<String>,
}

/// Scan `source` for `module "N" { ... }` blocks the same way the Terraform
/// resource extractor scans `resource "T" "N" { ... }` blocks.
fn extract_modules(source: &str) -> Vec<ModuleBlock> {
    let mut modules = Vec::new();
    let bytes = source.as_bytes();
    let mut search_from = 0usize;

    while let Some(rel) = source[search_from..].find("module \"") {
        let header_start = search_from + rel;
        let rest = &source[header_start + "module \"".len()..];
        let Some(name_end) = rest.find('"') else {
            search_from = header_start + "module \"".len();
            continue;
        };
        let name = rest[..name_end].to_string();
        let after_name = &rest[name_end + 1..];
        let Some(brace_rel) = after_name.find('{') else {
            search_from = header_start + "module \"".len();
            continue;
        };
        let open_idx = header_start + "module \"".len() + name_end + 1 + brace_rel;
        let Some(close_idx) = find_matching_brace(bytes, open_idx) else {
            break;
        };

        let body = parse_body(&source[open_idx + 1..close_idx]);
        let source_attr = body.get("source").and_then(|v| v.as_str()).unwrap_or("").to_string();
        let version = body.get("version").and_then(|v| v.as_str()).map(str::to_string);

        modules.push(ModuleBlock { name, source: source_attr, version });
        search_from = close_idx + 1;
    }

    modules
}

/// Built-in catalog entry: an approved module source, its tags, its
/// minimum supported version, and (if deprecated) its replacement.
struct CatalogEntry {
    source_prefix: &'static str,
    tags: &'static [&'static str],
    min_version: &'static str,
    deprecated: bool,
    replaced_by: Option<&'static str>,
}

const ALLOWLIST_PREFIXES: &[&str] = &["app.terraform.io/", "registry.terraform.io/", "git::https://github.com/"];

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        source_prefix: "registry.terraform.io/Azure/network/azurerm",
        tags: &["networking", "vnet"],
        min_version: "5.0.0",
        deprecated: false,
        replaced_by: None,
    },
    CatalogEntry {
        source_prefix: "registry.terraform.io/Azure/aks/azurerm",
        tags: &["compute", "kubernetes"],
        min_version: "7.0.0",
        deprecated: false,
        replaced_by: None,
    },
    CatalogEntry {
        source_prefix: "registry.terraform.io/Azure/storage/azurerm",
        tags: &["storage"],
        min_version: "2.0.0",
        deprecated: false,
        replaced_by: None,
    },
    CatalogEntry {
        source_prefix: "registry.terraform.io/Azure/legacy-vm/azurerm",
        tags: &["compute"],
        min_version: "1.0.0",
        deprecated: true,
        replaced_by: Some("registry.terraform.io/Azure/aks/azurerm"),
    },
];

enum Verdict {
    Approved,
    UnknownSource,
    NotApproved,
    Deprecated { replaced_by: &'static str },
    VersionMismatch { min_version: &'static str },
}

fn parse_semver(v: &str) -> Option<(u64, u64, u64)> {
    let mut parts = v.trim_start_matches('v').split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next()?.parse().ok()?;
    let patch = parts.next().unwrap_or("0").parse().ok()?;
    Some((major, minor, patch))
}

fn find_catalog_entry(source: &str) -> Option<&'static CatalogEntry> {
    CATALOG.iter().find(|e| source.starts_with(e.source_prefix))
}

fn evaluate_module(module: &ModuleBlock) -> Verdict {
    let allowed = ALLOWLIST_PREFIXES.iter().any(|p| module.source.starts_with(p));
    if !allowed {
        return Verdict::UnknownSource;
    }

    let Some(entry) = find_catalog_entry(&module.source) else {
        return Verdict::NotApproved;
    };

    if entry.deprecated {
        return Verdict::Deprecated {
            replaced_by: entry.replaced_by.unwrap_or("no replacement listed"),
        };
    }

    if let Some(version) = &module.version {
        if let (Some(declared), Some(min)) = (parse_semver(version), parse_semver(entry.min_version)) {
            if declared < min {
                return Verdict::VersionMismatch {
                    min_version: entry.min_version,
                };
            }
        }
    }

    Verdict::Approved
}

/// Find catalog entries sharing at least one tag with `entry`, for the
/// "recommendations" line on a flagged module.
fn similar_recommendations(entry: &CatalogEntry) -> Vec<&'static str> {
    CATALOG
        .iter()
        .filter(|other| {
            !std::ptr::eq(*other, entry)
                && !other.deprecated
                && other.tags.iter().any(|t| entry.tags.contains(t))
        })
        .map(|other| other.source_prefix)
        .collect()
}

pub struct ModuleAgent {
    capabilities: Capabilities,
}

impl ModuleAgent {
    pub fn new() -> Self {
        Self {
            capabilities: Capabilities {
                id: "module",
                name: "Module Registry",
                description: "Validates Terraform module sources and versions against an approved catalog.",
                version: "1.0.0",
                supported_formats: &[IacFormat::Terraform],
                needs_iac_input: false,
            },
        }
    }
}

impl Default for ModuleAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for ModuleAgent {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    async fn handle(
        &self,
        _ctx: &RequestContext,
        request: &AgentRequest,
        emitter: &(dyn Emitter + Sync),
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        emitter.message(&header("Module Registry")).await;

        let source = request
            .last_user_message()
            .map(combined_source)
            .unwrap_or_default();
        let modules = extract_modules(&source);

        if modules.is_empty() {
            emitter.message("No `module` blocks found to validate.\n").await;
            return Ok(());
        }

        let mut out = String::from("| Module | Source | Verdict |\n|---|---|---|\n");
        for module in &modules {
            let verdict = evaluate_module(module);
            let (label, recommendation) = match &verdict {
                Verdict::Approved => ("approved".to_string(), None),
                Verdict::UnknownSource => ("unknown_source".to_string(), None),
                Verdict::NotApproved => {
                    let rec = find_catalog_entry(&module.source)
                        .map(similar_recommendations)
                        .filter(|r| !r.is_empty())
                        .map(|r| r.join(", "));
                    ("not_approved".to_string(), rec)
                }
                Verdict::Deprecated { replaced_by } => {
                    (format!("deprecated (replaced_by: {})", replaced_by), None)
                }
                Verdict::VersionMismatch { min_version } => {
                    (format!("version_mismatch (requires >= {})", min_version), None)
                }
            };
            let _ = writeln!(out, "| {} | {} | {} |", module.name, module.source, label);
            if let Some(rec) = recommendation {
                let _ = writeln!(out, "| | | recommended: {} |", rec);
            }
        }

        emitter.message(&out).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::emitter::ReferenceLink;
    use crate::gateway::request::{ChatMessage, ChatRole};
    use std::sync::Mutex;

    struct CapturingEmitter(Mutex<String>);

    #[async_trait]
    impl Emitter for CapturingEmitter {
        async fn message(&self, chunk: &str) {
            self.0.lock().unwrap().push_str(chunk);
        }
        async fn references(&self, _refs: Vec<ReferenceLink>) {}
    }

    fn request(body: &str) -> AgentRequest {
        AgentRequest {
            messages: vec![ChatMessage {
                role: ChatRole::User,
                content: format!("review modules\n```hcl\n{}\n```", body),
            }],
            references: vec![],
            iac: None,
            token: None,
        }
    }

    #[tokio::test]
    async fn flags_an_unknown_module_source() {
        let agent = ModuleAgent::new();
        let req = request(r#"module "net" { source = "github.com/someone/whatever" version = "1.0.0" }"#);
        let emitter = CapturingEmitter(Mutex::new(String::new()));
        let ctx = RequestContext::new("r1");
        agent.handle(&ctx, &req, &emitter).await.unwrap();
        let output = emitter.0.lock().unwrap().clone();
        assert!(output.contains("unknown_source"));
    }

    #[tokio::test]
    async fn flags_a_version_below_the_catalog_minimum() {
        let agent = ModuleAgent::new();
        let req = request(
            r#"module "aks" { source = "registry.terraform.io/Azure/aks/azurerm" version = "1.0.0" }"#,
        );
        let emitter = CapturingEmitter(Mutex::new(String::new()));
        let ctx = RequestContext::new("r1");
        agent.handle(&ctx, &req, &emitter).await.unwrap();
        let output = emitter.0.lock().unwrap().clone();
        assert!(output.contains("version_mismatch"));
    }

    #[tokio::test]
    async fn flags_a_deprecated_module_with_a_replacement_hint() {
        let agent = ModuleAgent::new();
        let req = request(
            r#"module "vm" { source = "registry.terraform.io/Azure/legacy-vm/azurerm" version = "1.0.0" }"#,
        );
        let emitter = CapturingEmitter(Mutex::new(String::new()));
        let ctx = RequestContext::new("r1");
        agent.handle(&ctx, &req, &emitter).await.unwrap();
        let output = emitter.0.lock().unwrap().clone();
        assert!(output.contains("deprecated"));
        assert!(output.contains("Azure/aks/azurerm"));
    }

    #[tokio::test]
    async fn approves_a_known_source_at_a_sufficient_version() {
        let agent = ModuleAgent::new();
        let req = request(
            r#"module "net" { source = "registry.terraform.io/Azure/network/azurerm" version = "5.1.0" }"#,
        );
        let emitter = CapturingEmitter(Mutex::new(String::new()));
        let ctx = RequestContext::new("r1");
        agent.handle(&ctx, &req, &emitter).await.unwrap();
        let output = emitter.0.lock().unwrap().clone();
        assert!(output.contains("approved"));
    }
}
