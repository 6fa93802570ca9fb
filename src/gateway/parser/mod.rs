//! IaC parsing: format detection, Terraform/Bicep resource extraction, and
//! chat-message code extraction (§4.1 Parser, L0 in the module weighting).

pub mod bicep;
pub mod extract;
pub mod terraform;
pub mod types;

pub use extract::{combined_source, extract_code_blocks, extract_inline_fragments, resolve_source, strip_code_blocks};
pub use types::{IacFormat, PropertyValue, Resource};

/// Parse `source`, detecting its format first and dispatching to the
/// matching extractor. An `Unknown` detection still tries Terraform, then
/// Bicep, before giving up with an empty resource list (§4.1 invariant i).
pub fn parse(source: &str) -> (IacFormat, Vec<Resource>) {
    if source.trim().is_empty() {
        return (IacFormat::Unknown, Vec::new());
    }

    match extract::detect_format(source) {
        IacFormat::Terraform => (IacFormat::Terraform, terraform::parse(source)),
        IacFormat::Bicep => (IacFormat::Bicep, bicep::parse(source)),
        IacFormat::Unknown => {
            let tf = terraform::parse(source);
            if !tf.is_empty() {
                return (IacFormat::Terraform, tf);
            }
            let bicep = bicep::parse(source);
            if !bicep.is_empty() {
                return (IacFormat::Bicep, bicep);
            }
            (IacFormat::Unknown, Vec::new())
        }
    }
}

/// Extract embedded IaC source from a raw chat message — fenced blocks,
/// else inline fragments, else the message itself if it's detected as IaC
/// (§4.1) — and parse it. This is the entry point the orchestrator uses on
/// the inbound `AgentRequest` message before any IaC is attached directly.
pub fn parse_from_message(message: &str) -> (IacFormat, Vec<Resource>) {
    let source = resolve_source(message);
    if source.trim().is_empty() {
        return (IacFormat::Unknown, Vec::new());
    }
    parse(&source)
}
