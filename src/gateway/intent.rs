//! Intent classification (§4.4 "Intent classification").

use crate::gateway::clients::llm_client::{ChatTurn, LlmClient, Role};
use crate::gateway::parser::{extract_code_blocks, strip_code_blocks};
use std::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Analyze,
    Cost,
    Ops,
    Help,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Analyze => "analyze",
            Intent::Cost => "cost",
            Intent::Ops => "ops",
            Intent::Help => "help",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "analyze" => Some(Intent::Analyze),
            "cost" => Some(Intent::Cost),
            "ops" => Some(Intent::Ops),
            "help" => Some(Intent::Help),
            _ => None,
        }
    }

    /// The ordered, sequential agent dispatch list for this intent (§4.4
    /// "Intent → agent list").
    pub fn agent_ids(&self) -> &'static [&'static str] {
        match self {
            Intent::Analyze => &["policy", "security", "compliance", "impact"],
            Intent::Cost => &["cost"],
            Intent::Ops => &["deploy", "drift", "notification"],
            Intent::Help => &[],
        }
    }
}

const ANALYZE_KEYWORDS: &[&str] = &["analyze", "scan", "audit", "review", "check", "lint"];
const COST_KEYWORDS: &[&str] = &["cost", "price", "pricing", "estimate", "budget", "expensive"];
const OPS_KEYWORDS: &[&str] = &["deploy", "rollback", "promote", "status", "release", "ops"];
const HELP_KEYWORDS: &[&str] = &["help", "how", "what can you do", "usage"];

const SYSTEM_PROMPT: &str = r#"Classify the user's intent into exactly one of: analyze, cost, ops, help. Respond with JSON only, one key: {"intent": "<value>"}. No prose, no explanation."#;

/// Keyword-scoring fallback classifier, used when the LLM is disabled,
/// absent, or the caller has no token. Code fences are stripped before
/// keyword matching so property names like `min_tls_version` can't
/// masquerade as `ops`, except for the `terraform`/`bicep` boost which is
/// checked against the raw message (§4.4).
pub fn classify_keywords(message: &str) -> Intent {
    let prose = strip_code_blocks(message).to_ascii_lowercase();

    let mut scores = [0i32; 4]; // analyze, cost, ops, help
    for kw in ANALYZE_KEYWORDS {
        if prose.contains(kw) {
            scores[0] += 1;
        }
    }
    for kw in COST_KEYWORDS {
        if prose.contains(kw) {
            scores[1] += 1;
        }
    }
    for kw in OPS_KEYWORDS {
        if prose.contains(kw) {
            scores[2] += 1;
        }
    }
    for kw in HELP_KEYWORDS {
        if prose.contains(kw) {
            scores[3] += 1;
        }
    }

    let lowered_full = message.to_ascii_lowercase();
    if lowered_full.contains("terraform") || lowered_full.contains("bicep") {
        scores[0] += 2;
    }

    let (best_index, best_score) = scores
        .iter()
        .enumerate()
        .max_by_key(|(_, score)| **score)
        .unwrap();

    if best_score > &0 {
        return match best_index {
            0 => Intent::Analyze,
            1 => Intent::Cost,
            2 => Intent::Ops,
            _ => Intent::Help,
        };
    }

    let has_code_block = !extract_code_blocks(message).is_empty();
    if has_code_block || message.contains("resource ") {
        return Intent::Analyze;
    }

    Intent::Help
}

/// Preferred classification path: ask the configured LLM for one of the
/// four categories, tolerating a fenced JSON response. `token` is the
/// caller's own credential, forwarded as-is to the upstream call.
pub async fn classify_llm(
    client: &dyn LlmClient,
    message: &str,
    token: &str,
) -> Result<Intent, Box<dyn Error + Send + Sync>> {
    let turns = [
        ChatTurn {
            role: Role::System,
            content: SYSTEM_PROMPT.to_string(),
        },
        ChatTurn {
            role: Role::User,
            content: message.to_string(),
        },
    ];
    let response = client.send_message(&turns, token).await?;
    parse_llm_intent(&response).ok_or_else(|| "LLM returned an unrecognized intent".into())
}

fn parse_llm_intent(response: &str) -> Option<Intent> {
    let unwrapped = strip_code_fence(response.trim());
    let value: serde_json::Value = serde_json::from_str(unwrapped).ok()?;
    let intent_str = value.get("intent")?.as_str()?;
    Intent::parse(intent_str)
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let after_lang = rest.find('\n').map(|i| &rest[i + 1..]).unwrap_or(rest);
    after_lang.strip_suffix("```").unwrap_or(after_lang).trim()
}
