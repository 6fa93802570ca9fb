//! Shared outbound HTTP client pool.
//!
//! Every outbound call the gateway makes (LLM inference, Azure Retail
//! Prices lookups, Teams/Slack webhook delivery) goes through a client
//! pulled from here rather than building a fresh `reqwest::Client` per
//! call, so TCP/TLS connections to the same base URL are reused across
//! requests instead of being renegotiated every time.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

static HTTP_CLIENT_POOL: Lazy<Mutex<HashMap<String, reqwest::Client>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Get or create the shared client for `base_url`, built with the timeout
/// appropriate for the kind of call it backs. Streaming LLM calls get a
/// long budget; price lookups and webhook deliveries are expected to
/// return quickly and are capped accordingly (§4 per-agent timeouts).
pub fn client_for(base_url: &str, kind: ClientKind) -> reqwest::Client {
    let key = format!("{}|{:?}", base_url, kind);
    let mut pool = HTTP_CLIENT_POOL.lock().unwrap();

    if let Some(client) = pool.get(&key) {
        return client.clone();
    }

    let client = reqwest::ClientBuilder::new()
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .timeout(kind.timeout())
        .build()
        .expect("failed to build reqwest client");

    pool.insert(key, client.clone());
    client
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientKind {
    LlmInference,
    PriceLookup,
    Webhook,
}

impl ClientKind {
    fn timeout(self) -> Duration {
        match self {
            ClientKind::LlmInference => Duration::from_secs(120),
            ClientKind::PriceLookup => Duration::from_secs(10),
            ClientKind::Webhook => Duration::from_secs(8),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_a_usable_client_per_kind() {
        let price = client_for("https://example.test", ClientKind::PriceLookup);
        let webhook = client_for("https://example.test", ClientKind::Webhook);
        let llm = client_for("https://example.test", ClientKind::LlmInference);
        // Each kind is pooled independently; just assert construction succeeds
        // and repeated lookups don't panic.
        let _ = (price, webhook, llm);
        let _ = client_for("https://example.test", ClientKind::PriceLookup);
    }
}
