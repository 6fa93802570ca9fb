//! A minimal cancellation context threaded through agent dispatch.
//!
//! Client disconnects and SIGTERM both flip a cheap `Arc<AtomicBool>` flag
//! from the transport layer; the orchestrator polls it between agents, and
//! agents may poll it around their own outbound I/O.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A request-scoped cancellation flag, cheap to clone and share across the
/// orchestrator loop and any agent it dispatches to.
#[derive(Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

/// Per-request execution context: cancellation and a request id, propagated
/// alongside `AgentRequest` — which separately carries the caller's GitHub
/// token — through every agent call.
#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub cancellation: CancellationToken,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_token_starts_uncancelled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn shared_clones_observe_cancellation() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}
