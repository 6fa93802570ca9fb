//! Error kinds shared across the gateway.
//!
//! A flat enum implementing `Display` + `Error`, no macro-derived error crate.
//! `GatewayError` covers the wire-level failure taxonomy
//! (`BadInput`, `AuthFailure`, `ConfigFailure`, `UpstreamTransient`,
//! `AgentPanic`); agent- and parser-internal failures use
//! `Box<dyn Error + Send + Sync>` instead, so they compose without a
//! dedicated error type per module.

use std::error::Error;
use std::fmt;

/// Top-level error taxonomy used at the transport boundary.
///
/// Agents and the parser never construct these directly except where noted;
/// transports translate lower-level failures (parse errors, tool errors,
/// upstream timeouts) into one of these kinds to decide the wire-level
/// response (HTTP status code, or whether to keep streaming).
#[derive(Debug, Clone)]
pub enum GatewayError {
    /// Malformed JSON body or IaC fragment that could not be parsed at all.
    BadInput(String),
    /// Missing or invalid request signature.
    AuthFailure(String),
    /// A required configuration value is missing or invalid for the active
    /// environment (e.g. no webhook secret in `prod`).
    ConfigFailure(String),
    /// A downstream dependency (LLM, price API, webhook) timed out or
    /// returned a transient error. Never fatal to the request.
    UpstreamTransient(String),
    /// An agent panicked; recovered by middleware.
    AgentPanic(String),
}

impl fmt::Display for GatewayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayError::BadInput(msg) => write!(f, "bad input: {}", msg),
            GatewayError::AuthFailure(msg) => write!(f, "auth failure: {}", msg),
            GatewayError::ConfigFailure(msg) => write!(f, "config failure: {}", msg),
            GatewayError::UpstreamTransient(msg) => write!(f, "upstream transient error: {}", msg),
            GatewayError::AgentPanic(msg) => write!(f, "agent panic: {}", msg),
        }
    }
}

impl Error for GatewayError {}

/// Errors returned by the rule engine and agent dispatch layer.
#[derive(Debug, Clone)]
pub enum AgentError {
    /// `agentId` has no entry in the [`AgentRegistry`](crate::gateway::registry::AgentRegistry).
    NotRegistered(String),
    /// The agent declared `needsIaCInput` but the request carried no parsed resources.
    MissingIacInput,
    /// Execution failed for a reason internal to the agent (e.g. lock poisoning).
    ExecutionFailed(String),
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::NotRegistered(id) => write!(f, "Agent '{}' is not registered.", id),
            AgentError::MissingIacInput => write!(f, "no IaC input was provided or parsed"),
            AgentError::ExecutionFailed(msg) => write!(f, "agent execution failed: {}", msg),
        }
    }
}

impl Error for AgentError {}
