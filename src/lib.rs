// src/lib.rs

pub mod gateway;
pub mod transport;

pub use gateway::agent::{Agent, Capabilities};
pub use gateway::config::EnvironmentConfig;
pub use gateway::registry::{AgentRegistry, AgentRegistryBuilder};
pub use gateway::request::AgentRequest;
