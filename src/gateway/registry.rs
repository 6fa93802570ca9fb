//! Process-wide `agentId → Agent` mapping (§3 Data Model "Registry").
//!
//! Built once via [`AgentRegistryBuilder`] at startup, then frozen: the
//! hash map is never mutated again, so lookups need no locking (§9
//! "Registry... build it via a builder and expose only a lookup function").

use crate::gateway::agent::{Agent, Capabilities};
use std::collections::HashMap;
use std::sync::Arc;

pub struct AgentRegistryBuilder {
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistryBuilder {
    pub fn new() -> Self {
        Self {
            agents: HashMap::new(),
        }
    }

    pub fn register(mut self, agent: Arc<dyn Agent>) -> Self {
        let id = agent.capabilities().id.to_string();
        self.agents.insert(id, agent);
        self
    }

    pub fn build(self) -> AgentRegistry {
        AgentRegistry {
            agents: self.agents,
        }
    }
}

impl Default for AgentRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct AgentRegistry {
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn get(&self, id: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.agents.contains_key(id)
    }

    /// Capabilities for every registered agent, sorted by id — the only
    /// place iteration order matters (`GET /agents`, `tools/list`).
    pub fn list_capabilities(&self) -> Vec<Capabilities> {
        let mut caps: Vec<Capabilities> = self
            .agents
            .values()
            .map(|a| a.capabilities().clone())
            .collect();
        caps.sort_by_key(|c| c.id);
        caps
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::cancellation::RequestContext;
    use crate::gateway::emitter::Emitter;
    use crate::gateway::parser::IacFormat;
    use crate::gateway::request::AgentRequest;
    use async_trait::async_trait;
    use std::error::Error;

    struct StubAgent(Capabilities);

    #[async_trait]
    impl Agent for StubAgent {
        fn capabilities(&self) -> &Capabilities {
            &self.0
        }

        async fn handle(
            &self,
            _ctx: &RequestContext,
            _request: &AgentRequest,
            _emitter: &(dyn Emitter + Sync),
        ) -> Result<(), Box<dyn Error + Send + Sync>> {
            Ok(())
        }
    }

    fn stub(id: &'static str) -> Arc<dyn Agent> {
        Arc::new(StubAgent(Capabilities {
            id,
            name: id,
            description: "stub",
            version: "0.1.0",
            supported_formats: &[IacFormat::Terraform],
            needs_iac_input: false,
        }))
    }

    #[test]
    fn lookup_is_present_after_build_and_absent_for_unknown_ids() {
        let registry = AgentRegistryBuilder::new().register(stub("policy")).build();
        assert!(registry.get("policy").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn capabilities_are_listed_in_sorted_id_order() {
        let registry = AgentRegistryBuilder::new()
            .register(stub("security"))
            .register(stub("policy"))
            .register(stub("impact"))
            .build();
        let ids: Vec<&str> = registry.list_capabilities().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["impact", "policy", "security"]);
    }
}
