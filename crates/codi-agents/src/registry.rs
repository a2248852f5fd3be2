//! The agent capability registry.
//!
//! A static mapping from agent name to the signals it subscribes to and the
//! artifact types it can produce. Authoritative for routing and for the
//! evaluator's "can anyone satisfy this attractor" pre-check. Holds
//! capability sets directly, never a class hierarchy or duck-typed mixin.

use codi_artifacts::ArtifactType;
use codi_signals::Signal;
use std::collections::{HashMap, HashSet};

/// One agent's declared capabilities.
#[derive(Debug, Clone, Default)]
pub struct AgentCapabilities {
    /// Signals this agent handles.
    pub subscribes_to: HashSet<Signal>,
    /// Artifact types this agent can produce.
    pub produces: HashSet<ArtifactType>,
}

/// Explicit, non-singleton registry of agent capabilities.
#[derive(Debug, Clone, Default)]
pub struct AgentRegistry {
    agents: HashMap<String, AgentCapabilities>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an agent's capabilities, overwriting any prior declaration.
    pub fn register(&mut self, agent: impl Into<String>, capabilities: AgentCapabilities) {
        self.agents.insert(agent.into(), capabilities);
    }

    /// Agent names subscribed to a signal.
    pub fn agents_for_signal(&self, signal: Signal) -> Vec<&str> {
        self.agents
            .iter()
            .filter(|(_, caps)| caps.subscribes_to.contains(&signal))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Agent names that can produce a given artifact type.
    pub fn agents_for_artifact_type(&self, artifact_type: ArtifactType) -> Vec<&str> {
        self.agents
            .iter()
            .filter(|(_, caps)| caps.produces.contains(&artifact_type))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Whether at least one registered agent can satisfy a signal — the
    /// evaluator's pre-check before emitting it.
    pub fn has_capable_subscriber(&self, signal: Signal) -> bool {
        !self.agents_for_signal(signal).is_empty()
    }

    /// The capabilities declared for an agent, if registered.
    pub fn capabilities_for(&self, agent: &str) -> Option<&AgentCapabilities> {
        self.agents.get(agent)
    }
}
