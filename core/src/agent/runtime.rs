use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use super::context::AgentState;
use super::instance::Agent;
use crate::messaging::EndpointId;
use crate::{Result, TribunalError};

/// Agent runtime manager
///
/// Owns started agents keyed by endpoint. Stopping goes through [`Agent::stop`],
/// so every behavior reaches a safe stopping point before the call returns.
#[derive(Default)]
pub struct AgentRuntime {
    agents: DashMap<EndpointId, Agent>,
}

impl AgentRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an Agent and take ownership of it
    #[tracing::instrument(skip(self, agent), fields(endpoint = %agent.endpoint()))]
    pub fn spawn(&self, mut agent: Agent) -> Result<EndpointId> {
        let endpoint = agent.endpoint().clone();
        if self.agents.contains_key(&endpoint) {
            return Err(TribunalError::AgentError(format!(
                "Agent {} already registered",
                endpoint
            )));
        }
        if !agent.is_running() {
            agent.start()?;
        }
        self.agents.insert(endpoint.clone(), agent);

        info!("Spawned agent {}", endpoint);
        Ok(endpoint)
    }

    /// Stop and remove an Agent
    #[tracing::instrument(skip(self, endpoint), fields(endpoint = %endpoint))]
    pub async fn stop_agent(&self, endpoint: &EndpointId) -> Result<()> {
        let (_, mut agent) = self
            .agents
            .remove(endpoint)
            .ok_or_else(|| TribunalError::AgentError(format!("Agent {} not found", endpoint)))?;
        agent.stop().await?;

        info!("Stopped agent {}", endpoint);
        Ok(())
    }

    pub fn is_running(&self, endpoint: &EndpointId) -> bool {
        self.agents
            .get(endpoint)
            .map(|a| a.is_running())
            .unwrap_or(false)
    }

    pub fn agents(&self) -> Vec<EndpointId> {
        let mut ids: Vec<EndpointId> = self.agents.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Snapshot of an agent's state
    pub async fn state(&self, endpoint: &EndpointId) -> Option<AgentState> {
        let state = self
            .agents
            .get(endpoint)
            .map(|a| Arc::clone(a.context().state()))?;
        let snapshot = state.read().await.clone();
        Some(snapshot)
    }

    pub async fn shutdown(&self) -> Result<()> {
        info!("Agent Runtime shutting down");
        for endpoint in self.agents() {
            if let Some((_, mut agent)) = self.agents.remove(&endpoint) {
                agent.stop().await?;
            }
        }
        Ok(())
    }
}
