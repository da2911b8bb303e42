use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::messaging::{EndpointId, Message, Transport};
use crate::Result;

/// Immutable per-agent configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub endpoint: EndpointId,
    pub role: String,
    /// Default receive timeout for cyclic behaviors and the dispatcher
    pub poll_interval: Duration,
    /// Capacity of each behavior's inbox
    pub inbox_capacity: usize,
    pub parameters: HashMap<String, String>,
}

impl AgentConfig {
    pub fn new(endpoint: impl Into<EndpointId>, role: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            role: role.into(),
            poll_interval: Duration::from_millis(250),
            inbox_capacity: 256,
            parameters: HashMap::new(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }
}

/// Agent-owned mutable state shared by its behaviors
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentState {
    pub endpoint: String,
    pub processed_messages: u64,
    pub discarded_messages: u64,
    pub last_update_ms: i64,
    pub metadata: HashMap<String, String>,
}

/// Handle given to behaviors: identity, transport, and shared state.
#[derive(Clone)]
pub struct AgentContext {
    config: Arc<AgentConfig>,
    transport: Arc<dyn Transport>,
    state: Arc<RwLock<AgentState>>,
}

impl AgentContext {
    pub(crate) fn new(
        config: Arc<AgentConfig>,
        transport: Arc<dyn Transport>,
        state: Arc<RwLock<AgentState>>,
    ) -> Self {
        Self {
            config,
            transport,
            state,
        }
    }

    pub fn endpoint(&self) -> &EndpointId {
        &self.config.endpoint
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn state(&self) -> &Arc<RwLock<AgentState>> {
        &self.state
    }

    pub async fn send(&self, message: Message) -> Result<()> {
        self.transport.send(message).await
    }
}
