use std::time::Duration;

use async_trait::async_trait;

use super::context::AgentContext;
use super::template::MessageTemplate;
use crate::messaging::Message;
use crate::Result;

/// Behavior that runs to completion exactly once after the agent starts.
#[async_trait]
pub trait OneShotBehavior: Send + Sync {
    fn name(&self) -> &str {
        "one-shot"
    }

    async fn run(&mut self, ctx: &AgentContext) -> Result<()>;
}

/// Receive-process-reply loop.
///
/// The agent feeds the behavior every inbound message matching `template()`.
/// Each wait is bounded by `poll_interval()`; an empty wait calls `on_idle`
/// and loops again. A message returned from `on_message` is sent as the reply.
#[async_trait]
pub trait CyclicBehavior: Send + Sync {
    fn name(&self) -> &str {
        "cyclic"
    }

    fn template(&self) -> MessageTemplate {
        MessageTemplate::any()
    }

    /// Overrides the agent's default receive timeout.
    fn poll_interval(&self) -> Option<Duration> {
        None
    }

    async fn on_start(&mut self, _ctx: &AgentContext) -> Result<()> {
        Ok(())
    }

    async fn on_message(&mut self, message: Message, ctx: &AgentContext) -> Result<Option<Message>>;

    async fn on_idle(&mut self, _ctx: &AgentContext) -> Result<()> {
        Ok(())
    }

    async fn on_stop(&mut self, _ctx: &AgentContext) -> Result<()> {
        Ok(())
    }
}
