use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::content::ContentDescriptor;
use super::result::ReviewPayload;
use crate::agent::{AgentContext, CyclicBehavior, MessageTemplate};
use crate::messaging::message::defaults;
use crate::messaging::{Message, Payload, Performative};
use crate::Result;

/// Domain-specific review step plugged into a reviewer agent
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Review stage name, e.g. "moderation"
    fn role(&self) -> &str;

    async fn evaluate(&self, content: &ContentDescriptor) -> Result<ReviewPayload>;
}

/// Reviewer loop: waits for `request` messages, evaluates once per request,
/// and answers `inform` with the payload or `failure` with the error.
pub struct ReviewerBehavior<E: Evaluator> {
    evaluator: E,
    processing_delay: Option<Duration>,
    evaluated: u64,
}

impl<E: Evaluator> ReviewerBehavior<E> {
    pub fn new(evaluator: E) -> Self {
        Self {
            evaluator,
            processing_delay: None,
            evaluated: 0,
        }
    }

    /// Simulated analysis time before each reply.
    pub fn with_processing_delay(mut self, delay: Duration) -> Self {
        self.processing_delay = Some(delay);
        self
    }

    pub fn evaluated(&self) -> u64 {
        self.evaluated
    }
}

#[async_trait]
impl<E: Evaluator> CyclicBehavior for ReviewerBehavior<E> {
    fn name(&self) -> &str {
        self.evaluator.role()
    }

    fn template(&self) -> MessageTemplate {
        MessageTemplate::any()
            .performative(Performative::Request)
            .ontology(defaults::ONTOLOGY)
    }

    async fn on_message(&mut self, message: Message, ctx: &AgentContext) -> Result<Option<Message>> {
        let Payload::Submission(content) = &message.payload else {
            warn!(
                "Reviewer {} got a request without a submission payload: {}",
                ctx.endpoint(),
                message.id
            );
            return Ok(None);
        };

        debug!(
            "Reviewer {} evaluating {} for {}",
            ctx.endpoint(),
            content.content_id,
            message.correlation_id
        );
        if let Some(delay) = self.processing_delay {
            tokio::time::sleep(delay).await;
        }

        self.evaluated += 1;
        let reply = match self.evaluator.evaluate(content).await {
            Ok(review) => message.inform_reply(review),
            Err(e) => {
                warn!("Reviewer {} failed to evaluate {}: {}", ctx.endpoint(), content.content_id, e);
                message.failure_reply(e.to_string())
            }
        };
        Ok(Some(reply))
    }
}
