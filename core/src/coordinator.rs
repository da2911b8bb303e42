use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::agent::{AgentContext, CyclicBehavior, MessageTemplate, OneShotBehavior};
use crate::correlation::{CorrelationEngine, ReplyDisposition};
use crate::messaging::{CorrelationId, EndpointId, Message, Performative, Transport};
use crate::review::{AggregatedResult, ContentDescriptor, Submission};
use crate::{Result, TribunalError};

/// Extra wait past the deadline before the coordinator forces expiry itself
const DEFAULT_GRACE: Duration = Duration::from_millis(50);

/// Producer side of a review cycle.
///
/// Dispatches one `request` per reviewer, then waits on the correlation engine.
/// Replies reach the engine through [`Coordinator::reply_collector`], which the
/// producer agent runs as a cyclic behavior.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tribunal_core::{
///     ContentDescriptor, Coordinator, CorrelationEngine, EndpointDirectory, EndpointInfo,
///     LocalTransport,
/// };
///
/// # async fn example() -> tribunal_core::Result<()> {
/// let directory = Arc::new(EndpointDirectory::from_bindings([
///     EndpointInfo::new("producer", "local://producer", "producer"),
///     EndpointInfo::new("moderation", "local://moderation", "moderation"),
/// ]));
/// let transport = Arc::new(LocalTransport::from_directory(directory, 1024));
/// let coordinator = Coordinator::new("producer", transport, Arc::new(CorrelationEngine::new()));
///
/// let content = ContentDescriptor::new("dance_video_01", "tiktok", "short_video", "teens");
/// let result = coordinator
///     .run_review_cycle(content, &["moderation".into()], Duration::from_secs(5))
///     .await?;
/// println!("{} -> {}", result.correlation_id, result.status);
/// # Ok(())
/// # }
/// ```
pub struct Coordinator {
    endpoint: EndpointId,
    transport: Arc<dyn Transport>,
    engine: Arc<CorrelationEngine>,
    grace: Duration,
}

impl Coordinator {
    pub fn new(
        endpoint: impl Into<EndpointId>,
        transport: Arc<dyn Transport>,
        engine: Arc<CorrelationEngine>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
            engine,
            grace: DEFAULT_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn endpoint(&self) -> &EndpointId {
        &self.endpoint
    }

    pub fn engine(&self) -> &Arc<CorrelationEngine> {
        &self.engine
    }

    /// Runs one review cycle and returns its aggregated result.
    ///
    /// Delivery failures and silent reviewers degrade the result to `partial`;
    /// they are never returned as errors. Errors are reserved for an invalid
    /// cycle (no reviewers, zero timeout).
    #[tracing::instrument(skip(self, content, reviewers), fields(producer = %self.endpoint, content_id = %content.content_id, reviewers = reviewers.len()))]
    pub async fn run_review_cycle(
        &self,
        content: ContentDescriptor,
        reviewers: &[EndpointId],
        timeout: Duration,
    ) -> Result<AggregatedResult> {
        let submission = Submission::new(content, reviewers.iter().cloned());
        let mut handle = self.engine.register(&submission, timeout)?;
        let correlation_id = submission.correlation_id().clone();
        info!(
            "Starting review cycle {} with {} reviewers",
            correlation_id,
            submission.reviewers().len()
        );

        for reviewer in submission.reviewers() {
            let request = Message::request(
                self.endpoint.clone(),
                reviewer.clone(),
                correlation_id.clone(),
                submission.content().clone(),
            );
            match self.transport.send(request).await {
                Ok(()) => debug!("Dispatched {} to {}", correlation_id, reviewer),
                Err(e) => {
                    warn!("Dispatch of {} to {} failed: {}", correlation_id, reviewer, e);
                    self.engine.mark_undeliverable(&correlation_id, reviewer);
                }
            }
        }

        let waited = tokio::time::timeout(timeout + self.grace, handle.wait()).await;
        match waited {
            Ok(result) => result,
            Err(_) => {
                warn!("Engine did not resolve {} in time, forcing expiry", correlation_id);
                self.engine.expire(&correlation_id);
                handle.wait().await
            }
        }
    }

    /// Cancels an open cycle. Returns whether it was still open.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> bool {
        self.engine.cancel(correlation_id).is_some()
    }

    /// Cyclic behavior feeding `inform`/`failure` replies into the engine.
    pub fn reply_collector(&self) -> ReplyCollector {
        ReplyCollector {
            engine: Arc::clone(&self.engine),
        }
    }
}

/// Producer behavior recording replies against their pending requests
pub struct ReplyCollector {
    engine: Arc<CorrelationEngine>,
}

#[async_trait]
impl CyclicBehavior for ReplyCollector {
    fn name(&self) -> &str {
        "reply-collector"
    }

    fn template(&self) -> MessageTemplate {
        MessageTemplate::any().performatives([Performative::Inform, Performative::Failure])
    }

    async fn on_message(&mut self, message: Message, _ctx: &AgentContext) -> Result<Option<Message>> {
        if let ReplyDisposition::Rejected(reason) = self.engine.record_reply(&message) {
            debug!("Reply {} not recorded: {}", message.id, reason);
        }
        Ok(None)
    }
}

/// One-shot producer step: runs a single review cycle and hands the result
/// to whoever holds the receiver.
pub struct ReviewCycleBehavior {
    coordinator: Arc<Coordinator>,
    content: ContentDescriptor,
    reviewers: Vec<EndpointId>,
    timeout: Duration,
    result_tx: Option<oneshot::Sender<AggregatedResult>>,
}

impl ReviewCycleBehavior {
    pub fn new(
        coordinator: Arc<Coordinator>,
        content: ContentDescriptor,
        reviewers: Vec<EndpointId>,
        timeout: Duration,
    ) -> (Self, oneshot::Receiver<AggregatedResult>) {
        let (tx, rx) = oneshot::channel();
        let behavior = Self {
            coordinator,
            content,
            reviewers,
            timeout,
            result_tx: Some(tx),
        };
        (behavior, rx)
    }
}

#[async_trait]
impl OneShotBehavior for ReviewCycleBehavior {
    fn name(&self) -> &str {
        "review-cycle"
    }

    async fn run(&mut self, _ctx: &AgentContext) -> Result<()> {
        let result = self
            .coordinator
            .run_review_cycle(self.content.clone(), &self.reviewers, self.timeout)
            .await?;
        let tx = self.result_tx.take().ok_or_else(|| {
            TribunalError::AgentError("review cycle behavior ran twice".into())
        })?;
        if tx.send(result).is_err() {
            debug!("Nobody is waiting for the review cycle result");
        }
        Ok(())
    }
}
