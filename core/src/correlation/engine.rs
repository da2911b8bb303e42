use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::pending::{PendingRequest, Resolution};
use super::{ReplyDisposition, UnexpectedReply};
use crate::messaging::{CorrelationId, EndpointId, Message};
use crate::review::{AggregatedResult, Outcome, ReviewStatus, Submission};
use crate::{Result, TribunalError};

/// Resolved ids remembered so stragglers are classified as late, not unknown
const RECENTLY_CLOSED_CAPACITY: usize = 1024;

/// Correlation engine statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub registered: u64,
    pub completed: u64,
    pub partial: u64,
    pub cancelled: u64,
    pub accepted_replies: u64,
    pub rejected_replies: u64,
    pub open: usize,
}

/// Live entry: the record, its waiter, and its deadline timer
struct Entry {
    pending: PendingRequest,
    waiter: Option<oneshot::Sender<AggregatedResult>>,
    timer: Option<JoinHandle<()>>,
}

#[derive(Default)]
struct Table {
    live: HashMap<CorrelationId, Entry>,
    recently_closed: VecDeque<CorrelationId>,
    closed_index: HashSet<CorrelationId>,
    stats: EngineStats,
}

impl Table {
    fn remember_closed(&mut self, correlation_id: CorrelationId) {
        if self.recently_closed.len() >= RECENTLY_CLOSED_CAPACITY {
            if let Some(oldest) = self.recently_closed.pop_front() {
                self.closed_index.remove(&oldest);
            }
        }
        self.closed_index.insert(correlation_id.clone());
        self.recently_closed.push_back(correlation_id);
    }

    /// Removes a live entry, builds its result, and notifies the waiter.
    fn resolve(&mut self, correlation_id: &CorrelationId, resolution: Resolution) -> Option<AggregatedResult> {
        let mut entry = self.live.remove(correlation_id)?;
        if let Some(timer) = entry.timer.take() {
            timer.abort();
        }

        let result = entry.pending.into_result(resolution);
        match result.status {
            ReviewStatus::Complete => self.stats.completed += 1,
            ReviewStatus::Partial => self.stats.partial += 1,
            ReviewStatus::Cancelled => self.stats.cancelled += 1,
        }
        self.stats.open = self.live.len();
        self.remember_closed(correlation_id.clone());

        info!(
            correlation_id = %correlation_id,
            status = %result.status,
            responded = result.responded(),
            expected = result.outcomes.len(),
            elapsed_ms = result.elapsed_ms,
            "Review cycle resolved"
        );

        if let Some(waiter) = entry.waiter.take() {
            if waiter.send(result.clone()).is_err() {
                debug!("Waiter for {} already gone", correlation_id);
            }
        }
        Some(result)
    }
}

/// Handle returned by [`CorrelationEngine::register`]; yields the result once.
pub struct PendingHandle {
    correlation_id: CorrelationId,
    deadline: Instant,
    rx: oneshot::Receiver<AggregatedResult>,
}

impl PendingHandle {
    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Waits for the submission to resolve (complete, expired, or cancelled).
    pub async fn wait(&mut self) -> Result<AggregatedResult> {
        (&mut self.rx).await.map_err(|_| {
            TribunalError::CorrelationError(format!(
                "correlation engine dropped pending request {}",
                self.correlation_id
            ))
        })
    }
}

/// Tracks outstanding review requests and aggregates their replies.
///
/// Every mutation (reply arrival, delivery failure, deadline expiry,
/// cancellation) goes through one mutex-guarded table, so the deadline check
/// and the reply check for a submission never interleave. A reply observed
/// strictly before the deadline is recorded; one observed at or after it is
/// late and resolves the submission as timed out.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tribunal_core::{
///     ContentDescriptor, CorrelationEngine, Message, ReplyDisposition, ReviewPayload,
///     ReviewStatus, Submission, Verdict,
/// };
///
/// # async fn example() -> tribunal_core::Result<()> {
/// let engine = Arc::new(CorrelationEngine::new());
/// let content = ContentDescriptor::new("dance_video_01", "tiktok", "short_video", "teens");
/// let submission = Submission::new(content.clone(), ["moderation".into()]);
/// let mut handle = engine.register(&submission, Duration::from_secs(5))?;
///
/// let request = Message::request("producer", "moderation", submission.correlation_id().clone(), content);
/// let reply = request.inform_reply(ReviewPayload::new("moderation", Verdict::Approve, 0.95));
/// assert_eq!(engine.record_reply(&reply), ReplyDisposition::Completed);
///
/// let result = handle.wait().await?;
/// assert_eq!(result.status, ReviewStatus::Complete);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct CorrelationEngine {
    table: Mutex<Table>,
}

impl CorrelationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Opens a pending request for `submission` with deadline `now + timeout`.
    ///
    /// Spawns the deadline timer, so this must be called inside a tokio runtime.
    pub fn register(self: &Arc<Self>, submission: &Submission, timeout: Duration) -> Result<PendingHandle> {
        let correlation_id = submission.correlation_id().clone();
        if correlation_id.is_empty() {
            return Err(TribunalError::CorrelationError(
                "submission has an empty correlation id".into(),
            ));
        }
        if submission.reviewers().is_empty() {
            return Err(TribunalError::CorrelationError(format!(
                "submission {} has no reviewers",
                correlation_id
            )));
        }
        if timeout.is_zero() {
            return Err(TribunalError::CorrelationError(
                "timeout must be greater than 0".into(),
            ));
        }

        let pending = PendingRequest::open(submission, timeout);
        let deadline = pending.deadline;
        let (tx, rx) = oneshot::channel();

        let mut table = self.table();
        if table.live.contains_key(&correlation_id) || table.closed_index.contains(&correlation_id) {
            return Err(TribunalError::CorrelationError(format!(
                "correlation id {} already in use",
                correlation_id
            )));
        }

        let timer = tokio::spawn(expire_at(Arc::downgrade(self), correlation_id.clone(), deadline));
        table.live.insert(
            correlation_id.clone(),
            Entry {
                pending,
                waiter: Some(tx),
                timer: Some(timer),
            },
        );
        table.stats.registered += 1;
        table.stats.open = table.live.len();

        debug!(
            "Registered {} expecting {} reviewers, timeout {:?}",
            correlation_id,
            submission.reviewers().len(),
            timeout
        );
        Ok(PendingHandle {
            correlation_id,
            deadline,
            rx,
        })
    }

    /// Records an `inform`/`failure` reply against its pending request.
    ///
    /// Rejections are logged and reported back, never raised.
    pub fn record_reply(&self, message: &Message) -> ReplyDisposition {
        let now = Instant::now();
        let correlation_id = &message.correlation_id;
        let reviewer = &message.sender;

        let outcome = match Outcome::from_reply(&message.payload) {
            Some(outcome) if message.is_reply() => outcome,
            _ => return self.reject(message, UnexpectedReply::NotAReply),
        };

        let mut table = self.table();
        let Some(entry) = table.live.get_mut(correlation_id) else {
            let reason = if table.closed_index.contains(correlation_id) {
                UnexpectedReply::Late
            } else {
                UnexpectedReply::UnknownCorrelation
            };
            drop(table);
            return self.reject(message, reason);
        };

        if entry.pending.is_past_deadline(now) {
            // The timer has not fired yet; the deadline wins
            table.resolve(correlation_id, Resolution::Expired);
            drop(table);
            return self.reject(message, UnexpectedReply::Late);
        }

        if let Err(reason) = entry.pending.accept(reviewer, outcome) {
            drop(table);
            return self.reject(message, reason);
        }
        let settled = entry.pending.is_settled();
        table.stats.accepted_replies += 1;

        debug!(
            "Accepted {} from {} for {}",
            message.performative, reviewer, correlation_id
        );
        if settled {
            table.resolve(correlation_id, Resolution::Settled);
            ReplyDisposition::Completed
        } else {
            ReplyDisposition::Accepted
        }
    }

    /// Records `reviewer` as timed out right away because its request could
    /// not be delivered. Returns whether anything was recorded.
    pub fn mark_undeliverable(&self, correlation_id: &CorrelationId, reviewer: &EndpointId) -> bool {
        let mut table = self.table();
        let Some(entry) = table.live.get_mut(correlation_id) else {
            return false;
        };
        if let Err(reason) = entry.pending.accept(reviewer, Outcome::TimedOut) {
            debug!(
                "Ignoring delivery failure for {} on {}: {}",
                reviewer, correlation_id, reason
            );
            return false;
        }
        warn!("Reviewer {} unreachable for {}, recorded as timed out", reviewer, correlation_id);
        if entry.pending.is_settled() {
            table.resolve(correlation_id, Resolution::Settled);
        }
        true
    }

    /// Deadline processing: resolves the submission as timed out.
    ///
    /// Returns `None` when it already left live tracking.
    pub fn expire(&self, correlation_id: &CorrelationId) -> Option<AggregatedResult> {
        self.table().resolve(correlation_id, Resolution::Expired)
    }

    /// Discards a pending request; the waiter receives a cancelled result and
    /// later replies are dropped.
    pub fn cancel(&self, correlation_id: &CorrelationId) -> Option<AggregatedResult> {
        let result = self.table().resolve(correlation_id, Resolution::Cancelled);
        if result.is_some() {
            info!("Cancelled review cycle {}", correlation_id);
        }
        result
    }

    pub fn is_open(&self, correlation_id: &CorrelationId) -> bool {
        self.table().live.contains_key(correlation_id)
    }

    pub fn open_count(&self) -> usize {
        self.table().live.len()
    }

    pub fn stats(&self) -> EngineStats {
        self.table().stats.clone()
    }

    fn reject(&self, message: &Message, reason: UnexpectedReply) -> ReplyDisposition {
        self.table().stats.rejected_replies += 1;
        match reason {
            // Stragglers after resolution or cancellation are expected noise
            UnexpectedReply::Late => debug!(
                correlation_id = %message.correlation_id,
                sender = %message.sender,
                "Discarding late reply"
            ),
            _ => warn!(
                correlation_id = %message.correlation_id,
                sender = %message.sender,
                performative = %message.performative,
                reason = %reason,
                "Discarding unexpected reply"
            ),
        }
        ReplyDisposition::Rejected(reason)
    }
}

async fn expire_at(engine: Weak<CorrelationEngine>, correlation_id: CorrelationId, deadline: Instant) {
    tokio::time::sleep_until(deadline).await;
    if let Some(engine) = engine.upgrade() {
        if engine.expire(&correlation_id).is_some() {
            debug!("Deadline reached for {}", correlation_id);
        }
    }
}
