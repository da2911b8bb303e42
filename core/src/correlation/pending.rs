use std::collections::{BTreeMap, BTreeSet};

use tokio::time::{Duration, Instant};

use super::UnexpectedReply;
use crate::messaging::{CorrelationId, EndpointId};
use crate::review::{AggregatedResult, ContentDescriptor, Outcome, ReviewStatus, Submission};

/// How a pending request left live tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// Every expected reviewer has an outcome
    Settled,
    /// Deadline passed while collecting
    Expired,
    /// Discarded externally
    Cancelled,
}

/// Tracking record for one in-flight submission
#[derive(Debug)]
pub(crate) struct PendingRequest {
    pub(crate) correlation_id: CorrelationId,
    pub(crate) content: ContentDescriptor,
    pub(crate) expected: BTreeSet<EndpointId>,
    pub(crate) received: BTreeMap<EndpointId, Outcome>,
    pub(crate) opened_at: Instant,
    pub(crate) deadline: Instant,
}

impl PendingRequest {
    pub(crate) fn open(submission: &Submission, timeout: Duration) -> Self {
        let opened_at = Instant::now();
        Self {
            correlation_id: submission.correlation_id().clone(),
            content: submission.content().clone(),
            expected: submission.reviewers().clone(),
            received: BTreeMap::new(),
            opened_at,
            deadline: opened_at + timeout,
        }
    }

    /// Records the first outcome per expected reviewer.
    pub(crate) fn accept(
        &mut self,
        reviewer: &EndpointId,
        outcome: Outcome,
    ) -> Result<(), UnexpectedReply> {
        if !self.expected.contains(reviewer) {
            return Err(UnexpectedReply::UnexpectedReviewer);
        }
        if self.received.contains_key(reviewer) {
            return Err(UnexpectedReply::Duplicate);
        }
        self.received.insert(reviewer.clone(), outcome);
        Ok(())
    }

    pub(crate) fn is_settled(&self) -> bool {
        self.expected.iter().all(|r| self.received.contains_key(r))
    }

    pub(crate) fn is_past_deadline(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    pub(crate) fn into_result(self, resolution: Resolution) -> AggregatedResult {
        let missing = match resolution {
            Resolution::Cancelled => Outcome::NotReached,
            Resolution::Settled | Resolution::Expired => Outcome::TimedOut,
        };

        let mut outcomes = self.received;
        for reviewer in &self.expected {
            outcomes
                .entry(reviewer.clone())
                .or_insert_with(|| missing.clone());
        }

        let status = match resolution {
            Resolution::Cancelled => ReviewStatus::Cancelled,
            _ if outcomes.values().all(Outcome::is_reply) => ReviewStatus::Complete,
            _ => ReviewStatus::Partial,
        };

        AggregatedResult {
            correlation_id: self.correlation_id,
            content: self.content,
            outcomes,
            status,
            resolved_at_ms: chrono::Utc::now().timestamp_millis(),
            elapsed_ms: self.opened_at.elapsed().as_millis() as u64,
        }
    }
}
