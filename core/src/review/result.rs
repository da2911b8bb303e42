use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::content::ContentDescriptor;
use crate::messaging::{CorrelationId, EndpointId, Payload};

/// Reviewer's recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Approve,
    Revise,
    Reject,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Approve => "approve",
            Verdict::Revise => "revise",
            Verdict::Reject => "reject",
        };
        f.write_str(s)
    }
}

/// Body of an `inform` reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPayload {
    /// Review stage that produced this payload (e.g. "moderation")
    pub role: String,
    pub verdict: Verdict,
    /// Confidence or quality score in 0.0..=1.0
    pub score: f32,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl ReviewPayload {
    pub fn new(role: impl Into<String>, verdict: Verdict, score: f32) -> Self {
        Self {
            role: role.into(),
            verdict,
            score: score.clamp(0.0, 1.0),
            notes: String::new(),
            details: BTreeMap::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Per-reviewer result of a cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Outcome {
    /// `inform` reply
    Reviewed(ReviewPayload),
    /// `failure` reply
    Failed { reason: String },
    /// No reply before the deadline, or the request could not be delivered
    TimedOut,
    /// Cycle was cancelled before this reviewer answered
    NotReached,
}

impl Outcome {
    /// Converts a reply payload; `None` for a request payload.
    pub fn from_reply(payload: &Payload) -> Option<Self> {
        match payload {
            Payload::Review(review) => Some(Outcome::Reviewed(review.clone())),
            Payload::Failure { reason } => Some(Outcome::Failed {
                reason: reason.clone(),
            }),
            Payload::Submission(_) => None,
        }
    }

    /// Whether the reviewer actually answered.
    pub fn is_reply(&self) -> bool {
        matches!(self, Outcome::Reviewed(_) | Outcome::Failed { .. })
    }

    pub fn review(&self) -> Option<&ReviewPayload> {
        match self {
            Outcome::Reviewed(review) => Some(review),
            _ => None,
        }
    }
}

/// Overall status of a resolved cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    /// Every expected reviewer replied
    Complete,
    /// Deadline passed or a reviewer was unreachable
    Partial,
    /// Cancelled externally before resolution
    Cancelled,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReviewStatus::Complete => "complete",
            ReviewStatus::Partial => "partial",
            ReviewStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Combined per-reviewer outcome produced once per submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub correlation_id: CorrelationId,
    pub content: ContentDescriptor,
    pub outcomes: BTreeMap<EndpointId, Outcome>,
    pub status: ReviewStatus,
    pub resolved_at_ms: i64,
    pub elapsed_ms: u64,
}

impl AggregatedResult {
    pub fn outcome(&self, reviewer: &EndpointId) -> Option<&Outcome> {
        self.outcomes.get(reviewer)
    }

    /// Number of reviewers that answered with `inform` or `failure`.
    pub fn responded(&self) -> usize {
        self.outcomes.values().filter(|o| o.is_reply()).count()
    }

    pub fn timed_out(&self) -> Vec<&EndpointId> {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, Outcome::TimedOut))
            .map(|(r, _)| r)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.status == ReviewStatus::Complete
    }

    /// Final decision over the collected reviews.
    ///
    /// Any `reject` wins; otherwise anything short of a complete set of
    /// approvals asks for revision.
    pub fn final_verdict(&self) -> Verdict {
        let reviews: Vec<&ReviewPayload> = self.outcomes.values().filter_map(Outcome::review).collect();
        if reviews.iter().any(|r| r.verdict == Verdict::Reject) {
            return Verdict::Reject;
        }
        let all_approved = !reviews.is_empty()
            && reviews.len() == self.outcomes.len()
            && reviews.iter().all(|r| r.verdict == Verdict::Approve);
        if self.is_complete() && all_approved {
            Verdict::Approve
        } else {
            Verdict::Revise
        }
    }
}
