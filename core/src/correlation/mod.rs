//! Correlation & aggregation: matches replies to their submission, applies the
//! per-submission deadline, and produces one AggregatedResult per submission.

mod engine;
mod pending;

pub use engine::{CorrelationEngine, EngineStats, PendingHandle};

use thiserror::Error;

/// Why a reply was discarded instead of recorded
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnexpectedReply {
    #[error("no open review cycle with this correlation id")]
    UnknownCorrelation,

    #[error("sender is not an expected reviewer")]
    UnexpectedReviewer,

    #[error("reviewer already has a recorded outcome")]
    Duplicate,

    #[error("reply arrived at or after resolution")]
    Late,

    #[error("message is not an inform or failure reply")]
    NotAReply,
}

/// What the engine did with a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyDisposition {
    /// Recorded; other reviewers are still outstanding
    Accepted,
    /// Recorded and the submission resolved
    Completed,
    Rejected(UnexpectedReply),
}

impl ReplyDisposition {
    pub fn is_accepted(self) -> bool {
        matches!(self, ReplyDisposition::Accepted | ReplyDisposition::Completed)
    }
}
