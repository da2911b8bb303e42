//! Review domain: what gets submitted, what reviewers answer, and how the
//! answers are combined.
//!
//! - `content.rs`: ContentDescriptor and Submission
//! - `result.rs`: ReviewPayload, Outcome, AggregatedResult
//! - `reviewer.rs`: Evaluator plug-in and the ReviewerBehavior loop
//! - `evaluators.rs`: built-in engagement/summary/moderation evaluators

mod content;
pub mod evaluators;
mod result;
mod reviewer;

pub use content::{ContentDescriptor, Submission};
pub use evaluators::{EngagementEvaluator, ModerationEvaluator, SummaryEvaluator};
pub use result::{AggregatedResult, Outcome, ReviewPayload, ReviewStatus, Verdict};
pub use reviewer::{Evaluator, ReviewerBehavior};
