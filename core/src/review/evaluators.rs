//! Built-in evaluators for the three review stages.
//!
//! The verdict logic is intentionally shallow: the coordination layer only
//! needs deterministic payloads to aggregate.

use async_trait::async_trait;

use super::content::ContentDescriptor;
use super::reviewer::Evaluator;
use super::result::{ReviewPayload, Verdict};
use crate::Result;

const SHORT_FORM_PLATFORMS: &[&str] = &["tiktok", "instagram", "youtube_shorts", "snapchat"];

/// Audience/engagement feedback
#[derive(Debug, Clone, Default)]
pub struct EngagementEvaluator;

#[async_trait]
impl Evaluator for EngagementEvaluator {
    fn role(&self) -> &str {
        "feedback"
    }

    async fn evaluate(&self, content: &ContentDescriptor) -> Result<ReviewPayload> {
        let platform = content.platform.to_lowercase();
        let short_form = SHORT_FORM_PLATFORMS.contains(&platform.as_str());
        let short_content = content.content_type.contains("short") || content.content_type.contains("snippet");

        let mut score: f32 = 0.5;
        if short_form == short_content {
            score += 0.25;
        }
        if !content.tags.is_empty() {
            score += 0.1;
        }
        if content.title.is_some() {
            score += 0.1;
        }

        let verdict = if score >= 0.6 {
            Verdict::Approve
        } else {
            Verdict::Revise
        };
        let format_fit = if short_form == short_content {
            "matches platform"
        } else {
            "mismatched with platform"
        };

        Ok(ReviewPayload::new(self.role(), verdict, score)
            .with_notes(format!(
                "{} format {} for {}",
                content.content_type, format_fit, content.target_audience
            ))
            .with_detail("platform", platform)
            .with_detail("audience", content.target_audience.clone()))
    }
}

/// Content summarization
#[derive(Debug, Clone, Default)]
pub struct SummaryEvaluator;

#[async_trait]
impl Evaluator for SummaryEvaluator {
    fn role(&self) -> &str {
        "summary"
    }

    async fn evaluate(&self, content: &ContentDescriptor) -> Result<ReviewPayload> {
        let subject = content.title.as_deref().unwrap_or(content.content_id.as_str());
        let mut summary = format!(
            "{} \"{}\" for {} on {}",
            content.content_type, subject, content.target_audience, content.platform
        );
        if !content.tags.is_empty() {
            summary.push_str(&format!(" [{}]", content.tags.join(", ")));
        }

        // Untitled content cannot be summarized beyond its metadata
        let (verdict, score) = match content.title {
            Some(_) => (Verdict::Approve, 0.9),
            None => (Verdict::Revise, 0.5),
        };
        Ok(ReviewPayload::new(self.role(), verdict, score)
            .with_notes(summary)
            .with_detail("word_count", subject.split_whitespace().count().to_string()))
    }
}

/// Policy moderation against a term blocklist
#[derive(Debug, Clone)]
pub struct ModerationEvaluator {
    blocked_terms: Vec<String>,
}

impl Default for ModerationEvaluator {
    fn default() -> Self {
        Self::new(["violence", "gore", "hate", "explicit"])
    }
}

impl ModerationEvaluator {
    pub fn new<I, S>(blocked_terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blocked_terms: blocked_terms
                .into_iter()
                .map(|t| t.into().to_lowercase())
                .collect(),
        }
    }

    fn flagged_terms(&self, content: &ContentDescriptor) -> Vec<String> {
        let mut haystack: Vec<String> = content.tags.iter().map(|t| t.to_lowercase()).collect();
        if let Some(title) = &content.title {
            haystack.push(title.to_lowercase());
        }
        self.blocked_terms
            .iter()
            .filter(|term| haystack.iter().any(|h| h.contains(term.as_str())))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Evaluator for ModerationEvaluator {
    fn role(&self) -> &str {
        "moderation"
    }

    async fn evaluate(&self, content: &ContentDescriptor) -> Result<ReviewPayload> {
        let flagged = self.flagged_terms(content);
        if flagged.is_empty() {
            return Ok(ReviewPayload::new(self.role(), Verdict::Approve, 0.95)
                .with_notes("no policy concerns"));
        }
        Ok(ReviewPayload::new(self.role(), Verdict::Reject, 0.1)
            .with_notes(format!("blocked terms: {}", flagged.join(", ")))
            .with_detail("flagged", flagged.join(",")))
    }
}
