use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::messaging::{CorrelationId, EndpointId};

/// Describes the piece of content under review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDescriptor {
    pub content_id: String,
    pub platform: String,
    pub content_type: String,
    pub target_audience: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl ContentDescriptor {
    pub fn new(
        content_id: impl Into<String>,
        platform: impl Into<String>,
        content_type: impl Into<String>,
        target_audience: impl Into<String>,
    ) -> Self {
        Self {
            content_id: content_id.into(),
            platform: platform.into(),
            content_type: content_type.into(),
            target_audience: target_audience.into(),
            title: None,
            tags: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// One review cycle's request: immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    correlation_id: CorrelationId,
    content: ContentDescriptor,
    reviewers: BTreeSet<EndpointId>,
    created_at_ms: i64,
}

impl Submission {
    /// Creates a submission with a freshly generated correlation id.
    pub fn new(content: ContentDescriptor, reviewers: impl IntoIterator<Item = EndpointId>) -> Self {
        Self::with_id(CorrelationId::generate(), content, reviewers)
    }

    pub fn with_id(
        correlation_id: CorrelationId,
        content: ContentDescriptor,
        reviewers: impl IntoIterator<Item = EndpointId>,
    ) -> Self {
        Self {
            correlation_id,
            content,
            reviewers: reviewers.into_iter().collect(),
            created_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn content(&self) -> &ContentDescriptor {
        &self.content
    }

    pub fn reviewers(&self) -> &BTreeSet<EndpointId> {
        &self.reviewers
    }

    pub fn created_at_ms(&self) -> i64 {
        self.created_at_ms
    }
}
