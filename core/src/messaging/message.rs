use std::fmt;

use serde::{Deserialize, Serialize};

use crate::review::{ContentDescriptor, ReviewPayload};
use crate::{Result, TribunalError};

/// Well-known message metadata values.
pub mod defaults {
    /// Ontology stamped on every review message unless overridden
    pub const ONTOLOGY: &str = "content-review";
    /// Content language of the structured payload
    pub const LANGUAGE: &str = "application/json";
}

/// Opaque, unique name of an agent endpoint.
///
/// Stable for the agent's lifetime and used as the addressing key for both
/// sending and receiving.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(String);

impl EndpointId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EndpointId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EndpointId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Token linking a request to its replies.
///
/// # Examples
///
/// ```
/// use tribunal_core::CorrelationId;
///
/// let a = CorrelationId::generate();
/// let b = CorrelationId::generate();
/// assert_ne!(a, b);
/// assert!(a.as_str().starts_with("review_"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh id for a new review cycle.
    pub fn generate() -> Self {
        Self(format!("review_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Speech-act tag carried by every message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Performative {
    Request,
    Inform,
    Failure,
}

impl Performative {
    pub fn as_str(self) -> &'static str {
        match self {
            Performative::Request => "request",
            Performative::Inform => "inform",
            Performative::Failure => "failure",
        }
    }

    /// `inform` and `failure` answer a `request`.
    pub fn is_reply(self) -> bool {
        matches!(self, Performative::Inform | Performative::Failure)
    }
}

impl fmt::Display for Performative {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured message body, one variant per performative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "body", rename_all = "snake_case")]
pub enum Payload {
    /// Carried by `request`
    Submission(ContentDescriptor),
    /// Carried by `inform`
    Review(ReviewPayload),
    /// Carried by `failure`
    Failure { reason: String },
}

impl Payload {
    /// Performative this payload belongs to.
    pub fn performative(&self) -> Performative {
        match self {
            Payload::Submission(_) => Performative::Request,
            Payload::Review(_) => Performative::Inform,
            Payload::Failure { .. } => Performative::Failure,
        }
    }
}

/// A typed message exchanged between agents.
///
/// Replies are built from the triggering request with [`Message::inform_reply`]
/// or [`Message::failure_reply`], which keep the correlation id and swap the
/// endpoints.
///
/// # Examples
///
/// ```
/// use tribunal_core::{ContentDescriptor, CorrelationId, Message, Performative};
///
/// let content = ContentDescriptor::new("dance_video_01", "tiktok", "short_video", "teens");
/// let req = Message::request("producer", "moderation", CorrelationId::new("c-1"), content);
/// let reply = req.failure_reply("model offline");
///
/// assert_eq!(reply.performative, Performative::Failure);
/// assert_eq!(reply.correlation_id, req.correlation_id);
/// assert_eq!(reply.recipient.as_str(), "producer");
/// assert!(reply.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: EndpointId,
    pub recipient: EndpointId,
    pub performative: Performative,
    pub correlation_id: CorrelationId,
    pub ontology: String,
    pub language: String,
    pub timestamp_ms: i64,
    pub payload: Payload,
}

impl Message {
    /// Builds a message whose performative follows from the payload.
    pub fn new(
        sender: impl Into<EndpointId>,
        recipient: impl Into<EndpointId>,
        correlation_id: CorrelationId,
        payload: Payload,
    ) -> Self {
        Self {
            id: format!("msg_{}", uuid::Uuid::new_v4().simple()),
            sender: sender.into(),
            recipient: recipient.into(),
            performative: payload.performative(),
            correlation_id,
            ontology: defaults::ONTOLOGY.to_string(),
            language: defaults::LANGUAGE.to_string(),
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            payload,
        }
    }

    pub fn request(
        sender: impl Into<EndpointId>,
        recipient: impl Into<EndpointId>,
        correlation_id: CorrelationId,
        content: ContentDescriptor,
    ) -> Self {
        Self::new(
            sender,
            recipient,
            correlation_id,
            Payload::Submission(content),
        )
    }

    pub fn inform_reply(&self, review: ReviewPayload) -> Self {
        self.reply(Payload::Review(review))
    }

    pub fn failure_reply(&self, reason: impl Into<String>) -> Self {
        self.reply(Payload::Failure {
            reason: reason.into(),
        })
    }

    fn reply(&self, payload: Payload) -> Self {
        let mut reply = Self::new(
            self.recipient.clone(),
            self.sender.clone(),
            self.correlation_id.clone(),
            payload,
        );
        reply.ontology = self.ontology.clone();
        reply
    }

    pub fn with_ontology(mut self, ontology: impl Into<String>) -> Self {
        self.ontology = ontology.into();
        self
    }

    pub fn is_reply(&self) -> bool {
        self.performative.is_reply()
    }

    /// Checks the invariants enforced at the transport boundary.
    pub fn validate(&self) -> Result<()> {
        if self.correlation_id.is_empty() {
            return Err(TribunalError::InvalidMessage(format!(
                "message {} has an empty correlation id",
                self.id
            )));
        }
        if self.sender.as_str().is_empty() || self.recipient.as_str().is_empty() {
            return Err(TribunalError::InvalidMessage(format!(
                "message {} is missing a sender or recipient",
                self.id
            )));
        }
        if self.payload.performative() != self.performative {
            return Err(TribunalError::InvalidMessage(format!(
                "message {} is a {} but carries a {} payload",
                self.id,
                self.performative,
                self.payload.performative()
            )));
        }
        Ok(())
    }
}
