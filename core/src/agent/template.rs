use crate::messaging::{CorrelationId, EndpointId, Message, Performative};

/// Predicate that routes inbound messages to a cyclic behavior.
///
/// Empty fields match anything. The agent dispatcher hands each message to the
/// first behavior whose template matches.
///
/// # Examples
///
/// ```
/// use tribunal_core::{ContentDescriptor, CorrelationId, Message, MessageTemplate, Performative};
///
/// let tpl = MessageTemplate::any().performatives([Performative::Inform, Performative::Failure]);
/// let content = ContentDescriptor::new("edu_snippet_01", "youtube", "snippet", "students");
/// let req = Message::request("producer", "summary", CorrelationId::new("c-7"), content);
///
/// assert!(!tpl.matches(&req));
/// assert!(tpl.matches(&req.failure_reply("busy")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageTemplate {
    performatives: Vec<Performative>,
    ontology: Option<String>,
    correlation_id: Option<CorrelationId>,
    sender: Option<EndpointId>,
}

impl MessageTemplate {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn performative(mut self, performative: Performative) -> Self {
        self.performatives.push(performative);
        self
    }

    pub fn performatives(mut self, performatives: impl IntoIterator<Item = Performative>) -> Self {
        self.performatives.extend(performatives);
        self
    }

    pub fn ontology(mut self, ontology: impl Into<String>) -> Self {
        self.ontology = Some(ontology.into());
        self
    }

    pub fn correlation(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn sender(mut self, sender: impl Into<EndpointId>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn matches(&self, message: &Message) -> bool {
        if !self.performatives.is_empty() && !self.performatives.contains(&message.performative) {
            return false;
        }
        if let Some(ontology) = &self.ontology {
            if &message.ontology != ontology {
                return false;
            }
        }
        if let Some(cid) = &self.correlation_id {
            if &message.correlation_id != cid {
                return false;
            }
        }
        if let Some(sender) = &self.sender {
            if &message.sender != sender {
                return false;
            }
        }
        true
    }
}
