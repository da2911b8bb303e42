use std::time::Duration;

use async_trait::async_trait;

use super::message::{EndpointId, Message};
use crate::Result;

/// Capability to move typed messages between named endpoints.
///
/// `send` only guarantees hand-off to the substrate, not processing by the
/// recipient. Unknown or unreachable recipients surface as
/// [`crate::TribunalError::Delivery`]. `receive` returns `Ok(None)` when nothing
/// addressed to `endpoint` arrives within `timeout` and never blocks past it.
///
/// Messages from one sender to one recipient keep their send order; nothing is
/// promised across distinct senders.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, message: Message) -> Result<()>;

    async fn receive(&self, endpoint: &EndpointId, timeout: Duration) -> Result<Option<Message>>;
}
