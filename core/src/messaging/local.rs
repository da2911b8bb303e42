// In-process transport backed by tokio mailboxes
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use super::message::{EndpointId, Message};
use super::transport::Transport;
use crate::directory::EndpointDirectory;
use crate::{DeliveryError, Result};

pub const DEFAULT_MAILBOX_CAPACITY: usize = 1024;

/// Transport statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportStats {
    pub total_sent: u64,
    pub total_delivered: u64,
    pub delivery_failures: u64,
    pub bound_mailboxes: usize,
}

/// Mailbox owned by one bound address
struct Mailbox {
    tx: mpsc::Sender<Message>,
    rx: Mutex<mpsc::Receiver<Message>>,
}

impl Mailbox {
    fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }
}

/// In-process [`Transport`]: one bounded mailbox per bound address.
///
/// Endpoint names are resolved through the shared [`EndpointDirectory`]. A name
/// missing from the directory is an unknown endpoint; a known name whose address
/// has no open mailbox is unreachable.
pub struct LocalTransport {
    directory: Arc<EndpointDirectory>,
    // Address -> mailbox
    mailboxes: DashMap<String, Arc<Mailbox>>,
    capacity: usize,
    sent: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl LocalTransport {
    pub fn new(directory: Arc<EndpointDirectory>, capacity: usize) -> Self {
        Self {
            directory,
            mailboxes: DashMap::new(),
            capacity: capacity.max(1),
            sent: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Creates the transport and binds a mailbox for every directory entry.
    pub fn from_directory(directory: Arc<EndpointDirectory>, capacity: usize) -> Self {
        let transport = Self::new(Arc::clone(&directory), capacity);
        for info in directory.all() {
            transport.bind(info.address);
        }
        transport
    }

    pub fn directory(&self) -> &Arc<EndpointDirectory> {
        &self.directory
    }

    /// Opens a mailbox at `address`; binding an already bound address is a no-op.
    pub fn bind(&self, address: impl Into<String>) {
        let address = address.into();
        self.mailboxes
            .entry(address.clone())
            .or_insert_with(|| Arc::new(Mailbox::new(self.capacity)));
        info!("Bound mailbox at {}", address);
    }

    /// Closes the mailbox at `address`; queued messages are dropped.
    pub fn unbind(&self, address: &str) -> bool {
        let removed = self.mailboxes.remove(address).is_some();
        if removed {
            info!("Unbound mailbox at {}", address);
        }
        removed
    }

    pub fn stats(&self) -> TransportStats {
        TransportStats {
            total_sent: self.sent.load(Ordering::Relaxed),
            total_delivered: self.delivered.load(Ordering::Relaxed),
            delivery_failures: self.failed.load(Ordering::Relaxed),
            bound_mailboxes: self.mailboxes.len(),
        }
    }

    fn mailbox_for(&self, endpoint: &EndpointId) -> std::result::Result<Arc<Mailbox>, DeliveryError> {
        let address = self
            .directory
            .resolve(endpoint)
            .ok_or_else(|| DeliveryError::UnknownEndpoint(endpoint.clone()))?;
        self.mailboxes
            .get(&address)
            .map(|m| Arc::clone(m.value()))
            .ok_or_else(|| DeliveryError::Unreachable(endpoint.clone()))
    }

    fn fail(&self, err: DeliveryError) -> crate::TribunalError {
        self.failed.fetch_add(1, Ordering::Relaxed);
        err.into()
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, message: Message) -> Result<()> {
        message.validate()?;
        self.sent.fetch_add(1, Ordering::Relaxed);

        let recipient = message.recipient.clone();
        let mailbox = self.mailbox_for(&recipient).map_err(|e| self.fail(e))?;

        debug!(
            "Sending {} {} from {} to {} (correlation {})",
            message.performative, message.id, message.sender, recipient, message.correlation_id
        );
        match mailbox.tx.try_send(message) {
            Ok(()) => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(mpsc::error::TrySendError::Full(dropped)) => {
                warn!("Mailbox for {} is full, dropping {}", recipient, dropped.id);
                Err(self.fail(DeliveryError::Unreachable(recipient)))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(self.fail(DeliveryError::Unreachable(recipient)))
            }
        }
    }

    async fn receive(&self, endpoint: &EndpointId, timeout: Duration) -> Result<Option<Message>> {
        let mailbox = self.mailbox_for(endpoint)?;
        let received = tokio::time::timeout(timeout, async {
            let mut rx = mailbox.rx.lock().await;
            rx.recv().await
        })
        .await;
        Ok(received.ok().flatten())
    }
}
