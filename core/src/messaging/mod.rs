//! Messaging layer: typed messages, the transport seam, and the in-process transport.
//!
//! - `Message`: sender/recipient/performative/correlation id plus a tagged payload
//! - `Transport`: send to a named endpoint, receive with a bounded wait
//! - `LocalTransport`: mailbox-per-address implementation resolved through the directory

pub mod local;
pub mod message;
pub mod transport;

// Re-export key types for ergonomic access
pub use local::{LocalTransport, TransportStats, DEFAULT_MAILBOX_CAPACITY};
pub use message::{CorrelationId, EndpointId, Message, Payload, Performative};
pub use transport::Transport;
