// Tribunal Core Library
// Multi-agent content review coordination runtime

pub mod agent;
pub mod config;
pub mod coordinator;
pub mod correlation;
pub mod directory;
pub mod messaging;
pub mod review;
pub mod telemetry;

// Export core types
pub use agent::{
    Agent, AgentContext, AgentRuntime, AgentState, CyclicBehavior, MessageTemplate,
    OneShotBehavior,
};
pub use config::TribunalConfig;
pub use coordinator::{Coordinator, ReplyCollector, ReviewCycleBehavior};
pub use correlation::{
    CorrelationEngine, EngineStats, PendingHandle, ReplyDisposition, UnexpectedReply,
};
pub use directory::{EndpointDirectory, EndpointInfo};
pub use messaging::{
    CorrelationId, EndpointId, LocalTransport, Message, Payload, Performative, Transport,
};
pub use review::{
    AggregatedResult, ContentDescriptor, Evaluator, Outcome, ReviewPayload, ReviewStatus,
    ReviewerBehavior, Submission, Verdict,
};
pub use telemetry::{init_tracing, CycleReport};

// Error types
use thiserror::Error;

/// Failure to hand a message to the transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(EndpointId),

    #[error("Endpoint unreachable: {0}")]
    Unreachable(EndpointId),
}

#[derive(Error, Debug)]
pub enum TribunalError {
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Agent error: {0}")]
    AgentError(String),

    #[error("Correlation error: {0}")]
    CorrelationError(String),

    #[error("Evaluation error: {0}")]
    EvaluationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    ConfigParseError(#[from] toml::de::Error),
}
pub type Result<T> = std::result::Result<T, TribunalError>;
