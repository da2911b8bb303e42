//! Agent runtime module split into smaller files for readability.
//! - behavior.rs: OneShotBehavior and CyclicBehavior traits
//! - template.rs: MessageTemplate used to route inbound messages
//! - context.rs: AgentConfig, AgentState and the AgentContext handed to behaviors
//! - instance.rs: Agent struct and its dispatcher/behavior tasks
//! - runtime.rs: AgentRuntime manager

mod behavior;
mod context;
mod instance;
mod runtime;
mod template;

pub use behavior::{CyclicBehavior, OneShotBehavior};
pub use context::{AgentConfig, AgentContext, AgentState};
pub use instance::Agent;
pub use runtime::AgentRuntime;
pub use template::MessageTemplate;
