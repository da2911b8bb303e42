// Logging setup and review cycle reporting
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::correlation::EngineStats;
use crate::messaging::TransportStats;
use crate::review::{AggregatedResult, Outcome};

pub const DEFAULT_FILTER: &str = "info,tribunal_core=info";

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over `default_filter`. Returns false when a subscriber was
/// already installed, so repeated calls (tests, embedding binaries) are harmless.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Per-cycle summary suitable for structured logs or JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    pub correlation_id: String,
    pub content_id: String,
    pub status: String,
    pub final_verdict: String,
    pub responded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub elapsed_ms: u64,
}

impl From<&AggregatedResult> for CycleReport {
    fn from(result: &AggregatedResult) -> Self {
        let failed = result
            .outcomes
            .values()
            .filter(|o| matches!(o, Outcome::Failed { .. }))
            .count();
        Self {
            correlation_id: result.correlation_id.to_string(),
            content_id: result.content.content_id.clone(),
            status: result.status.to_string(),
            final_verdict: result.final_verdict().to_string(),
            responded: result.responded(),
            failed,
            timed_out: result.timed_out().len(),
            elapsed_ms: result.elapsed_ms,
        }
    }
}

impl CycleReport {
    pub fn log(&self) {
        info!(
            target: "telemetry",
            correlation_id = %self.correlation_id,
            content_id = %self.content_id,
            status = %self.status,
            verdict = %self.final_verdict,
            responded = self.responded,
            failed = self.failed,
            timed_out = self.timed_out,
            elapsed_ms = self.elapsed_ms,
            "Review cycle report"
        );
    }
}

/// Log engine and transport counters, typically once at shutdown.
pub fn log_counters(engine: &EngineStats, transport: &TransportStats) {
    info!(
        target: "telemetry",
        registered = engine.registered,
        completed = engine.completed,
        partial = engine.partial,
        cancelled = engine.cancelled,
        accepted_replies = engine.accepted_replies,
        rejected_replies = engine.rejected_replies,
        sent = transport.total_sent,
        delivered = transport.total_delivered,
        delivery_failures = transport.delivery_failures,
        "Review panel counters"
    );
}
