use std::sync::Arc;

use tokio::signal;
use tracing::{error, info, warn};
use tribunal_core::agent::AgentConfig;
use tribunal_core::review::{EngagementEvaluator, ModerationEvaluator, SummaryEvaluator};
use tribunal_core::telemetry::{self, CycleReport};
use tribunal_core::{
    Agent, AgentRuntime, Coordinator, CorrelationEngine, EndpointId, Evaluator, LocalTransport,
    ReviewCycleBehavior, ReviewerBehavior, Transport, TribunalConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing("info,tribunal_core=info,review_panel=info");

    info!(
        target = "review_panel",
        "Starting review panel demo: producer → feedback / summary / moderation"
    );

    // Defaults + optional TOML + env overrides
    let cfg = TribunalConfig::load()?;
    cfg.validate()?;

    let directory = Arc::new(cfg.directory());
    let local = Arc::new(LocalTransport::from_directory(directory, cfg.mailbox_capacity));
    let transport: Arc<dyn Transport> = local.clone();
    let runtime = AgentRuntime::new();

    // Reviewers: one agent per configured reviewer, evaluator picked by role
    for reviewer in &cfg.reviewers {
        let role = cfg.role_of(reviewer).unwrap_or_default();
        let agent = match role {
            "feedback" => reviewer_agent(reviewer, EngagementEvaluator, &cfg, &transport),
            "summary" => reviewer_agent(reviewer, SummaryEvaluator, &cfg, &transport),
            "moderation" => reviewer_agent(reviewer, ModerationEvaluator::default(), &cfg, &transport),
            other => {
                warn!(target = "review_panel", reviewer = %reviewer, role = other, "No evaluator for role; reviewer stays silent");
                continue;
            }
        };
        runtime.spawn(agent)?;
    }

    // Producer: reply collector plus one review cycle per content item
    let engine = Arc::new(CorrelationEngine::new());
    let coordinator = Arc::new(Coordinator::new(cfg.producer.clone(), Arc::clone(&transport), Arc::clone(&engine)));
    let mut producer = Agent::new(
        AgentConfig::new(cfg.producer.clone(), "producer").with_poll_interval(cfg.poll_interval()),
        Arc::clone(&transport),
    );
    producer.add_cyclic(coordinator.reply_collector());

    let mut pending = Vec::with_capacity(cfg.content.len());
    for content in &cfg.content {
        let (cycle, rx) = ReviewCycleBehavior::new(
            Arc::clone(&coordinator),
            content.clone(),
            cfg.reviewers.clone(),
            cfg.cycle_timeout(),
        );
        producer.add_one_shot(cycle);
        pending.push((content.content_id.clone(), rx));
    }
    runtime.spawn(producer)?;

    let collect = async {
        for (content_id, rx) in pending {
            match rx.await {
                Ok(result) => {
                    CycleReport::from(&result).log();
                    match serde_json::to_string_pretty(&result) {
                        Ok(json) => println!("{}", json),
                        Err(e) => error!(target = "review_panel", error = %e, "Failed to render result"),
                    }
                }
                Err(_) => error!(target = "review_panel", content_id = %content_id, "Review cycle ended without a result"),
            }
        }
    };

    tokio::select! {
        _ = collect => info!(target = "review_panel", "All review cycles finished"),
        _ = signal::ctrl_c() => info!(target = "review_panel", "Ctrl-C received, shutting down"),
    }

    telemetry::log_counters(&engine.stats(), &local.stats());
    runtime.shutdown().await?;
    info!(target = "review_panel", "Review panel stopped");
    Ok(())
}

fn reviewer_agent<E: Evaluator + 'static>(
    endpoint: &EndpointId,
    evaluator: E,
    cfg: &TribunalConfig,
    transport: &Arc<dyn Transport>,
) -> Agent {
    let config = AgentConfig::new(endpoint.clone(), evaluator.role()).with_poll_interval(cfg.poll_interval());
    let mut agent = Agent::new(config, Arc::clone(transport));
    agent.add_cyclic(ReviewerBehavior::new(evaluator));
    agent
}
