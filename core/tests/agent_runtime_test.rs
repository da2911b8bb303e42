use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tribunal_core::agent::AgentConfig;
use tribunal_core::review::SummaryEvaluator;
use tribunal_core::{
    Agent, AgentContext, AgentRuntime, ContentDescriptor, CorrelationId, CyclicBehavior,
    EndpointDirectory, EndpointId, EndpointInfo, LocalTransport, Message, MessageTemplate,
    OneShotBehavior, Payload, Performative, Result, ReviewerBehavior, Transport, Verdict,
};

fn transport() -> Arc<LocalTransport> {
    let dir = EndpointDirectory::from_bindings([
        EndpointInfo::new("producer", "local://producer", "producer"),
        EndpointInfo::new("worker", "local://worker", "summary"),
    ]);
    Arc::new(LocalTransport::from_directory(Arc::new(dir), 64))
}

fn agent(endpoint: &str, transport: &Arc<LocalTransport>) -> Agent {
    let config = AgentConfig::new(endpoint, "test").with_poll_interval(Duration::from_millis(10));
    Agent::new(config, transport.clone() as Arc<dyn Transport>)
}

fn request(cid: &str) -> Message {
    Message::request(
        "producer",
        "worker",
        CorrelationId::new(cid),
        ContentDescriptor::new("vlog_highlight_01", "youtube", "vlog", "adults").with_title("Trip"),
    )
}

// Counts how often it runs
struct CountingOneShot {
    runs: Arc<AtomicUsize>,
}

#[async_trait]
impl OneShotBehavior for CountingOneShot {
    async fn run(&mut self, _ctx: &AgentContext) -> Result<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// Only takes requests; sleeps while handling to simulate in-flight work
struct SlowHandler {
    delay: Duration,
    handled: Arc<AtomicUsize>,
    idles: Arc<AtomicUsize>,
    stopped: Arc<AtomicBool>,
}

impl SlowHandler {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            handled: Arc::new(AtomicUsize::new(0)),
            idles: Arc::new(AtomicUsize::new(0)),
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl CyclicBehavior for SlowHandler {
    fn name(&self) -> &str {
        "slow-handler"
    }

    fn template(&self) -> MessageTemplate {
        MessageTemplate::any().performative(Performative::Request)
    }

    async fn on_message(&mut self, _message: Message, _ctx: &AgentContext) -> Result<Option<Message>> {
        tokio::time::sleep(self.delay).await;
        self.handled.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }

    async fn on_idle(&mut self, _ctx: &AgentContext) -> Result<()> {
        self.idles.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_stop(&mut self, _ctx: &AgentContext) -> Result<()> {
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn one_shot_runs_exactly_once() {
    let transport = transport();
    let runtime = AgentRuntime::new();
    let runs = Arc::new(AtomicUsize::new(0));

    let mut producer = agent("producer", &transport);
    producer.add_one_shot(CountingOneShot { runs: runs.clone() });
    let id = runtime.spawn(producer).unwrap();
    assert!(runtime.is_running(&id));

    tokio::time::sleep(Duration::from_millis(50)).await;
    runtime.stop_agent(&id).await.unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(!runtime.is_running(&id));
    assert!(runtime.is_empty());
}

#[tokio::test]
async fn reviewer_replies_to_request_with_same_correlation() {
    let transport = transport();
    let runtime = AgentRuntime::new();

    let mut worker = agent("worker", &transport);
    worker.add_cyclic(ReviewerBehavior::new(SummaryEvaluator));
    runtime.spawn(worker).unwrap();

    transport.send(request("c-42")).await.unwrap();

    let reply = transport
        .receive(&EndpointId::from("producer"), Duration::from_secs(1))
        .await
        .unwrap()
        .expect("reviewer should reply");
    assert_eq!(reply.performative, Performative::Inform);
    assert_eq!(reply.correlation_id.as_str(), "c-42");
    assert_eq!(reply.sender.as_str(), "worker");
    match reply.payload {
        Payload::Review(review) => {
            assert_eq!(review.role, "summary");
            assert_eq!(review.verdict, Verdict::Approve);
        }
        other => panic!("unexpected payload {:?}", other),
    }

    let state = runtime.state(&EndpointId::from("worker")).await.unwrap();
    assert_eq!(state.processed_messages, 1);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn unmatched_messages_are_discarded() {
    let transport = transport();
    let runtime = AgentRuntime::new();
    let handler = SlowHandler::new(Duration::ZERO);
    let handled = handler.handled.clone();

    let mut worker = agent("worker", &transport);
    worker.add_cyclic(handler);
    runtime.spawn(worker).unwrap();

    // A reply nobody asked for
    let stray = Message::new(
        "producer",
        "worker",
        CorrelationId::new("c-1"),
        Payload::Failure {
            reason: "oops".into(),
        },
    );
    transport.send(stray).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let state = runtime.state(&EndpointId::from("worker")).await.unwrap();
    assert_eq!(state.discarded_messages, 1);
    assert_eq!(state.processed_messages, 0);
    assert_eq!(handled.load(Ordering::SeqCst), 0);
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn idle_hook_fires_on_empty_polls() {
    let transport = transport();
    let handler = SlowHandler::new(Duration::ZERO);
    let idles = handler.idles.clone();

    let mut worker = agent("worker", &transport);
    worker.add_cyclic(handler);
    worker.start().unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    worker.stop().await.unwrap();
    assert!(idles.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn stop_waits_for_in_flight_message() {
    let transport = transport();
    let handler = SlowHandler::new(Duration::from_millis(150));
    let handled = handler.handled.clone();
    let stopped = handler.stopped.clone();

    let mut worker = agent("worker", &transport);
    worker.add_cyclic(handler);
    worker.start().unwrap();

    transport.send(request("c-1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    worker.stop().await.unwrap();
    assert_eq!(handled.load(Ordering::SeqCst), 1);
    assert!(stopped.load(Ordering::SeqCst));
    assert!(!worker.is_running());
}

#[tokio::test]
async fn behavior_added_to_running_agent_starts_immediately() {
    let transport = transport();
    let runs = Arc::new(AtomicUsize::new(0));

    let mut worker = agent("worker", &transport);
    worker.start().unwrap();
    worker.add_one_shot(CountingOneShot { runs: runs.clone() });

    tokio::time::sleep(Duration::from_millis(50)).await;
    worker.stop().await.unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn runtime_rejects_duplicates_and_unknown_agents() {
    let transport = transport();
    let runtime = AgentRuntime::new();

    runtime.spawn(agent("worker", &transport)).unwrap();
    assert!(runtime.spawn(agent("worker", &transport)).is_err());
    assert!(runtime
        .stop_agent(&EndpointId::from("ghost"))
        .await
        .is_err());

    let mut started = agent("producer", &transport);
    started.start().unwrap();
    assert!(started.start().is_err());
    started.stop().await.unwrap();

    assert_eq!(runtime.agents(), vec![EndpointId::from("worker")]);
    runtime.shutdown().await.unwrap();
    assert!(runtime.is_empty());
}
