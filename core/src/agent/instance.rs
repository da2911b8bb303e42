use std::sync::{Arc, RwLock as StdRwLock};

use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::behavior::{CyclicBehavior, OneShotBehavior};
use super::context::{AgentConfig, AgentContext, AgentState};
use super::template::MessageTemplate;
use crate::messaging::{EndpointId, Message, Transport};
use crate::{Result, TribunalError};

/// Inbox of one cyclic behavior, selected by its template
struct Route {
    behavior: String,
    template: MessageTemplate,
    tx: mpsc::Sender<Message>,
}

type RouteTable = Arc<StdRwLock<Vec<Route>>>;

/// Tasks of a started agent
struct Running {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<(String, JoinHandle<()>)>,
}

/// Agent instance: one endpoint, any number of behaviors.
///
/// `start` spawns a dispatcher that drains the endpoint's transport mailbox and
/// one task per behavior. `stop` raises the shutdown signal and waits for every
/// task; a behavior in the middle of `on_message` finishes it first.
/// Behaviors are consumed by the run they were started in.
pub struct Agent {
    ctx: AgentContext,
    one_shots: Vec<Box<dyn OneShotBehavior>>,
    cyclics: Vec<Box<dyn CyclicBehavior>>,
    routes: RouteTable,
    running: Option<Running>,
}

impl Agent {
    pub fn new(config: AgentConfig, transport: Arc<dyn Transport>) -> Self {
        let state = AgentState {
            endpoint: config.endpoint.to_string(),
            last_update_ms: chrono::Utc::now().timestamp_millis(),
            metadata: config.parameters.clone(),
            ..Default::default()
        };
        let ctx = AgentContext::new(Arc::new(config), transport, Arc::new(RwLock::new(state)));

        Self {
            ctx,
            one_shots: Vec::new(),
            cyclics: Vec::new(),
            routes: Arc::new(StdRwLock::new(Vec::new())),
            running: None,
        }
    }

    pub fn endpoint(&self) -> &EndpointId {
        self.ctx.endpoint()
    }

    pub fn context(&self) -> &AgentContext {
        &self.ctx
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Registers a one-shot behavior; on a running agent it starts immediately.
    pub fn add_one_shot(&mut self, behavior: impl OneShotBehavior + 'static) {
        let behavior: Box<dyn OneShotBehavior> = Box::new(behavior);
        match self.running.as_mut() {
            Some(running) => {
                // Finished one-shots leave the task list here
                running.tasks.retain(|(_, h)| !h.is_finished());
                let name = behavior.name().to_string();
                let handle = tokio::spawn(run_one_shot(behavior, self.ctx.clone()));
                running.tasks.push((name, handle));
            }
            None => self.one_shots.push(behavior),
        }
    }

    /// Registers a cyclic behavior; on a running agent it starts immediately.
    pub fn add_cyclic(&mut self, behavior: impl CyclicBehavior + 'static) {
        let behavior: Box<dyn CyclicBehavior> = Box::new(behavior);
        match self.running.as_mut() {
            Some(running) => {
                let shutdown_rx = running.shutdown_tx.subscribe();
                let task = spawn_cyclic(behavior, &self.ctx, &self.routes, shutdown_rx);
                running.tasks.push(task);
            }
            None => self.cyclics.push(behavior),
        }
    }

    /// Activates every registered behavior.
    pub fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(TribunalError::AgentError(format!(
                "Agent {} already running",
                self.endpoint()
            )));
        }
        info!("Agent {} starting", self.endpoint());

        let (shutdown_tx, _) = watch::channel(false);
        let mut tasks = Vec::with_capacity(1 + self.cyclics.len() + self.one_shots.len());

        // Cyclic inboxes exist before the dispatcher routes anything
        for behavior in self.cyclics.drain(..) {
            let task = spawn_cyclic(behavior, &self.ctx, &self.routes, shutdown_tx.subscribe());
            tasks.push(task);
        }

        let dispatcher = tokio::spawn(run_dispatcher(
            self.ctx.clone(),
            Arc::clone(&self.routes),
            shutdown_tx.subscribe(),
        ));
        tasks.push(("dispatcher".to_string(), dispatcher));

        for behavior in self.one_shots.drain(..) {
            let name = behavior.name().to_string();
            let handle = tokio::spawn(run_one_shot(behavior, self.ctx.clone()));
            tasks.push((name, handle));
        }

        self.running = Some(Running { shutdown_tx, tasks });
        Ok(())
    }

    /// Signals every behavior to stop and waits until all of them have.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };
        info!("Agent {} stopping", self.endpoint());

        let _ = running.shutdown_tx.send(true);
        for (name, handle) in running.tasks {
            if let Err(e) = handle.await {
                warn!("Agent {} task {} ended abnormally: {}", self.endpoint(), name, e);
            }
        }
        self.routes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();

        info!("Agent {} stopped", self.endpoint());
        Ok(())
    }

    /// Snapshot of the agent-owned state.
    pub async fn state(&self) -> AgentState {
        self.ctx.state().read().await.clone()
    }
}

fn spawn_cyclic(
    behavior: Box<dyn CyclicBehavior>,
    ctx: &AgentContext,
    routes: &RouteTable,
    shutdown: watch::Receiver<bool>,
) -> (String, JoinHandle<()>) {
    let name = behavior.name().to_string();
    let (tx, rx) = mpsc::channel(ctx.config().inbox_capacity.max(1));
    routes
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .push(Route {
            behavior: name.clone(),
            template: behavior.template(),
            tx,
        });
    let handle = tokio::spawn(run_cyclic(behavior, ctx.clone(), rx, shutdown));
    (name, handle)
}

async fn run_one_shot(mut behavior: Box<dyn OneShotBehavior>, ctx: AgentContext) {
    let name = behavior.name().to_string();
    debug!("Agent {} running one-shot {}", ctx.endpoint(), name);
    if let Err(e) = behavior.run(&ctx).await {
        warn!("Agent {} one-shot {} failed: {}", ctx.endpoint(), name, e);
    }
}

async fn run_cyclic(
    mut behavior: Box<dyn CyclicBehavior>,
    ctx: AgentContext,
    mut inbox: mpsc::Receiver<Message>,
    mut shutdown: watch::Receiver<bool>,
) {
    let name = behavior.name().to_string();
    let poll = behavior
        .poll_interval()
        .unwrap_or(ctx.config().poll_interval);

    if let Err(e) = behavior.on_start(&ctx).await {
        warn!("Agent {} behavior {} failed to start: {}", ctx.endpoint(), name, e);
    }

    loop {
        if *shutdown.borrow() {
            break;
        }
        let next = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            received = tokio::time::timeout(poll, inbox.recv()) => received,
        };
        match next {
            Ok(Some(message)) => handle_message(&mut behavior, message, &ctx, &name).await,
            // Dispatcher is gone
            Ok(None) => break,
            // Idle poll
            Err(_) => {
                if let Err(e) = behavior.on_idle(&ctx).await {
                    warn!("Agent {} behavior {} idle hook failed: {}", ctx.endpoint(), name, e);
                }
            }
        }
    }

    if let Err(e) = behavior.on_stop(&ctx).await {
        warn!("Agent {} behavior {} failed to stop cleanly: {}", ctx.endpoint(), name, e);
    }
    debug!("Agent {} behavior {} stopped", ctx.endpoint(), name);
}

async fn handle_message(
    behavior: &mut Box<dyn CyclicBehavior>,
    message: Message,
    ctx: &AgentContext,
    name: &str,
) {
    debug!(
        "Agent {} behavior {} processing {} {} from {}",
        ctx.endpoint(),
        name,
        message.performative,
        message.id,
        message.sender
    );
    match behavior.on_message(message, ctx).await {
        Ok(Some(reply)) => {
            if let Err(e) = ctx.send(reply).await {
                warn!("Agent {} failed to send reply: {}", ctx.endpoint(), e);
            }
        }
        Ok(None) => {}
        Err(e) => warn!("Agent {} behavior {} error handling message: {}", ctx.endpoint(), name, e),
    }

    let mut state = ctx.state().write().await;
    state.processed_messages += 1;
    state.last_update_ms = chrono::Utc::now().timestamp_millis();
}

async fn run_dispatcher(ctx: AgentContext, routes: RouteTable, mut shutdown: watch::Receiver<bool>) {
    let endpoint = ctx.endpoint().clone();
    let poll = ctx.config().poll_interval;

    loop {
        if *shutdown.borrow() {
            break;
        }
        let received = tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            received = ctx.transport().receive(&endpoint, poll) => received,
        };
        match received {
            Ok(Some(message)) => dispatch(&ctx, &routes, message).await,
            Ok(None) => {}
            Err(e) => {
                warn!("Agent {} receive failed: {}", endpoint, e);
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(poll) => {}
                }
            }
        }
    }
    debug!("Agent {} dispatcher stopped", endpoint);
}

async fn dispatch(ctx: &AgentContext, routes: &RouteTable, message: Message) {
    let target = {
        let routes = routes.read().unwrap_or_else(|e| e.into_inner());
        routes
            .iter()
            .find(|r| r.template.matches(&message))
            .map(|r| (r.behavior.clone(), r.tx.clone()))
    };

    let Some((behavior, tx)) = target else {
        warn!(
            "Agent {} discarding unmatched {} {} from {} (correlation {})",
            ctx.endpoint(),
            message.performative,
            message.id,
            message.sender,
            message.correlation_id
        );
        ctx.state().write().await.discarded_messages += 1;
        return;
    };

    if tx.send(message).await.is_err() {
        warn!("Agent {} behavior {} is no longer receiving", ctx.endpoint(), behavior);
        ctx.state().write().await.discarded_messages += 1;
    }
}
