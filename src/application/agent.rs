//! Agent contract and the wrapper that runs agents for the event bus.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use tracing::{error, info};

use crate::domain::models::rule::panic_message;
use crate::domain::models::{AgentResult, Event};
use crate::services::event_bus::EventHandler;

/// A domain agent woken up by events.
#[async_trait]
pub trait Agent: Send + Sync {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// Do the agent's work for one event.
    async fn execute(&self, event: &Event) -> anyhow::Result<AgentResult>;
}

/// Run an agent with timing, logging and error capture.
///
/// Never fails: errors and panics come back as an unsuccessful
/// [`AgentResult`].
pub async fn run_agent(agent: &dyn Agent, event: &Event) -> AgentResult {
    let started = Instant::now();
    info!(
        agent_id = agent.id(),
        event_id = %event.id(),
        event_type = %event.event_type,
        "agent starting"
    );

    let mut result = match AssertUnwindSafe(agent.execute(event)).catch_unwind().await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            error!(agent_id = agent.id(), error = %format!("{e:#}"), "agent failed");
            AgentResult::failure(agent.id(), format!("{e:#}"))
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            error!(agent_id = agent.id(), error = %msg, "agent panicked");
            AgentResult::failure(agent.id(), msg)
        }
    };

    result.execution_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
        agent_id = agent.id(),
        success = result.success,
        actions_taken = result.actions_taken.len(),
        execution_time_ms = result.execution_time_ms,
        "agent completed"
    );
    result
}

/// Bus handler that runs one agent per delivered event.
pub struct AgentEventHandler {
    agent: Arc<dyn Agent>,
}

impl AgentEventHandler {
    pub fn new(agent: Arc<dyn Agent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl EventHandler for AgentEventHandler {
    fn name(&self) -> &str {
        self.agent.id()
    }

    async fn handle(&self, event: &Event) -> Result<Value, String> {
        let result = run_agent(self.agent.as_ref(), event).await;
        if result.success {
            serde_json::to_value(&result).map_err(|e| e.to_string())
        } else {
            Err(result.errors.join("; "))
        }
    }
}
