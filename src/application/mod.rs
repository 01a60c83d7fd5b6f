//! Application layer: agents and the orchestrator that runs them.

pub mod ads_agent;
pub mod agent;
pub mod content_agent;
pub mod monitor_agent;
pub mod orchestrator;
pub mod support_agent;

pub use ads_agent::{AdsAgent, ExecutionPolicy};
pub use agent::{run_agent, Agent, AgentEventHandler};
pub use content_agent::{CalendarItem, ContentAction, ContentAgent};
pub use monitor_agent::MonitorAgent;
pub use orchestrator::{Orchestrator, OrchestratorState, Sources};
pub use support_agent::{ChatResponse, SupportAgent};
