pub mod agent;
pub mod campaign;
pub mod config;
pub mod content;
pub mod context;
pub mod event;
pub mod health;
pub mod rule;
pub mod support;

pub use agent::AgentResult;
pub use campaign::CampaignMetrics;
pub use config::{
    AgentConfig, Config, EventBusConfig, LogFormat, LoggingConfig, MonitorThresholds,
    ProductConfig, RotationPolicy, SchedulerConfig, TriggerConfig,
};
pub use content::{brand_voice, ContentDraft, ContentStatus, ContentType, Platform};
pub use context::Context;
pub use event::{event_types, Event, EventId};
pub use health::{Alert, AlertSeverity, HealthStatus, ProductHealth};
pub use rule::{
    ActionOutcome, Condition, FnCondition, OutcomeStatus, Rule, RuleAction, RuleSummary,
};
pub use support::{EscalationReason, MessageType};
