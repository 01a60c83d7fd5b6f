use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::event::event_types;

/// Main configuration structure for Vaspera
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Event bus dispatch loop settings
    #[serde(default)]
    pub event_bus: EventBusConfig,

    /// Scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Health thresholds used by the monitor rule set
    #[serde(default)]
    pub monitor: MonitorThresholds,

    /// Products keyed by product id
    #[serde(default)]
    pub products: BTreeMap<String, ProductConfig>,

    /// Agents keyed by agent id (`ads`, `monitor`, `support`)
    #[serde(default = "default_agents")]
    pub agents: BTreeMap<String, AgentConfig>,

    /// Evaluate rules but never run action handlers
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            event_bus: EventBusConfig::default(),
            scheduler: SchedulerConfig::default(),
            monitor: MonitorThresholds::default(),
            products: BTreeMap::new(),
            agents: default_agents(),
            dry_run: false,
        }
    }
}

fn default_agents() -> BTreeMap<String, AgentConfig> {
    let mut agents = BTreeMap::new();
    agents.insert(
        "ads".to_string(),
        AgentConfig::new(
            "Ads Optimizer",
            "Performance Marketing Manager",
            "Keep paid acquisition under target CPA",
        )
        .with_triggers([event_types::SCHEDULE_ADS_OPTIMIZATION, event_types::AD_THRESHOLD]),
    );
    agents.insert(
        "content".to_string(),
        AgentConfig::new(
            "Content Writer",
            "Content Marketing Manager",
            "Create and distribute engaging content for all products",
        )
        .with_triggers([event_types::SCHEDULE_WEEKLY_CONTENT, event_types::GITHUB_RELEASE]),
    );
    agents.insert(
        "monitor".to_string(),
        AgentConfig::new(
            "Health Monitor",
            "Site Reliability Engineer",
            "Detect degraded products before customers do",
        )
        .with_triggers([
            event_types::SCHEDULE_HEALTH_CHECK,
            event_types::ERROR_SPIKE,
            event_types::LATENCY_SPIKE,
            event_types::DOWNTIME,
        ]),
    );
    agents.insert(
        "support".to_string(),
        AgentConfig::new(
            "Support Chat",
            "Customer Support Specialist",
            "Answer customers and escalate what needs a human",
        )
        .with_triggers([event_types::CHAT_MESSAGE]),
    );
    agents
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Directory for log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub enable_stdout: bool,

    #[serde(default)]
    pub rotation: RotationPolicy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            enable_stdout: true,
            rotation: RotationPolicy::default(),
        }
    }
}

/// Event bus configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EventBusConfig {
    /// Bounded wait for the next queued event, so `stop()` is observed
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

const fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SchedulerConfig {
    /// Tick interval in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Maximum number of registered jobs
    #[serde(default = "default_max_jobs")]
    pub max_jobs: usize,

    /// Install the built-in schedules on startup
    #[serde(default = "default_true")]
    pub default_schedules: bool,
}

const fn default_tick_interval_ms() -> u64 {
    1000
}

const fn default_max_jobs() -> usize {
    100
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            max_jobs: default_max_jobs(),
            default_schedules: true,
        }
    }
}

/// Health thresholds. Error rate and uptime are percentages, latency in ms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonitorThresholds {
    #[serde(default = "default_error_rate")]
    pub error_rate: f64,
    #[serde(default = "default_error_rate_critical")]
    pub error_rate_critical: f64,
    #[serde(default = "default_response_time_p95")]
    pub response_time_p95: f64,
    #[serde(default = "default_response_time_critical")]
    pub response_time_critical: f64,
    #[serde(default = "default_uptime")]
    pub uptime: f64,
}

const fn default_error_rate() -> f64 {
    1.0
}

const fn default_error_rate_critical() -> f64 {
    5.0
}

const fn default_response_time_p95() -> f64 {
    2000.0
}

const fn default_response_time_critical() -> f64 {
    5000.0
}

const fn default_uptime() -> f64 {
    99.9
}

impl Default for MonitorThresholds {
    fn default() -> Self {
        Self {
            error_rate: default_error_rate(),
            error_rate_critical: default_error_rate_critical(),
            response_time_p95: default_response_time_p95(),
            response_time_critical: default_response_time_critical(),
            uptime: default_uptime(),
        }
    }
}

/// A product managed by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProductConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub domain: String,
    /// Product kind, e.g. `saas` or `mobile`
    #[serde(default, alias = "type")]
    pub kind: String,
    #[serde(default)]
    pub ad_platforms: Vec<String>,
    #[serde(default = "default_target_cpa")]
    pub target_cpa: f64,
    #[serde(default = "default_monthly_ad_budget")]
    pub monthly_ad_budget: f64,
}

const fn default_target_cpa() -> f64 {
    50.0
}

const fn default_monthly_ad_budget() -> f64 {
    1000.0
}

impl ProductConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            repo: String::new(),
            domain: String::new(),
            kind: String::new(),
            ad_platforms: Vec::new(),
            target_cpa: default_target_cpa(),
            monthly_ad_budget: default_monthly_ad_budget(),
        }
    }

    /// Daily ad budget used for pacing.
    pub fn daily_budget(&self) -> f64 {
        self.monthly_ad_budget / 30.0
    }
}

/// An agent and the event types that wake it up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgentConfig {
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub approval_required: bool,
    #[serde(default)]
    pub triggers: Vec<TriggerConfig>,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, role: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            goal: goal.into(),
            enabled: true,
            approval_required: false,
            triggers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_triggers<I, S>(mut self, event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.triggers = event_types
            .into_iter()
            .map(|t| TriggerConfig {
                event_type: t.into(),
            })
            .collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(rename = "type")]
    pub event_type: String,
}
