use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result from one agent execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent_id: String,
    pub success: bool,
    pub output: Value,
    #[serde(default)]
    pub actions_taken: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl AgentResult {
    pub fn success(agent_id: impl Into<String>, output: Value) -> Self {
        Self {
            agent_id: agent_id.into(),
            success: true,
            output,
            actions_taken: Vec::new(),
            errors: Vec::new(),
            execution_time_ms: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(agent_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            success: false,
            output: Value::Null,
            actions_taken: Vec::new(),
            errors: vec![error.into()],
            execution_time_ms: 0,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn with_actions(mut self, actions: Vec<String>) -> Self {
        self.actions_taken = actions;
        self
    }

    #[must_use]
    pub fn with_errors(mut self, errors: Vec<String>) -> Self {
        self.errors = errors;
        self
    }
}
