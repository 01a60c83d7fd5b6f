//! Product health snapshots and the alerts derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::MonitorThresholds;
use super::context::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Critical,
    Unknown,
}

impl HealthStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Critical => "critical",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductHealth {
    pub product_id: String,
    pub status: HealthStatus,
    /// Percentage, 0-100.
    pub error_rate: f64,
    /// Milliseconds.
    pub response_time_p95: f64,
    /// Percentage, 0-100.
    pub uptime: f64,
    pub active_users: u64,
    pub last_deploy: Option<DateTime<Utc>>,
    pub open_incidents: u32,
    pub checked_at: DateTime<Utc>,
}

impl ProductHealth {
    /// Healthy means every metric is inside its warning threshold and
    /// there are no open incidents.
    pub fn is_healthy(&self, thresholds: &MonitorThresholds) -> bool {
        self.error_rate < thresholds.error_rate
            && self.response_time_p95 < thresholds.response_time_p95
            && self.uptime >= thresholds.uptime
            && self.open_incidents == 0
    }

    pub fn to_context(&self) -> Context {
        Context::new()
            .with("product_id", self.product_id.as_str())
            .with("error_rate", self.error_rate)
            .with("response_time_p95", self.response_time_p95)
            .with("uptime", self.uptime)
            .with("active_users", self.active_users)
            .with("open_incidents", self.open_incidents)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Critical,
    Warning,
    Info,
}

/// An alert raised by the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub product_id: String,
    pub severity: AlertSeverity,
    pub title: String,
    pub message: String,
    pub metric: String,
    pub current_value: f64,
    pub threshold: f64,
    pub created_at: DateTime<Utc>,
}
