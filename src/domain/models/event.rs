//! Event envelope routed by the event bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Unique identifier for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single event in the system.
///
/// `id` and `timestamp` are assigned at construction and cannot be
/// changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Dot-namespaced routing key, e.g. `schedule.daily_revenue`.
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: Map<String, Value>,
    /// Free-text origin, e.g. `scheduler:daily_revenue_report`.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    id: EventId,
    timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(
        event_type: impl Into<String>,
        payload: Map<String, Value>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            source: source.into(),
            product_id: None,
            id: EventId::new(),
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn for_product(mut self, product_id: impl Into<String>) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub const fn id(&self) -> EventId {
        self.id
    }

    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Payload field as a string, if present and a string.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

/// Standard event types.
pub mod event_types {
    pub const WILDCARD: &str = "*";

    pub const GITHUB_ISSUE_CREATED: &str = "github.issue.created";
    pub const GITHUB_ISSUE_UPDATED: &str = "github.issue.updated";
    pub const GITHUB_PR_OPENED: &str = "github.pr.opened";
    pub const GITHUB_PR_MERGED: &str = "github.pr.merged";
    pub const GITHUB_RELEASE: &str = "github.release";

    pub const ERROR_SPIKE: &str = "monitoring.error_spike";
    pub const LATENCY_SPIKE: &str = "monitoring.latency_spike";
    pub const DOWNTIME: &str = "monitoring.downtime";

    pub const CHAT_MESSAGE: &str = "support.chat_message";
    pub const TICKET_CREATED: &str = "support.ticket_created";
    pub const ESCALATION: &str = "support.escalation";

    pub const SIGNUP: &str = "revenue.signup";
    pub const SUBSCRIPTION_CREATED: &str = "revenue.subscription_created";
    pub const SUBSCRIPTION_CANCELLED: &str = "revenue.subscription_cancelled";
    pub const PAYMENT_RECEIVED: &str = "revenue.payment_received";

    pub const AD_THRESHOLD: &str = "marketing.ad_threshold";
    pub const CONTENT_PUBLISHED: &str = "marketing.content_published";

    pub const SCHEDULE_DAILY: &str = "schedule.daily";
    pub const SCHEDULE_WEEKLY: &str = "schedule.weekly";
    pub const SCHEDULE_HOURLY: &str = "schedule.hourly";
    pub const SCHEDULE_HEALTH_CHECK: &str = "schedule.health_check";
    pub const SCHEDULE_ADS_OPTIMIZATION: &str = "schedule.ads_optimization";
    pub const SCHEDULE_DAILY_REVENUE: &str = "schedule.daily_revenue";
    pub const SCHEDULE_WEEKLY_CONTENT: &str = "schedule.weekly_content";
    pub const SCHEDULE_WEEKLY_SEO: &str = "schedule.weekly_seo";
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_event_gets_unique_id() {
        let a = Event::new("order.created", Map::new(), "test");
        let b = Event::new("order.created", Map::new(), "test");
        assert_ne!(a.id(), b.id());
        assert!(a.product_id.is_none());
    }

    #[test]
    fn test_serializes_type_key() {
        let mut payload = Map::new();
        payload.insert("message".to_string(), json!("hi"));
        let event = Event::new(event_types::CHAT_MESSAGE, payload, "widget").for_product("vaspera-memory");

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], json!("support.chat_message"));
        assert_eq!(value["product_id"], json!("vaspera-memory"));
        assert_eq!(value["id"], json!(event.id().to_string()));
        assert_eq!(event.payload_str("message"), Some("hi"));
    }
}
