//! Action handlers that stand in for platform side effects.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use crate::domain::models::{Context, RuleAction};
use crate::services::rules_engine::ActionHandler;

/// Records the action in the log and acknowledges it.
///
/// Used for every action until a platform integration replaces it.
#[derive(Debug, Clone, Copy)]
pub struct LoggingActionHandler {
    action: RuleAction,
}

impl LoggingActionHandler {
    pub const fn new(action: RuleAction) -> Self {
        Self { action }
    }
}

#[async_trait]
impl ActionHandler for LoggingActionHandler {
    async fn handle(&self, ctx: &Context) -> Result<Value, String> {
        let target = ctx
            .text("campaign_id", "")
            .ok()
            .filter(|s| !s.is_empty())
            .or_else(|| ctx.text("product_id", "").ok())
            .unwrap_or_default()
            .to_string();
        let reason = ["reason", "message", "title", "escalation_reason"]
            .into_iter()
            .find_map(|key| ctx.text(key, "").ok().filter(|s| !s.is_empty()))
            .unwrap_or_default()
            .to_string();

        info!(action = %self.action, target = %target, reason = %reason, "action executed");

        Ok(json!({
            "status": "logged",
            "action": self.action,
            "target": target,
            "reason": reason,
        }))
    }
}
