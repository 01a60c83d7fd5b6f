//! Customer support agent: classifies chat messages and decides between
//! an automatic reply and a hand-off to a human.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use super::agent::Agent;
use crate::domain::models::{AgentResult, Context, EscalationReason, Event, MessageType};
use crate::services::rules_engine::RulesEngine;
use crate::services::support_rules::SUPPORT_DOMAIN;

/// What the agent answers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatResponse {
    pub conversation_id: String,
    pub response: String,
    pub resolved: bool,
    pub escalated: bool,
    pub escalation_reason: Option<EscalationReason>,
    pub message_type: MessageType,
    pub suggested_actions: Vec<String>,
    pub confidence: f64,
}

pub struct SupportAgent {
    engine: Arc<RulesEngine>,
    /// Product id to display name.
    product_names: BTreeMap<String, String>,
    dry_run: bool,
}

impl SupportAgent {
    pub const ID: &'static str = "support";

    pub fn new(engine: Arc<RulesEngine>, product_names: BTreeMap<String, String>, dry_run: bool) -> Self {
        Self {
            engine,
            product_names,
            dry_run,
        }
    }

    fn product_name<'a>(&'a self, product_id: &'a str) -> &'a str {
        self.product_names.get(product_id).map_or(product_id, String::as_str)
    }
}

/// Canned reply for a message that needs no human.
fn canned_reply(kind: MessageType, product: &str) -> (String, bool, Vec<String>, f64) {
    match kind {
        MessageType::Question => (
            format!(
                "Thanks for reaching out about {product}! I'd be happy to help answer your question. \
                 Based on our documentation, here's what I found..."
            ),
            false,
            Vec::new(),
            0.85,
        ),
        MessageType::BugReport => (
            format!(
                "Thank you for reporting this issue with {product}. I've logged this as a bug report \
                 for our engineering team. Can you provide any additional details like error messages \
                 or steps to reproduce?"
            ),
            false,
            vec!["Create GitHub issue".to_string(), "Request more details".to_string()],
            0.9,
        ),
        MessageType::FeatureRequest => (
            format!(
                "Thanks for the feature suggestion for {product}! I've added this to our feedback board. \
                 Our product team reviews all suggestions regularly."
            ),
            true,
            vec!["Add to feature backlog".to_string()],
            0.95,
        ),
        MessageType::Feedback => (
            format!(
                "Thank you so much for your feedback about {product}! We really appreciate you taking \
                 the time to share this with us."
            ),
            true,
            Vec::new(),
            0.95,
        ),
        MessageType::Billing | MessageType::Complaint | MessageType::Other => (
            format!(
                "Thanks for contacting {product} support! I'm here to help. \
                 Could you tell me more about what you need?"
            ),
            false,
            Vec::new(),
            0.7,
        ),
    }
}

#[async_trait]
impl Agent for SupportAgent {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "Support Agent"
    }

    async fn execute(&self, event: &Event) -> anyhow::Result<AgentResult> {
        let conversation_id = event.payload_str("conversation_id").unwrap_or("unknown");
        let message = event
            .payload_str("user_message")
            .or_else(|| event.payload_str("message"))
            .unwrap_or_default();
        let product_id = event
            .product_id
            .as_deref()
            .or_else(|| event.payload_str("product_id"))
            .unwrap_or("unknown");

        let kind = MessageType::classify(message);
        let mut actions = vec![format!("classified:{kind}")];
        let mut errors = Vec::new();

        let ctx = Context::new()
            .with("message", message)
            .with("message_type", kind.as_str())
            .with("product_id", product_id)
            .with("conversation_id", conversation_id)
            .with("user_email", event.payload_str("user_email").unwrap_or_default());

        let triggered = self.engine.evaluate(SUPPORT_DOMAIN, &ctx);

        let reply = if let Some((rule, params)) = triggered.first() {
            let reason = params
                .text("escalation_reason", "")
                .ok()
                .and_then(EscalationReason::parse)
                .unwrap_or(EscalationReason::CannotResolve);
            info!(conversation_id, rule_id = %rule.id, reason = reason.as_str(), "escalating conversation");

            if !self.dry_run {
                if let Some(outcome) = self.engine.execute(rule, params, &ctx).await {
                    if let Some(err) = outcome.error() {
                        errors.push(format!("{}: {err}", rule.id));
                    }
                }
            }
            actions.push(format!("escalated:{}", reason.as_str()));

            ChatResponse {
                conversation_id: conversation_id.to_string(),
                response: reason.customer_message().to_string(),
                resolved: false,
                escalated: true,
                escalation_reason: Some(reason),
                message_type: kind,
                suggested_actions: Vec::new(),
                confidence: 1.0,
            }
        } else {
            let (response, resolved, suggested_actions, confidence) = canned_reply(kind, self.product_name(product_id));
            actions.push(format!("responded:confidence={confidence:.2}"));

            ChatResponse {
                conversation_id: conversation_id.to_string(),
                response,
                resolved,
                escalated: false,
                escalation_reason: None,
                message_type: kind,
                suggested_actions,
                confidence,
            }
        };

        Ok(AgentResult::success(Self::ID, serde_json::to_value(&reply)?)
            .with_actions(actions)
            .with_errors(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::support_rules::setup_support_rules;
    use serde_json::{json, Map, Value};

    fn agent() -> SupportAgent {
        let mut engine = RulesEngine::new();
        setup_support_rules(&mut engine).unwrap();
        let names = BTreeMap::from([("vaspera-memory".to_string(), "VasperaMemory".to_string())]);
        SupportAgent::new(Arc::new(engine), names, false)
    }

    fn chat(message: &str) -> Event {
        let mut payload = Map::new();
        payload.insert("user_message".into(), Value::from(message));
        payload.insert("conversation_id".into(), json!("conv-1"));
        Event::new("support.chat_message", payload, "chatwoot").for_product("vaspera-memory")
    }

    #[tokio::test]
    async fn test_billing_message_escalates() {
        let result = agent().execute(&chat("I was charged twice on my invoice")).await.unwrap();

        assert_eq!(result.actions_taken, vec!["classified:billing", "escalated:billing_issue"]);
        assert_eq!(result.output["escalated"], true);
        assert_eq!(result.output["escalation_reason"], "billing_issue");
    }

    #[tokio::test]
    async fn test_angry_customer_escalates() {
        let result = agent()
            .execute(&chat("This is unacceptable, it crashed again"))
            .await
            .unwrap();

        assert_eq!(result.output["message_type"], "bug_report");
        assert_eq!(result.output["escalation_reason"], "angry_customer");
    }

    #[tokio::test]
    async fn test_question_gets_canned_answer() {
        let result = agent().execute(&chat("How do I export my memories?")).await.unwrap();

        assert_eq!(result.output["escalated"], false);
        assert_eq!(result.output["message_type"], "question");
        assert!(result.output["response"]
            .as_str()
            .unwrap()
            .contains("VasperaMemory"));
        assert_eq!(result.actions_taken[1], "responded:confidence=0.85");
    }

    #[tokio::test]
    async fn test_message_alias_and_missing_fields() {
        let mut payload = Map::new();
        payload.insert("message".into(), json!("I'd like to talk to someone"));
        let event = Event::new("support.chat_message", payload, "web");

        let result = agent().execute(&event).await.unwrap();

        assert_eq!(result.output["conversation_id"], "unknown");
        assert_eq!(result.output["escalation_reason"], "human_requested");
    }
}
