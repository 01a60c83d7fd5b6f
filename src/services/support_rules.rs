//! Escalation rule set for the `support` domain.
//!
//! Context keys: `message` (raw customer text) and `message_type`
//! (classifier output). Missing text reads as the empty string.

use crate::domain::errors::{ConditionError, DomainResult};
use crate::domain::models::{Condition, Context, EscalationReason, MessageType, Rule, RuleAction};
use crate::services::rules_engine::RulesEngine;

pub const SUPPORT_DOMAIN: &str = "support";

#[derive(Debug, Clone, Copy)]
pub struct MessageTypeIs(pub MessageType);

impl Condition for MessageTypeIs {
    fn evaluate(&self, ctx: &Context) -> Result<bool, ConditionError> {
        Ok(ctx.text("message_type", "")? == self.0.as_str())
    }
}

/// Case-insensitive substring match on `message`.
#[derive(Debug, Clone)]
pub struct MentionsAny {
    pub phrases: Vec<&'static str>,
}

impl Condition for MentionsAny {
    fn evaluate(&self, ctx: &Context) -> Result<bool, ConditionError> {
        let message = ctx.text("message", "")?.to_lowercase();
        Ok(self.phrases.iter().any(|p| message.contains(p)))
    }

    fn describe(&self) -> String {
        format!("message mentions any of {:?}", self.phrases)
    }
}

fn escalation(reason: EscalationReason) -> Context {
    Context::new()
        .with("escalation_reason", reason.as_str())
        .with("response", reason.customer_message())
}

pub fn support_rules() -> Vec<Rule> {
    vec![
        Rule::new(
            "support_billing_escalation",
            "Billing escalation",
            RuleAction::CreateTicket,
            MessageTypeIs(MessageType::Billing),
        )
        .with_description("Billing questions always go to the billing team")
        .with_params(escalation(EscalationReason::BillingIssue))
        .with_priority(100),
        Rule::new(
            "support_refund_request",
            "Refund request",
            RuleAction::CreateTicket,
            MentionsAny { phrases: vec!["refund"] },
        )
        .with_params(escalation(EscalationReason::RefundRequest))
        .with_priority(90),
        Rule::new(
            "support_angry_customer",
            "Angry customer",
            RuleAction::Notify,
            MentionsAny {
                phrases: vec!["angry", "furious", "unacceptable", "lawsuit", "lawyer"],
            },
        )
        .with_params(escalation(EscalationReason::AngryCustomer))
        .with_priority(80),
        Rule::new(
            "support_human_requested",
            "Human requested",
            RuleAction::Notify,
            MentionsAny {
                phrases: vec!["speak to human", "talk to someone", "real person", "manager"],
            },
        )
        .with_params(escalation(EscalationReason::HumanRequested))
        .with_priority(70),
    ]
}

pub fn setup_support_rules(engine: &mut RulesEngine) -> DomainResult<()> {
    for rule in support_rules() {
        engine.register_rule(SUPPORT_DOMAIN, rule)?;
    }
    Ok(())
}
