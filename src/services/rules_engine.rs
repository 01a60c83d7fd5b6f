//! Priority-ordered, domain-partitioned rules engine.
//!
//! Rules are grouped by domain (`ads.<product_id>`, `monitor`, `support`)
//! and kept sorted by descending priority on every registration. Action
//! handlers are registered per [`RuleAction`]; at most one per kind.
//!
//! Registration takes `&mut self` and evaluation takes `&self`: wire the
//! engine up first, then share it behind an `Arc` for concurrent use.

use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::rule::panic_message;
use crate::domain::models::{ActionOutcome, Context, OutcomeStatus, Rule, RuleAction, RuleSummary};

/// Side-effecting handler for one action kind.
///
/// Receives the evaluation context merged with the rule's params.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, ctx: &Context) -> Result<Value, String>;
}

/// Adapts a synchronous closure into an [`ActionHandler`].
pub struct FnActionHandler<F> {
    f: F,
}

impl<F> FnActionHandler<F>
where
    F: Fn(&Context) -> Result<Value, String> + Send + Sync,
{
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F> ActionHandler for FnActionHandler<F>
where
    F: Fn(&Context) -> Result<Value, String> + Send + Sync,
{
    async fn handle(&self, ctx: &Context) -> Result<Value, String> {
        (self.f)(ctx)
    }
}

/// Coordinates rule evaluation and action dispatch.
#[derive(Default)]
pub struct RulesEngine {
    rules: BTreeMap<String, Vec<Rule>>,
    handlers: HashMap<RuleAction, Arc<dyn ActionHandler>>,
}

impl RulesEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule to a domain, keeping the domain sorted by descending
    /// priority. Equal priorities keep registration order.
    ///
    /// Rule ids are unique per domain; a second rule with the same id is
    /// rejected.
    pub fn register_rule(&mut self, domain: impl Into<String>, rule: Rule) -> DomainResult<()> {
        let domain = domain.into();
        let rules = self.rules.entry(domain.clone()).or_default();

        if rules.iter().any(|r| r.id == rule.id) {
            return Err(DomainError::DuplicateRule {
                domain,
                rule_id: rule.id,
            });
        }

        tracing::debug!(
            domain = %domain,
            rule_id = %rule.id,
            priority = rule.priority,
            "rule registered"
        );
        rules.push(rule);
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(())
    }

    /// Store the handler for an action kind. Last registration wins.
    pub fn register_action_handler(&mut self, action: RuleAction, handler: Arc<dyn ActionHandler>) {
        if self.handlers.insert(action, handler).is_some() {
            tracing::debug!(action = %action, "action handler replaced");
        }
    }

    pub fn has_handler(&self, action: RuleAction) -> bool {
        self.handlers.contains_key(&action)
    }

    /// Triggered rules of a domain in priority order, each paired with
    /// its action params (empty when unset).
    ///
    /// Pure apart from logging. Unknown domains yield nothing.
    pub fn evaluate(&self, domain: &str, ctx: &Context) -> Vec<(&Rule, Context)> {
        let Some(rules) = self.rules.get(domain) else {
            return Vec::new();
        };

        rules
            .iter()
            .filter(|rule| rule.evaluate(ctx))
            .map(|rule| {
                tracing::info!(
                    domain = %domain,
                    rule_id = %rule.id,
                    action = %rule.action,
                    "rule triggered"
                );
                (rule, rule.params())
            })
            .collect()
    }

    /// Run the handler for one triggered rule.
    ///
    /// Returns `None` when no handler is registered for the rule's action.
    /// Handler errors and panics become an error outcome.
    pub async fn execute(&self, rule: &Rule, params: &Context, ctx: &Context) -> Option<ActionOutcome> {
        let Some(handler) = self.handlers.get(&rule.action) else {
            tracing::warn!(
                rule_id = %rule.id,
                action = %rule.action,
                "no handler registered for action, skipping"
            );
            return None;
        };

        let input = ctx.merged(params);
        let status = match AssertUnwindSafe(handler.handle(&input)).catch_unwind().await {
            Ok(Ok(result)) => OutcomeStatus::Result(result),
            Ok(Err(e)) => {
                tracing::error!(rule_id = %rule.id, action = %rule.action, error = %e, "action handler failed");
                OutcomeStatus::Error(e)
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                tracing::error!(rule_id = %rule.id, action = %rule.action, error = %msg, "action handler panicked");
                OutcomeStatus::Error(msg)
            }
        };

        Some(ActionOutcome {
            rule_id: rule.id.clone(),
            action: rule.action,
            status,
        })
    }

    /// Evaluate a domain and run every triggered rule's handler in order.
    ///
    /// Best effort: a failing handler is recorded and the next triggered
    /// rule still runs.
    pub async fn evaluate_and_execute(&self, domain: &str, ctx: &Context) -> Vec<ActionOutcome> {
        let mut outcomes = Vec::new();
        for (rule, params) in self.evaluate(domain, ctx) {
            if let Some(outcome) = self.execute(rule, &params, ctx).await {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// Summaries of every rule, or of one domain's rules.
    pub fn list_rules(&self, domain: Option<&str>) -> Vec<RuleSummary> {
        match domain {
            Some(d) => self
                .rules
                .get(d)
                .map(|rules| rules.iter().map(|r| r.summary(d)).collect())
                .unwrap_or_default(),
            None => self
                .rules
                .iter()
                .flat_map(|(d, rules)| rules.iter().map(move |r| r.summary(d)))
                .collect(),
        }
    }

    /// A domain's rules in evaluation order.
    pub fn rules(&self, domain: &str) -> &[Rule] {
        self.rules.get(domain).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn domains(&self) -> Vec<&str> {
        self.rules.keys().map(String::as_str).collect()
    }

    pub fn rule_count(&self, domain: &str) -> usize {
        self.rules(domain).len()
    }
}

impl std::fmt::Debug for RulesEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut actions: Vec<_> = self.handlers.keys().copied().collect();
        actions.sort();
        f.debug_struct("RulesEngine")
            .field("domains", &self.domains())
            .field("handlers", &actions)
            .finish()
    }
}
