//! Rule model: a named condition → action binding.
//!
//! Conditions are value-holding predicate objects implementing
//! [`Condition`], so a rule's captured parameters stay inspectable for
//! listing and tests. Closures are still welcome through [`FnCondition`].

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::context::Context;
use crate::domain::errors::ConditionError;

/// Closed set of actions a rule may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    Pause,
    ScaleUp,
    ScaleDown,
    Alert,
    Restart,
    Rollback,
    Notify,
    CreateTicket,
    SendEmail,
}

impl RuleAction {
    pub const ALL: [Self; 9] = [
        Self::Pause,
        Self::ScaleUp,
        Self::ScaleDown,
        Self::Alert,
        Self::Restart,
        Self::Rollback,
        Self::Notify,
        Self::CreateTicket,
        Self::SendEmail,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::ScaleUp => "scale_up",
            Self::ScaleDown => "scale_down",
            Self::Alert => "alert",
            Self::Restart => "restart",
            Self::Rollback => "rollback",
            Self::Notify => "notify",
            Self::CreateTicket => "create_ticket",
            Self::SendEmail => "send_email",
        }
    }

    /// Actions that change spend or delivery of a campaign.
    pub const fn is_mutating(self) -> bool {
        matches!(self, Self::Pause | Self::ScaleUp | Self::ScaleDown)
    }
}

impl fmt::Display for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown rule action: {s}"))
    }
}

/// A pure predicate over a [`Context`].
///
/// Implementations must not depend on anything but the context and the
/// parameters they were built with. Returning `Err` means "could not
/// decide"; the owning rule then counts as not triggered.
pub trait Condition: Send + Sync + fmt::Debug {
    fn evaluate(&self, ctx: &Context) -> Result<bool, ConditionError>;

    /// Human-readable rendering of the predicate.
    fn describe(&self) -> String {
        format!("{self:?}")
    }
}

/// Adapts a closure into a [`Condition`].
pub struct FnCondition<F> {
    label: String,
    f: F,
}

impl<F> FnCondition<F>
where
    F: Fn(&Context) -> Result<bool, ConditionError> + Send + Sync,
{
    pub fn new(label: impl Into<String>, f: F) -> Self {
        Self {
            label: label.into(),
            f,
        }
    }
}

impl<F> fmt::Debug for FnCondition<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FnCondition").field(&self.label).finish()
    }
}

impl<F> Condition for FnCondition<F>
where
    F: Fn(&Context) -> Result<bool, ConditionError> + Send + Sync,
{
    fn evaluate(&self, ctx: &Context) -> Result<bool, ConditionError> {
        (self.f)(ctx)
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// A single automation rule.
#[derive(Debug, Clone)]
pub struct Rule {
    /// Unique within its domain.
    pub id: String,
    pub name: String,
    pub description: String,
    pub condition: Arc<dyn Condition>,
    pub action: RuleAction,
    /// Merged over the evaluation context when the action handler runs.
    pub action_params: Option<Context>,
    pub enabled: bool,
    /// Higher runs first.
    pub priority: i32,
}

impl Rule {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        action: RuleAction,
        condition: impl Condition + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            condition: Arc::new(condition),
            action,
            action_params: None,
            enabled: true,
            priority: 0,
        }
    }

    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: Context) -> Self {
        self.action_params = Some(params);
        self
    }

    #[must_use]
    pub const fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether this rule fires for `ctx`.
    ///
    /// Disabled rules never fire. A condition that errors or panics is
    /// logged and treated as not triggered.
    pub fn evaluate(&self, ctx: &Context) -> bool {
        if !self.enabled {
            return false;
        }

        match panic::catch_unwind(AssertUnwindSafe(|| self.condition.evaluate(ctx))) {
            Ok(Ok(triggered)) => triggered,
            Ok(Err(e)) => {
                tracing::error!(rule_id = %self.id, error = %e, "rule evaluation error");
                false
            }
            Err(payload) => {
                tracing::error!(
                    rule_id = %self.id,
                    error = %panic_message(payload.as_ref()),
                    "rule condition panicked"
                );
                false
            }
        }
    }

    /// The action params, or an empty mapping when unset.
    pub fn params(&self) -> Context {
        self.action_params.clone().unwrap_or_default()
    }

    pub fn summary(&self, domain: &str) -> RuleSummary {
        RuleSummary {
            domain: domain.to_string(),
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            action: self.action,
            enabled: self.enabled,
            priority: self.priority,
        }
    }
}

/// Read-only listing record for a registered rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSummary {
    pub domain: String,
    pub id: String,
    pub name: String,
    pub description: String,
    pub action: RuleAction,
    pub enabled: bool,
    pub priority: i32,
}

/// What happened when a triggered rule's action handler ran.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub rule_id: String,
    pub action: RuleAction,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Handler returned a value.
    Result(Value),
    /// Handler failed or panicked.
    Error(String),
}

impl ActionOutcome {
    pub const fn is_success(&self) -> bool {
        matches!(self.status, OutcomeStatus::Result(_))
    }

    pub const fn result(&self) -> Option<&Value> {
        match &self.status {
            OutcomeStatus::Result(v) => Some(v),
            OutcomeStatus::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            OutcomeStatus::Error(e) => Some(e.as_str()),
            OutcomeStatus::Result(_) => None,
        }
    }
}

/// Best-effort text from a caught panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
