//! Health-threshold rule set for the `monitor` domain.
//!
//! Context keys: `error_rate` and `uptime` in percent,
//! `response_time_p95` in milliseconds. Missing error rate and latency
//! read as 0, missing uptime as +infinity, so absent data never alerts.

use crate::domain::errors::{ConditionError, DomainResult};
use crate::domain::models::{AlertSeverity, Condition, Context, MonitorThresholds, Rule, RuleAction};
use crate::services::rules_engine::RulesEngine;

pub const MONITOR_DOMAIN: &str = "monitor";

/// `metric >= threshold`, and below `ceiling` when one is set.
#[derive(Debug, Clone, Copy)]
pub struct AtLeast {
    pub metric: &'static str,
    pub threshold: f64,
    pub ceiling: Option<f64>,
}

impl Condition for AtLeast {
    fn evaluate(&self, ctx: &Context) -> Result<bool, ConditionError> {
        let value = ctx.number(self.metric, 0.0)?;
        Ok(value >= self.threshold && self.ceiling.is_none_or(|c| value < c))
    }

    fn describe(&self) -> String {
        match self.ceiling {
            Some(c) => format!("{} <= {} < {c}", self.threshold, self.metric),
            None => format!("{} >= {}", self.metric, self.threshold),
        }
    }
}

/// `metric < threshold`.
#[derive(Debug, Clone, Copy)]
pub struct Below {
    pub metric: &'static str,
    pub threshold: f64,
}

impl Condition for Below {
    fn evaluate(&self, ctx: &Context) -> Result<bool, ConditionError> {
        Ok(ctx.number(self.metric, f64::INFINITY)? < self.threshold)
    }

    fn describe(&self) -> String {
        format!("{} < {}", self.metric, self.threshold)
    }
}

fn alert_params(severity: AlertSeverity, metric: &str, threshold: f64, title: &str) -> Context {
    let severity = match severity {
        AlertSeverity::Critical => "critical",
        AlertSeverity::Warning => "warning",
        AlertSeverity::Info => "info",
    };
    Context::new()
        .with("severity", severity)
        .with("metric", metric)
        .with("threshold", threshold)
        .with("title", title)
}

pub fn monitor_rules(t: &MonitorThresholds) -> Vec<Rule> {
    vec![
        Rule::new(
            "monitor_error_rate_critical",
            "Critical error rate",
            RuleAction::Alert,
            AtLeast {
                metric: "error_rate",
                threshold: t.error_rate_critical,
                ceiling: None,
            },
        )
        .with_description(format!("Error rate at or above {}%", t.error_rate_critical))
        .with_params(alert_params(
            AlertSeverity::Critical,
            "error_rate",
            t.error_rate_critical,
            "Critical error rate",
        ))
        .with_priority(100),
        Rule::new(
            "monitor_error_rate_warning",
            "Elevated error rate",
            RuleAction::Alert,
            AtLeast {
                metric: "error_rate",
                threshold: t.error_rate,
                ceiling: Some(t.error_rate_critical),
            },
        )
        .with_description(format!("Error rate at or above {}%", t.error_rate))
        .with_params(alert_params(
            AlertSeverity::Warning,
            "error_rate",
            t.error_rate,
            "Elevated error rate",
        ))
        .with_priority(90),
        Rule::new(
            "monitor_latency_critical",
            "Critical latency",
            RuleAction::Alert,
            AtLeast {
                metric: "response_time_p95",
                threshold: t.response_time_critical,
                ceiling: None,
            },
        )
        .with_description(format!("P95 latency at or above {}ms", t.response_time_critical))
        .with_params(alert_params(
            AlertSeverity::Critical,
            "response_time_p95",
            t.response_time_critical,
            "Critical latency",
        ))
        .with_priority(80),
        Rule::new(
            "monitor_latency_warning",
            "Elevated latency",
            RuleAction::Alert,
            AtLeast {
                metric: "response_time_p95",
                threshold: t.response_time_p95,
                ceiling: Some(t.response_time_critical),
            },
        )
        .with_description(format!("P95 latency at or above {}ms", t.response_time_p95))
        .with_params(alert_params(
            AlertSeverity::Warning,
            "response_time_p95",
            t.response_time_p95,
            "Elevated latency",
        ))
        .with_priority(70),
        Rule::new(
            "monitor_uptime_sla",
            "Uptime below SLA",
            RuleAction::Alert,
            Below {
                metric: "uptime",
                threshold: t.uptime,
            },
        )
        .with_description(format!("Uptime below {}% SLA", t.uptime))
        .with_params(alert_params(AlertSeverity::Critical, "uptime", t.uptime, "Uptime below SLA"))
        .with_priority(60),
    ]
}

pub fn setup_monitor_rules(engine: &mut RulesEngine, thresholds: &MonitorThresholds) -> DomainResult<()> {
    for rule in monitor_rules(thresholds) {
        engine.register_rule(MONITOR_DOMAIN, rule)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triggered(ctx: &Context) -> Vec<String> {
        let mut engine = RulesEngine::new();
        setup_monitor_rules(&mut engine, &MonitorThresholds::default()).unwrap();
        engine
            .evaluate(MONITOR_DOMAIN, ctx)
            .into_iter()
            .map(|(r, _)| r.id.clone())
            .collect()
    }

    #[test]
    fn test_healthy_product_raises_nothing() {
        let ctx = Context::new()
            .with("error_rate", 0.5)
            .with("response_time_p95", 450)
            .with("uptime", 99.99);
        assert!(triggered(&ctx).is_empty());
        assert!(triggered(&Context::new()).is_empty());
    }

    #[test]
    fn test_warning_suppressed_at_critical_level() {
        assert_eq!(
            triggered(&Context::new().with("error_rate", 2.0)),
            vec!["monitor_error_rate_warning"]
        );
        assert_eq!(
            triggered(&Context::new().with("error_rate", 5.0)),
            vec!["monitor_error_rate_critical"]
        );
        assert_eq!(
            triggered(&Context::new().with("response_time_p95", 6000)),
            vec!["monitor_latency_critical"]
        );
    }

    #[test]
    fn test_uptime_below_sla_is_critical() {
        let mut engine = RulesEngine::new();
        setup_monitor_rules(&mut engine, &MonitorThresholds::default()).unwrap();
        let hits = engine.evaluate(MONITOR_DOMAIN, &Context::new().with("uptime", 99.5));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].1.text("severity", "").unwrap(), "critical");
        assert_eq!(hits[0].1.text("metric", "").unwrap(), "uptime");
    }
}
