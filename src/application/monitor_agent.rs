//! Health monitoring agent.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::{error, warn};

use super::agent::Agent;
use crate::domain::models::{AgentResult, Alert, AlertSeverity, Context, Event, HealthStatus, MonitorThresholds, ProductHealth};
use crate::domain::ports::HealthSource;
use crate::domain::DomainError;
use crate::services::monitor_rules::MONITOR_DOMAIN;
use crate::services::rules_engine::RulesEngine;

pub struct MonitorAgent {
    engine: Arc<RulesEngine>,
    source: Arc<dyn HealthSource>,
    product_ids: Vec<String>,
    thresholds: MonitorThresholds,
    dry_run: bool,
}

impl MonitorAgent {
    pub const ID: &'static str = "monitor";

    pub fn new(
        engine: Arc<RulesEngine>,
        source: Arc<dyn HealthSource>,
        product_ids: Vec<String>,
        thresholds: MonitorThresholds,
        dry_run: bool,
    ) -> Self {
        Self {
            engine,
            source,
            product_ids,
            thresholds,
            dry_run,
        }
    }

    fn targets<'a>(&'a self, event: &'a Event) -> Result<Vec<&'a str>, DomainError> {
        match event.product_id.as_deref() {
            Some(pid) if self.product_ids.iter().any(|p| p == pid) => Ok(vec![pid]),
            Some(pid) => Err(DomainError::UnknownProduct(pid.to_string())),
            None => Ok(self.product_ids.iter().map(String::as_str).collect()),
        }
    }

    /// Evaluate one snapshot, running alert handlers unless in dry-run.
    async fn check(&self, health: &ProductHealth, errors: &mut Vec<String>) -> Vec<Alert> {
        let ctx = health.to_context();
        let mut alerts = Vec::new();

        for (rule, params) in self.engine.evaluate(MONITOR_DOMAIN, &ctx) {
            alerts.push(alert_from(health, &ctx, &params));

            if self.dry_run {
                continue;
            }
            if let Some(outcome) = self.engine.execute(rule, &params, &ctx).await {
                if let Some(err) = outcome.error() {
                    errors.push(format!("{}:{}: {err}", health.product_id, rule.id));
                }
            }
        }
        alerts
    }
}

fn alert_from(health: &ProductHealth, ctx: &Context, params: &Context) -> Alert {
    let severity = match params.text("severity", "warning").unwrap_or("warning") {
        "critical" => AlertSeverity::Critical,
        "info" => AlertSeverity::Info,
        _ => AlertSeverity::Warning,
    };
    let metric = params.text("metric", "").unwrap_or_default().to_string();
    let title = params.text("title", "Health alert").unwrap_or("Health alert");
    let current_value = ctx.number(&metric, 0.0).unwrap_or(0.0);
    let threshold = params.number("threshold", 0.0).unwrap_or(0.0);

    let message = match metric.as_str() {
        "response_time_p95" => format!("P95 response time is {current_value:.0}ms"),
        "uptime" => format!("Uptime is {current_value:.2}%, below {threshold}% SLA"),
        _ => format!("{metric} is {current_value:.2}, threshold {threshold}"),
    };

    Alert {
        product_id: health.product_id.clone(),
        severity,
        title: format!("{title}: {}", health.product_id),
        message,
        metric,
        current_value,
        threshold,
        created_at: Utc::now(),
    }
}

fn log_alerts(alerts: &[Alert]) {
    for alert in alerts {
        if alert.severity == AlertSeverity::Critical {
            error!(product_id = %alert.product_id, title = %alert.title, message = %alert.message, "critical alert");
        } else {
            warn!(product_id = %alert.product_id, title = %alert.title, message = %alert.message, "alert");
        }
    }
}

fn summary(reports: &[ProductHealth], alerts: &[Alert], thresholds: &MonitorThresholds) -> Value {
    let healthy = reports.iter().filter(|h| h.is_healthy(thresholds)).count();
    let count = |severity| alerts.iter().filter(|a| a.severity == severity).count();

    let by_product: Map<String, Value> = reports
        .iter()
        .map(|h| {
            (
                h.product_id.clone(),
                json!({
                    "status": h.status,
                    "error_rate": h.error_rate,
                    "response_time_p95": h.response_time_p95,
                    "uptime": h.uptime,
                    "active_users": h.active_users,
                }),
            )
        })
        .collect();

    let overall = if healthy == reports.len() {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    };

    json!({
        "timestamp": Utc::now().to_rfc3339(),
        "overall_status": overall,
        "products": {
            "total": reports.len(),
            "healthy": healthy,
            "degraded": reports.len() - healthy,
        },
        "alerts": {
            "total": alerts.len(),
            "critical": count(AlertSeverity::Critical),
            "warning": count(AlertSeverity::Warning),
        },
        "health_by_product": by_product,
    })
}

#[async_trait]
impl Agent for MonitorAgent {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "Monitor Agent"
    }

    async fn execute(&self, event: &Event) -> anyhow::Result<AgentResult> {
        let mut actions = Vec::new();
        let mut errors = Vec::new();
        let mut reports = Vec::new();
        let mut alerts = Vec::new();

        for product_id in self.targets(event)? {
            let health = match self.source.health(product_id).await {
                Ok(h) => h,
                Err(e) => {
                    warn!(product_id, error = %e, "failed to fetch product health");
                    errors.push(format!("{product_id}: {e}"));
                    continue;
                }
            };

            let found = self.check(&health, &mut errors).await;
            if !found.is_empty() {
                actions.push(format!("alert:{product_id}:{}_issues", found.len()));
            }
            alerts.extend(found);
            reports.push(health);
        }

        if alerts.iter().any(|a| a.severity == AlertSeverity::Critical) {
            log_alerts(&alerts);
            actions.push("sent_critical_alerts".to_string());
        }

        let mut output = summary(&reports, &alerts, &self.thresholds);
        output["alert_details"] = serde_json::to_value(&alerts)?;

        Ok(AgentResult::success(Self::ID, output)
            .with_actions(actions)
            .with_errors(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::static_sources::StaticHealthSource;
    use crate::services::monitor_rules::setup_monitor_rules;

    fn health(pid: &str, error_rate: f64, p95: f64, uptime: f64) -> ProductHealth {
        ProductHealth {
            product_id: pid.to_string(),
            status: HealthStatus::Healthy,
            error_rate,
            response_time_p95: p95,
            uptime,
            active_users: 10,
            last_deploy: None,
            open_incidents: 0,
            checked_at: Utc::now(),
        }
    }

    fn agent(source: StaticHealthSource, products: &[&str]) -> MonitorAgent {
        let thresholds = MonitorThresholds::default();
        let mut engine = RulesEngine::new();
        setup_monitor_rules(&mut engine, &thresholds).unwrap();
        MonitorAgent::new(
            Arc::new(engine),
            Arc::new(source),
            products.iter().map(ToString::to_string).collect(),
            thresholds,
            false,
        )
    }

    fn tick() -> Event {
        Event::new("schedule.health_check", Map::new(), "test")
    }

    #[tokio::test]
    async fn test_healthy_products_raise_nothing() {
        let agent = agent(StaticHealthSource::new(), &["a", "b"]);

        let result = agent.execute(&tick()).await.unwrap();

        assert!(result.success);
        assert!(result.actions_taken.is_empty());
        assert_eq!(result.output["overall_status"], "healthy");
        assert_eq!(result.output["products"]["total"], 2);
    }

    #[tokio::test]
    async fn test_critical_error_rate_alerts_once() {
        let source = StaticHealthSource::new().with_health(health("a", 7.5, 450.0, 99.99));
        let agent = agent(source, &["a"]);

        let result = agent.execute(&tick()).await.unwrap();

        assert_eq!(result.actions_taken, vec!["alert:a:1_issues", "sent_critical_alerts"]);
        assert_eq!(result.output["alerts"]["critical"], 1);
        assert_eq!(result.output["alerts"]["warning"], 0);
        assert_eq!(result.output["overall_status"], "degraded");
        assert_eq!(result.output["alert_details"][0]["title"], "Critical error rate: a");
    }

    #[tokio::test]
    async fn test_warnings_do_not_send_critical_alerts() {
        let source = StaticHealthSource::new().with_health(health("a", 2.0, 2500.0, 99.99));
        let agent = agent(source, &["a"]);

        let result = agent.execute(&tick()).await.unwrap();

        assert_eq!(result.actions_taken, vec!["alert:a:2_issues"]);
        assert_eq!(result.output["alerts"]["warning"], 2);
    }

    #[tokio::test]
    async fn test_product_scoped_event() {
        let agent = agent(StaticHealthSource::new(), &["a", "b"]);

        let result = agent.execute(&tick().for_product("b")).await.unwrap();

        assert_eq!(result.output["products"]["total"], 1);
        assert!(agent.execute(&tick().for_product("zzz")).await.is_err());
    }
}
