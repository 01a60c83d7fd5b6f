//! Paid-advertising agent: applies the ads rule set to every campaign of
//! every configured product.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::agent::Agent;
use crate::domain::models::{AgentResult, CampaignMetrics, Event};
use crate::domain::ports::CampaignSource;
use crate::domain::DomainError;
use crate::services::ads_rules::ads_domain;
use crate::services::rules_engine::RulesEngine;

/// How the agent commits triggered actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionPolicy {
    /// Record actions without running any handler.
    pub dry_run: bool,
    /// Hold mutating actions for a human instead of running them.
    pub approval_required: bool,
}

pub struct AdsAgent {
    engine: Arc<RulesEngine>,
    source: Arc<dyn CampaignSource>,
    product_ids: Vec<String>,
    policy: ExecutionPolicy,
}

impl AdsAgent {
    pub const ID: &'static str = "ads";

    pub fn new(
        engine: Arc<RulesEngine>,
        source: Arc<dyn CampaignSource>,
        product_ids: Vec<String>,
        policy: ExecutionPolicy,
    ) -> Self {
        Self {
            engine,
            source,
            product_ids,
            policy,
        }
    }

    /// Products covered by one run: the event's product, or all of them.
    fn targets<'a>(&'a self, event: &'a Event) -> Result<Vec<&'a str>, DomainError> {
        match event.product_id.as_deref() {
            Some(pid) if self.product_ids.iter().any(|p| p == pid) => Ok(vec![pid]),
            Some(pid) => Err(DomainError::UnknownProduct(pid.to_string())),
            None => Ok(self.product_ids.iter().map(String::as_str).collect()),
        }
    }

    async fn optimize(&self, product_id: &str, campaign: &CampaignMetrics, actions: &mut Vec<String>, errors: &mut Vec<String>) {
        let domain = ads_domain(product_id);
        let ctx = campaign.to_context();
        let triggered = self.engine.evaluate(&domain, &ctx);

        // Any triggered rule may freeze the campaign for this run.
        let frozen = triggered
            .iter()
            .any(|(_, params)| params.flag("block_changes", false).unwrap_or(false));

        for (rule, params) in &triggered {
            let tag = format!("{}:{}:{}", rule.action, campaign.campaign_id, rule.id);

            if rule.action.is_mutating() && frozen {
                info!(campaign_id = %campaign.campaign_id, rule_id = %rule.id, "change blocked by learning phase");
                actions.push(format!("blocked:{tag}"));
                continue;
            }
            if self.policy.dry_run {
                actions.push(format!("dry_run:{tag}"));
                continue;
            }
            if rule.action.is_mutating() && self.policy.approval_required {
                actions.push(format!("pending_approval:{tag}"));
                continue;
            }

            match self.engine.execute(rule, params, &ctx).await {
                Some(outcome) if outcome.is_success() => actions.push(tag),
                Some(outcome) => {
                    let err = outcome.error().unwrap_or_default();
                    errors.push(format!("{tag}: {err}"));
                }
                None => actions.push(format!("unhandled:{tag}")),
            }
        }
    }
}

#[async_trait]
impl Agent for AdsAgent {
    fn id(&self) -> &str {
        Self::ID
    }

    fn name(&self) -> &str {
        "Ads Agent"
    }

    async fn execute(&self, event: &Event) -> anyhow::Result<AgentResult> {
        let mut actions = Vec::new();
        let mut errors = Vec::new();
        let mut campaigns = Vec::new();

        for product_id in self.targets(event)? {
            let fetched = match self.source.campaigns(product_id).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    warn!(product_id, error = %e, "failed to fetch campaigns");
                    errors.push(format!("{product_id}: {e}"));
                    continue;
                }
            };
            for campaign in fetched {
                self.optimize(product_id, &campaign, &mut actions, &mut errors).await;
                campaigns.push(campaign);
            }
        }

        let report = report(&campaigns, &actions);
        Ok(AgentResult::success(Self::ID, report)
            .with_actions(actions)
            .with_errors(errors))
    }
}

#[allow(clippy::cast_precision_loss)]
fn report(campaigns: &[CampaignMetrics], actions: &[String]) -> Value {
    let total_spend: f64 = campaigns.iter().map(|c| c.spend).sum();
    let total_conversions: u64 = campaigns.iter().map(|c| c.conversions).sum();
    let total_revenue: f64 = campaigns.iter().map(|c| c.revenue).sum();

    let overall_cpa = if total_conversions > 0 {
        total_spend / total_conversions as f64
    } else {
        0.0
    };
    let overall_roas = if total_spend > 0.0 { total_revenue / total_spend } else { 0.0 };

    let mut by_platform: BTreeMap<&str, usize> = BTreeMap::new();
    for c in campaigns {
        *by_platform.entry(c.platform.as_str()).or_default() += 1;
    }

    json!({
        "summary": {
            "total_campaigns": campaigns.len(),
            "total_spend": total_spend,
            "total_conversions": total_conversions,
            "total_revenue": total_revenue,
            "overall_cpa": overall_cpa,
            "overall_roas": overall_roas,
        },
        "actions_taken": actions,
        "campaigns_by_platform": by_platform,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::static_sources::StaticCampaignSource;
    use crate::domain::models::RuleAction;
    use crate::services::ads_rules::{setup_ads_rules, AdsRuleParams};
    use crate::services::rules_engine::FnActionHandler;
    use serde_json::Map;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn campaign(id: &str, spend: f64, conversions: u64, learning: bool) -> CampaignMetrics {
        CampaignMetrics {
            campaign_id: id.to_string(),
            campaign_name: format!("{id} campaign"),
            platform: "google".to_string(),
            product_id: "p1".to_string(),
            spend,
            impressions: 10_000,
            clicks: 500,
            conversions,
            revenue: 0.0,
            frequency: 0.0,
            spend_today: 0.0,
            in_learning_phase: learning,
        }
    }

    fn engine(counter: Arc<AtomicUsize>) -> RulesEngine {
        let mut engine = RulesEngine::new();
        let params = AdsRuleParams {
            target_cpa: 50.0,
            daily_budget: 1000.0,
        };
        setup_ads_rules(&mut engine, &ads_domain("p1"), &params).unwrap();
        for action in RuleAction::ALL {
            let counter = Arc::clone(&counter);
            engine.register_action_handler(
                action,
                Arc::new(FnActionHandler::new(move |_ctx| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({"status": "ok"}))
                })),
            );
        }
        engine
    }

    fn agent(campaigns: Vec<CampaignMetrics>, policy: ExecutionPolicy, counter: Arc<AtomicUsize>) -> AdsAgent {
        AdsAgent::new(
            Arc::new(engine(counter)),
            Arc::new(StaticCampaignSource::new(campaigns)),
            vec!["p1".to_string()],
            policy,
        )
    }

    fn tick() -> Event {
        Event::new("schedule.ads_optimization", Map::new(), "test")
    }

    #[tokio::test]
    async fn test_kills_campaign_over_three_x_cpa() {
        let counter = Arc::new(AtomicUsize::new(0));
        let agent = agent(vec![campaign("c1", 160.0, 0, false)], ExecutionPolicy::default(), Arc::clone(&counter));

        let result = agent.execute(&tick()).await.unwrap();

        assert!(result.success);
        assert!(result.actions_taken.contains(&"pause:c1:ads_3x_kill".to_string()));
        assert!(counter.load(Ordering::SeqCst) >= 1);
        assert_eq!(result.output["summary"]["total_campaigns"], 1);
    }

    #[tokio::test]
    async fn test_learning_phase_blocks_mutating_actions() {
        let counter = Arc::new(AtomicUsize::new(0));
        let agent = agent(vec![campaign("c1", 160.0, 0, true)], ExecutionPolicy::default(), Arc::clone(&counter));

        let result = agent.execute(&tick()).await.unwrap();

        assert!(result
            .actions_taken
            .contains(&"blocked:pause:c1:ads_3x_kill".to_string()));
        assert!(!result.actions_taken.contains(&"pause:c1:ads_3x_kill".to_string()));
    }

    #[tokio::test]
    async fn test_dry_run_runs_no_handlers() {
        let counter = Arc::new(AtomicUsize::new(0));
        let policy = ExecutionPolicy {
            dry_run: true,
            approval_required: false,
        };
        let agent = agent(vec![campaign("c1", 160.0, 0, false)], policy, Arc::clone(&counter));

        let result = agent.execute(&tick()).await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(result
            .actions_taken
            .contains(&"dry_run:pause:c1:ads_3x_kill".to_string()));
    }

    #[tokio::test]
    async fn test_approval_holds_mutating_actions() {
        let counter = Arc::new(AtomicUsize::new(0));
        let policy = ExecutionPolicy {
            dry_run: false,
            approval_required: true,
        };
        let agent = agent(vec![campaign("c1", 160.0, 0, false)], policy, Arc::clone(&counter));

        let result = agent.execute(&tick()).await.unwrap();

        assert!(result
            .actions_taken
            .contains(&"pending_approval:pause:c1:ads_3x_kill".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_product_is_an_error() {
        let counter = Arc::new(AtomicUsize::new(0));
        let agent = agent(Vec::new(), ExecutionPolicy::default(), counter);
        let event = tick().for_product("nope");

        assert!(agent.execute(&event).await.is_err());
    }

    #[test]
    fn test_report_totals() {
        let mut a = campaign("a", 100.0, 4, false);
        a.revenue = 300.0;
        let b = campaign("b", 100.0, 0, false);

        let report = report(&[a, b], &[]);

        assert_eq!(report["summary"]["total_spend"], 200.0);
        assert_eq!(report["summary"]["overall_cpa"], 50.0);
        assert_eq!(report["summary"]["overall_roas"], 1.5);
        assert_eq!(report["campaigns_by_platform"]["google"], 2);
    }
}
