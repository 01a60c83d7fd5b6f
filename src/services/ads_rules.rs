//! Paid-advertising rule set.
//!
//! Each factory returns a fully-formed [`Rule`] whose condition holds the
//! parameters it was built with. [`setup_ads_rules`] registers the whole
//! set for one product under its own `ads.<product_id>` domain, so every
//! product keeps independently configured thresholds.
//!
//! Missing context keys default toward inaction: no `spend` is 0, no
//! `cpa` is +infinity, no `ctr` is 1.0.

use crate::domain::errors::{ConditionError, DomainResult};
use crate::domain::models::{Condition, Context, ProductConfig, Rule, RuleAction};
use crate::services::rules_engine::RulesEngine;

pub const LEARNING_PROTECTION: &str = "ads_learning_protection";
pub const THREE_X_KILL: &str = "ads_3x_kill";
pub const SCALE_WINNER: &str = "ads_scale_winner";
pub const ROAS_THRESHOLD: &str = "ads_roas_threshold";
pub const CREATIVE_FATIGUE: &str = "ads_creative_fatigue";
pub const CTR_DROP: &str = "ads_ctr_drop";
pub const BUDGET_PACING: &str = "ads_budget_pacing";

/// Rule domain for a product's ads rules.
pub fn ads_domain(product_id: &str) -> String {
    format!("ads.{product_id}")
}

/// Per-product inputs to the ads rule set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdsRuleParams {
    pub target_cpa: f64,
    pub daily_budget: f64,
}

impl AdsRuleParams {
    pub fn from_product(product: &ProductConfig) -> Self {
        Self {
            target_cpa: product.target_cpa,
            daily_budget: product.daily_budget(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct InLearningPhase;

impl Condition for InLearningPhase {
    fn evaluate(&self, ctx: &Context) -> Result<bool, ConditionError> {
        ctx.flag("in_learning_phase", false)
    }

    fn describe(&self) -> String {
        "in_learning_phase".to_string()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ThreeXKill {
    pub target_cpa: f64,
}

impl Condition for ThreeXKill {
    fn evaluate(&self, ctx: &Context) -> Result<bool, ConditionError> {
        Ok(ctx.number("spend", 0.0)? > self.target_cpa * 3.0 && ctx.number("conversions", 0.0)? == 0.0)
    }

    fn describe(&self) -> String {
        format!("spend > {:.2} && conversions == 0", self.target_cpa * 3.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ScaleWinner {
    pub target_cpa: f64,
    /// Fraction of target CPA a winner must beat.
    pub threshold: f64,
    pub min_conversions: f64,
}

impl Condition for ScaleWinner {
    fn evaluate(&self, ctx: &Context) -> Result<bool, ConditionError> {
        Ok(ctx.number("cpa", f64::INFINITY)? < self.target_cpa * self.threshold
            && ctx.number("conversions", 0.0)? >= self.min_conversions
            && !ctx.flag("in_learning_phase", false)?)
    }

    fn describe(&self) -> String {
        format!(
            "cpa < {:.2} && conversions >= {} && !in_learning_phase",
            self.target_cpa * self.threshold,
            self.min_conversions
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LowRoas {
    pub min_roas: f64,
    pub min_spend: f64,
}

impl Condition for LowRoas {
    fn evaluate(&self, ctx: &Context) -> Result<bool, ConditionError> {
        Ok(ctx.number("roas", f64::INFINITY)? < self.min_roas && ctx.number("spend", 0.0)? >= self.min_spend)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CreativeFatigue {
    pub max_frequency: f64,
}

impl Condition for CreativeFatigue {
    fn evaluate(&self, ctx: &Context) -> Result<bool, ConditionError> {
        Ok(ctx.number("frequency", 0.0)? > self.max_frequency)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LowCtr {
    pub min_ctr: f64,
    pub min_impressions: f64,
}

impl Condition for LowCtr {
    fn evaluate(&self, ctx: &Context) -> Result<bool, ConditionError> {
        Ok(ctx.number("ctr", 1.0)? < self.min_ctr && ctx.number("impressions", 0.0)? >= self.min_impressions)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BudgetPacing {
    pub daily_budget: f64,
    pub ratio: f64,
}

impl Condition for BudgetPacing {
    fn evaluate(&self, ctx: &Context) -> Result<bool, ConditionError> {
        Ok(ctx.number("spend_today", 0.0)? > self.daily_budget * self.ratio)
    }
}

fn alert_params(alert_type: &str, message: &str) -> Context {
    Context::new().with("alert_type", alert_type).with("message", message)
}

/// Blocks modifications while the platform is still learning. Checked first.
pub fn learning_phase_protection_rule() -> Rule {
    Rule::new(
        LEARNING_PROTECTION,
        "Learning Phase Protection",
        RuleAction::Alert,
        InLearningPhase,
    )
    .with_description("Block modifications during learning phase")
    .with_params(
        alert_params("learning_phase", "Campaign in learning phase - changes blocked").with("block_changes", true),
    )
    .with_priority(200)
}

/// Pause when spend passes three times the target CPA without a conversion.
pub fn three_x_kill_rule(target_cpa: f64) -> Rule {
    Rule::new(THREE_X_KILL, "3x Kill Rule", RuleAction::Pause, ThreeXKill { target_cpa })
        .with_description(format!(
            "Pause if spend > 3x target CPA (${:.2}) with 0 conversions",
            target_cpa * 3.0
        ))
        .with_params(Context::new().with("reason", "3x Kill Rule - no conversions"))
        .with_priority(100)
}

/// Scale budget by 20% when CPA is well under target on enough data.
pub fn scale_winner_rule(target_cpa: f64) -> Rule {
    let condition = ScaleWinner {
        target_cpa,
        threshold: 0.8,
        min_conversions: 10.0,
    };
    Rule::new(SCALE_WINNER, "Scale Winner Rule", RuleAction::ScaleUp, condition)
        .with_description(format!(
            "Scale 20% if CPA < ${:.2} and conversions >= 10",
            target_cpa * condition.threshold
        ))
        .with_params(Context::new().with("increase_percent", 20))
        .with_priority(50)
}

pub fn roas_threshold_rule(min_roas: f64) -> Rule {
    Rule::new(
        ROAS_THRESHOLD,
        "Low ROAS Alert",
        RuleAction::Alert,
        LowRoas {
            min_roas,
            min_spend: 100.0,
        },
    )
    .with_description(format!("Alert when ROAS < {min_roas:.1}"))
    .with_params(alert_params("low_roas", "ROAS below breakeven - review campaign"))
    .with_priority(40)
}

pub fn creative_fatigue_rule(max_frequency: f64) -> Rule {
    Rule::new(
        CREATIVE_FATIGUE,
        "Creative Fatigue Alert",
        RuleAction::Alert,
        CreativeFatigue { max_frequency },
    )
    .with_description(format!("Alert when frequency > {max_frequency}"))
    .with_params(alert_params(
        "creative_fatigue",
        "Creative fatigue detected - consider refreshing ad creative",
    ))
    .with_priority(30)
}

pub fn ctr_drop_rule(min_ctr: f64) -> Rule {
    Rule::new(
        CTR_DROP,
        "Low CTR Alert",
        RuleAction::Alert,
        LowCtr {
            min_ctr,
            min_impressions: 1000.0,
        },
    )
    .with_description(format!("Alert when CTR < {:.1}%", min_ctr * 100.0))
    .with_params(alert_params("low_ctr", "CTR below minimum threshold - review ad creative"))
    .with_priority(25)
}

pub fn budget_pacing_rule(daily_budget: f64) -> Rule {
    Rule::new(
        BUDGET_PACING,
        "Budget Pacing Alert",
        RuleAction::Alert,
        BudgetPacing {
            daily_budget,
            ratio: 0.8,
        },
    )
    .with_description(format!(
        "Alert when spend > 80% of daily budget (${:.2})",
        daily_budget * 0.8
    ))
    .with_params(alert_params("budget_pacing", "Approaching daily budget limit"))
    .with_priority(20)
}

/// The canonical ads rule set for one product.
pub fn ads_rules(params: &AdsRuleParams) -> Vec<Rule> {
    vec![
        learning_phase_protection_rule(),
        three_x_kill_rule(params.target_cpa),
        scale_winner_rule(params.target_cpa),
        creative_fatigue_rule(4.0),
        budget_pacing_rule(params.daily_budget),
        ctr_drop_rule(0.01),
        roas_threshold_rule(1.0),
    ]
}

/// Register the ads rule set under `domain`.
pub fn setup_ads_rules(engine: &mut RulesEngine, domain: &str, params: &AdsRuleParams) -> DomainResult<()> {
    for rule in ads_rules(params) {
        engine.register_rule(domain, rule)?;
    }
    tracing::info!(
        domain = %domain,
        target_cpa = params.target_cpa,
        daily_budget = params.daily_budget,
        "ads rules configured"
    );
    Ok(())
}
