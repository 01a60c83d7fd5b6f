//! Rule inspection CLI commands.

use std::path::Path;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::Value;

use crate::application::orchestrator::Orchestrator;
use crate::cli::output::{
    action_failure, action_success, colorize_action, list_table, output, render_list, truncate, CommandOutput,
};
use crate::domain::models::{ActionOutcome, Context, RuleSummary};

#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub command: RulesCommands,
}

#[derive(Subcommand, Debug)]
pub enum RulesCommands {
    /// List registered rules in priority order
    List {
        /// Only show one domain (e.g. `monitor`, `ads.<product>`)
        #[arg(short, long)]
        domain: Option<String>,
    },
    /// Evaluate a domain against an ad-hoc context
    Eval {
        /// Rule domain to evaluate
        #[arg(short, long)]
        domain: String,

        /// Context entries as key=value; values parse as JSON when they can
        #[arg(short, long = "set", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        set: Vec<(String, Value)>,

        /// Run the action handlers of triggered rules
        #[arg(long)]
        execute: bool,
    },
}

/// Parse `key=value`. `5`, `true` and `"x"` become JSON scalars; anything
/// that is not valid JSON is kept as a string.
pub fn parse_key_value(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    let value = serde_json::from_str::<Value>(raw)
        .ok()
        .filter(|v| !v.is_object() && !v.is_array())
        .unwrap_or_else(|| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[derive(Debug, Serialize)]
pub struct RuleListOutput {
    pub rules: Vec<RuleSummary>,
    pub total: usize,
}

impl CommandOutput for RuleListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["domain", "id", "name", "action", "priority", "enabled"]);
        for rule in &self.rules {
            table.add_row(vec![
                rule.domain.clone(),
                rule.id.clone(),
                truncate(&rule.name, 32),
                colorize_action(rule.action.as_str()).to_string(),
                rule.priority.to_string(),
                if rule.enabled { "yes" } else { "no" }.to_string(),
            ]);
        }
        render_list("rule", &table, self.total)
    }
}

#[derive(Debug, Serialize)]
pub struct TriggeredRule {
    pub rule_id: String,
    pub action: String,
    pub params: Context,
}

#[derive(Debug, Serialize)]
pub struct EvalOutput {
    pub domain: String,
    pub triggered: Vec<TriggeredRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcomes: Option<Vec<ActionOutcome>>,
}

impl CommandOutput for EvalOutput {
    fn to_human(&self) -> String {
        if self.triggered.is_empty() {
            return format!("No rules triggered in '{}'.", self.domain);
        }

        let mut table = list_table(&["rule", "action", "params"]);
        for t in &self.triggered {
            table.add_row(vec![
                t.rule_id.clone(),
                colorize_action(&t.action).to_string(),
                truncate(&serde_json::to_string(&t.params).unwrap_or_default(), 60),
            ]);
        }
        let mut out = render_list("triggered rule", &table, self.triggered.len());

        if let Some(outcomes) = &self.outcomes {
            out.push('\n');
            for o in outcomes {
                let line = match o.error() {
                    None => action_success(&format!("{} ({})", o.rule_id, o.action)),
                    Some(err) => action_failure(&format!("{} ({}): {err}", o.rule_id, o.action)),
                };
                out.push('\n');
                out.push_str(&line);
            }
        }
        out
    }
}

pub async fn execute(args: RulesArgs, json_mode: bool, config_path: Option<&Path>) -> Result<()> {
    let config = super::load_config(config_path)?;
    let engine = Orchestrator::build_engine(&config).context("Failed to register rules")?;

    match args.command {
        RulesCommands::List { domain } => {
            let rules = engine.list_rules(domain.as_deref());
            let out = RuleListOutput {
                total: rules.len(),
                rules,
            };
            output(&out, json_mode);
        }

        RulesCommands::Eval { domain, set, execute } => {
            if engine.rule_count(&domain) == 0 {
                anyhow::bail!(
                    "No rules registered in domain '{domain}'. Known domains: {}",
                    engine.domains().join(", ")
                );
            }

            let mut ctx = Context::new();
            for (key, value) in set {
                ctx.insert(key, value);
            }

            let triggered = engine
                .evaluate(&domain, &ctx)
                .into_iter()
                .map(|(rule, params)| TriggeredRule {
                    rule_id: rule.id.clone(),
                    action: rule.action.to_string(),
                    params,
                })
                .collect();

            let outcomes = if execute {
                Some(engine.evaluate_and_execute(&domain, &ctx).await)
            } else {
                None
            };

            output(
                &EvalOutput {
                    domain,
                    triggered,
                    outcomes,
                },
                json_mode,
            );
        }
    }

    Ok(())
}
