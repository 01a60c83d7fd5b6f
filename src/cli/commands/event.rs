//! Event CLI commands.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::cli::output::{action_failure, action_success, output, truncate, CommandOutput};
use crate::services::event_bus::result_to_json;

#[derive(Args, Debug)]
pub struct EventArgs {
    #[command(subcommand)]
    pub command: EventCommands,
}

#[derive(Subcommand, Debug)]
pub enum EventCommands {
    /// Publish an event and wait for every subscribed handler
    Publish {
        /// Event type, e.g. `support.chat_message`
        event_type: String,

        /// JSON object payload
        #[arg(short, long, default_value = "{}")]
        payload: String,

        /// Product the event concerns
        #[arg(long)]
        product: Option<String>,
    },
}

/// Parse a payload argument; it must be a JSON object.
pub fn parse_payload(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(raw).context("Payload is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("Payload must be a JSON object, got {other}"),
    }
}

#[derive(Debug, Serialize)]
pub struct PublishOutput {
    pub event_type: String,
    pub handlers: usize,
    pub failures: usize,
    pub results: Vec<Value>,
}

impl CommandOutput for PublishOutput {
    fn to_human(&self) -> String {
        if self.handlers == 0 {
            return format!("No handlers subscribed to '{}'.", self.event_type);
        }

        let mut lines = vec![format!(
            "Delivered '{}' to {} handler(s), {} failed:",
            self.event_type, self.handlers, self.failures
        )];
        for result in &self.results {
            let text = truncate(&result.to_string(), 100);
            lines.push(match result.get("error") {
                Some(_) => action_failure(&text),
                None => action_success(&text),
            });
        }
        lines.join("\n")
    }
}

pub async fn execute(args: EventArgs, json_mode: bool, config_path: Option<&Path>) -> Result<()> {
    match args.command {
        EventCommands::Publish {
            event_type,
            payload,
            product,
        } => {
            let payload = parse_payload(&payload)?;
            let config = super::load_config(config_path)?;
            let orchestrator = super::build_orchestrator(config).await?;

            let results = orchestrator
                .bus()
                .publish_sync(event_type.clone(), payload, "cli", product)
                .await;

            let out = PublishOutput {
                event_type,
                handlers: results.len(),
                failures: results.iter().filter(|r| r.is_err()).count(),
                results: results.iter().map(result_to_json).collect(),
            };
            output(&out, json_mode);
        }
    }
    Ok(())
}
