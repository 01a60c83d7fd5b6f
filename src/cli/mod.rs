//! Command-line interface.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;

use commands::event::EventArgs;
use commands::rules::RulesArgs;
use commands::run::RunArgs;
use commands::schedule::ScheduleArgs;

#[derive(Parser, Debug)]
#[command(name = "vaspera")]
#[command(about = "Vaspera - multi-agent business automation orchestrator", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Config file to load instead of the .vaspera/ hierarchy
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the orchestrator until Ctrl-C
    Run(RunArgs),

    /// Inspect and evaluate rules
    Rules(RulesArgs),

    /// Publish events
    Event(EventArgs),

    /// Inspect scheduled jobs
    Schedule(ScheduleArgs),
}

impl Cli {
    /// Whether the command writes its own structured logs.
    pub const fn is_long_running(&self) -> bool {
        matches!(self.command, Commands::Run(_))
    }

    pub async fn dispatch(self) -> Result<()> {
        let config = self.config.as_deref();
        match self.command {
            Commands::Run(args) => commands::run::execute(args, config).await,
            Commands::Rules(args) => commands::rules::execute(args, self.json, config).await,
            Commands::Event(args) => commands::event::execute(args, self.json, config).await,
            Commands::Schedule(args) => commands::schedule::execute(args, self.json, config).await,
        }
    }
}

/// Report a command failure and exit non-zero.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    if json_mode {
        let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
        let body = serde_json::json!({ "error": err.to_string(), "causes": causes });
        eprintln!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err}", style("Error:").red().bold());
        for cause in err.chain().skip(1) {
            eprintln!("  {} {cause}", style("caused by:").dim());
        }
    }
    std::process::exit(1);
}
