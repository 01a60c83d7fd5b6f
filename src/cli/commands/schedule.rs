//! Schedule CLI commands.

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::cli::output::{list_table, output, render_list, CommandOutput};
use crate::services::event_scheduler::JobInfo;

#[derive(Args, Debug)]
pub struct ScheduleArgs {
    #[command(subcommand)]
    pub command: ScheduleCommands,
}

#[derive(Subcommand, Debug)]
pub enum ScheduleCommands {
    /// List scheduled jobs and their next run
    List,
}

#[derive(Debug, Serialize)]
pub struct JobListOutput {
    pub jobs: Vec<JobInfo>,
    pub total: usize,
}

impl CommandOutput for JobListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["id", "event", "trigger", "next run"]);
        for job in &self.jobs {
            table.add_row(vec![
                job.id.clone(),
                job.event_type.clone(),
                job.trigger.clone(),
                job.next_run
                    .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M UTC").to_string()),
            ]);
        }
        render_list("job", &table, self.total)
    }
}

pub async fn execute(args: ScheduleArgs, json_mode: bool, config_path: Option<&Path>) -> Result<()> {
    match args.command {
        ScheduleCommands::List => {
            let config = super::load_config(config_path)?;
            let orchestrator = super::build_orchestrator(config).await?;

            let jobs = orchestrator.scheduler().list_jobs().await;
            let out = JobListOutput {
                total: jobs.len(),
                jobs,
            };
            output(&out, json_mode);
        }
    }
    Ok(())
}
