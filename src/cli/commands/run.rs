//! `vaspera run`: start the orchestrator in the foreground.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use crate::infrastructure::logging::LoggerImpl;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Evaluate rules but never run action handlers
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn execute(args: RunArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = super::load_config(config_path)?;
    config.dry_run |= args.dry_run;

    let _logger = LoggerImpl::init(&config.logging)?;

    let orchestrator = super::build_orchestrator(config).await?;
    orchestrator.run().await
}
