//! CLI command implementations.

pub mod event;
pub mod rules;
pub mod run;
pub mod schedule;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::static_sources::{StaticCampaignSource, StaticHealthSource};
use crate::application::orchestrator::{Orchestrator, Sources};
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

pub(crate) fn load_config(path: Option<&Path>) -> Result<Config> {
    ConfigLoader::resolve(path).context("Failed to load configuration")
}

/// Fixture-backed data sources until platform adapters are configured.
pub(crate) fn fixture_sources() -> Sources {
    Sources {
        campaigns: Arc::new(StaticCampaignSource::with_fixtures()),
        health: Arc::new(StaticHealthSource::new()),
    }
}

pub(crate) async fn build_orchestrator(config: Config) -> Result<Orchestrator> {
    Orchestrator::new(config, fixture_sources())
        .await
        .context("Failed to build orchestrator")
}
