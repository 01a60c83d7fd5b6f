//! Vaspera - multi-agent business automation orchestrator
//!
//! Agents react to events (scheduled ticks, monitoring signals, support
//! chats) and decide what to do through a priority-ordered rules engine.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and data-source ports
//! - **Service Layer** (`services`): rules engine, rule sets, event bus, scheduler
//! - **Application Layer** (`application`): agents and the orchestrator
//! - **Adapters** (`adapters`): in-memory data sources, action handlers
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use vaspera::application::{Orchestrator, Sources};
//! use vaspera::adapters::{StaticCampaignSource, StaticHealthSource};
//! use vaspera::infrastructure::config::ConfigLoader;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let sources = Sources {
//!         campaigns: Arc::new(StaticCampaignSource::with_fixtures()),
//!         health: Arc::new(StaticHealthSource::new()),
//!     };
//!     Orchestrator::new(config, sources).await?.run().await
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use application::{Agent, Orchestrator, Sources};
pub use domain::models::{Config, Context, Event, Rule, RuleAction};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{EventBus, EventScheduler, RulesEngine};
