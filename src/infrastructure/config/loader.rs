use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Project config directory, relative to the working directory.
pub const CONFIG_DIR: &str = ".vaspera";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid event_bus.poll_interval_ms: must be greater than 0")]
    InvalidPollInterval,

    #[error("Invalid scheduler.tick_interval_ms: must be greater than 0")]
    InvalidTickInterval,

    #[error("Invalid scheduler.max_jobs: must be at least 1")]
    InvalidMaxJobs,

    #[error("Invalid target_cpa for product '{product}': {value}. Must be positive")]
    InvalidTargetCpa { product: String, value: f64 },

    #[error("Invalid monthly_ad_budget for product '{product}': {value}. Cannot be negative")]
    InvalidBudget { product: String, value: f64 },

    #[error("Invalid monitor thresholds: {metric} critical ({critical}) is below warning ({warning})")]
    InvalidThresholds { metric: &'static str, warning: f64, critical: f64 },

    #[error("Invalid monitor.uptime: {0}. Must be in (0, 100]")]
    InvalidUptime(f64),

    #[error("Agent '{0}' has a trigger with an empty event type")]
    EmptyTrigger(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .vaspera/config.yaml (project config)
    /// 3. .vaspera/local.yaml (local overrides, optional)
    /// 4. Environment variables (VASPERA_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(Path::new(CONFIG_DIR).join("config.yaml")))
            .merge(Yaml::file(Path::new(CONFIG_DIR).join("local.yaml")))
            .merge(Env::prefixed("VASPERA_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// An explicit file when given, the project hierarchy otherwise.
    pub fn resolve(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Self::load(),
        }
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if config.event_bus.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval);
        }
        if config.scheduler.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidTickInterval);
        }
        if config.scheduler.max_jobs == 0 {
            return Err(ConfigError::InvalidMaxJobs);
        }

        for (id, product) in &config.products {
            if product.target_cpa <= 0.0 {
                return Err(ConfigError::InvalidTargetCpa {
                    product: id.clone(),
                    value: product.target_cpa,
                });
            }
            if product.monthly_ad_budget < 0.0 {
                return Err(ConfigError::InvalidBudget {
                    product: id.clone(),
                    value: product.monthly_ad_budget,
                });
            }
        }

        let m = &config.monitor;
        if m.error_rate_critical < m.error_rate {
            return Err(ConfigError::InvalidThresholds {
                metric: "error_rate",
                warning: m.error_rate,
                critical: m.error_rate_critical,
            });
        }
        if m.response_time_critical < m.response_time_p95 {
            return Err(ConfigError::InvalidThresholds {
                metric: "response_time",
                warning: m.response_time_p95,
                critical: m.response_time_critical,
            });
        }
        if m.uptime <= 0.0 || m.uptime > 100.0 {
            return Err(ConfigError::InvalidUptime(m.uptime));
        }

        for (id, agent) in &config.agents {
            if agent.triggers.iter().any(|t| t.event_type.trim().is_empty()) {
                return Err(ConfigError::EmptyTrigger(id.clone()));
            }
        }

        Ok(())
    }
}
