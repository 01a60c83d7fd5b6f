//! Common test utilities for integration tests
//!
//! Shared fixtures for configs, campaigns and health snapshots.

#![allow(dead_code)]

use std::time::{Duration, Instant};

use chrono::Utc;
use vaspera::domain::models::{
    CampaignMetrics, Config, EventBusConfig, HealthStatus, ProductConfig, ProductHealth, SchedulerConfig,
};

/// Two products, fast bus and scheduler loops, no default schedules.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.event_bus = EventBusConfig { poll_interval_ms: 20 };
    config.scheduler = SchedulerConfig {
        tick_interval_ms: 20,
        max_jobs: 100,
        default_schedules: false,
    };
    config
        .products
        .insert("vaspera-memory".to_string(), ProductConfig::new("VasperaMemory"));
    config
        .products
        .insert("nutrifit-ai".to_string(), ProductConfig::new("NutriFitAI"));
    config
}

pub fn campaign(id: &str, product_id: &str, spend: f64, conversions: u64) -> CampaignMetrics {
    CampaignMetrics {
        campaign_id: id.to_string(),
        campaign_name: format!("{id} campaign"),
        platform: "google".to_string(),
        product_id: product_id.to_string(),
        spend,
        impressions: 10_000,
        clicks: 500,
        conversions,
        revenue: 0.0,
        frequency: 0.0,
        spend_today: 0.0,
        in_learning_phase: false,
    }
}

pub fn health(product_id: &str, error_rate: f64, response_time_p95: f64, uptime: f64) -> ProductHealth {
    ProductHealth {
        product_id: product_id.to_string(),
        status: HealthStatus::Healthy,
        error_rate,
        response_time_p95,
        uptime,
        active_users: 100,
        last_deploy: None,
        open_incidents: 0,
        checked_at: Utc::now(),
    }
}

/// Setup test logging
///
/// Initializes a tracing subscriber that writes through the test harness.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Poll a predicate every 10ms until it holds or the timeout passes.
pub async fn wait_for<F>(mut predicate: F, timeout_ms: u64) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    predicate()
}
