//! In-memory campaign and health sources.
//!
//! Stand-ins for the ad platform and monitoring APIs. They serve fixed
//! fixtures and can be updated at runtime, which is what the CLI and the
//! integration tests run against.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CampaignMetrics, HealthStatus, ProductHealth};
use crate::domain::ports::{CampaignSource, HealthSource};

/// Campaigns held in memory, filtered per product on read.
#[derive(Debug, Default)]
pub struct StaticCampaignSource {
    campaigns: RwLock<Vec<CampaignMetrics>>,
}

impl StaticCampaignSource {
    pub fn new(campaigns: Vec<CampaignMetrics>) -> Self {
        Self {
            campaigns: RwLock::new(campaigns),
        }
    }

    /// One Google campaign that converts and one Meta campaign with spend
    /// but no conversions.
    pub fn with_fixtures() -> Self {
        Self::new(vec![
            CampaignMetrics {
                campaign_id: "goog_1".to_string(),
                campaign_name: "VasperaMemory - AI Memory Tools".to_string(),
                platform: "google".to_string(),
                product_id: "vaspera-memory".to_string(),
                spend: 150.0,
                impressions: 10_000,
                clicks: 500,
                conversions: 5,
                revenue: 0.0,
                frequency: 0.0,
                spend_today: 0.0,
                in_learning_phase: false,
            },
            CampaignMetrics {
                campaign_id: "meta_1".to_string(),
                campaign_name: "NutriFitAI - Fitness App".to_string(),
                platform: "meta".to_string(),
                product_id: "nutrifit-ai".to_string(),
                spend: 200.0,
                impressions: 25_000,
                clicks: 750,
                conversions: 0,
                revenue: 0.0,
                frequency: 0.0,
                spend_today: 0.0,
                in_learning_phase: false,
            },
        ])
    }

    /// Insert or replace a campaign by id.
    pub async fn upsert(&self, campaign: CampaignMetrics) {
        let mut campaigns = self.campaigns.write().await;
        match campaigns.iter_mut().find(|c| c.campaign_id == campaign.campaign_id) {
            Some(existing) => *existing = campaign,
            None => campaigns.push(campaign),
        }
    }
}

#[async_trait]
impl CampaignSource for StaticCampaignSource {
    async fn campaigns(&self, product_id: &str) -> DomainResult<Vec<CampaignMetrics>> {
        Ok(self
            .campaigns
            .read()
            .await
            .iter()
            .filter(|c| c.product_id == product_id)
            .cloned()
            .collect())
    }
}

/// Health snapshots held in memory.
///
/// Products without an explicit snapshot report a healthy baseline.
#[derive(Debug, Default)]
pub struct StaticHealthSource {
    overrides: RwLock<HashMap<String, ProductHealth>>,
}

impl StaticHealthSource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_health(mut self, health: ProductHealth) -> Self {
        self.overrides
            .get_mut()
            .insert(health.product_id.clone(), health);
        self
    }

    pub async fn set_health(&self, health: ProductHealth) {
        self.overrides
            .write()
            .await
            .insert(health.product_id.clone(), health);
    }

    fn baseline(product_id: &str) -> ProductHealth {
        let now = Utc::now();
        ProductHealth {
            product_id: product_id.to_string(),
            status: HealthStatus::Healthy,
            error_rate: 0.5,
            response_time_p95: 450.0,
            uptime: 99.99,
            active_users: 150,
            last_deploy: Some(now - Duration::hours(6)),
            open_incidents: 0,
            checked_at: now,
        }
    }
}

#[async_trait]
impl HealthSource for StaticHealthSource {
    async fn health(&self, product_id: &str) -> DomainResult<ProductHealth> {
        let overrides = self.overrides.read().await;
        Ok(overrides.get(product_id).cloned().map_or_else(
            || Self::baseline(product_id),
            |mut h| {
                h.checked_at = Utc::now();
                h
            },
        ))
    }
}
