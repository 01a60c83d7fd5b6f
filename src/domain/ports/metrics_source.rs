//! Data-source ports for the agents.
//!
//! Ad platforms and monitoring backends sit behind these traits so that
//! agents only ever see domain models.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CampaignMetrics, ProductHealth};

/// Source of ad campaign metrics.
#[async_trait]
pub trait CampaignSource: Send + Sync {
    /// All campaigns currently running for a product.
    async fn campaigns(&self, product_id: &str) -> DomainResult<Vec<CampaignMetrics>>;
}

/// Source of product health snapshots.
#[async_trait]
pub trait HealthSource: Send + Sync {
    async fn health(&self, product_id: &str) -> DomainResult<ProductHealth>;
}
