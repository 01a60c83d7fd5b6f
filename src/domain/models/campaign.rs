//! Ad campaign metrics as reported by an ad platform.

use serde::{Deserialize, Serialize};

use super::context::Context;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignMetrics {
    pub campaign_id: String,
    pub campaign_name: String,
    pub platform: String,
    pub product_id: String,
    pub spend: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    #[serde(default)]
    pub revenue: f64,
    /// Impressions per user, when the platform reports it.
    #[serde(default)]
    pub frequency: f64,
    #[serde(default)]
    pub spend_today: f64,
    #[serde(default)]
    pub in_learning_phase: bool,
}

impl CampaignMetrics {
    /// Click-through rate.
    pub fn ctr(&self) -> f64 {
        if self.impressions > 0 {
            self.clicks as f64 / self.impressions as f64
        } else {
            0.0
        }
    }

    /// Cost per click.
    pub fn cpc(&self) -> f64 {
        if self.clicks > 0 {
            self.spend / self.clicks as f64
        } else {
            0.0
        }
    }

    /// Cost per acquisition, `None` without conversions (unbounded).
    pub fn cpa(&self) -> Option<f64> {
        (self.conversions > 0).then(|| self.spend / self.conversions as f64)
    }

    /// Return on ad spend.
    pub fn roas(&self) -> f64 {
        if self.spend > 0.0 {
            self.revenue / self.spend
        } else {
            0.0
        }
    }

    /// Rule context for this campaign.
    ///
    /// `cpa` is omitted when there are no conversions; the ads rules read
    /// a missing `cpa` as +infinity.
    pub fn to_context(&self) -> Context {
        let mut ctx = Context::new()
            .with("campaign_id", self.campaign_id.as_str())
            .with("campaign_name", self.campaign_name.as_str())
            .with("platform", self.platform.as_str())
            .with("product_id", self.product_id.as_str())
            .with("spend", self.spend)
            .with("impressions", self.impressions)
            .with("clicks", self.clicks)
            .with("conversions", self.conversions)
            .with("ctr", self.ctr())
            .with("cpc", self.cpc())
            .with("roas", self.roas())
            .with("frequency", self.frequency)
            .with("spend_today", self.spend_today)
            .with("in_learning_phase", self.in_learning_phase);
        if let Some(cpa) = self.cpa() {
            ctx.insert("cpa", cpa);
        }
        ctx
    }
}
