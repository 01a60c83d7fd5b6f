//! Port trait definitions (Hexagonal Architecture)
//!
//! Async interfaces that adapters implement:
//! - CampaignSource: ad platform campaign metrics
//! - HealthSource: product health metrics

pub mod metrics_source;

pub use metrics_source::{CampaignSource, HealthSource};
