//! Adapters for external systems.

pub mod action_handlers;
pub mod static_sources;

pub use action_handlers::LoggingActionHandler;
pub use static_sources::{StaticCampaignSource, StaticHealthSource};
