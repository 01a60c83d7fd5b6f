//! Domain layer for the Vaspera orchestrator
//!
//! Core models, typed errors and the ports that adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{ConditionError, DomainError, DomainResult};
