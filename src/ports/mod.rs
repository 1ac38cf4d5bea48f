//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (visit file, model artifact).

mod record_source;
mod risk_model;

pub use record_source::{RecordError, RecordSource};
pub use risk_model::{ModelError, RiskModel};
