//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the login, dashboard and risk use cases.

mod dashboard;
mod gate;
mod records;
mod risk;

pub use dashboard::{DashboardService, DashboardView, HistoryEntry, PatientProfile};
pub use gate::{IdentityGate, LoginOutcome};
pub use records::RecordStore;
pub use risk::{RiskOutcome, RiskService};
