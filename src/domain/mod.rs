//! Domain layer: Core types and pure logic.
//!
//! Visit records, per-patient history, the health score formula, risk model
//! feature layouts and the session object. No I/O happens here.

mod history;
pub mod risk;
pub mod score;
mod session;
mod visit;

pub use history::PatientHistory;
pub use risk::{Feature, RiskLabel, RiskLevel, RiskPrediction, CLINICAL_10, VITALS_4};
pub use score::{health_score, ScoreBand};
pub use session::Session;
pub use visit::{Demographics, PatientId, VisitRecord};
