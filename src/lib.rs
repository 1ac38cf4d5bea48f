//! # HealthPredict
//!
//! Local terminal dashboard over a patient visit file.
//!
//! This crate provides:
//! - Visit record loading with a load-once cache
//! - An identifier-based login gate
//! - A fixed-formula health score per visit
//! - Heart disease risk labels from a pre-trained classifier artifact
//! - Terminal UI for browsing the latest visit and visit history
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (VisitRecord, PatientHistory, Session, score, risk)
//! - `ports`: Trait definitions for the record source and the risk model
//! - `adapters`: Concrete implementations (CSV, JSON model, log sanitizer)
//! - `application`: Use cases orchestrating domain and ports
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{health_score, PatientId, RiskLabel, Session, VisitRecord};

/// Result type for HealthPredict operations
pub type Result<T> = std::result::Result<T, HealthPredictError>;

/// Main error type for HealthPredict
#[derive(Debug, thiserror::Error)]
pub enum HealthPredictError {
    #[error("Patient data unavailable: {0}")]
    DataUnavailable(#[from] ports::RecordError),

    #[error("Risk model unavailable: {0}")]
    ModelUnavailable(#[from] ports::ModelError),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
