//! Risk model port: Trait for the opaque heart disease classifier.
//!
//! This trait abstracts the serialized model format from the application logic.

use crate::domain::{Feature, RiskPrediction};

/// Errors that make the risk model unavailable.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model artifact not found: {0}")]
    NotFound(String),

    #[error("Failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid model artifact: {0}")]
    Invalid(String),

    #[error("Model integrity check failed: {0}")]
    Integrity(String),

    #[error("Feature count mismatch: got {got}, expected {expected}")]
    FeatureCount { got: usize, expected: usize },

    #[error("Visit is missing model feature {0}")]
    MissingFeature(Feature),

    /// Load failed earlier; carries the original reason.
    #[error("{0}")]
    NotLoaded(String),
}

/// Trait for a pre-trained classifier.
///
/// Implementations own any feature scaling they were fitted with.
pub trait RiskModel: Send + Sync {
    /// Features the model expects, in order.
    fn features(&self) -> &[Feature];

    /// Classify one raw (unscaled) feature vector.
    ///
    /// # Errors
    /// Returns `ModelError::FeatureCount` if `features` has the wrong length.
    fn predict(&self, features: &[f64]) -> Result<RiskPrediction, ModelError>;
}
