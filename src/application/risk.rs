//! Risk service: Runs the heart disease classifier on a visit.
//!
//! A missing or corrupt model is not fatal. The service remembers why the
//! model is unavailable and every assessment reports that reason instead of
//! a label.

use std::path::Path;
use std::sync::Arc;

use crate::adapters::JsonRiskModel;
use crate::domain::risk::feature_vector;
use crate::domain::{RiskPrediction, VisitRecord};
use crate::ports::{ModelError, RiskModel};
use crate::HealthPredictError;

/// Result of assessing one visit.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskOutcome {
    Predicted(RiskPrediction),
    /// Prediction not shown, with the reason.
    Unavailable(String),
}

enum ModelState<M> {
    Ready(Arc<M>),
    Unavailable(String),
}

/// Service wrapping an optional risk model.
pub struct RiskService<M>
where
    M: RiskModel,
{
    state: ModelState<M>,
}

impl RiskService<JsonRiskModel> {
    /// Load the JSON model artifact from `dir`.
    ///
    /// Never fails: a load error leaves the service in the unavailable state.
    pub fn load(dir: &Path) -> Self {
        match JsonRiskModel::load(dir) {
            Ok(model) => Self::new(Arc::new(model)),
            Err(e) => {
                tracing::error!("Risk model unavailable at {:?}: {}", dir, e);
                Self::unavailable(e.to_string())
            }
        }
    }
}

impl<M> RiskService<M>
where
    M: RiskModel,
{
    pub fn new(model: Arc<M>) -> Self {
        Self {
            state: ModelState::Ready(model),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: ModelState::Unavailable(reason.into()),
        }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(self.state, ModelState::Ready(_))
    }

    /// Predict the risk label for a visit.
    ///
    /// # Errors
    /// Returns `HealthPredictError::ModelUnavailable` if no model is loaded,
    /// the visit lacks a model feature, or inference fails.
    pub fn predict(&self, visit: &VisitRecord) -> Result<RiskPrediction, HealthPredictError> {
        let model = match &self.state {
            ModelState::Ready(model) => model,
            ModelState::Unavailable(reason) => {
                return Err(ModelError::NotLoaded(reason.clone()).into());
            }
        };

        let features =
            feature_vector(visit, model.features()).map_err(ModelError::MissingFeature)?;
        let prediction = model.predict(&features)?;

        tracing::debug!(
            "Risk prediction: label={}, probability={:?}",
            prediction.label,
            prediction.probability
        );
        Ok(prediction)
    }

    /// Assess a visit without failing.
    #[must_use]
    pub fn assess(&self, visit: &VisitRecord) -> RiskOutcome {
        match &self.state {
            ModelState::Unavailable(reason) => RiskOutcome::Unavailable(reason.clone()),
            ModelState::Ready(_) => match self.predict(visit) {
                Ok(prediction) => RiskOutcome::Predicted(prediction),
                Err(e) => {
                    tracing::warn!("Risk prediction skipped: {}", e);
                    RiskOutcome::Unavailable(e.to_string())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::model::{ExportedModel, ModelKind};
    use crate::domain::{PatientId, RiskLabel, VITALS_4};
    use chrono::NaiveDate;

    fn model() -> JsonRiskModel {
        JsonRiskModel::from_exported(ExportedModel {
            kind: ModelKind::LinearSvc,
            feature_names: VITALS_4.iter().map(|f| f.name().to_string()).collect(),
            coefficients: vec![0.0, 1.0, 0.0, 0.0],
            intercept: -130.0,
            threshold: 0.5,
            scaler: None,
        })
        .expect("valid model")
    }

    fn visit(systolic: f64) -> VisitRecord {
        let mut v = VisitRecord::new(
            PatientId::parse("P001").expect("id"),
            NaiveDate::from_ymd_opt(2024, 2, 1).expect("date"),
        );
        v.bmi = Some(24.0);
        v.systolic_bp = Some(systolic);
        v.diastolic_bp = Some(80.0);
        v.heart_rate = Some(70.0);
        v
    }

    #[test]
    fn test_predicts_with_model() {
        let service = RiskService::new(Arc::new(model()));
        assert!(service.is_available());
        assert_eq!(
            service.predict(&visit(140.0)).expect("predict").label,
            RiskLabel::Yes
        );
        assert_eq!(
            service.assess(&visit(120.0)),
            RiskOutcome::Predicted(RiskPrediction::from_label(RiskLabel::No))
        );
    }

    #[test]
    fn test_missing_artifact_fails_closed() {
        let service = RiskService::load(Path::new("/nonexistent/model"));
        assert!(!service.is_available());
        assert!(matches!(
            service.predict(&visit(140.0)),
            Err(HealthPredictError::ModelUnavailable(_))
        ));
        assert!(matches!(
            service.assess(&visit(140.0)),
            RiskOutcome::Unavailable(_)
        ));
    }

    #[test]
    fn test_missing_feature_is_unavailable() {
        let service = RiskService::new(Arc::new(model()));
        let mut v = visit(140.0);
        v.heart_rate = None;
        match service.assess(&v) {
            RiskOutcome::Unavailable(reason) => assert!(reason.contains("Heart_Rate")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
