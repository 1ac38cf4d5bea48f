//! Dashboard service: Assembles the per-patient view.
//!
//! Selects the session's visits, orders them by date, scores every visit and
//! runs the risk model on the most recent one only.

use std::sync::Arc;

use crate::domain::{
    health_score, PatientHistory, PatientId, ScoreBand, Session, VisitRecord,
};
use crate::ports::{RecordSource, RiskModel};
use crate::HealthPredictError;

use super::records::RecordStore;
use super::risk::{RiskOutcome, RiskService};

/// Patient details shown in the information panel.
///
/// Each field comes from the most recent visit that carries it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientProfile {
    pub name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub age: Option<u32>,
    pub smoker: Option<bool>,
}

impl PatientProfile {
    fn from_history(history: &PatientHistory) -> Self {
        let newest_first = || history.visits().iter().rev();
        Self {
            name: newest_first().find_map(|v| v.demographics.full_name()),
            gender: newest_first().find_map(|v| v.demographics.gender.clone()),
            date_of_birth: newest_first().find_map(|v| v.demographics.date_of_birth.clone()),
            age: newest_first().find_map(|v| v.demographics.age),
            smoker: newest_first().find_map(VisitRecord::is_smoker),
        }
    }
}

/// One row of the visit history with its computed score.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub visit: VisitRecord,
    pub score: f64,
}

/// Everything the dashboard renders for one patient.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub patient_id: PatientId,
    pub profile: PatientProfile,
    pub latest: VisitRecord,
    pub score: f64,
    pub band: ScoreBand,
    /// Visits in ascending date order.
    pub history: Vec<HistoryEntry>,
    pub risk: RiskOutcome,
}

impl DashboardView {
    /// Computed scores in visit order.
    #[must_use]
    pub fn trend(&self) -> Vec<f64> {
        self.history.iter().map(|e| e.score).collect()
    }

    /// Change in score since the previous visit.
    #[must_use]
    pub fn score_change(&self) -> Option<f64> {
        let n = self.history.len();
        if n < 2 {
            return None;
        }
        Some(self.history[n - 1].score - self.history[n - 2].score)
    }
}

pub struct DashboardService<S, M>
where
    S: RecordSource,
    M: RiskModel,
{
    records: Arc<RecordStore<S>>,
    risk: Arc<RiskService<M>>,
}

impl<S, M> DashboardService<S, M>
where
    S: RecordSource,
    M: RiskModel,
{
    pub fn new(records: Arc<RecordStore<S>>, risk: Arc<RiskService<M>>) -> Self {
        Self { records, risk }
    }

    /// Build the view for the logged-in patient.
    ///
    /// # Errors
    /// Returns `Validation` without an authenticated session or when the
    /// patient has no visits, and `DataUnavailable` if records cannot load.
    pub fn build(&self, session: &Session) -> Result<DashboardView, HealthPredictError> {
        let patient_id = session
            .patient_id()
            .ok_or_else(|| HealthPredictError::Validation("Not logged in".into()))?;

        let records = self.records.records()?;
        let history = PatientHistory::from_records(patient_id, &records).ok_or_else(|| {
            HealthPredictError::Validation(format!("No visits for patient {patient_id}"))
        })?;

        let latest = history.latest().clone();
        let score = health_score(&latest);
        let risk = self.risk.assess(&latest);

        let entries = history
            .visits()
            .iter()
            .map(|visit| HistoryEntry {
                visit: visit.clone(),
                score: health_score(visit),
            })
            .collect();

        tracing::debug!(
            "Dashboard built: visits={}, latest={}, score={:.1}",
            history.len(),
            latest.visit_date,
            score
        );

        Ok(DashboardView {
            patient_id: patient_id.clone(),
            profile: PatientProfile::from_history(&history),
            latest,
            score,
            band: ScoreBand::from_score(score),
            history: entries,
            risk,
        })
    }
}
