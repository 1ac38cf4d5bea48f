//! Per-patient visit history.
//!
//! A patient is not stored on its own: it is the set of visits sharing an
//! identifier, ordered by visit date.

use super::visit::{PatientId, VisitRecord};

/// Visits for one patient, sorted ascending by `(visit_date, source_row)`.
///
/// Same-date visits keep file order, so the later row is treated as the
/// more recent one.
#[derive(Debug, Clone)]
pub struct PatientHistory {
    patient_id: PatientId,
    visits: Vec<VisitRecord>,
}

impl PatientHistory {
    /// Collect and order the visits belonging to `patient_id`.
    ///
    /// Returns `None` when the identifier has no visits.
    #[must_use]
    pub fn from_records(patient_id: &PatientId, records: &[VisitRecord]) -> Option<Self> {
        let mut visits: Vec<VisitRecord> = records
            .iter()
            .filter(|r| &r.patient_id == patient_id)
            .cloned()
            .collect();

        if visits.is_empty() {
            return None;
        }

        visits.sort_by_key(|v| (v.visit_date, v.source_row));

        Some(Self {
            patient_id: patient_id.clone(),
            visits,
        })
    }

    #[must_use]
    pub fn patient_id(&self) -> &PatientId {
        &self.patient_id
    }

    /// All visits, oldest first.
    #[must_use]
    pub fn visits(&self) -> &[VisitRecord] {
        &self.visits
    }

    /// The most recent visit.
    #[must_use]
    pub fn latest(&self) -> &VisitRecord {
        // Non-empty by construction.
        &self.visits[self.visits.len() - 1]
    }

    /// The earliest visit.
    #[must_use]
    pub fn first(&self) -> &VisitRecord {
        &self.visits[0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.visits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.visits.is_empty()
    }
}
