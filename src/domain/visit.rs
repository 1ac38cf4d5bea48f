//! Visit records for the patient dashboard.
//!
//! One record per dated visit. Records are read-only once loaded.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Patient identifier as it appears in the visit file.
///
/// Identifiers are stored trimmed. Comparison is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatientId(String);

impl PatientId {
    /// Build an identifier from raw input, trimming surrounding whitespace.
    ///
    /// Returns `None` for empty or whitespace-only input.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PatientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Demographic columns carried by some visit files.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub age: Option<u32>,
}

impl Demographics {
    /// Full display name, if any part of it is known.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => Some(format!("{first} {last}")),
            (Some(first), None) => Some(first.clone()),
            (None, Some(last)) => Some(last.clone()),
            (None, None) => None,
        }
    }
}

/// A single dated measurement event for one patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub patient_id: PatientId,
    pub visit_date: NaiveDate,

    /// 1-based data row in the source file. Breaks same-date ties.
    pub source_row: usize,

    /// Height in centimetres
    pub height_cm: Option<f64>,
    /// Weight in kilograms
    pub weight_kg: Option<f64>,
    pub bmi: Option<f64>,
    /// Systolic blood pressure in mmHg
    pub systolic_bp: Option<f64>,
    /// Diastolic blood pressure in mmHg
    pub diastolic_bp: Option<f64>,
    /// Heart rate in bpm
    pub heart_rate: Option<f64>,

    /// Smoking status: 0 = no, 1 = yes
    pub smoking: Option<f64>,
    pub diabetes: Option<bool>,
    pub hyperlipidemia: Option<bool>,
    pub heart_disease: Option<bool>,

    /// Health score as recorded in the file, if the file carries one.
    pub recorded_score: Option<f64>,
    /// Risk label as recorded in the file, if the file carries one.
    pub recorded_risk: Option<String>,

    pub demographics: Demographics,
}

impl VisitRecord {
    /// Create a record with only the mandatory fields set.
    #[must_use]
    pub fn new(patient_id: PatientId, visit_date: NaiveDate) -> Self {
        Self {
            patient_id,
            visit_date,
            source_row: 0,
            height_cm: None,
            weight_kg: None,
            bmi: None,
            systolic_bp: None,
            diastolic_bp: None,
            heart_rate: None,
            smoking: None,
            diabetes: None,
            hyperlipidemia: None,
            heart_disease: None,
            recorded_score: None,
            recorded_risk: None,
            demographics: Demographics::default(),
        }
    }

    /// Blood pressure formatted as `systolic/diastolic`.
    #[must_use]
    pub fn blood_pressure(&self) -> Option<String> {
        match (self.systolic_bp, self.diastolic_bp) {
            (Some(sys), Some(dia)) => Some(format!("{sys:.0}/{dia:.0}")),
            _ => None,
        }
    }

    /// Whether the patient was recorded as a smoker at this visit.
    #[must_use]
    pub fn is_smoker(&self) -> Option<bool> {
        self.smoking.map(|s| s >= 0.5)
    }
}
