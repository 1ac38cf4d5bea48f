//! Composite health score.
//!
//! A fixed linear formula over a visit's vitals. No learned parameters.

use serde::{Deserialize, Serialize};

use super::visit::VisitRecord;

/// Starting value before penalties are subtracted.
pub const BASE_SCORE: f64 = 100.0;

const BMI_WEIGHT: f64 = 0.3;
const SYSTOLIC_WEIGHT: f64 = 0.2;
const DIASTOLIC_WEIGHT: f64 = 0.1;
const HEART_RATE_WEIGHT: f64 = 0.1;
const SMOKING_WEIGHT: f64 = 5.0;

const HEART_DISEASE_PENALTY: f64 = 15.0;
const DIABETES_PENALTY: f64 = 12.0;
const HEAVY_WEIGHT_PENALTY: f64 = 10.0;
const HYPERLIPIDEMIA_PENALTY: f64 = 12.0;

/// Weight (kg) above which the heavy-weight penalty applies.
const HEAVY_WEIGHT_KG: f64 = 100.0;

/// Compute the health score for a single visit.
///
/// Missing fields skip their term. The result is not clamped and may fall
/// outside `[0, 100]`.
#[must_use]
pub fn health_score(visit: &VisitRecord) -> f64 {
    let linear = [
        (visit.bmi, BMI_WEIGHT),
        (visit.systolic_bp, SYSTOLIC_WEIGHT),
        (visit.diastolic_bp, DIASTOLIC_WEIGHT),
        (visit.heart_rate, HEART_RATE_WEIGHT),
        (visit.smoking, SMOKING_WEIGHT),
    ];

    let mut score = BASE_SCORE;
    for (value, weight) in linear {
        if let Some(v) = value {
            score -= weight * v;
        }
    }

    if visit.heart_disease == Some(true) {
        score -= HEART_DISEASE_PENALTY;
    }
    if visit.diabetes == Some(true) {
        score -= DIABETES_PENALTY;
    }
    if visit.weight_kg.is_some_and(|w| w > HEAVY_WEIGHT_KG) {
        score -= HEAVY_WEIGHT_PENALTY;
    }
    if visit.hyperlipidemia == Some(true) {
        score -= HYPERLIPIDEMIA_PENALTY;
    }

    score
}

/// Display band for a score, matching the dashboard gauge colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreBand {
    /// 60 or below
    Poor,
    /// Above 60, up to 80
    Fair,
    /// Above 80
    Good,
}

impl ScoreBand {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score > 80.0 {
            Self::Good
        } else if score > 60.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

impl std::fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Poor => write!(f, "POOR"),
            Self::Fair => write!(f, "FAIR"),
            Self::Good => write!(f, "GOOD"),
        }
    }
}
