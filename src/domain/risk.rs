//! Heart disease risk types and model feature layouts.

use serde::{Deserialize, Serialize};

use super::visit::VisitRecord;

/// Binary label produced by the risk classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLabel {
    No,
    Yes,
}

impl RiskLabel {
    #[must_use]
    pub fn from_class(class: u8) -> Self {
        if class == 0 {
            Self::No
        } else {
            Self::Yes
        }
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::No => write!(f, "No"),
            Self::Yes => write!(f, "Yes"),
        }
    }
}

/// Risk level classification, available when the model yields a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Low risk of heart disease
    Low,
    /// Moderate risk, monitoring recommended
    Moderate,
    /// High risk, intervention recommended
    High,
}

impl RiskLevel {
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability < 0.3 {
            Self::Low
        } else if probability < 0.7 {
            Self::Moderate
        } else {
            Self::High
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Low risk - No significant indicators",
            Self::Moderate => "Moderate risk - Follow-up recommended",
            Self::High => "High risk - Consultation advised",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Output of one classifier call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    pub label: RiskLabel,

    /// Positive-class probability, for models that produce one.
    pub probability: Option<f64>,
}

impl RiskPrediction {
    /// Prediction from a probability and decision threshold.
    #[must_use]
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        let label = if probability >= threshold {
            RiskLabel::Yes
        } else {
            RiskLabel::No
        };
        Self {
            label,
            probability: Some(probability),
        }
    }

    /// Prediction from a bare class label.
    #[must_use]
    pub fn from_label(label: RiskLabel) -> Self {
        Self {
            label,
            probability: None,
        }
    }

    #[must_use]
    pub fn risk_level(&self) -> Option<RiskLevel> {
        self.probability.map(RiskLevel::from_probability)
    }
}

/// A visit column that a risk model can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    HeightCm,
    WeightKg,
    Bmi,
    SystolicBp,
    DiastolicBp,
    HeartRate,
    SmokingStatus,
    Diabetes,
    Hyperlipidemia,
    HeartDisease,
}

/// `[BMI, Systolic_BP, Diastolic_BP, Heart_Rate]`
pub const VITALS_4: [Feature; 4] = [
    Feature::Bmi,
    Feature::SystolicBp,
    Feature::DiastolicBp,
    Feature::HeartRate,
];

/// `[Height_cm, BMI, Weight_kg, Diastolic_BP, Heart_Rate, Systolic_BP,
/// Smoking_Status, Diabetes, Hyperlipidemia, Heart_Disease]`
pub const CLINICAL_10: [Feature; 10] = [
    Feature::HeightCm,
    Feature::Bmi,
    Feature::WeightKg,
    Feature::DiastolicBp,
    Feature::HeartRate,
    Feature::SystolicBp,
    Feature::SmokingStatus,
    Feature::Diabetes,
    Feature::Hyperlipidemia,
    Feature::HeartDisease,
];

impl Feature {
    /// Canonical column name used in model artifacts.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::HeightCm => "Height_cm",
            Self::WeightKg => "Weight_kg",
            Self::Bmi => "BMI",
            Self::SystolicBp => "Systolic_BP",
            Self::DiastolicBp => "Diastolic_BP",
            Self::HeartRate => "Heart_Rate",
            Self::SmokingStatus => "Smoking_Status",
            Self::Diabetes => "Diabetes",
            Self::Hyperlipidemia => "Hyperlipidemia",
            Self::HeartDisease => "Heart_Disease",
        }
    }

    /// Resolve an artifact feature name, ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let all = [
            Self::HeightCm,
            Self::WeightKg,
            Self::Bmi,
            Self::SystolicBp,
            Self::DiastolicBp,
            Self::HeartRate,
            Self::SmokingStatus,
            Self::Diabetes,
            Self::Hyperlipidemia,
            Self::HeartDisease,
        ];
        all.into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Read this feature from a visit. Flags map to 0/1.
    #[must_use]
    pub fn value(&self, visit: &VisitRecord) -> Option<f64> {
        let flag = |b: Option<bool>| b.map(|b| if b { 1.0 } else { 0.0 });
        match self {
            Self::HeightCm => visit.height_cm,
            Self::WeightKg => visit.weight_kg,
            Self::Bmi => visit.bmi,
            Self::SystolicBp => visit.systolic_bp,
            Self::DiastolicBp => visit.diastolic_bp,
            Self::HeartRate => visit.heart_rate,
            Self::SmokingStatus => visit.smoking,
            Self::Diabetes => flag(visit.diabetes),
            Self::Hyperlipidemia => flag(visit.hyperlipidemia),
            Self::HeartDisease => flag(visit.heart_disease),
        }
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Build the ordered feature vector for `layout`.
///
/// # Errors
/// Returns the first feature the visit has no value for.
pub fn feature_vector(visit: &VisitRecord, layout: &[Feature]) -> Result<Vec<f64>, Feature> {
    layout
        .iter()
        .map(|f| f.value(visit).ok_or(*f))
        .collect()
}
