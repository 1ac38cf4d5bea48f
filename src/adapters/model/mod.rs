//! Model adapter: Implementation of RiskModel over a JSON artifact directory.
//!
//! The classifier is trained elsewhere and exported as plain parameters.
//! A model directory contains:
//!
//! - `model.json`: classifier kind, feature names, coefficients, intercept
//! - `scaler.json` (optional): pre-fitted standard scaler, overrides any
//!   scaler embedded in `model.json`
//! - `features.json` (optional): explicit feature-name list, overrides the
//!   names in `model.json`
//! - `manifest.json` (optional): SHA-256 digests binding the files above
//!
//! # Integrity
//!
//! When a manifest is present every file it lists must exist and hash to the
//! recorded digest, `model.json` must be among them, and a `scaler.json` or
//! `features.json` it does not list is rejected. A directory without a
//! manifest is loaded as-is.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::{Feature, RiskLabel, RiskPrediction};
use crate::ports::{ModelError, RiskModel};

pub const MODEL_FILE: &str = "model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const FEATURES_FILE: &str = "features.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Classifier family of the exported model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// `sigmoid(w·x + b) >= threshold`
    LogisticRegression,
    /// `w·x + b >= 0`, no probability
    LinearSvc,
}

/// Pre-fitted standard scaler: `(x - mean) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

fn default_threshold() -> f64 {
    0.5
}

/// Model parameters as written by the training pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedModel {
    pub kind: ModelKind,
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default)]
    pub scaler: Option<ExportedScaler>,
}

/// Digest manifest written by the `bind_model` tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: u32,
    pub files: BTreeMap<String, String>,
}

/// Hex-encoded SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

// Constant-time compare for ASCII strings (used for SHA-256 hex digests).
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn parse_json<T: serde::de::DeserializeOwned>(name: &str, bytes: &[u8]) -> Result<T, ModelError> {
    serde_json::from_slice(bytes).map_err(|e| ModelError::Invalid(format!("{name}: {e}")))
}

// Bytes of the artifact files present in a model directory, keyed by file name.
// Parsing, digest checks and binding all work from this single read.
fn read_artifact(dir: &Path) -> Result<BTreeMap<String, Vec<u8>>, ModelError> {
    let model_path = dir.join(MODEL_FILE);
    if !model_path.exists() {
        return Err(ModelError::NotFound(model_path.display().to_string()));
    }

    let mut files = BTreeMap::new();
    for rel in [MODEL_FILE, SCALER_FILE, FEATURES_FILE] {
        let path = dir.join(rel);
        if path.exists() {
            files.insert(rel.to_string(), fs::read(&path)?);
        }
    }
    Ok(files)
}

fn verify_manifest(dir: &Path, artifact: &BTreeMap<String, Vec<u8>>) -> Result<(), ModelError> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        tracing::debug!("No model manifest at {:?}, skipping digest check", manifest_path);
        return Ok(());
    }

    let manifest: ModelManifest = parse_json(MANIFEST_FILE, &fs::read(&manifest_path)?)?;
    if manifest.version != 1 {
        return Err(ModelError::Integrity(format!(
            "Unsupported manifest version: {}",
            manifest.version
        )));
    }
    if !manifest.files.contains_key(MODEL_FILE) {
        return Err(ModelError::Integrity(format!(
            "manifest.json must bind {MODEL_FILE}"
        )));
    }

    // A file that would be loaded must be bound.
    if let Some(rel) = artifact.keys().find(|rel| !manifest.files.contains_key(*rel)) {
        return Err(ModelError::Integrity(format!(
            "{rel} is present but not bound by manifest.json"
        )));
    }

    for (rel, expected_hex) in &manifest.files {
        let actual_hex = match artifact.get(rel) {
            Some(bytes) => sha256_hex(bytes),
            None => {
                let path = dir.join(rel);
                let bytes = fs::read(&path).map_err(|e| {
                    ModelError::Integrity(format!(
                        "Manifest references missing/unreadable file {:?}: {e}",
                        path
                    ))
                })?;
                sha256_hex(&bytes)
            }
        };
        if !constant_time_eq_str(&actual_hex, expected_hex) {
            return Err(ModelError::Integrity(format!("File hash mismatch for {rel}")));
        }
    }

    tracing::info!("Model manifest verified ({} files)", manifest.files.len());
    Ok(())
}

/// Validate the model in `dir` and write a `manifest.json` binding its files.
///
/// The digests are taken from the same bytes that were validated. An existing
/// manifest is only replaced once validation succeeds.
///
/// # Errors
/// Returns `ModelError` if the model does not load or the manifest cannot be
/// written.
pub fn bind(dir: &Path) -> Result<ModelManifest, ModelError> {
    let artifact = read_artifact(dir)?;
    JsonRiskModel::from_artifact(&artifact)?;

    let manifest = ModelManifest {
        version: 1,
        files: artifact
            .iter()
            .map(|(rel, bytes)| (rel.clone(), sha256_hex(bytes)))
            .collect(),
    };
    let bytes = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| ModelError::Invalid(format!("{MANIFEST_FILE}: {e}")))?;

    let staged = dir.join(format!("{MANIFEST_FILE}.tmp"));
    fs::write(&staged, &bytes)?;
    fs::rename(&staged, dir.join(MANIFEST_FILE))?;

    tracing::info!("Bound {} model file(s) in {:?}", manifest.files.len(), dir);
    Ok(manifest)
}

fn check_finite(values: &[f64], what: &str) -> Result<(), ModelError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ModelError::Invalid(format!("{what} contains non-finite values")))
    }
}

/// Risk classifier loaded from a JSON artifact directory.
#[derive(Debug, Clone)]
pub struct JsonRiskModel {
    kind: ModelKind,
    features: Vec<Feature>,
    coefficients: Vec<f64>,
    intercept: f64,
    threshold: f64,
    scaler: Option<ExportedScaler>,
}

impl JsonRiskModel {
    /// Load and validate a model directory.
    ///
    /// # Errors
    /// Returns `ModelError` if `model.json` is missing, any file is corrupt,
    /// the manifest does not match, or parameters are inconsistent.
    pub fn load(dir: &Path) -> Result<Self, ModelError> {
        let artifact = read_artifact(dir)?;
        verify_manifest(dir, &artifact)?;

        let model = Self::from_artifact(&artifact)?;
        tracing::info!(
            "Loaded {:?} risk model from {:?} (n_features={}, scaled={})",
            model.kind,
            dir,
            model.features.len(),
            model.scaler.is_some()
        );
        Ok(model)
    }

    fn from_artifact(artifact: &BTreeMap<String, Vec<u8>>) -> Result<Self, ModelError> {
        let model_bytes = artifact
            .get(MODEL_FILE)
            .ok_or_else(|| ModelError::NotFound(MODEL_FILE.to_string()))?;
        let mut exported: ExportedModel = parse_json(MODEL_FILE, model_bytes)?;

        if let Some(bytes) = artifact.get(SCALER_FILE) {
            exported.scaler = Some(parse_json(SCALER_FILE, bytes)?);
        }

        if let Some(bytes) = artifact.get(FEATURES_FILE) {
            let names: Vec<String> = parse_json(FEATURES_FILE, bytes)?;
            if names.len() != exported.feature_names.len() {
                return Err(ModelError::Invalid(format!(
                    "features.json lists {} features, model has {}",
                    names.len(),
                    exported.feature_names.len()
                )));
            }
            exported.feature_names = names;
        }

        Self::from_exported(exported)
    }

    /// Validate exported parameters and resolve feature names.
    ///
    /// # Errors
    /// Returns `ModelError::Invalid` on inconsistent or unknown parameters.
    pub fn from_exported(exported: ExportedModel) -> Result<Self, ModelError> {
        let n = exported.feature_names.len();
        if n == 0 {
            return Err(ModelError::Invalid("model has no features".into()));
        }
        if exported.coefficients.len() != n {
            return Err(ModelError::Invalid(format!(
                "{} coefficients for {} features",
                exported.coefficients.len(),
                n
            )));
        }
        check_finite(&exported.coefficients, "coefficients")?;
        check_finite(&[exported.intercept, exported.threshold], "intercept/threshold")?;

        if let Some(scaler) = &exported.scaler {
            if scaler.mean.len() != n || scaler.scale.len() != n {
                return Err(ModelError::Invalid(
                    "scaler lengths do not match feature count".into(),
                ));
            }
            check_finite(&scaler.mean, "scaler mean")?;
            check_finite(&scaler.scale, "scaler scale")?;
            if scaler.scale.iter().any(|s| *s == 0.0) {
                return Err(ModelError::Invalid("scaler scale contains zero".into()));
            }
        }

        let features = exported
            .feature_names
            .iter()
            .map(|name| {
                Feature::from_name(name)
                    .ok_or_else(|| ModelError::Invalid(format!("unknown feature {name:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            kind: exported.kind,
            features,
            coefficients: exported.coefficients,
            intercept: exported.intercept,
            threshold: exported.threshold,
            scaler: exported.scaler,
        })
    }

    #[must_use]
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    fn decision_function(&self, raw: &[f64]) -> f64 {
        let mut z = self.intercept;
        for (i, (x, w)) in raw.iter().zip(&self.coefficients).enumerate() {
            let x = match &self.scaler {
                Some(s) => (x - s.mean[i]) / s.scale[i],
                None => *x,
            };
            z += w * x;
        }
        z
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl RiskModel for JsonRiskModel {
    fn features(&self) -> &[Feature] {
        &self.features
    }

    fn predict(&self, features: &[f64]) -> Result<RiskPrediction, ModelError> {
        if features.len() != self.features.len() {
            return Err(ModelError::FeatureCount {
                got: features.len(),
                expected: self.features.len(),
            });
        }

        let z = self.decision_function(features);
        let prediction = match self.kind {
            ModelKind::LogisticRegression => {
                RiskPrediction::from_probability(sigmoid(z), self.threshold)
            }
            ModelKind::LinearSvc => {
                RiskPrediction::from_label(RiskLabel::from_class(u8::from(z >= 0.0)))
            }
        };
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VITALS_4;
    use tempfile::tempdir;

    fn vitals_model(kind: ModelKind) -> ExportedModel {
        ExportedModel {
            kind,
            feature_names: VITALS_4.iter().map(|f| f.name().to_string()).collect(),
            coefficients: vec![0.1, 0.05, 0.0, 0.0],
            intercept: -9.0,
            threshold: 0.5,
            scaler: None,
        }
    }

    fn write_json<T: Serialize>(path: &Path, value: &T) {
        let bytes = serde_json::to_vec(value).expect("serialize");
        fs::write(path, bytes).expect("write");
    }

    #[test]
    fn test_logistic_prediction() {
        let model = JsonRiskModel::from_exported(vitals_model(ModelKind::LogisticRegression))
            .expect("valid model");

        // z = -9 + 2.5 + 6 = -0.5
        let low = model.predict(&[25.0, 120.0, 80.0, 70.0]).expect("predict");
        assert_eq!(low.label, RiskLabel::No);
        let p = low.probability.expect("probability");
        assert!((p - sigmoid(-0.5)).abs() < 1e-12);

        // z = -9 + 3.5 + 8 = 2.5
        let high = model.predict(&[35.0, 160.0, 95.0, 90.0]).expect("predict");
        assert_eq!(high.label, RiskLabel::Yes);
    }

    #[test]
    fn test_linear_svc_has_no_probability() {
        let model =
            JsonRiskModel::from_exported(vitals_model(ModelKind::LinearSvc)).expect("valid model");
        let pred = model.predict(&[35.0, 160.0, 95.0, 90.0]).expect("predict");
        assert_eq!(pred.label, RiskLabel::Yes);
        assert!(pred.probability.is_none());
    }

    #[test]
    fn test_scaler_is_applied() {
        let mut exported = vitals_model(ModelKind::LinearSvc);
        exported.coefficients = vec![1.0, 0.0, 0.0, 0.0];
        exported.intercept = 0.0;
        exported.scaler = Some(ExportedScaler {
            mean: vec![30.0, 0.0, 0.0, 0.0],
            scale: vec![5.0, 1.0, 1.0, 1.0],
        });
        let model = JsonRiskModel::from_exported(exported).expect("valid model");

        assert_eq!(model.decision_function(&[25.0, 0.0, 0.0, 0.0]), -1.0);
        let pred = model.predict(&[25.0, 0.0, 0.0, 0.0]).expect("predict");
        assert_eq!(pred.label, RiskLabel::No);
    }

    #[test]
    fn test_rejects_wrong_vector_length() {
        let model = JsonRiskModel::from_exported(vitals_model(ModelKind::LogisticRegression))
            .expect("valid model");
        assert!(matches!(
            model.predict(&[1.0, 2.0]),
            Err(ModelError::FeatureCount { got: 2, expected: 4 })
        ));
    }

    #[test]
    fn test_rejects_inconsistent_parameters() {
        let mut exported = vitals_model(ModelKind::LogisticRegression);
        exported.coefficients.pop();
        assert!(JsonRiskModel::from_exported(exported).is_err());

        let mut exported = vitals_model(ModelKind::LogisticRegression);
        exported.feature_names[0] = "Cholesterol".into();
        assert!(JsonRiskModel::from_exported(exported).is_err());

        let mut exported = vitals_model(ModelKind::LogisticRegression);
        exported.scaler = Some(ExportedScaler {
            mean: vec![0.0; 4],
            scale: vec![1.0, 0.0, 1.0, 1.0],
        });
        assert!(JsonRiskModel::from_exported(exported).is_err());
    }

    #[test]
    fn test_load_missing_directory() {
        let err = JsonRiskModel::load(Path::new("/nonexistent/model")).expect_err("must fail");
        assert!(matches!(err, ModelError::NotFound(_)));
    }

    #[test]
    fn test_load_corrupt_model() {
        let temp = tempdir().expect("tempdir");
        fs::write(temp.path().join(MODEL_FILE), b"{ not json").expect("write");
        assert!(matches!(
            JsonRiskModel::load(temp.path()),
            Err(ModelError::Invalid(_))
        ));
    }

    #[test]
    fn test_load_with_separate_scaler_and_features() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();

        let mut exported = vitals_model(ModelKind::LogisticRegression);
        exported.feature_names = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        write_json(&dir.join(MODEL_FILE), &exported);
        write_json(
            &dir.join(FEATURES_FILE),
            &vec!["BMI", "Systolic_BP", "Diastolic_BP", "Heart_Rate"],
        );
        write_json(
            &dir.join(SCALER_FILE),
            &ExportedScaler {
                mean: vec![0.0; 4],
                scale: vec![1.0; 4],
            },
        );

        let model = JsonRiskModel::load(dir).expect("load");
        assert_eq!(model.features(), &VITALS_4);
        assert!(model.scaler.is_some());
    }

    #[test]
    fn test_manifest_binding() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();

        write_json(&dir.join(MODEL_FILE), &vitals_model(ModelKind::LogisticRegression));
        let bytes = fs::read(dir.join(MODEL_FILE)).expect("read");

        let mut files = BTreeMap::new();
        files.insert(MODEL_FILE.to_string(), sha256_hex(&bytes));
        write_json(&dir.join(MANIFEST_FILE), &ModelManifest { version: 1, files });
        JsonRiskModel::load(dir).expect("bound model loads");

        // Tamper with the model after binding.
        let mut tampered = vitals_model(ModelKind::LogisticRegression);
        tampered.intercept = 100.0;
        write_json(&dir.join(MODEL_FILE), &tampered);
        assert!(matches!(
            JsonRiskModel::load(dir),
            Err(ModelError::Integrity(_))
        ));
    }

    #[test]
    fn test_manifest_rejects_unbound_sidecar() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();

        write_json(&dir.join(MODEL_FILE), &vitals_model(ModelKind::LogisticRegression));
        let bytes = fs::read(dir.join(MODEL_FILE)).expect("read");
        let mut files = BTreeMap::new();
        files.insert(MODEL_FILE.to_string(), sha256_hex(&bytes));
        write_json(&dir.join(MANIFEST_FILE), &ModelManifest { version: 1, files });

        let bound = JsonRiskModel::load(dir).expect("bound model loads");
        let visit = [25.0, 120.0, 80.0, 70.0];
        assert_eq!(bound.predict(&visit).expect("predict").label, RiskLabel::No);

        // A scaler dropped in after binding would flip the label.
        write_json(
            &dir.join(SCALER_FILE),
            &ExportedScaler {
                mean: vec![0.0; 4],
                scale: vec![0.001; 4],
            },
        );
        assert!(matches!(
            JsonRiskModel::load(dir),
            Err(ModelError::Integrity(_))
        ));

        fs::remove_file(dir.join(SCALER_FILE)).expect("remove scaler");
        write_json(
            &dir.join(FEATURES_FILE),
            &vec!["BMI", "Systolic_BP", "Diastolic_BP", "Heart_Rate"],
        );
        assert!(matches!(
            JsonRiskModel::load(dir),
            Err(ModelError::Integrity(_))
        ));
    }

    #[test]
    fn test_bind_covers_sidecars() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();

        write_json(&dir.join(MODEL_FILE), &vitals_model(ModelKind::LogisticRegression));
        write_json(
            &dir.join(SCALER_FILE),
            &ExportedScaler {
                mean: vec![0.0; 4],
                scale: vec![1.0; 4],
            },
        );

        let manifest = bind(dir).expect("bind");
        assert_eq!(
            manifest.files.keys().map(String::as_str).collect::<Vec<_>>(),
            vec![MODEL_FILE, SCALER_FILE]
        );
        assert!(!dir.join(format!("{MANIFEST_FILE}.tmp")).exists());
        JsonRiskModel::load(dir).expect("freshly bound model loads");
    }

    #[test]
    fn test_bind_invalid_model_keeps_existing_manifest() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();

        write_json(&dir.join(MODEL_FILE), &vitals_model(ModelKind::LogisticRegression));
        bind(dir).expect("bind");
        let before = fs::read(dir.join(MANIFEST_FILE)).expect("read manifest");

        let mut broken = vitals_model(ModelKind::LogisticRegression);
        broken.coefficients.pop();
        write_json(&dir.join(MODEL_FILE), &broken);

        assert!(matches!(bind(dir), Err(ModelError::Invalid(_))));
        let after = fs::read(dir.join(MANIFEST_FILE)).expect("manifest still present");
        assert_eq!(before, after);
        assert!(matches!(
            JsonRiskModel::load(dir),
            Err(ModelError::Integrity(_))
        ));
    }

    #[test]
    fn test_manifest_must_bind_model() {
        let temp = tempdir().expect("tempdir");
        let dir = temp.path();
        write_json(&dir.join(MODEL_FILE), &vitals_model(ModelKind::LogisticRegression));
        write_json(
            &dir.join(MANIFEST_FILE),
            &ModelManifest {
                version: 1,
                files: BTreeMap::new(),
            },
        );
        assert!(matches!(
            JsonRiskModel::load(dir),
            Err(ModelError::Integrity(_))
        ));
    }
}
