//! End-to-end flow over real files: CSV visits, JSON model, login, dashboard.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use tempfile::TempDir;

use healthpredict::adapters::{CsvRecordSource, JsonRiskModel};
use healthpredict::application::{
    DashboardService, IdentityGate, LoginOutcome, RecordStore, RiskOutcome, RiskService,
};
use healthpredict::ports::RecordSource;
use healthpredict::{HealthPredictError, RiskLabel, Session};

const VISITS: &str = "\
patient_id,visit_date,weight,bmi,systolic_bp,diastolic_bp,heart_rate,smoking_status
P001,2024-02-01,92,30,140,90,80,0
P002,2024-01-10,70,22,110,70,60,0
P001,2024-01-01,80,25,120,80,70,0
";

// Positive iff systolic >= 130.
const SVC_MODEL: &str = r#"{
  "kind": "linear_svc",
  "feature_names": ["BMI", "Systolic_BP", "Diastolic_BP", "Heart_Rate"],
  "coefficients": [0.0, 1.0, 0.0, 0.0],
  "intercept": -130.0
}"#;

struct Fixture {
    _dir: TempDir,
    csv: PathBuf,
    model_dir: PathBuf,
}

fn fixture(visits: &str, model: Option<&str>) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let csv = dir.path().join("patients.csv");
    fs::write(&csv, visits).expect("write csv");

    let model_dir = dir.path().join("model");
    fs::create_dir(&model_dir).expect("model dir");
    if let Some(model) = model {
        fs::write(model_dir.join("model.json"), model).expect("write model");
    }

    Fixture {
        _dir: dir,
        csv,
        model_dir,
    }
}

fn services(
    fx: &Fixture,
) -> (
    Arc<RecordStore<CsvRecordSource>>,
    DashboardService<CsvRecordSource, JsonRiskModel>,
) {
    let store = Arc::new(RecordStore::new(CsvRecordSource::new(&fx.csv)));
    let risk = Arc::new(RiskService::load(&fx.model_dir));
    let dashboard = DashboardService::new(Arc::clone(&store), risk);
    (store, dashboard)
}

#[test]
fn test_login_then_latest_visit_drives_dashboard() {
    let fx = fixture(VISITS, Some(SVC_MODEL));
    let (store, dashboard) = services(&fx);
    let mut session = Session::new();

    let outcome = IdentityGate::login("P001", &store, &mut session);
    assert!(matches!(outcome, LoginOutcome::Granted(_)));

    let view = dashboard.build(&session).expect("Should build dashboard");
    assert_eq!(
        view.latest.visit_date,
        NaiveDate::from_ymd_opt(2024, 2, 1).expect("date")
    );
    assert_eq!(view.history.len(), 2);
    assert_eq!(
        view.history[0].visit.visit_date,
        NaiveDate::from_ymd_opt(2024, 1, 1).expect("date")
    );

    // 100 - 0.3*30 - 0.2*140 - 0.1*90 - 0.1*80
    assert!((view.score - 46.0).abs() < 1e-9);

    match view.risk {
        RiskOutcome::Predicted(prediction) => assert_eq!(prediction.label, RiskLabel::Yes),
        other => panic!("expected a prediction, got {other:?}"),
    }
}

#[test]
fn test_unknown_identifier_is_denied() {
    let fx = fixture(VISITS, Some(SVC_MODEL));
    let (store, dashboard) = services(&fx);
    let mut session = Session::new();

    assert_eq!(
        IdentityGate::login("p001", &store, &mut session),
        LoginOutcome::Denied
    );
    assert!(matches!(
        dashboard.build(&session),
        Err(HealthPredictError::Validation(_))
    ));
}

#[test]
fn test_missing_model_fails_closed() {
    let fx = fixture(VISITS, None);
    let (store, dashboard) = services(&fx);
    let mut session = Session::new();
    IdentityGate::login("P001", &store, &mut session);

    let risk = RiskService::load(&fx.model_dir);
    let records = store.records().expect("records");
    assert!(matches!(
        risk.predict(&records[0]),
        Err(HealthPredictError::ModelUnavailable(_))
    ));

    let view = dashboard.build(&session).expect("Dashboard renders without a model");
    assert!(matches!(view.risk, RiskOutcome::Unavailable(_)));
    assert!((view.score - 46.0).abs() < 1e-9);
}

#[test]
fn test_corrupt_model_fails_closed() {
    let fx = fixture(VISITS, Some("{ not json"));
    let risk = RiskService::load(&fx.model_dir);
    assert!(!risk.is_available());
}

#[test]
fn test_missing_data_denies_login() {
    let fx = fixture(VISITS, Some(SVC_MODEL));
    let store = RecordStore::new(CsvRecordSource::new(fx.csv.with_extension("missing")));
    let mut session = Session::new();

    assert!(!IdentityGate::authenticate_with_store("P001", &store));
    assert!(matches!(
        IdentityGate::login("P001", &store, &mut session),
        LoginOutcome::DataUnavailable(_)
    ));
    assert!(!session.is_authenticated());
}

#[test]
fn test_loading_twice_is_identical() {
    let fx = fixture(VISITS, None);
    let source = CsvRecordSource::new(&fx.csv);
    let first = source.load().expect("first load");
    let second = source.load().expect("second load");
    assert_eq!(first, second);
}

#[test]
fn test_same_date_tie_uses_later_row() {
    let visits = "\
patient_id,visit_date,bmi,systolic_bp,diastolic_bp,heart_rate
P001,2024-02-01,20,110,70,60
P001,2024-02-01,30,140,90,80
";
    let fx = fixture(visits, Some(SVC_MODEL));
    let (store, dashboard) = services(&fx);
    let mut session = Session::new();
    IdentityGate::login("P001", &store, &mut session);

    let view = dashboard.build(&session).expect("Should build dashboard");
    assert_eq!(view.latest.bmi, Some(30.0));
}

#[test]
fn test_bundled_sample_data_and_model() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR"));
    let store = Arc::new(RecordStore::new(CsvRecordSource::new(
        root.join("data/patients.csv"),
    )));
    let risk = Arc::new(RiskService::load(&root.join("model")));
    assert!(risk.is_available());

    let mut session = Session::new();
    assert!(matches!(
        IdentityGate::login("P001", &store, &mut session),
        LoginOutcome::Granted(_)
    ));

    let view = DashboardService::new(Arc::clone(&store), risk)
        .build(&session)
        .expect("Should build dashboard");
    assert_eq!(view.history.len(), 3);
    assert_eq!(view.profile.name.as_deref(), Some("Maria Lopez"));
    assert!(matches!(view.risk, RiskOutcome::Predicted(_)));

    // The file carries its own scores; they agree with the formula.
    let recorded = view.latest.recorded_score.expect("recorded score");
    assert!((recorded - view.score).abs() < 0.1);
}
