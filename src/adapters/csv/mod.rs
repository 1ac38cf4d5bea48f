//! CSV adapter: Implementation of RecordSource.
//!
//! Reads one visit per row. Column names differ between exports of the same
//! data (`patient` vs `patient_id`, `Date` vs `visit_date`, ...), so headers are
//! resolved through an alias table after normalisation (lowercase, spaces and
//! hyphens folded to underscores).

use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};

use crate::domain::{Demographics, PatientId, VisitRecord};
use crate::ports::{RecordError, RecordSource};

const ID_ALIASES: &[&str] = &["patient", "patient_id", "id"];
const DATE_ALIASES: &[&str] = &["date", "visit_date"];
const HEIGHT_ALIASES: &[&str] = &["height_cm", "height"];
const WEIGHT_ALIASES: &[&str] = &["weight_kg", "weight"];
const BMI_ALIASES: &[&str] = &["bmi"];
const SYSTOLIC_ALIASES: &[&str] = &["systolic_bp", "systolic"];
const DIASTOLIC_ALIASES: &[&str] = &["diastolic_bp", "diastolic"];
const BP_ALIASES: &[&str] = &["bp", "blood_pressure"];
const HEART_RATE_ALIASES: &[&str] = &["heart_rate", "hr"];
const SMOKING_ALIASES: &[&str] = &["smoking_status", "smoking", "smoker"];
const DIABETES_ALIASES: &[&str] = &["diabetes"];
const HYPERLIPIDEMIA_ALIASES: &[&str] = &["hyperlipidemia"];
const HEART_DISEASE_ALIASES: &[&str] = &["heart_disease", "heart_disease_history"];
const SCORE_ALIASES: &[&str] = &["health_score"];
const RISK_ALIASES: &[&str] = &["risk_level", "risk_score", "risk", "heart_disease_risk"];
const FIRST_NAME_ALIASES: &[&str] = &["first_name", "firstname"];
const LAST_NAME_ALIASES: &[&str] = &["last_name", "lastname"];
const GENDER_ALIASES: &[&str] = &["gender", "sex"];
const DOB_ALIASES: &[&str] = &["date_of_birth", "dob"];
const AGE_ALIASES: &[&str] = &["age"];

/// CSV file backed record source.
#[derive(Debug, Clone)]
pub struct CsvRecordSource {
    path: PathBuf,
}

impl CsvRecordSource {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordSource for CsvRecordSource {
    fn load(&self) -> Result<Vec<VisitRecord>, RecordError> {
        if !self.path.exists() {
            return Err(RecordError::NotFound(self.path.display().to_string()));
        }

        let file = std::fs::File::open(&self.path)?;
        let records = parse_records(file)?;

        tracing::info!(
            "Loaded {} visit records from {:?}",
            records.len(),
            self.path
        );
        Ok(records)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Header positions resolved against the alias table.
struct Columns {
    id: usize,
    date: usize,
    height: Option<usize>,
    weight: Option<usize>,
    bmi: Option<usize>,
    systolic: Option<usize>,
    diastolic: Option<usize>,
    bp: Option<usize>,
    heart_rate: Option<usize>,
    smoking: Option<usize>,
    diabetes: Option<usize>,
    hyperlipidemia: Option<usize>,
    heart_disease: Option<usize>,
    score: Option<usize>,
    risk: Option<usize>,
    first_name: Option<usize>,
    last_name: Option<usize>,
    gender: Option<usize>,
    dob: Option<usize>,
    age: Option<usize>,
}

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .to_ascii_lowercase()
        .replace([' ', '-'], "_")
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, RecordError> {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let find = |aliases: &[&str]| {
            aliases
                .iter()
                .find_map(|alias| normalized.iter().position(|h| h == alias))
        };

        Ok(Self {
            id: find(ID_ALIASES).ok_or(RecordError::MissingColumn("patient_id"))?,
            date: find(DATE_ALIASES).ok_or(RecordError::MissingColumn("visit_date"))?,
            height: find(HEIGHT_ALIASES),
            weight: find(WEIGHT_ALIASES),
            bmi: find(BMI_ALIASES),
            systolic: find(SYSTOLIC_ALIASES),
            diastolic: find(DIASTOLIC_ALIASES),
            bp: find(BP_ALIASES),
            heart_rate: find(HEART_RATE_ALIASES),
            smoking: find(SMOKING_ALIASES),
            diabetes: find(DIABETES_ALIASES),
            hyperlipidemia: find(HYPERLIPIDEMIA_ALIASES),
            heart_disease: find(HEART_DISEASE_ALIASES),
            score: find(SCORE_ALIASES),
            risk: find(RISK_ALIASES),
            first_name: find(FIRST_NAME_ALIASES),
            last_name: find(LAST_NAME_ALIASES),
            gender: find(GENDER_ALIASES),
            dob: find(DOB_ALIASES),
            age: find(AGE_ALIASES),
        })
    }
}

/// Parse visit records from any CSV reader.
///
/// # Errors
/// Returns `RecordError` on missing key columns or any malformed row.
pub fn parse_records<R: io::Read>(reader: R) -> Result<Vec<VisitRecord>, RecordError> {
    let mut rdr = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| RecordError::Malformed(e.to_string()))?
        .clone();
    let columns = Columns::resolve(&headers)?;

    let mut out = Vec::new();
    for (idx, row) in rdr.records().enumerate() {
        let row_no = idx + 1;
        let row = row.map_err(|e| RecordError::Malformed(e.to_string()))?;
        let visit = parse_row(&columns, &row, row_no)
            .map_err(|message| RecordError::InvalidRow { row: row_no, message })?;
        out.push(visit);
    }

    Ok(out)
}

fn cell<'r>(row: &'r StringRecord, col: Option<usize>) -> Option<&'r str> {
    col.and_then(|c| row.get(c)).map(str::trim).filter(|s| !s.is_empty())
}

fn text(row: &StringRecord, col: Option<usize>) -> Option<String> {
    cell(row, col).map(str::to_string)
}

fn number(row: &StringRecord, col: Option<usize>, name: &str) -> Result<Option<f64>, String> {
    match cell(row, col) {
        None => Ok(None),
        Some(s) => s
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| format!("{name}: invalid number {s:?}")),
    }
}

fn flag(row: &StringRecord, col: Option<usize>, name: &str) -> Result<Option<bool>, String> {
    match cell(row, col) {
        None => Ok(None),
        Some(s) => parse_flag(s)
            .map(Some)
            .ok_or_else(|| format!("{name}: invalid flag {s:?}")),
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "1.0" | "yes" | "y" | "true" => Some(true),
        "0" | "0.0" | "no" | "n" | "false" => Some(false),
        _ => None,
    }
}

fn parse_smoking(s: &str) -> Option<f64> {
    if let Some(b) = parse_flag(s) {
        return Some(if b { 1.0 } else { 0.0 });
    }
    match s.to_ascii_lowercase().replace(['-', '_'], " ").as_str() {
        "current" | "smoker" | "current smoker" => Some(1.0),
        "never" | "former" | "non smoker" | "nonsmoker" | "former smoker" => Some(0.0),
        _ => None,
    }
}

fn parse_blood_pressure(s: &str) -> Option<(f64, f64)> {
    let (sys, dia) = s.split_once('/')?;
    let sys = sys.trim().parse::<f64>().ok()?;
    let dia = dia.trim().parse::<f64>().ok()?;
    Some((sys, dia))
}

/// Parse a visit date. Datetime inputs keep only their date part.
#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];
    const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn parse_row(cols: &Columns, row: &StringRecord, row_no: usize) -> Result<VisitRecord, String> {
    let patient_id = cell(row, Some(cols.id))
        .and_then(PatientId::parse)
        .ok_or_else(|| "empty patient identifier".to_string())?;

    let raw_date = cell(row, Some(cols.date)).ok_or_else(|| "empty visit date".to_string())?;
    let visit_date =
        parse_date(raw_date).ok_or_else(|| format!("invalid visit date {raw_date:?}"))?;

    let mut visit = VisitRecord::new(patient_id, visit_date);
    visit.source_row = row_no;

    visit.height_cm = number(row, cols.height, "height")?;
    visit.weight_kg = number(row, cols.weight, "weight")?;
    visit.bmi = number(row, cols.bmi, "bmi")?;
    visit.systolic_bp = number(row, cols.systolic, "systolic_bp")?;
    visit.diastolic_bp = number(row, cols.diastolic, "diastolic_bp")?;

    if visit.systolic_bp.is_none() && visit.diastolic_bp.is_none() {
        if let Some(bp) = cell(row, cols.bp) {
            let (sys, dia) =
                parse_blood_pressure(bp).ok_or_else(|| format!("bp: invalid value {bp:?}"))?;
            visit.systolic_bp = Some(sys);
            visit.diastolic_bp = Some(dia);
        }
    }

    visit.heart_rate = number(row, cols.heart_rate, "heart_rate")?;

    visit.smoking = match cell(row, cols.smoking) {
        None => None,
        Some(s) => Some(parse_smoking(s).ok_or_else(|| format!("smoking: invalid value {s:?}"))?),
    };
    visit.diabetes = flag(row, cols.diabetes, "diabetes")?;
    visit.hyperlipidemia = flag(row, cols.hyperlipidemia, "hyperlipidemia")?;
    visit.heart_disease = flag(row, cols.heart_disease, "heart_disease")?;

    visit.recorded_score = number(row, cols.score, "health_score")?;
    visit.recorded_risk = text(row, cols.risk);

    visit.demographics = Demographics {
        first_name: text(row, cols.first_name),
        last_name: text(row, cols.last_name),
        gender: text(row, cols.gender),
        date_of_birth: text(row, cols.dob),
        age: number(row, cols.age, "age")?
            .filter(|a| *a >= 0.0)
            .map(|a| a.round() as u32),
    };

    Ok(visit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "\
patient,Date,First Name,Last Name,Gender,Height_cm,Weight,BMI,Systolic_BP,Diastolic_BP,Heart_Rate,Smoking_Status,Diabetes,Hyperlipidemia,Heart_Disease,Health_Score
P001,2024-01-01,Ada,Lovelace,F,168,70,24.8,122,81,72,0,0,0,0,54
P001,2024-02-01,Ada,Lovelace,F,168,69,24.4,118,79,70,0,0,1,0,43
P002,2024-01-15,Alan,Turing,M,180,104,32.1,140,90,80,Yes,1,0,1,
";

    #[test]
    fn test_parse_sample() {
        let records = parse_records(SAMPLE.as_bytes()).expect("Should parse");
        assert_eq!(records.len(), 3);

        let first = &records[0];
        assert_eq!(first.patient_id.as_str(), "P001");
        assert_eq!(first.source_row, 1);
        assert_eq!(first.bmi, Some(24.8));
        assert_eq!(first.weight_kg, Some(70.0));
        assert_eq!(first.recorded_score, Some(54.0));
        assert_eq!(first.demographics.full_name().as_deref(), Some("Ada Lovelace"));

        let third = &records[2];
        assert_eq!(third.smoking, Some(1.0));
        assert_eq!(third.diabetes, Some(true));
        assert_eq!(third.heart_disease, Some(true));
        assert_eq!(third.recorded_score, None);
    }

    #[test]
    fn test_alternate_header_names() {
        let csv = "\
patient_id,visit_date,bmi,bp,heart_rate,smoking_status,health_score,risk_score
 P010 ,03/05/2024,27.5,130/85,77,Former,61,Low
";
        let records = parse_records(csv.as_bytes()).expect("Should parse");
        let v = &records[0];
        assert_eq!(v.patient_id.as_str(), "P010");
        assert_eq!(v.visit_date, NaiveDate::from_ymd_opt(2024, 3, 5).expect("date"));
        assert_eq!(v.systolic_bp, Some(130.0));
        assert_eq!(v.diastolic_bp, Some(85.0));
        assert_eq!(v.smoking, Some(0.0));
        assert_eq!(v.recorded_risk.as_deref(), Some("Low"));
    }

    #[test]
    fn test_missing_identifier_column() {
        let csv = "Date,BMI\n2024-01-01,25\n";
        let err = parse_records(csv.as_bytes()).expect_err("must fail");
        assert!(matches!(err, RecordError::MissingColumn("patient_id")));
    }

    #[test]
    fn test_bad_date_names_row() {
        let csv = "patient,Date\nP001,2024-01-01\nP001,yesterday\n";
        let err = parse_records(csv.as_bytes()).expect_err("must fail");
        match err {
            RecordError::InvalidRow { row, message } => {
                assert_eq!(row, 2);
                assert!(message.contains("yesterday"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_number_is_malformed() {
        let csv = "patient,Date,BMI\nP001,2024-01-01,heavy\n";
        assert!(matches!(
            parse_records(csv.as_bytes()),
            Err(RecordError::InvalidRow { row: 1, .. })
        ));
    }

    #[test]
    fn test_ragged_row_is_malformed() {
        let csv = "patient,Date,BMI\nP001,2024-01-01\n";
        assert!(parse_records(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 2, 1).expect("date");
        assert_eq!(parse_date("2024-02-01"), Some(expected));
        assert_eq!(parse_date("2024/02/01"), Some(expected));
        assert_eq!(parse_date("02/01/2024"), Some(expected));
        assert_eq!(parse_date("2024-02-01 13:45:00"), Some(expected));
        assert_eq!(parse_date("2024-02-01T08:00:00+00:00"), Some(expected));
        assert_eq!(parse_date("Feb 1"), None);
    }

    #[test]
    fn test_missing_file() {
        let source = CsvRecordSource::new("/nonexistent/visits.csv");
        assert!(matches!(source.load(), Err(RecordError::NotFound(_))));
    }

    #[test]
    fn test_load_from_file_twice_is_identical() {
        let mut file = NamedTempFile::new().expect("tempfile");
        file.write_all(SAMPLE.as_bytes()).expect("write");

        let source = CsvRecordSource::new(file.path());
        let a = source.load().expect("first load");
        let b = source.load().expect("second load");
        assert_eq!(a, b);
    }
}
