//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external formats:
//! - `csv`: visit records from a CSV export
//! - `model`: risk classifier from a JSON artifact directory
//! - `sanitize`: identifier/PII filtering for logs

pub mod csv;
pub mod model;
pub mod sanitize;

pub use self::csv::CsvRecordSource;
pub use self::model::JsonRiskModel;
