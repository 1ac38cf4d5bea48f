//! Record source port: Trait for loading visit records.
//!
//! This trait abstracts the backing file format (CSV) from the application logic.

use crate::domain::VisitRecord;

/// Errors that make the visit data unavailable.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Visit file not found: {0}")]
    NotFound(String),

    #[error("Failed to read visit file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed visit file: {0}")]
    Malformed(String),

    #[error("Missing required column: {0}")]
    MissingColumn(&'static str),

    #[error("Row {row}: {message}")]
    InvalidRow { row: usize, message: String },
}

/// Trait for read-only sources of visit records.
///
/// Records are loaded wholesale; a source never writes back.
pub trait RecordSource: Send + Sync {
    /// Load every visit record from the source.
    ///
    /// # Errors
    /// Returns `RecordError` when the source is missing or malformed.
    fn load(&self) -> Result<Vec<VisitRecord>, RecordError>;

    /// Human-readable description of where records come from.
    fn describe(&self) -> String;
}
