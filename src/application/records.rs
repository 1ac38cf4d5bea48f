//! Record store: Loads visit records once and shares them for the session.

use std::sync::{Arc, Mutex};

use crate::adapters::sanitize;
use crate::domain::VisitRecord;
use crate::ports::RecordSource;
use crate::HealthPredictError;

/// Process-wide cache of visit records over a `RecordSource`.
///
/// The first successful load is kept for the lifetime of the store. Failed
/// loads are not cached, so the next call reads the source again.
pub struct RecordStore<S>
where
    S: RecordSource,
{
    source: S,
    cache: Mutex<Option<Arc<[VisitRecord]>>>,
}

impl<S> RecordStore<S>
where
    S: RecordSource,
{
    /// Create a store; nothing is read until `records()` is called.
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: Mutex::new(None),
        }
    }

    /// Get the loaded records, reading the source on first use.
    ///
    /// # Errors
    /// Returns `HealthPredictError::DataUnavailable` if the source is missing
    /// or malformed.
    pub fn records(&self) -> Result<Arc<[VisitRecord]>, HealthPredictError> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|_| HealthPredictError::Validation("Record cache lock poisoned".into()))?;

        if let Some(records) = cache.as_ref() {
            return Ok(Arc::clone(records));
        }

        let records: Arc<[VisitRecord]> = match self.source.load() {
            Ok(records) => records.into(),
            Err(e) => {
                tracing::warn!("Visit data unavailable from {}: {}", self.source.describe(), e);
                return Err(e.into());
            }
        };

        sanitize::register_identifiers(records.iter().map(|r| r.patient_id.as_str()));

        *cache = Some(Arc::clone(&records));
        Ok(records)
    }

    /// Whether records have been loaded successfully.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.cache.lock().map(|c| c.is_some()).unwrap_or(false)
    }

    /// Number of distinct patients in the loaded records.
    ///
    /// # Errors
    /// Returns `HealthPredictError::DataUnavailable` if loading fails.
    pub fn patient_count(&self) -> Result<usize, HealthPredictError> {
        let records = self.records()?;
        let ids: std::collections::BTreeSet<&str> =
            records.iter().map(|r| r.patient_id.as_str()).collect();
        Ok(ids.len())
    }

    #[must_use]
    pub fn describe(&self) -> String {
        self.source.describe()
    }
}
