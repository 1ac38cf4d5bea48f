//! Identity gate: Grants dashboard access to known patient identifiers.
//!
//! There is no secret involved. Any identifier present in the visit file is
//! accepted. Input is trimmed; comparison is exact and case-sensitive.

use crate::domain::{PatientId, Session, VisitRecord};
use crate::ports::RecordSource;

use super::records::RecordStore;

/// Outcome of a login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Granted(PatientId),
    Denied,
    /// Visit data could not be loaded; access is denied.
    DataUnavailable(String),
}

pub struct IdentityGate;

impl IdentityGate {
    /// Check `candidate` against the identifiers present in `records`.
    ///
    /// Empty or whitespace-only input is denied.
    #[must_use]
    pub fn authenticate(candidate: &str, records: &[VisitRecord]) -> bool {
        match PatientId::parse(candidate) {
            Some(id) => records.iter().any(|r| r.patient_id == id),
            None => false,
        }
    }

    /// Like [`IdentityGate::authenticate`], loading records from `store`.
    ///
    /// Denies when the records cannot be loaded.
    #[must_use]
    pub fn authenticate_with_store<S: RecordSource>(candidate: &str, store: &RecordStore<S>) -> bool {
        matches!(Self::check(candidate, store), LoginOutcome::Granted(_))
    }

    /// Attempt a login and update `session` on success.
    ///
    /// A denied or failed attempt leaves an existing session untouched.
    pub fn login<S: RecordSource>(
        candidate: &str,
        store: &RecordStore<S>,
        session: &mut Session,
    ) -> LoginOutcome {
        let outcome = Self::check(candidate, store);
        match &outcome {
            LoginOutcome::Granted(id) => {
                tracing::info!("Login granted for patient_id={}", id);
                session.login(id.clone());
            }
            LoginOutcome::Denied => tracing::info!("Login denied: unknown identifier"),
            LoginOutcome::DataUnavailable(reason) => {
                tracing::warn!("Login denied, data unavailable: {}", reason);
            }
        }
        outcome
    }

    fn check<S: RecordSource>(candidate: &str, store: &RecordStore<S>) -> LoginOutcome {
        let Some(id) = PatientId::parse(candidate) else {
            return LoginOutcome::Denied;
        };

        match store.records() {
            Ok(records) => {
                if records.iter().any(|r| r.patient_id == id) {
                    LoginOutcome::Granted(id)
                } else {
                    LoginOutcome::Denied
                }
            }
            Err(e) => LoginOutcome::DataUnavailable(e.to_string()),
        }
    }
}
