//! Interactive session state.

use super::visit::PatientId;

/// Login state for one interactive session.
///
/// Owned by the caller and passed to each handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    authenticated: bool,
    patient_id: Option<PatientId>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the session as authenticated for `patient_id`.
    pub fn login(&mut self, patient_id: PatientId) {
        self.authenticated = true;
        self.patient_id = Some(patient_id);
    }

    /// Reset to unauthenticated.
    pub fn logout(&mut self) {
        self.authenticated = false;
        self.patient_id = None;
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// The logged-in identifier, if any.
    #[must_use]
    pub fn patient_id(&self) -> Option<&PatientId> {
        if self.authenticated {
            self.patient_id.as_ref()
        } else {
            None
        }
    }
}
