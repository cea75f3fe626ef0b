//! Storage ports: Gateway traits for persistent storage operations.
//!
//! These traits abstract the storage backend (SQLite, in-memory) from the
//! use cases. Implementations only report presence or absence; anything else
//! is a storage failure.

use crate::domain::{MedicalRecord, Patient, PatientId, ShareToken};

/// Persistence contract for patients.
pub trait PatientGateway: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist a new patient and return it with its assigned id.
    ///
    /// # Errors
    /// Returns error if the CPF is already stored or the store fails.
    fn save(&self, patient: &Patient) -> Result<Patient, Self::Error>;

    /// Find a patient (with its medical records) by CPF.
    ///
    /// # Returns
    /// `None` if no patient has this CPF.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn find_by_cpf(&self, cpf: &str) -> Result<Option<Patient>, Self::Error>;
}

/// Persistence contract for medical records.
pub trait MedicalRecordGateway: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Append a record to the history of `patient_id`.
    ///
    /// # Errors
    /// Returns error if the patient does not exist or the store fails.
    fn save(&self, record: &MedicalRecord, patient_id: PatientId)
        -> Result<MedicalRecord, Self::Error>;

    /// All records of the patient with this CPF, oldest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn find_by_patient_cpf(&self, cpf: &str) -> Result<Vec<MedicalRecord>, Self::Error>;

    /// All records of the patient with this id, oldest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn find_by_patient_id(&self, patient_id: PatientId) -> Result<Vec<MedicalRecord>, Self::Error>;
}

/// Persistence contract for share tokens.
pub trait ShareTokenGateway: Send + Sync {
    /// Error type for storage operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist a token issued for `patient_id`.
    ///
    /// # Errors
    /// Returns error if the patient does not exist, the access token is
    /// already stored, or the store fails.
    fn save(&self, token: &ShareToken, patient_id: PatientId) -> Result<ShareToken, Self::Error>;

    /// Look up a token by its access token string.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn find_by_access_token(&self, access_token: &str) -> Result<Option<ShareToken>, Self::Error>;
}
