//! History lookup by CPF.

use std::sync::Arc;

use super::BusinessError;
use crate::adapters::StorageError;
use crate::domain::MedicalRecord;
use crate::ports::{MedicalRecordGateway, PatientGateway};
use crate::MedshareError;

/// Returns the full medical history of a registered patient.
pub struct SearchPatientHistory<P, R>
where
    P: PatientGateway,
    R: MedicalRecordGateway,
{
    patients: Arc<P>,
    records: Arc<R>,
}

impl<P, R> SearchPatientHistory<P, R>
where
    P: PatientGateway,
    P::Error: Into<StorageError>,
    R: MedicalRecordGateway,
    R::Error: Into<StorageError>,
{
    pub fn new(patients: Arc<P>, records: Arc<R>) -> Self {
        Self { patients, records }
    }

    /// # Errors
    /// - `BusinessError::PatientNotFound` if no patient has this CPF
    /// - `StorageError` if a gateway fails
    pub fn execute(&self, cpf: &str) -> Result<Vec<MedicalRecord>, MedshareError> {
        let known = self
            .patients
            .find_by_cpf(cpf)
            .map_err(|e| MedshareError::Storage(e.into()))?
            .is_some();
        if !known {
            return Err(BusinessError::PatientNotFound(cpf.to_string()).into());
        }

        let history = self
            .records
            .find_by_patient_cpf(cpf)
            .map_err(|e| MedshareError::Storage(e.into()))?;
        tracing::debug!(records = history.len(), "Loaded patient history");
        Ok(history)
    }
}
