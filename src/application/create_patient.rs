//! Patient registration.

use std::sync::Arc;

use chrono::NaiveDate;

use super::BusinessError;
use crate::adapters::StorageError;
use crate::domain::Patient;
use crate::ports::PatientGateway;
use crate::MedshareError;

/// Registers a new patient, refusing a CPF that is already on file.
pub struct CreatePatient<P>
where
    P: PatientGateway,
{
    patients: Arc<P>,
}

impl<P> CreatePatient<P>
where
    P: PatientGateway,
    P::Error: Into<StorageError>,
{
    pub fn new(patients: Arc<P>) -> Self {
        Self { patients }
    }

    /// # Errors
    /// - `BusinessError::PatientAlreadyExists` if the CPF is registered
    /// - `DomainError` if any field is invalid
    /// - `StorageError` if the gateway fails
    pub fn execute(
        &self,
        name: Option<&str>,
        cpf: Option<&str>,
        birth_date: Option<NaiveDate>,
    ) -> Result<Patient, MedshareError> {
        if let Some(cpf) = cpf {
            let existing = self
                .patients
                .find_by_cpf(cpf)
                .map_err(|e| MedshareError::Storage(e.into()))?;
            if existing.is_some() {
                tracing::warn!("Rejected registration for an already registered CPF");
                return Err(BusinessError::PatientAlreadyExists(cpf.to_string()).into());
            }
        }

        let patient = Patient::create(name, cpf, birth_date)?;

        let saved = self.patients.save(&patient).map_err(|e| {
            let err: StorageError = e.into();
            match err {
                // Lost the race against a concurrent registration of the same CPF.
                StorageError::Conflict(_) => MedshareError::from(
                    BusinessError::PatientAlreadyExists(patient.cpf().to_string()),
                ),
                other => MedshareError::Storage(other),
            }
        })?;

        if let Some(id) = saved.id() {
            tracing::info!(patient_id = %id, "Patient registered");
        }
        Ok(saved)
    }
}
