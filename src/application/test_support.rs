//! Shared fixtures for use-case tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::adapters::StorageError;
use crate::domain::{MedicalRecord, Patient, PatientId, RecordFields, ShareToken};
use crate::ports::{MedicalRecordGateway, PatientGateway, ShareTokenGateway};

pub fn instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 14, 30, 0).unwrap()
}

pub fn birth_date() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1990, 1, 1)
}

pub fn record_fields() -> RecordFields {
    RecordFields {
        unit: Some("UBS Central".to_string()),
        professional_name: Some("Dr. José Silva".to_string()),
        diagnosis: Some("Gripe".to_string()),
        treatment: Some("Descanso".to_string()),
        notes: Some("Retornar em uma semana".to_string()),
    }
}

/// Gateway double that fails the test if any method is called.
pub struct Untouchable;

impl PatientGateway for Untouchable {
    type Error = StorageError;

    fn save(&self, _: &Patient) -> Result<Patient, Self::Error> {
        panic!("patient gateway must not be called");
    }

    fn find_by_cpf(&self, _: &str) -> Result<Option<Patient>, Self::Error> {
        panic!("patient gateway must not be called");
    }
}

impl MedicalRecordGateway for Untouchable {
    type Error = StorageError;

    fn save(&self, _: &MedicalRecord, _: PatientId) -> Result<MedicalRecord, Self::Error> {
        panic!("medical record gateway must not be called");
    }

    fn find_by_patient_cpf(&self, _: &str) -> Result<Vec<MedicalRecord>, Self::Error> {
        panic!("medical record gateway must not be called");
    }

    fn find_by_patient_id(&self, _: PatientId) -> Result<Vec<MedicalRecord>, Self::Error> {
        panic!("medical record gateway must not be called");
    }
}

impl ShareTokenGateway for Untouchable {
    type Error = StorageError;

    fn save(&self, _: &ShareToken, _: PatientId) -> Result<ShareToken, Self::Error> {
        panic!("share token gateway must not be called");
    }

    fn find_by_access_token(&self, _: &str) -> Result<Option<ShareToken>, Self::Error> {
        panic!("share token gateway must not be called");
    }
}
