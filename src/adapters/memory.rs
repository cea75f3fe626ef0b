//! In-memory adapter: process-local implementation of the storage gateways.
//!
//! Used by tests and when `MEDSHARE_DB_PATH=:memory:`. Enforces the same
//! uniqueness and referential checks as the SQLite adapter and reports them
//! with the same [`StorageError`] variants.

use std::sync::Mutex;

use crate::adapters::StorageError;
use crate::domain::{MedicalRecord, MedicalRecordId, Patient, PatientId, ShareToken, ShareTokenId};
use crate::ports::{MedicalRecordGateway, PatientGateway, ShareTokenGateway};

#[derive(Default)]
struct State {
    patients: Vec<Patient>,
    records: Vec<(PatientId, MedicalRecord)>,
    tokens: Vec<ShareToken>,
    last_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn patient_by_cpf(&self, cpf: &str) -> Option<&Patient> {
        self.patients.iter().find(|p| p.cpf() == cpf)
    }

    fn require_patient(&self, patient_id: PatientId) -> Result<(), StorageError> {
        if self.patients.iter().any(|p| p.id() == Some(patient_id)) {
            Ok(())
        } else {
            Err(StorageError::NotFound(format!(
                "Patient with id=[{patient_id}] not found."
            )))
        }
    }

    fn records_of(&self, patient_id: PatientId) -> Vec<MedicalRecord> {
        self.records
            .iter()
            .filter(|(owner, _)| *owner == patient_id)
            .map(|(_, record)| record.clone())
            .collect()
    }
}

/// Storage backed by vectors behind a single mutex.
#[derive(Default)]
pub struct InMemoryStorage {
    state: Mutex<State>,
}

impl InMemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PatientGateway for InMemoryStorage {
    type Error = StorageError;

    fn save(&self, patient: &Patient) -> Result<Patient, Self::Error> {
        let mut state = self.state.lock().expect("Lock failed");

        if state.patient_by_cpf(patient.cpf()).is_some() {
            return Err(StorageError::Conflict(format!(
                "Patient with cpf=[{}] already registered.",
                patient.cpf()
            )));
        }

        let id = PatientId(state.next_id());
        let saved = patient.clone().with_id(id).with_medical_records(Vec::new());
        state.patients.push(saved.clone());
        Ok(saved)
    }

    fn find_by_cpf(&self, cpf: &str) -> Result<Option<Patient>, Self::Error> {
        let state = self.state.lock().expect("Lock failed");

        Ok(state.patient_by_cpf(cpf).map(|patient| {
            let records = patient
                .id()
                .map(|id| state.records_of(id))
                .unwrap_or_default();
            patient.clone().with_medical_records(records)
        }))
    }
}

impl MedicalRecordGateway for InMemoryStorage {
    type Error = StorageError;

    fn save(
        &self,
        record: &MedicalRecord,
        patient_id: PatientId,
    ) -> Result<MedicalRecord, Self::Error> {
        let mut state = self.state.lock().expect("Lock failed");
        state.require_patient(patient_id)?;

        let saved = record.clone().with_id(MedicalRecordId(state.next_id()));
        state.records.push((patient_id, saved.clone()));
        Ok(saved)
    }

    fn find_by_patient_cpf(&self, cpf: &str) -> Result<Vec<MedicalRecord>, Self::Error> {
        let state = self.state.lock().expect("Lock failed");
        Ok(state
            .patient_by_cpf(cpf)
            .and_then(Patient::id)
            .map(|id| state.records_of(id))
            .unwrap_or_default())
    }

    fn find_by_patient_id(&self, patient_id: PatientId) -> Result<Vec<MedicalRecord>, Self::Error> {
        let state = self.state.lock().expect("Lock failed");
        Ok(state.records_of(patient_id))
    }
}

impl ShareTokenGateway for InMemoryStorage {
    type Error = StorageError;

    fn save(&self, token: &ShareToken, patient_id: PatientId) -> Result<ShareToken, Self::Error> {
        let mut state = self.state.lock().expect("Lock failed");
        state.require_patient(patient_id)?;

        if state
            .tokens
            .iter()
            .any(|t| t.access_token() == token.access_token())
        {
            return Err(StorageError::Conflict(format!(
                "Share token [{}] already registered.",
                token.access_token()
            )));
        }

        let id = ShareTokenId(state.next_id());
        let saved = ShareToken::restore(
            Some(id),
            Some(token.access_token()),
            Some(token.expires_in_minutes()),
            Some(token.created_at()),
            Some(patient_id),
        )
        .map_err(|e| StorageError::InvalidRow(format!("share token {}: {e}", id.0)))?;
        state.tokens.push(saved.clone());
        Ok(saved)
    }

    fn find_by_access_token(&self, access_token: &str) -> Result<Option<ShareToken>, Self::Error> {
        let state = self.state.lock().expect("Lock failed");
        Ok(state
            .tokens
            .iter()
            .find(|t| t.access_token() == access_token)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecordFields;
    use chrono::{NaiveDate, Utc};

    fn patient(cpf: &str) -> Patient {
        Patient::create(Some("Bob"), Some(cpf), NaiveDate::from_ymd_opt(1985, 3, 2))
            .expect("Should build patient")
    }

    fn record(diagnosis: &str) -> MedicalRecord {
        let now = Utc::now();
        let fields = RecordFields {
            unit: Some("UBS".to_string()),
            professional_name: Some("Dr. Y".to_string()),
            diagnosis: Some(diagnosis.to_string()),
            treatment: Some("Rest".to_string()),
            notes: Some("None".to_string()),
        };
        MedicalRecord::create(Some(now), &fields, now).expect("Should build record")
    }

    #[test]
    fn test_patient_save_assigns_id_and_rejects_duplicates() {
        let storage = InMemoryStorage::new();
        let saved = PatientGateway::save(&storage, &patient("12345678900")).expect("Should save");
        assert!(saved.id().is_some());

        let err = PatientGateway::save(&storage, &patient("12345678900")).expect_err("Should fail");
        assert_eq!(err.to_string(), "Patient with cpf=[12345678900] already registered.");
    }

    #[test]
    fn test_find_by_cpf_carries_records() {
        let storage = InMemoryStorage::new();
        let saved = PatientGateway::save(&storage, &patient("12345678900")).expect("Should save");
        let id = saved.id().expect("Should have id");

        MedicalRecordGateway::save(&storage, &record("A"), id).expect("Should save");
        MedicalRecordGateway::save(&storage, &record("B"), id).expect("Should save");

        let loaded = storage
            .find_by_cpf("12345678900")
            .expect("Should query")
            .expect("Should exist");
        let diagnoses: Vec<&str> = loaded
            .medical_records()
            .iter()
            .map(MedicalRecord::diagnosis)
            .collect();
        assert_eq!(diagnoses, ["A", "B"]);
        assert_eq!(
            storage.find_by_patient_cpf("12345678900").expect("Should load"),
            storage.find_by_patient_id(id).expect("Should load")
        );
    }

    #[test]
    fn test_unknown_patient_is_not_found() {
        let storage = InMemoryStorage::new();
        let err = MedicalRecordGateway::save(&storage, &record("A"), PatientId(5))
            .expect_err("Should fail");
        assert!(matches!(err, StorageError::NotFound(_)));
        assert!(storage.find_by_patient_cpf("00000000000").expect("Should load").is_empty());
    }

    #[test]
    fn test_token_uniqueness() {
        let storage = InMemoryStorage::new();
        let saved = PatientGateway::save(&storage, &patient("12345678900")).expect("Should save");
        let id = saved.id().expect("Should have id");
        let token = ShareToken::create(Some("tok"), Some(5), Some(Utc::now()), Some(id))
            .expect("Should build token");

        ShareTokenGateway::save(&storage, &token, id).expect("Should save");
        let err = ShareTokenGateway::save(&storage, &token, id).expect_err("Should fail");
        assert!(matches!(err, StorageError::Conflict(_)));

        let found = storage
            .find_by_access_token("tok")
            .expect("Should query")
            .expect("Should exist");
        assert_eq!(found.patient_id(), id);
    }

    #[test]
    fn test_token_is_stored_under_given_patient() {
        let storage = InMemoryStorage::new();
        let a = PatientGateway::save(&storage, &patient("11111111111")).expect("Should save");
        let b = PatientGateway::save(&storage, &patient("22222222222")).expect("Should save");
        let a_id = a.id().expect("Should have id");
        let b_id = b.id().expect("Should have id");

        let token = ShareToken::create(Some("tok"), Some(5), Some(Utc::now()), Some(a_id))
            .expect("Should build token");
        let saved = ShareTokenGateway::save(&storage, &token, b_id).expect("Should save");
        assert_eq!(saved.patient_id(), b_id);

        let found = storage
            .find_by_access_token("tok")
            .expect("Should query")
            .expect("Should exist");
        assert_eq!(found, saved);
    }
}
