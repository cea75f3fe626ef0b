//! JSON response bodies for the boundary.
//!
//! Field names are camelCase to match the wire format clients already
//! consume.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::{
    MedicalRecord, MedicalRecordId, Patient, PatientId, ShareToken, ShareTokenId,
};
use crate::MedshareError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientResponse {
    pub id: Option<PatientId>,
    pub cpf: String,
    pub name: String,
    pub birth_date: NaiveDate,
}

impl From<&Patient> for PatientResponse {
    fn from(patient: &Patient) -> Self {
        Self {
            id: patient.id(),
            cpf: patient.cpf().to_string(),
            name: patient.name().to_string(),
            birth_date: patient.birth_date(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecordResponse {
    pub id: Option<MedicalRecordId>,
    pub date: DateTime<Utc>,
    pub unit: String,
    pub professional_name: String,
    pub diagnosis: String,
    pub treatment: String,
    pub notes: String,
}

impl From<&MedicalRecord> for MedicalRecordResponse {
    fn from(record: &MedicalRecord) -> Self {
        Self {
            id: record.id(),
            date: record.date(),
            unit: record.unit().to_string(),
            professional_name: record.professional_name().to_string(),
            diagnosis: record.diagnosis().to_string(),
            treatment: record.treatment().to_string(),
            notes: record.notes().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareTokenResponse {
    pub id: Option<ShareTokenId>,
    pub access_token: String,
    pub expires_in_minutes: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub patient_id: PatientId,
}

impl From<&ShareToken> for ShareTokenResponse {
    fn from(token: &ShareToken) -> Self {
        Self {
            id: token.id(),
            access_token: token.access_token().to_string(),
            expires_in_minutes: token.expires_in_minutes(),
            created_at: token.created_at(),
            expires_at: token.expires_at(),
            patient_id: token.patient_id(),
        }
    }
}

/// Error envelope: human message, stable code and status class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub error: &'static str,
    pub status: u16,
}

impl From<&MedshareError> for ErrorResponse {
    fn from(err: &MedshareError) -> Self {
        Self {
            message: err.to_string(),
            error: err.code(),
            status: err.status(),
        }
    }
}

#[must_use]
pub fn history(records: &[MedicalRecord]) -> Vec<MedicalRecordResponse> {
    records.iter().map(MedicalRecordResponse::from).collect()
}
