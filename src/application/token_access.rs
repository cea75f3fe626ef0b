//! History access through a share token.
//!
//! Both use cases resolve the token first: an unknown token fails with
//! `ShareTokenNotFound`, one whose window has elapsed at the sampled `now`
//! fails with `ShareTokenExpired`. A valid token may be used any number of
//! times until it expires.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::BusinessError;
use crate::adapters::StorageError;
use crate::domain::{MedicalRecord, RecordFields, ShareToken};
use crate::ports::{Clock, MedicalRecordGateway, ShareTokenGateway};
use crate::MedshareError;

fn resolve_token<T>(
    tokens: &T,
    access_token: &str,
    now: DateTime<Utc>,
) -> Result<ShareToken, MedshareError>
where
    T: ShareTokenGateway,
    T::Error: Into<StorageError>,
{
    let token = tokens
        .find_by_access_token(access_token)
        .map_err(|e| MedshareError::Storage(e.into()))?
        .ok_or_else(|| {
            tracing::warn!("Rejected unknown share token");
            BusinessError::ShareTokenNotFound(access_token.to_string())
        })?;

    if token.is_expired(now) {
        tracing::warn!(expired_at = %token.expires_at(), "Rejected expired share token");
        return Err(BusinessError::ShareTokenExpired(access_token.to_string()).into());
    }

    Ok(token)
}

/// Reads a patient's history with a share token.
pub struct AccessHistoryByToken<T, R, C>
where
    T: ShareTokenGateway,
    R: MedicalRecordGateway,
    C: Clock,
{
    tokens: Arc<T>,
    records: Arc<R>,
    clock: Arc<C>,
}

impl<T, R, C> AccessHistoryByToken<T, R, C>
where
    T: ShareTokenGateway,
    T::Error: Into<StorageError>,
    R: MedicalRecordGateway,
    R::Error: Into<StorageError>,
    C: Clock,
{
    pub fn new(tokens: Arc<T>, records: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            tokens,
            records,
            clock,
        }
    }

    /// # Errors
    /// - `BusinessError::ShareTokenNotFound` / `ShareTokenExpired`
    /// - `StorageError` if a gateway fails
    pub fn execute(&self, access_token: &str) -> Result<Vec<MedicalRecord>, MedshareError> {
        let token = resolve_token(self.tokens.as_ref(), access_token, self.clock.now())?;

        let history = self
            .records
            .find_by_patient_id(token.patient_id())
            .map_err(|e| MedshareError::Storage(e.into()))?;
        tracing::debug!(
            patient_id = %token.patient_id(),
            records = history.len(),
            "History read through share token"
        );
        Ok(history)
    }
}

/// Appends a record to a patient's history with a share token.
pub struct RegisterMedicalRecordByToken<T, R, C>
where
    T: ShareTokenGateway,
    R: MedicalRecordGateway,
    C: Clock,
{
    tokens: Arc<T>,
    records: Arc<R>,
    clock: Arc<C>,
}

impl<T, R, C> RegisterMedicalRecordByToken<T, R, C>
where
    T: ShareTokenGateway,
    T::Error: Into<StorageError>,
    R: MedicalRecordGateway,
    R::Error: Into<StorageError>,
    C: Clock,
{
    pub fn new(tokens: Arc<T>, records: Arc<R>, clock: Arc<C>) -> Self {
        Self {
            tokens,
            records,
            clock,
        }
    }

    /// Record a consultation dated at the current instant.
    ///
    /// # Errors
    /// - `BusinessError::ShareTokenNotFound` / `ShareTokenExpired`
    /// - `DomainError` if any record field is blank
    /// - `StorageError` if a gateway fails
    pub fn execute(
        &self,
        access_token: &str,
        fields: &RecordFields,
    ) -> Result<MedicalRecord, MedshareError> {
        let now = self.clock.now();
        let token = resolve_token(self.tokens.as_ref(), access_token, now)?;

        let record = MedicalRecord::create(Some(now), fields, now)?;
        let saved = self
            .records
            .save(&record, token.patient_id())
            .map_err(|e| MedshareError::Storage(e.into()))?;

        tracing::info!(patient_id = %token.patient_id(), "Medical record registered");
        Ok(saved)
    }
}
