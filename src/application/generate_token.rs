//! Share token issuance.

use std::sync::Arc;

use super::BusinessError;
use crate::adapters::StorageError;
use crate::domain::{generate_access_token, ShareToken};
use crate::ports::{Clock, PatientGateway, ShareTokenGateway};
use crate::MedshareError;

/// Issues a time-limited access token for a registered patient.
pub struct GenerateToken<P, T, C>
where
    P: PatientGateway,
    T: ShareTokenGateway,
    C: Clock,
{
    patients: Arc<P>,
    tokens: Arc<T>,
    clock: Arc<C>,
}

impl<P, T, C> GenerateToken<P, T, C>
where
    P: PatientGateway,
    P::Error: Into<StorageError>,
    T: ShareTokenGateway,
    T::Error: Into<StorageError>,
    C: Clock,
{
    pub fn new(patients: Arc<P>, tokens: Arc<T>, clock: Arc<C>) -> Self {
        Self {
            patients,
            tokens,
            clock,
        }
    }

    /// Issue a token valid for `expires_in_minutes` from now.
    ///
    /// # Errors
    /// - `BusinessError::InvalidTokenExpiration` if the window is not positive
    ///   (no gateway is consulted)
    /// - `BusinessError::PatientNotFound` if no patient has this CPF
    /// - `StorageError` if a gateway fails
    pub fn execute(&self, cpf: &str, expires_in_minutes: i64) -> Result<ShareToken, MedshareError> {
        if expires_in_minutes <= 0 {
            return Err(BusinessError::InvalidTokenExpiration.into());
        }

        let patient = self
            .patients
            .find_by_cpf(cpf)
            .map_err(|e| MedshareError::Storage(e.into()))?
            .ok_or_else(|| BusinessError::PatientNotFound(cpf.to_string()))?;

        let token = ShareToken::create(
            Some(generate_access_token().as_str()),
            Some(expires_in_minutes),
            Some(self.clock.now()),
            patient.id(),
        )?;

        let saved = self
            .tokens
            .save(&token, token.patient_id())
            .map_err(|e| MedshareError::Storage(e.into()))?;

        tracing::info!(
            patient_id = %saved.patient_id(),
            expires_in_minutes,
            "Share token issued"
        );
        Ok(saved)
    }
}
