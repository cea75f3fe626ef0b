//! Business rule failures raised by the use cases.

/// Failures of use-case level rules, as opposed to field invariants
/// ([`crate::DomainError`]) or storage faults.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BusinessError {
    #[error("Patient with cpf=[{0}] already exists.")]
    PatientAlreadyExists(String),

    #[error("Patient with identifier=[{0}] not found.")]
    PatientNotFound(String),

    #[error("Share token [{0}] not found.")]
    ShareTokenNotFound(String),

    #[error("Share token [{0}] has expired.")]
    ShareTokenExpired(String),

    #[error("Expiration time must be greater than zero.")]
    InvalidTokenExpiration,
}

impl BusinessError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::PatientAlreadyExists(_) => "already_exists",
            Self::PatientNotFound(_) => "not_found",
            Self::ShareTokenNotFound(_) => "share_token_not_found",
            Self::ShareTokenExpired(_) => "share_token_expired",
            Self::InvalidTokenExpiration => "invalid_token_expiration",
        }
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::PatientNotFound(_) | Self::ShareTokenNotFound(_) => 404,
            Self::PatientAlreadyExists(_)
            | Self::ShareTokenExpired(_)
            | Self::InvalidTokenExpiration => 400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_and_codes() {
        let cases = [
            (
                BusinessError::PatientAlreadyExists("12345678900".to_string()),
                "Patient with cpf=[12345678900] already exists.",
                "already_exists",
                400,
            ),
            (
                BusinessError::PatientNotFound("00000000000".to_string()),
                "Patient with identifier=[00000000000] not found.",
                "not_found",
                404,
            ),
            (
                BusinessError::ShareTokenNotFound("abc".to_string()),
                "Share token [abc] not found.",
                "share_token_not_found",
                404,
            ),
            (
                BusinessError::ShareTokenExpired("abc".to_string()),
                "Share token [abc] has expired.",
                "share_token_expired",
                400,
            ),
            (
                BusinessError::InvalidTokenExpiration,
                "Expiration time must be greater than zero.",
                "invalid_token_expiration",
                400,
            ),
        ];

        for (err, message, code, status) in cases {
            assert_eq!(err.to_string(), message);
            assert_eq!(err.code(), code);
            assert_eq!(err.status(), status);
        }
    }
}
