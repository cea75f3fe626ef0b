//! Time-limited access tokens granting read/append access to a patient's history.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::patient::PatientId;
use super::validation::{
    ensure, is_absent, is_blank, is_non_positive, DomainError, Rule, BLANK_MESSAGE,
    NON_POSITIVE_MESSAGE,
};

const DOMAIN_LABEL: &str = "by domain share token";

/// Storage-assigned token identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareTokenId(pub i64);

/// A bearer token bound to one patient. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareToken {
    id: Option<ShareTokenId>,
    access_token: String,
    expires_in_minutes: i64,
    created_at: DateTime<Utc>,
    patient_id: PatientId,
}

impl ShareToken {
    /// Build a new, unsaved token.
    ///
    /// # Errors
    /// Returns `DomainError` listing every violated field rule.
    pub fn create(
        access_token: Option<&str>,
        expires_in_minutes: Option<i64>,
        created_at: Option<DateTime<Utc>>,
        patient_id: Option<PatientId>,
    ) -> Result<Self, DomainError> {
        Self::restore(None, access_token, expires_in_minutes, created_at, patient_id)
    }

    /// Rehydrate a persisted token, re-checking the same rules as [`ShareToken::create`].
    ///
    /// # Errors
    /// Returns `DomainError` listing every violated field rule.
    pub fn restore(
        id: Option<ShareTokenId>,
        access_token: Option<&str>,
        expires_in_minutes: Option<i64>,
        created_at: Option<DateTime<Utc>>,
        patient_id: Option<PatientId>,
    ) -> Result<Self, DomainError> {
        let token_rule = Rule::new(access_token, BLANK_MESSAGE, "accessToken").when(is_blank);
        let expires_missing = Rule::new(
            expires_in_minutes.as_ref(),
            BLANK_MESSAGE,
            "expiresInMinutes",
        )
        .when(is_absent::<i64>);
        let expires_positive =
            Rule::new(expires_in_minutes.as_ref(), NON_POSITIVE_MESSAGE, "expiresInMinutes")
                .when(is_non_positive);
        let created_rule = Rule::new(created_at.as_ref(), BLANK_MESSAGE, "createdAt")
            .when(is_absent::<DateTime<Utc>>);
        let patient_rule = Rule::new(patient_id.as_ref(), BLANK_MESSAGE, "patientId")
            .when(is_absent::<PatientId>);

        ensure(
            &[
                &token_rule,
                &expires_missing,
                &expires_positive,
                &created_rule,
                &patient_rule,
            ],
            DOMAIN_LABEL,
        )?;

        let (Some(access_token), Some(expires_in_minutes), Some(created_at), Some(patient_id)) =
            (access_token, expires_in_minutes, created_at, patient_id)
        else {
            unreachable!("rule table rejects absent token fields");
        };

        Ok(Self {
            id,
            access_token: access_token.to_string(),
            expires_in_minutes,
            created_at,
            patient_id,
        })
    }

    #[must_use]
    pub fn with_id(mut self, id: ShareTokenId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn id(&self) -> Option<ShareTokenId> {
        self.id
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    #[must_use]
    pub fn expires_in_minutes(&self) -> i64 {
        self.expires_in_minutes
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn patient_id(&self) -> PatientId {
        self.patient_id
    }

    /// Instant from which the token is no longer accepted.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        Duration::try_minutes(self.expires_in_minutes)
            .and_then(|window| self.created_at.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// A token is valid strictly before `expires_at`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }
}

/// Generate a random access token shaped like a UUID v4.
///
/// Uses ChaCha20Rng seeded from OS entropy so tokens are not predictable.
#[must_use]
pub fn generate_access_token() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 16] = rng.gen();

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        (bytes[6] & 0x0f) | 0x40, bytes[7],
        (bytes[8] & 0x3f) | 0x80, bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn token(expires: i64, created_at: DateTime<Utc>) -> ShareToken {
        ShareToken::create(Some("abc"), Some(expires), Some(created_at), Some(PatientId(1)))
            .expect("Should create")
    }

    #[test]
    fn test_create_token() {
        let now = Utc::now();
        let value = generate_access_token();
        let token = ShareToken::create(
            Some(value.as_str()),
            Some(30),
            Some(now),
            Some(PatientId(123)),
        )
        .expect("Should create");

        assert_eq!(token.id(), None);
        assert_eq!(token.access_token(), value);
        assert_eq!(token.expires_in_minutes(), 30);
        assert_eq!(token.created_at(), now);
        assert_eq!(token.patient_id(), PatientId(123));
        assert!(!token.is_expired(now));
    }

    #[test]
    fn test_expired_after_window() {
        let now = Utc::now();
        assert!(token(30, now - Duration::minutes(60)).is_expired(now));
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let created = Utc::now();
        let token = token(30, created);
        assert!(!token.is_expired(created + Duration::minutes(30) - Duration::milliseconds(1)));
        assert!(token.is_expired(created + Duration::minutes(30)));
    }

    #[test]
    fn test_blank_access_token_rejected() {
        for value in [None, Some("")] {
            let err = ShareToken::create(value, Some(10), Some(Utc::now()), Some(PatientId(1)))
                .expect_err("Should fail");
            assert_eq!(
                err.to_string(),
                "Field=[accessToken] should not be empty or null by domain share token"
            );
        }
    }

    #[test]
    fn test_missing_expiration_rejected() {
        let err = ShareToken::create(Some("token"), None, Some(Utc::now()), Some(PatientId(1)))
            .expect_err("Should fail");
        assert_eq!(
            err.to_string(),
            "Field=[expiresInMinutes] should not be empty or null by domain share token"
        );
    }

    #[test]
    fn test_non_positive_expiration_rejected() {
        for value in [0, -1] {
            let err =
                ShareToken::create(Some("token"), Some(value), Some(Utc::now()), Some(PatientId(1)))
                    .expect_err("Should fail");
            assert_eq!(
                err.to_string(),
                "Field=[expiresInMinutes] must be greater than 0 by domain share token"
            );
        }
    }

    #[test]
    fn test_missing_created_at_rejected() {
        let err = ShareToken::create(Some("token"), Some(10), None, Some(PatientId(1)))
            .expect_err("Should fail");
        assert_eq!(
            err.to_string(),
            "Field=[createdAt] should not be empty or null by domain share token"
        );
    }

    #[test]
    fn test_missing_patient_rejected() {
        let err = ShareToken::create(Some("token"), Some(10), Some(Utc::now()), None)
            .expect_err("Should fail");
        assert_eq!(
            err.to_string(),
            "Field=[patientId] should not be empty or null by domain share token"
        );
    }

    #[test]
    fn test_access_token_generation() {
        let a = generate_access_token();
        let b = generate_access_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
        assert_eq!(a.as_bytes()[14], b'4');
    }

    proptest! {
        #[test]
        fn prop_expired_iff_window_elapsed(minutes in 1i64..10_000, elapsed in 0i64..20_000 * 60) {
            let created = Utc::now();
            let token = token(minutes, created);
            let now = created + Duration::seconds(elapsed);
            prop_assert_eq!(token.is_expired(now), elapsed >= minutes * 60);
        }
    }
}
