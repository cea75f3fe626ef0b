//! Medical record entries appended to a patient's history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{
    ensure, is_absent, is_after, is_blank, DomainError, Rule, BLANK_MESSAGE, FUTURE_DATE_MESSAGE,
};

const DOMAIN_LABEL: &str = "by domain medical record";

/// Storage-assigned record identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MedicalRecordId(pub i64);

/// One consultation entry. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicalRecord {
    id: Option<MedicalRecordId>,
    date: DateTime<Utc>,
    unit: String,
    professional_name: String,
    diagnosis: String,
    treatment: String,
    notes: String,
}

/// Raw record fields as received from the boundary. `None` means "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    pub unit: Option<String>,
    pub professional_name: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
}

impl MedicalRecord {
    /// Build a new, unsaved record dated `date`.
    ///
    /// `now` is the reference instant for the "not in the future" rule.
    ///
    /// # Errors
    /// Returns `DomainError` listing every violated field rule.
    pub fn create(
        date: Option<DateTime<Utc>>,
        fields: &RecordFields,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        Self::restore(None, date, fields, now)
    }

    /// Rehydrate a persisted record, re-checking the same rules as [`MedicalRecord::create`].
    ///
    /// # Errors
    /// Returns `DomainError` listing every violated field rule.
    pub fn restore(
        id: Option<MedicalRecordId>,
        date: Option<DateTime<Utc>>,
        fields: &RecordFields,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        validate_domain(date.as_ref(), fields, now)?;

        let Some(date) = date else {
            unreachable!("rule table rejects an absent record date");
        };
        let text = |value: &Option<String>| value.clone().unwrap_or_default();

        Ok(Self {
            id,
            date,
            unit: text(&fields.unit),
            professional_name: text(&fields.professional_name),
            diagnosis: text(&fields.diagnosis),
            treatment: text(&fields.treatment),
            notes: text(&fields.notes),
        })
    }

    #[must_use]
    pub fn with_id(mut self, id: MedicalRecordId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn id(&self) -> Option<MedicalRecordId> {
        self.id
    }

    #[must_use]
    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    #[must_use]
    pub fn unit(&self) -> &str {
        &self.unit
    }

    #[must_use]
    pub fn professional_name(&self) -> &str {
        &self.professional_name
    }

    #[must_use]
    pub fn diagnosis(&self) -> &str {
        &self.diagnosis
    }

    #[must_use]
    pub fn treatment(&self) -> &str {
        &self.treatment
    }

    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }
}

fn validate_domain(
    date: Option<&DateTime<Utc>>,
    fields: &RecordFields,
    now: DateTime<Utc>,
) -> Result<(), DomainError> {
    let date_missing = Rule::new(date, BLANK_MESSAGE, "date").when(is_absent::<DateTime<Utc>>);
    let date_future = Rule::new(date, FUTURE_DATE_MESSAGE, "date").when(is_after(now));
    let unit = Rule::new(fields.unit.as_deref(), BLANK_MESSAGE, "unit").when(is_blank);
    let professional = Rule::new(
        fields.professional_name.as_deref(),
        BLANK_MESSAGE,
        "professionalName",
    )
    .when(is_blank);
    let diagnosis =
        Rule::new(fields.diagnosis.as_deref(), BLANK_MESSAGE, "diagnosis").when(is_blank);
    let treatment =
        Rule::new(fields.treatment.as_deref(), BLANK_MESSAGE, "treatment").when(is_blank);
    let notes = Rule::new(fields.notes.as_deref(), BLANK_MESSAGE, "notes").when(is_blank);

    ensure(
        &[
            &date_missing,
            &date_future,
            &unit,
            &professional,
            &diagnosis,
            &treatment,
            &notes,
        ],
        DOMAIN_LABEL,
    )
}
